//! # Project Repository

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use podb_core::types::{Project, ProjectId};

/// Row shape of the `project` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub code: String,
    pub description: String,
    pub completed: bool,
}

impl From<ProjectRecord> for Project {
    fn from(r: ProjectRecord) -> Self {
        Project {
            id: r.id,
            code: r.code,
            description: r.description,
            completed: r.completed,
        }
    }
}

/// Repository for project database operations.
#[derive(Debug, Clone)]
pub struct ProjectRepository {
    pool: SqlitePool,
}

impl ProjectRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProjectRepository { pool }
    }

    /// Lists every project by id.
    pub async fn list_all(&self) -> DbResult<Vec<Project>> {
        let records = sqlx::query_as::<_, ProjectRecord>(
            "SELECT id, code, description, completed FROM project ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = records.len(), "Loaded projects");
        Ok(records.into_iter().map(Project::from).collect())
    }

    /// Gets a project by its code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Project>> {
        let record = sqlx::query_as::<_, ProjectRecord>(
            "SELECT id, code, description, completed FROM project WHERE code = ?1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Project::from))
    }

    pub async fn upsert(&self, project: &Project) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::upsert_in(&mut conn, project).await
    }

    pub async fn upsert_in(conn: &mut SqliteConnection, project: &Project) -> DbResult<()> {
        debug!(id = %project.id, code = %project.code, "Upserting project");

        sqlx::query(
            r#"
            INSERT INTO project (id, code, description, completed)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (id) DO UPDATE SET
                code = excluded.code,
                description = excluded.description,
                completed = excluded.completed
            "#,
        )
        .bind(project.id)
        .bind(&project.code)
        .bind(&project.description)
        .bind(project.completed)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_upsert_and_lookup_by_code() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut project = Project {
            id: ProjectId(1),
            code: "WH01".to_string(),
            description: "Warehouse fit-out".to_string(),
            completed: false,
        };
        db.projects().upsert(&project).await.unwrap();

        project.completed = true;
        db.projects().upsert(&project).await.unwrap();

        let stored = db.projects().get_by_code("WH01").await.unwrap().unwrap();
        assert!(stored.completed);
        assert!(db.projects().get_by_code("XX99").await.unwrap().is_none());
    }
}
