//! # Application Configuration
//!
//! Deployment settings that never live in the database: currency scale,
//! order number prefix, tax wording and where totals read their tax rate.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     PODB_NUMBER_PREFIX=PO                                              │
//! │     PODB_CURRENCY_DECIMAL_PLACES=2                                     │
//! │                                                                         │
//! │  2. TOML Config File (read by podb-db::settings)                       │
//! │     ~/.config/podb/config.toml (Linux)                                 │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Company details and order defaults are NOT here: they are versioned in
//! the database as [`ConfigSnapshot`](crate::types::ConfigSnapshot) rows.
//!
//! ## Configuration File Format
//! ```toml
//! [company]
//! name = "Leal Engineering"
//!
//! [purchase_order]
//! number_prefix = "PO"
//!
//! [locale]
//! currency_symbol = "R"
//! currency_decimal_places = 2
//! tax_name = "VAT"
//!
//! [totals]
//! tax_rate_source = "latest"   # latest | order_snapshot
//!
//! [database]
//! path = "/var/lib/podb/podb.db"
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::conversion::CurrencyScale;
use crate::error::{CoreError, CoreResult};
use crate::validation::validate_order_number_prefix;

// =============================================================================
// Tax Rate Source
// =============================================================================

/// Which configuration snapshot supplies the tax rate for order totals.
///
/// ```text
/// LATEST (default)                     ORDER_SNAPSHOT
/// ────────────────                     ──────────────
/// Every recompute reads the newest     Totals use the snapshot the order
/// snapshot and re-points the order     already references, so editing an
/// at it. Matches stored totals of      old order keeps its old tax rate.
/// existing databases.
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxRateSource {
    #[default]
    Latest,
    OrderSnapshot,
}

impl fmt::Display for TaxRateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaxRateSource::Latest => write!(f, "latest"),
            TaxRateSource::OrderSnapshot => write!(f, "order_snapshot"),
        }
    }
}

impl FromStr for TaxRateSource {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "latest" => Ok(TaxRateSource::Latest),
            "order_snapshot" | "order" => Ok(TaxRateSource::OrderSnapshot),
            other => Err(CoreError::Config(format!(
                "Unknown tax rate source: '{}'. Valid options: latest, order_snapshot",
                other
            ))),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanySection {
    /// Printed on reports.
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrderSection {
    /// Prefix of generated order numbers, at most three characters.
    #[serde(default = "default_number_prefix")]
    pub number_prefix: String,
}

fn default_number_prefix() -> String {
    "PO".to_string()
}

impl Default for PurchaseOrderSection {
    fn default() -> Self {
        PurchaseOrderSection {
            number_prefix: default_number_prefix(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocaleSection {
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    #[serde(default)]
    pub currency_decimal_places: CurrencyScale,

    /// What the tax is called on screen and on reports ("VAT", "GST").
    #[serde(default = "default_tax_name")]
    pub tax_name: String,
}

fn default_currency_symbol() -> String {
    "R".to_string()
}

fn default_tax_name() -> String {
    "VAT".to_string()
}

impl Default for LocaleSection {
    fn default() -> Self {
        LocaleSection {
            currency_symbol: default_currency_symbol(),
            currency_decimal_places: CurrencyScale::default(),
            tax_name: default_tax_name(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TotalsSection {
    #[serde(default)]
    pub tax_rate_source: TaxRateSource,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// SQLite file. `None` means the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// =============================================================================
// App Config
// =============================================================================

/// The full application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub company: CompanySection,

    #[serde(default)]
    pub purchase_order: PurchaseOrderSection,

    #[serde(default)]
    pub locale: LocaleSection,

    #[serde(default)]
    pub totals: TotalsSection,

    #[serde(default)]
    pub database: DatabaseSection,
}

impl AppConfig {
    /// Parses and validates a TOML document. Missing keys take defaults.
    pub fn from_toml_str(contents: &str) -> CoreResult<Self> {
        let config: AppConfig =
            toml::from_str(contents).map_err(|e| CoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> CoreResult<String> {
        toml::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> CoreResult<()> {
        validate_order_number_prefix(&self.purchase_order.number_prefix).map_err(|e| {
            CoreError::Config(format!("Purchase Order number_prefix: {}", e))
        })?;

        if self.locale.currency_symbol.trim().is_empty() {
            return Err(CoreError::Config(
                "Locale currency_symbol must not be blank".into(),
            ));
        }

        if self.locale.tax_name.trim().is_empty() {
            return Err(CoreError::Config("Locale tax_name must not be blank".into()));
        }

        Ok(())
    }

    /// Applies `PODB_*` overrides from a variable lookup.
    ///
    /// The lookup is usually `|k| std::env::var(k).ok()`; passing it in keeps
    /// this crate free of process I/O. Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(prefix) = lookup("PODB_NUMBER_PREFIX") {
            debug!(prefix = %prefix, "Overriding order number prefix from environment");
            self.purchase_order.number_prefix = prefix;
        }

        if let Some(symbol) = lookup("PODB_CURRENCY_SYMBOL") {
            self.locale.currency_symbol = symbol;
        }

        if let Some(places) = lookup("PODB_CURRENCY_DECIMAL_PLACES") {
            if let Some(scale) = places
                .parse::<u32>()
                .ok()
                .and_then(|p| CurrencyScale::new(p).ok())
            {
                debug!(%scale, "Overriding currency decimal places from environment");
                self.locale.currency_decimal_places = scale;
            }
        }

        if let Some(tax_name) = lookup("PODB_TAX_NAME") {
            self.locale.tax_name = tax_name;
        }

        if let Some(source) = lookup("PODB_TAX_RATE_SOURCE") {
            if let Ok(parsed) = source.parse() {
                debug!(source = %source, "Overriding tax rate source from environment");
                self.totals.tax_rate_source = parsed;
            }
        }

        if let Some(path) = lookup("PODB_DATABASE_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn currency_scale(&self) -> CurrencyScale {
        self.locale.currency_decimal_places
    }

    pub fn number_prefix(&self) -> &str {
        &self.purchase_order.number_prefix
    }

    pub fn tax_rate_source(&self) -> TaxRateSource {
        self.totals.tax_rate_source
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.number_prefix(), "PO");
        assert_eq!(config.currency_scale().decimal_places(), 2);
        assert_eq!(config.locale.tax_name, "VAT");
        assert_eq!(config.tax_rate_source(), TaxRateSource::Latest);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_file() {
        let config = AppConfig::from_toml_str(
            r#"
            [locale]
            currency_symbol = "$"
            currency_decimal_places = 3

            [totals]
            tax_rate_source = "order_snapshot"
            "#,
        )
        .unwrap();

        assert_eq!(config.locale.currency_symbol, "$");
        assert_eq!(config.currency_scale().decimal_places(), 3);
        assert_eq!(config.tax_rate_source(), TaxRateSource::OrderSnapshot);
        assert_eq!(config.number_prefix(), "PO");
    }

    #[test]
    fn test_rejects_bad_scale_and_prefix() {
        assert!(AppConfig::from_toml_str("[locale]\ncurrency_decimal_places = 5\n").is_err());
        assert!(AppConfig::from_toml_str("[purchase_order]\nnumber_prefix = \"LONG\"\n").is_err());
        assert!(AppConfig::from_toml_str("[purchase_order]\nnumber_prefix = \"\"\n").is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = AppConfig::default();
        config.company.name = "Leal Engineering".to_string();
        config.database.path = Some(PathBuf::from("/tmp/podb.db"));

        let text = config.to_toml_string().unwrap();
        assert_eq!(AppConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_apply_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PODB_NUMBER_PREFIX", "ORD"),
            ("PODB_CURRENCY_DECIMAL_PLACES", "0"),
            ("PODB_TAX_RATE_SOURCE", "order_snapshot"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.number_prefix(), "ORD");
        assert_eq!(config.currency_scale().decimal_places(), 0);
        assert_eq!(config.tax_rate_source(), TaxRateSource::OrderSnapshot);
    }

    #[test]
    fn test_apply_overrides_ignores_garbage() {
        let mut config = AppConfig::default();
        config.apply_overrides(|k| match k {
            "PODB_CURRENCY_DECIMAL_PLACES" => Some("nine".to_string()),
            "PODB_TAX_RATE_SOURCE" => Some("whenever".to_string()),
            _ => None,
        });
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_tax_rate_source_from_str() {
        assert_eq!("LATEST".parse::<TaxRateSource>().unwrap(), TaxRateSource::Latest);
        assert!("sometimes".parse::<TaxRateSource>().is_err());
    }
}
