//! # Session
//!
//! The unit of work every purchase order edit runs inside.
//!
//! ## Committed vs Working State
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Session                                       │
//! │                                                                         │
//! │   committed: Tables ──────────── last state the store accepted         │
//! │        │                                                                │
//! │        │ changes()  (diff, read by podb-db when committing)            │
//! │        ▼                                                                │
//! │   working: Tables  ◄──────────── every ledger / buffer write           │
//! │        ▲                                                                │
//! │        │ flush()  (assigns OrderIds)                                   │
//! │        │                                                                │
//! │   pending: [PurchaseOrder]  ◄─── Ledger::create                        │
//! │                                                                         │
//! │   commit()   → working becomes committed                               │
//! │   rollback() → working is thrown away, pending is dropped              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The session is an arena: entities refer to each other by typed id and
//! every lookup goes through here. Catalog queries never flush, so a
//! validation lookup in the middle of an edit cannot push half-made orders
//! into the working set.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{CoreError, CoreResult};
use crate::types::{
    ConfigId, ConfigSnapshot, NewConfigSnapshot, NewProduct, NewProject, NewSupplier, OrderId,
    OrderLine, Product, ProductId, Project, ProjectId, PurchaseOrder, Supplier, SupplierId,
};
use crate::validation::{
    validate_length, validate_optional, validate_percentage, validate_price, validate_required,
    validate_unique, COMPANY_NAME_LENGTH, DESCRIPTION_LENGTH, EMAIL_ADDRESS_LENGTH,
    GPS_COORDINATES_LENGTH, PART_NUMBER_LENGTH, PERSON_NAME_LENGTH, PHONE_NUMBER_LENGTH,
    PROJECT_CODE_LENGTH, TAX_NUMBER_LENGTH, WEB_ADDRESS_LENGTH,
};

// =============================================================================
// Tables
// =============================================================================

/// Every persisted row, keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tables {
    pub suppliers: BTreeMap<SupplierId, Supplier>,
    pub products: BTreeMap<ProductId, Product>,
    pub projects: BTreeMap<ProjectId, Project>,
    pub configs: BTreeMap<ConfigId, ConfigSnapshot>,
    pub orders: BTreeMap<OrderId, PurchaseOrder>,

    /// Lines in display order. Orders without lines have no entry.
    pub order_lines: BTreeMap<OrderId, Vec<OrderLine>>,
}

/// Handle to an order inserted but not yet flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingOrderKey(u64);

// =============================================================================
// Change Set
// =============================================================================

/// What the store must write to make its state match the working set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    /// Inserted or updated rows.
    pub suppliers: Vec<Supplier>,
    pub products: Vec<Product>,
    pub projects: Vec<Project>,
    pub configs: Vec<ConfigSnapshot>,
    pub orders: Vec<PurchaseOrder>,

    pub deleted_orders: Vec<OrderId>,

    /// Full replacement line lists for orders whose lines changed.
    pub order_lines: Vec<(OrderId, Vec<OrderLine>)>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.suppliers.is_empty()
            && self.products.is_empty()
            && self.projects.is_empty()
            && self.configs.is_empty()
            && self.orders.is_empty()
            && self.deleted_orders.is_empty()
            && self.order_lines.is_empty()
    }
}

fn upserts<K: Ord, V: Clone + PartialEq>(
    committed: &BTreeMap<K, V>,
    working: &BTreeMap<K, V>,
) -> Vec<V> {
    working
        .iter()
        .filter(|(key, value)| committed.get(key) != Some(*value))
        .map(|(_, value)| value.clone())
        .collect()
}

fn next_id<K: Ord + Copy + Into<i64>, V>(
    committed: &BTreeMap<K, V>,
    working: &BTreeMap<K, V>,
) -> i64 {
    let last = |map: &BTreeMap<K, V>| -> i64 {
        map.keys().next_back().map(|k| (*k).into()).unwrap_or(0)
    };
    last(committed).max(last(working)) + 1
}

// =============================================================================
// Session
// =============================================================================

/// Unit of work over the purchase order tables.
#[derive(Debug, Clone, Default)]
pub struct Session {
    committed: Tables,
    working: Tables,
    pending: Vec<(PendingOrderKey, PurchaseOrder)>,
    resolved: HashMap<PendingOrderKey, OrderId>,
    next_pending: u64,
}

impl Session {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session over rows loaded from a store.
    pub fn from_tables(tables: Tables) -> Self {
        Session {
            committed: tables.clone(),
            working: tables,
            ..Default::default()
        }
    }

    /// Working state, including flushed but uncommitted writes.
    pub fn tables(&self) -> &Tables {
        &self.working
    }

    /// True if anything differs from the committed state.
    pub fn is_modified(&self) -> bool {
        !self.pending.is_empty() || self.working != self.committed
    }

    // =========================================================================
    // Suppliers
    // =========================================================================

    /// All suppliers in id order.
    pub fn suppliers(&self) -> impl Iterator<Item = &Supplier> {
        self.working.suppliers.values()
    }

    pub fn supplier(&self, id: SupplierId) -> Option<&Supplier> {
        self.working.suppliers.get(&id)
    }

    pub fn supplier_by_name(&self, company_name: &str) -> Option<&Supplier> {
        self.suppliers().find(|s| s.company_name == company_name)
    }

    /// Adds a supplier and returns its id.
    ///
    /// ## Rules
    /// - Company name required, at most 50 characters, unique
    /// - Contact details within their column sizes
    pub fn add_supplier(&mut self, supplier: NewSupplier) -> CoreResult<SupplierId> {
        let id = SupplierId(next_id(&self.committed.suppliers, &self.working.suppliers));
        let supplier = supplier.into_supplier(id);
        self.check_supplier(&supplier)?;

        info!(supplier_id = %id, name = %supplier.company_name, "Adding supplier");
        self.working.suppliers.insert(id, supplier);
        Ok(id)
    }

    /// Replaces a supplier's details, including its archived flag.
    pub fn update_supplier(&mut self, supplier: Supplier) -> CoreResult<()> {
        if !self.working.suppliers.contains_key(&supplier.id) {
            return Err(CoreError::not_found("Supplier", supplier.id));
        }
        self.check_supplier(&supplier)?;

        debug!(supplier_id = %supplier.id, "Updating supplier");
        self.working.suppliers.insert(supplier.id, supplier);
        Ok(())
    }

    fn check_supplier(&self, supplier: &Supplier) -> CoreResult<()> {
        validate_required("company name", &supplier.company_name, COMPANY_NAME_LENGTH)?;
        validate_unique(
            "company name",
            &supplier.company_name,
            self.suppliers()
                .filter(|s| s.id != supplier.id)
                .map(|s| s.company_name.as_str()),
        )?;
        validate_optional("contact name", supplier.contact_name.as_deref(), PERSON_NAME_LENGTH)?;
        validate_optional("phone number", supplier.phone.as_deref(), PHONE_NUMBER_LENGTH)?;
        validate_optional("fax number", supplier.fax.as_deref(), PHONE_NUMBER_LENGTH)?;
        validate_optional("email address", supplier.email.as_deref(), EMAIL_ADDRESS_LENGTH)?;
        validate_optional("web address", supplier.web_address.as_deref(), WEB_ADDRESS_LENGTH)?;
        validate_optional("tax number", supplier.tax_number.as_deref(), TAX_NUMBER_LENGTH)?;
        Ok(())
    }

    // =========================================================================
    // Products
    // =========================================================================

    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.working.products.get(&id)
    }

    /// A supplier's catalog in id order.
    pub fn products_for_supplier(
        &self,
        supplier_id: SupplierId,
        include_archived: bool,
    ) -> Vec<&Product> {
        self.working
            .products
            .values()
            .filter(|p| p.supplier_id == supplier_id)
            .filter(|p| include_archived || !p.archived)
            .collect()
    }

    /// Adds a product to a supplier's catalog.
    ///
    /// ## Rules
    /// - Supplier must exist
    /// - Part number and description required, each unique within the supplier
    /// - Price not negative, discount 0..=99
    pub fn add_product(&mut self, product: NewProduct) -> CoreResult<ProductId> {
        let id = ProductId(next_id(&self.committed.products, &self.working.products));
        let product = product.into_product(id);
        self.check_product(&product)?;

        info!(
            product_id = %id,
            supplier_id = %product.supplier_id,
            part_number = %product.part_number,
            "Adding product"
        );
        self.working.products.insert(id, product);
        Ok(id)
    }

    /// Replaces a product. Order lines keep the price they were given.
    pub fn update_product(&mut self, product: Product) -> CoreResult<()> {
        if !self.working.products.contains_key(&product.id) {
            return Err(CoreError::not_found("Product", product.id));
        }
        self.check_product(&product)?;

        debug!(product_id = %product.id, price = product.current_price, "Updating product");
        self.working.products.insert(product.id, product);
        Ok(())
    }

    fn check_product(&self, product: &Product) -> CoreResult<()> {
        if self.supplier(product.supplier_id).is_none() {
            return Err(CoreError::not_found("Supplier", product.supplier_id));
        }
        validate_required("part number", &product.part_number, PART_NUMBER_LENGTH)?;
        validate_required("description", &product.description, DESCRIPTION_LENGTH)?;
        validate_price(product.current_price)?;
        validate_percentage("discount", product.current_discount)?;

        let siblings: Vec<&Product> = self
            .products_for_supplier(product.supplier_id, true)
            .into_iter()
            .filter(|p| p.id != product.id)
            .collect();
        validate_unique(
            "part number",
            &product.part_number,
            siblings.iter().map(|p| p.part_number.as_str()),
        )?;
        validate_unique(
            "description",
            &product.description,
            siblings.iter().map(|p| p.description.as_str()),
        )?;
        Ok(())
    }

    // =========================================================================
    // Projects
    // =========================================================================

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.working.projects.values()
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.working.projects.get(&id)
    }

    pub fn project_by_code(&self, code: &str) -> Option<&Project> {
        self.projects().find(|p| p.code == code)
    }

    pub fn add_project(&mut self, project: NewProject) -> CoreResult<ProjectId> {
        validate_required("project code", &project.code, PROJECT_CODE_LENGTH)?;
        validate_length("description", &project.description, DESCRIPTION_LENGTH)?;
        validate_unique(
            "project code",
            &project.code,
            self.projects().map(|p| p.code.as_str()),
        )?;

        let id = ProjectId(next_id(&self.committed.projects, &self.working.projects));
        info!(project_id = %id, code = %project.code, "Adding project");
        self.working.projects.insert(
            id,
            Project {
                id,
                code: project.code,
                description: project.description,
                completed: false,
            },
        );
        Ok(id)
    }

    // =========================================================================
    // Configuration Snapshots
    // =========================================================================

    pub fn config(&self, id: ConfigId) -> Option<&ConfigSnapshot> {
        self.working.configs.get(&id)
    }

    /// The newest snapshot by creation time (ties go to the higher id).
    pub fn latest_config(&self) -> Option<&ConfigSnapshot> {
        self.working
            .configs
            .values()
            .max_by_key(|c| (c.created_at, c.id))
    }

    /// Appends a configuration snapshot. Snapshots are never edited.
    pub fn add_config(
        &mut self,
        config: NewConfigSnapshot,
        created_at: DateTime<Utc>,
    ) -> CoreResult<ConfigId> {
        validate_optional("GPS coordinates", config.company_gps.as_deref(), GPS_COORDINATES_LENGTH)?;
        validate_required("phone number", &config.company_phone, PHONE_NUMBER_LENGTH)?;
        validate_optional("fax number", config.company_fax.as_deref(), PHONE_NUMBER_LENGTH)?;
        validate_optional("email address", config.company_email.as_deref(), EMAIL_ADDRESS_LENGTH)?;
        validate_optional(
            "web address",
            config.company_web_address.as_deref(),
            WEB_ADDRESS_LENGTH,
        )?;
        validate_required("signatory name", &config.signatory_name, PERSON_NAME_LENGTH)?;
        validate_percentage("tax rate", config.tax_rate)?;

        let id = ConfigId(next_id(&self.committed.configs, &self.working.configs));
        info!(config_id = %id, tax_rate = config.tax_rate, "Adding configuration snapshot");
        self.working
            .configs
            .insert(id, config.into_snapshot(id, created_at));
        Ok(id)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Flushed orders in id order.
    pub fn orders(&self) -> impl Iterator<Item = &PurchaseOrder> {
        self.working.orders.values()
    }

    pub fn order(&self, id: OrderId) -> Option<&PurchaseOrder> {
        self.working.orders.get(&id)
    }

    pub fn order_mut(&mut self, id: OrderId) -> Option<&mut PurchaseOrder> {
        self.working.orders.get_mut(&id)
    }

    /// Flushed plus pending orders.
    pub fn order_count(&self) -> usize {
        self.working.orders.len() + self.pending.len()
    }

    /// True if any order, pending or flushed, carries this number.
    pub fn order_number_in_use(&self, order_number: &str) -> bool {
        self.orders()
            .chain(self.pending.iter().map(|(_, order)| order))
            .any(|order| order.order_number == order_number)
    }

    /// Queues a new order. It gets an id on the next [`flush`](Self::flush).
    pub fn insert_order(&mut self, mut order: PurchaseOrder) -> PendingOrderKey {
        let key = PendingOrderKey(self.next_pending);
        self.next_pending += 1;
        order.id = None;

        debug!(order_number = %order.order_number, "Queued new purchase order");
        self.pending.push((key, order));
        key
    }

    /// Moves pending orders into the working set, assigning ids.
    pub fn flush(&mut self) -> Vec<OrderId> {
        let mut assigned = Vec::with_capacity(self.pending.len());

        for (key, mut order) in std::mem::take(&mut self.pending) {
            let id = OrderId(next_id(&self.committed.orders, &self.working.orders));
            order.id = Some(id);
            debug!(order_id = %id, order_number = %order.order_number, "Flushed purchase order");

            self.working.orders.insert(id, order);
            self.resolved.insert(key, id);
            assigned.push(id);
        }

        assigned
    }

    /// The id a pending order received when it was flushed.
    pub fn resolve_pending(&self, key: PendingOrderKey) -> CoreResult<OrderId> {
        self.resolved
            .get(&key)
            .copied()
            .ok_or_else(|| CoreError::not_found("Flushed order", format!("{:?}", key)))
    }

    /// Removes an order and its lines from the working set.
    pub fn delete_order(&mut self, id: OrderId) -> CoreResult<PurchaseOrder> {
        let order = self
            .working
            .orders
            .remove(&id)
            .ok_or_else(|| CoreError::not_found("Purchase order", id))?;
        self.working.order_lines.remove(&id);

        info!(order_id = %id, order_number = %order.order_number, "Deleted purchase order");
        Ok(order)
    }

    // =========================================================================
    // Order Lines
    // =========================================================================

    /// Persisted lines of an order, in display order.
    pub fn order_lines(&self, id: OrderId) -> &[OrderLine] {
        self.working
            .order_lines
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Replaces the persisted lines of an order.
    pub fn set_order_lines(&mut self, id: OrderId, lines: Vec<OrderLine>) -> CoreResult<()> {
        if !self.working.orders.contains_key(&id) {
            return Err(CoreError::not_found("Purchase order", id));
        }

        if lines.is_empty() {
            self.working.order_lines.remove(&id);
        } else {
            self.working.order_lines.insert(id, lines);
        }
        Ok(())
    }

    // =========================================================================
    // Transaction Boundary
    // =========================================================================

    /// Diff of the working set against the committed state.
    ///
    /// Pending orders are not included; flush first.
    pub fn changes(&self) -> ChangeSet {
        let deleted_orders = self
            .committed
            .orders
            .keys()
            .filter(|id| !self.working.orders.contains_key(id))
            .copied()
            .collect();

        let order_lines = self
            .working
            .orders
            .keys()
            .filter(|id| {
                self.committed.order_lines.get(id) != self.working.order_lines.get(id)
            })
            .map(|id| (*id, self.order_lines(*id).to_vec()))
            .collect();

        ChangeSet {
            suppliers: upserts(&self.committed.suppliers, &self.working.suppliers),
            products: upserts(&self.committed.products, &self.working.products),
            projects: upserts(&self.committed.projects, &self.working.projects),
            configs: upserts(&self.committed.configs, &self.working.configs),
            orders: upserts(&self.committed.orders, &self.working.orders),
            deleted_orders,
            order_lines,
        }
    }

    /// Flushes and makes the working set the committed state.
    ///
    /// Call after the store has written [`changes`](Self::changes).
    pub fn commit(&mut self) {
        self.flush();
        self.committed = self.working.clone();
        self.resolved.clear();
        info!(orders = self.committed.orders.len(), "Session committed");
    }

    /// Discards every uncommitted write, including pending orders.
    pub fn rollback(&mut self) {
        self.working = self.committed.clone();
        self.pending.clear();
        self.resolved.clear();
        info!("Session rolled back");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::types::{OrderStatus, PaymentTerms};
    use chrono::{NaiveDate, TimeZone};

    fn sample_order(number: &str) -> PurchaseOrder {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        PurchaseOrder {
            id: None,
            order_number: number.to_string(),
            order_date: date,
            delivery_date: date,
            delivery_address: "1 Main Rd".to_string(),
            delivery_gps: None,
            payment_terms: PaymentTerms::default(),
            order_status: OrderStatus::default(),
            notes: String::new(),
            total_excluding_tax: 0,
            total_tax: 0,
            total_including_tax: 0,
            project_id: ProjectId(1),
            supplier_id: SupplierId(1),
            config_id: ConfigId(1),
        }
    }

    fn new_config(tax_rate: i64) -> NewConfigSnapshot {
        NewConfigSnapshot {
            company_physical_address: "1 Main Rd".to_string(),
            company_gps: None,
            company_postal_address: "PO Box 1".to_string(),
            company_phone: "021 555 0100".to_string(),
            company_fax: None,
            company_email: None,
            company_web_address: None,
            signatory_name: "J. Leal".to_string(),
            default_payment_terms: PaymentTerms::PayIn30Days,
            default_order_status: OrderStatus::Draft,
            tax_rate,
        }
    }

    #[test]
    fn test_pending_orders_get_ids_on_flush() {
        let mut session = Session::new();
        let key = session.insert_order(sample_order("PO00001"));

        assert_eq!(session.order_count(), 1);
        assert_eq!(session.orders().count(), 0);
        assert!(session.resolve_pending(key).is_err());

        let assigned = session.flush();
        let id = session.resolve_pending(key).unwrap();
        assert_eq!(assigned, vec![id]);
        assert_eq!(session.order(id).unwrap().id, Some(id));
        assert_eq!(session.order_count(), 1);
    }

    #[test]
    fn test_catalog_queries_do_not_flush() {
        let mut session = Session::new();
        session.add_supplier(NewSupplier::new("Acme")).unwrap();
        session.insert_order(sample_order("PO00001"));

        assert!(session.supplier_by_name("Acme").is_some());
        assert!(session.order_number_in_use("PO00001"));
        assert_eq!(session.orders().count(), 0);
    }

    #[test]
    fn test_add_supplier_rejects_duplicate_name() {
        let mut session = Session::new();
        session.add_supplier(NewSupplier::new("Acme")).unwrap();

        let err = session.add_supplier(NewSupplier::new("Acme")).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_product_uniqueness_is_per_supplier() {
        let mut session = Session::new();
        let acme = session.add_supplier(NewSupplier::new("Acme")).unwrap();
        let bolt = session.add_supplier(NewSupplier::new("BoltCo")).unwrap();

        let product = |supplier_id| NewProduct {
            supplier_id,
            part_number: "B-10".to_string(),
            description: "Bolt 10mm".to_string(),
            current_price: 250,
            current_discount: 0,
        };

        session.add_product(product(acme)).unwrap();
        session.add_product(product(bolt)).unwrap();
        assert!(session.add_product(product(acme)).is_err());
    }

    #[test]
    fn test_products_for_supplier_filters_archived() {
        let mut session = Session::new();
        let acme = session.add_supplier(NewSupplier::new("Acme")).unwrap();
        let id = session
            .add_product(NewProduct {
                supplier_id: acme,
                part_number: "B-10".to_string(),
                description: "Bolt 10mm".to_string(),
                current_price: 250,
                current_discount: 0,
            })
            .unwrap();

        let mut archived = session.product(id).unwrap().clone();
        archived.archived = true;
        session.update_product(archived).unwrap();

        assert!(session.products_for_supplier(acme, false).is_empty());
        assert_eq!(session.products_for_supplier(acme, true).len(), 1);
    }

    #[test]
    fn test_latest_config_uses_creation_time() {
        let mut session = Session::new();
        let newer = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let older = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();

        let first = session.add_config(new_config(15), newer).unwrap();
        session.add_config(new_config(14), older).unwrap();

        assert_eq!(session.latest_config().unwrap().id, first);
    }

    #[test]
    fn test_changes_and_commit() {
        let mut session = Session::new();
        session.add_supplier(NewSupplier::new("Acme")).unwrap();
        session.insert_order(sample_order("PO00001"));
        session.flush();

        let changes = session.changes();
        assert_eq!(changes.suppliers.len(), 1);
        assert_eq!(changes.orders.len(), 1);
        assert!(changes.order_lines.is_empty());

        session.commit();
        assert!(session.changes().is_empty());
        assert!(!session.is_modified());
    }

    #[test]
    fn test_changes_track_lines_and_deletes() {
        let mut session = Session::new();
        session.insert_order(sample_order("PO00001"));
        let id = session.flush()[0];
        session.commit();

        session
            .set_order_lines(id, vec![OrderLine::empty(id)])
            .unwrap();
        let changes = session.changes();
        assert_eq!(changes.order_lines, vec![(id, vec![OrderLine::empty(id)])]);
        session.commit();

        session.delete_order(id).unwrap();
        let changes = session.changes();
        assert_eq!(changes.deleted_orders, vec![id]);
        assert!(changes.order_lines.is_empty());
    }

    #[test]
    fn test_rollback_discards_everything() {
        let mut session = Session::new();
        session.add_supplier(NewSupplier::new("Acme")).unwrap();
        session.commit();

        session.add_supplier(NewSupplier::new("BoltCo")).unwrap();
        session.insert_order(sample_order("PO00001"));
        session.rollback();

        assert_eq!(session.suppliers().count(), 1);
        assert_eq!(session.order_count(), 0);
        assert!(!session.is_modified());
    }

    #[test]
    fn test_deleted_id_is_not_reused_before_commit() {
        let mut session = Session::new();
        session.insert_order(sample_order("PO00001"));
        let first = session.flush()[0];
        session.commit();

        session.delete_order(first).unwrap();
        session.insert_order(sample_order("PO00002"));
        let second = session.flush()[0];

        assert_ne!(first, second);
    }
}
