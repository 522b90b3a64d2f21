//! Joiner
//!
//! Inner join of orders against the six other tables. Every table is indexed
//! by its key once; when a key repeats, the first occurrence in file order is
//! the one joined and the later ones are counted as duplicates.
//!
//! Inventory rows are keyed by `(Warehouse_ID, Product_Category)`. An order
//! takes the row for its own category, or the warehouse's first row when that
//! category is not stocked there.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

use crate::models::{
    CostBreakdown, Dataset, DeliveryRecord, FeedbackRecord, Order, Route, SourceTables, Vehicle,
    WarehouseRecord,
};

/// One order with its matching record from each related table
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub order: Order,
    pub delivery: DeliveryRecord,
    pub route: Route,
    pub vehicle: Vehicle,
    pub warehouse: WarehouseRecord,
    pub feedback: FeedbackRecord,
    pub costs: CostBreakdown,
    /// Sum of the five cost categories
    pub total_cost: Option<f64>,
    /// `total_cost / order_value`; absent when either is missing or value <= 0
    pub cost_to_value: Option<f64>,
    pub delay_days: Option<f64>,
}

impl JoinedRow {
    pub fn new(
        order: Order,
        delivery: DeliveryRecord,
        route: Route,
        vehicle: Vehicle,
        warehouse: WarehouseRecord,
        feedback: FeedbackRecord,
        costs: CostBreakdown,
    ) -> Self {
        let total_cost = costs.total();
        let cost_to_value = match (total_cost, order.order_value) {
            (Some(cost), Some(value)) if value > 0.0 => Some(cost / value),
            _ => None,
        };
        let delay_days = delivery.delay_days();
        Self {
            order,
            delivery,
            route,
            vehicle,
            warehouse,
            feedback,
            costs,
            total_cost,
            cost_to_value,
            delay_days,
        }
    }
}

/// Data-quality counters produced by a join
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JoinReport {
    pub input_orders: usize,
    pub joined: usize,
    /// Orders excluded because the key had no match, per referenced table.
    /// An order missing several matches is counted once, under the first
    /// table checked.
    pub unmatched: BTreeMap<Dataset, usize>,
    /// Rows ignored because an earlier row had the same key, per table
    pub duplicate_keys: BTreeMap<Dataset, usize>,
}

impl JoinReport {
    pub fn excluded(&self) -> usize {
        self.unmatched.values().sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct JoinedTable {
    pub rows: Vec<JoinedRow>,
    pub report: JoinReport,
}

impl JoinedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Build a first-occurrence index of `rows` by `key`.
fn index_by<'a, T>(
    rows: &'a [T],
    dataset: Dataset,
    key: impl Fn(&T) -> &str,
    report: &mut JoinReport,
) -> HashMap<&'a str, &'a T>
where
    T: 'a,
{
    let mut index: HashMap<&'a str, &'a T> = HashMap::with_capacity(rows.len());
    let mut duplicates = 0;
    for row in rows {
        let k: &'a str = key(row);
        if index.contains_key(k) {
            duplicates += 1;
        } else {
            index.insert(k, row);
        }
    }
    if duplicates > 0 {
        debug!("{}: {} duplicate keys ignored", dataset, duplicates);
        report.duplicate_keys.insert(dataset, duplicates);
    }
    index
}

/// Inventory rows by `(warehouse, category)` with a first-row-per-warehouse fallback
struct WarehouseIndex<'a> {
    by_category: HashMap<(&'a str, &'a str), &'a WarehouseRecord>,
    by_id: HashMap<&'a str, &'a WarehouseRecord>,
}

impl<'a> WarehouseIndex<'a> {
    fn build(rows: &'a [WarehouseRecord], report: &mut JoinReport) -> Self {
        let mut by_category = HashMap::with_capacity(rows.len());
        let mut by_id = HashMap::new();
        let mut duplicates = 0;
        for row in rows {
            let key = (row.warehouse_id.as_str(), row.product_category.as_str());
            if by_category.contains_key(&key) {
                duplicates += 1;
                continue;
            }
            by_category.insert(key, row);
            by_id.entry(row.warehouse_id.as_str()).or_insert(row);
        }
        if duplicates > 0 {
            debug!("{}: {} duplicate keys ignored", Dataset::Warehouse, duplicates);
            report.duplicate_keys.insert(Dataset::Warehouse, duplicates);
        }
        Self { by_category, by_id }
    }

    fn get(&self, order: &'a Order) -> Option<&&'a WarehouseRecord> {
        let id = order.warehouse_id.as_str();
        self.by_category
            .get(&(id, order.product_category.as_str()))
            .or_else(|| self.by_id.get(id))
    }
}

/// Inner-join the seven tables into one row per resolvable order.
pub fn join(tables: SourceTables<'_>) -> JoinedTable {
    let mut report = JoinReport {
        input_orders: tables.orders.len(),
        ..JoinReport::default()
    };

    let delivery = index_by(
        tables.delivery,
        Dataset::Delivery,
        |r| r.order_id.as_str(),
        &mut report,
    );
    let routes = index_by(tables.routes, Dataset::Routes, |r| r.route_id.as_str(), &mut report);
    let fleet = index_by(tables.fleet, Dataset::Fleet, |r| r.vehicle_id.as_str(), &mut report);
    let warehouses = WarehouseIndex::build(tables.warehouses, &mut report);
    let feedback = index_by(
        tables.feedback,
        Dataset::Feedback,
        |r| r.order_id.as_str(),
        &mut report,
    );
    let costs = index_by(tables.costs, Dataset::Costs, |r| r.order_id.as_str(), &mut report);

    let mut seen_orders = HashSet::with_capacity(tables.orders.len());
    let mut duplicate_orders = 0;
    let mut rows = Vec::with_capacity(tables.orders.len());

    for order in tables.orders {
        if !seen_orders.insert(order.order_id.as_str()) {
            duplicate_orders += 1;
            continue;
        }

        let id = order.order_id.as_str();
        let lookups = (
            delivery.get(id),
            routes.get(order.route_id.as_str()),
            fleet.get(order.vehicle_id.as_str()),
            warehouses.get(order),
            feedback.get(id),
            costs.get(id),
        );
        match lookups {
            (Some(d), Some(r), Some(v), Some(w), Some(f), Some(c)) => rows.push(JoinedRow::new(
                order.clone(),
                (*d).clone(),
                (*r).clone(),
                (*v).clone(),
                (*w).clone(),
                (*f).clone(),
                (*c).clone(),
            )),
            (d, r, v, w, f, _) => {
                let missing = if d.is_none() {
                    Dataset::Delivery
                } else if r.is_none() {
                    Dataset::Routes
                } else if v.is_none() {
                    Dataset::Fleet
                } else if w.is_none() {
                    Dataset::Warehouse
                } else if f.is_none() {
                    Dataset::Feedback
                } else {
                    Dataset::Costs
                };
                *report.unmatched.entry(missing).or_insert(0) += 1;
            }
        }
    }

    if duplicate_orders > 0 {
        report.duplicate_keys.insert(Dataset::Orders, duplicate_orders);
    }
    report.joined = rows.len();

    if report.excluded() > 0 {
        warn!(
            "Join excluded {} of {} orders with unresolved keys: {:?}",
            report.excluded(),
            report.input_orders,
            report.unmatched
        );
    }
    debug!("Joined {} rows", report.joined);

    JoinedTable { rows, report }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_all_keys_match() {
        let t = tables(&[
            ("A", 100.0, 10.0, 0.0),
            ("B", 200.0, 40.0, 1.0),
            ("C", 300.0, 90.0, 3.0),
        ]);
        let joined = join(t.view());
        assert_eq!(joined.len(), 3);
        assert_eq!(joined.report.joined, 3);
        assert_eq!(joined.report.excluded(), 0);
        assert!(joined.report.duplicate_keys.is_empty());

        let b = &joined.rows[1];
        assert_eq!(b.order.order_id, "B");
        assert!((b.total_cost.unwrap() - 40.0).abs() < 1e-9);
        assert!((b.cost_to_value.unwrap() - 0.2).abs() < 1e-9);
        assert_eq!(b.delay_days, Some(1.0));
    }

    #[test]
    fn test_unmatched_orders_are_excluded_and_counted() {
        let mut t = tables(&[
            ("A", 100.0, 10.0, 0.0),
            ("B", 200.0, 40.0, 0.0),
            ("C", 300.0, 90.0, 0.0),
        ]);
        t.feedback.retain(|f| f.order_id != "B");
        t.fleet.retain(|v| v.vehicle_id != "V-C");

        let joined = join(t.view());
        assert_eq!(joined.len(), 1);
        assert_eq!(joined.report.unmatched.get(&Dataset::Feedback), Some(&1));
        assert_eq!(joined.report.unmatched.get(&Dataset::Fleet), Some(&1));
        assert_eq!(joined.report.excluded(), 2);

        let smallest = [
            t.orders.len(),
            t.delivery.len(),
            t.feedback.len(),
            t.costs.len(),
        ]
        .into_iter()
        .min()
        .unwrap();
        assert!(joined.len() <= smallest);
    }

    #[test]
    fn test_duplicate_keys_take_first_occurrence() {
        let mut t = tables(&[("A", 100.0, 10.0, 0.0)]);
        let mut second = t.costs[0].clone();
        second.fuel = Some(999.0);
        t.costs.push(second);
        t.orders.push(t.orders[0].clone());

        let joined = join(t.view());
        assert_eq!(joined.len(), 1);
        assert_eq!(joined.rows[0].costs.fuel, Some(4.0));
        assert_eq!(joined.report.duplicate_keys.get(&Dataset::Costs), Some(&1));
        assert_eq!(joined.report.duplicate_keys.get(&Dataset::Orders), Some(&1));
    }

    #[test]
    fn test_shared_dimension_rows() {
        // two orders on the same route
        let mut t = tables(&[("A", 100.0, 10.0, 0.0), ("B", 100.0, 10.0, 0.0)]);
        t.orders[1].route_id = "R-A".to_string();
        t.routes.truncate(1);

        let joined = join(t.view());
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.rows[1].route.route_id, "R-A");
    }

    #[test]
    fn test_warehouse_row_follows_order_category() {
        let mut t = tables(&[("A", 100.0, 10.0, 0.0), ("B", 100.0, 10.0, 0.0)]);
        t.orders[0].product_category = "Books".to_string();
        t.orders[1].product_category = "Toys".to_string();
        t.orders[1].warehouse_id = "W-A".to_string();
        let mut books = t.warehouses[0].clone();
        books.product_category = "Books".to_string();
        books.storage_cost_per_unit = Some(9.0);
        t.warehouses.truncate(1);
        t.warehouses.push(books);

        let joined = join(t.view());
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.rows[0].warehouse.product_category, "Books");
        assert_eq!(joined.rows[0].warehouse.storage_cost_per_unit, Some(9.0));
        // no "Toys" row at W-A: first row for the warehouse
        assert_eq!(joined.rows[1].warehouse.product_category, "Electronics");
        assert!(joined.report.duplicate_keys.is_empty());

        t.warehouses.push(t.warehouses[1].clone());
        let joined = join(t.view());
        assert_eq!(joined.report.duplicate_keys.get(&Dataset::Warehouse), Some(&1));
    }

    #[test]
    fn test_zero_order_value_has_no_ratio() {
        let t = tables(&[("A", 0.0, 10.0, 0.0)]);
        let joined = join(t.view());
        assert_eq!(joined.rows[0].cost_to_value, None);
    }

    #[test]
    fn test_empty_input() {
        let t = tables(&[]);
        let joined = join(t.view());
        assert!(joined.is_empty());
        assert_eq!(joined.report, JoinReport::default());
    }
}
