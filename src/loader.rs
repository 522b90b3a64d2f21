//! Dataset loading
//!
//! Each of the seven CSV files is read once, its header validated against the
//! dataset's required columns, and every row deserialized into a typed record.
//! A failure is kept per dataset so unrelated sections can still render.

use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{Error, LoadError};
use crate::models::{
    CostBreakdown, Dataset, DeliveryRecord, FeedbackRecord, Order, Route, SourceTables, Vehicle,
    WarehouseRecord,
};

/// A typed row of one source dataset
pub trait SourceRecord: DeserializeOwned {
    const DATASET: Dataset;

    /// Identifier fields as `(column, value)`; none may be blank.
    fn keys(&self) -> Vec<(&'static str, &str)>;
}

impl SourceRecord for Order {
    const DATASET: Dataset = Dataset::Orders;

    fn keys(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("Order_ID", &self.order_id),
            ("Route_ID", &self.route_id),
            ("Vehicle_ID", &self.vehicle_id),
            ("Warehouse_ID", &self.warehouse_id),
        ]
    }
}

impl SourceRecord for DeliveryRecord {
    const DATASET: Dataset = Dataset::Delivery;

    fn keys(&self) -> Vec<(&'static str, &str)> {
        vec![("Order_ID", &self.order_id)]
    }
}

impl SourceRecord for Route {
    const DATASET: Dataset = Dataset::Routes;

    fn keys(&self) -> Vec<(&'static str, &str)> {
        vec![("Route_ID", &self.route_id)]
    }
}

impl SourceRecord for Vehicle {
    const DATASET: Dataset = Dataset::Fleet;

    fn keys(&self) -> Vec<(&'static str, &str)> {
        vec![("Vehicle_ID", &self.vehicle_id)]
    }
}

impl SourceRecord for WarehouseRecord {
    const DATASET: Dataset = Dataset::Warehouse;

    fn keys(&self) -> Vec<(&'static str, &str)> {
        vec![("Warehouse_ID", &self.warehouse_id)]
    }
}

impl SourceRecord for FeedbackRecord {
    const DATASET: Dataset = Dataset::Feedback;

    fn keys(&self) -> Vec<(&'static str, &str)> {
        vec![("Order_ID", &self.order_id)]
    }
}

impl SourceRecord for CostBreakdown {
    const DATASET: Dataset = Dataset::Costs;

    fn keys(&self) -> Vec<(&'static str, &str)> {
        vec![("Order_ID", &self.order_id)]
    }
}

/// Read one dataset from any CSV source.
pub fn read_records<T, R>(source: R) -> Result<Vec<T>, LoadError>
where
    T: SourceRecord,
    R: std::io::Read,
{
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(source);
    parse_records(&mut reader)
}

/// Read one dataset from `<dir>/<file name>`.
pub fn load_dataset<T: SourceRecord>(dir: &Path) -> Result<Vec<T>, LoadError> {
    let path = dir.join(T::DATASET.file_name());
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(&path)
        .map_err(|source| LoadError::Io {
            dataset: T::DATASET,
            path: path.clone(),
            source,
        })?;
    let records = parse_records(&mut reader)?;
    info!("Loaded {} rows from {:?}", records.len(), path);
    Ok(records)
}

fn parse_records<T, R>(reader: &mut csv::Reader<R>) -> Result<Vec<T>, LoadError>
where
    T: SourceRecord,
    R: std::io::Read,
{
    let dataset = T::DATASET;
    let headers = reader
        .headers()
        .map_err(|source| LoadError::InvalidRecord {
            dataset,
            line: 1,
            source,
        })?
        .clone();

    for &column in dataset.required_columns() {
        if !headers.iter().any(|h| h == column) {
            return Err(LoadError::MissingColumn { dataset, column });
        }
    }

    let mut records = Vec::new();
    for result in reader.deserialize::<T>() {
        let record = result.map_err(|source| LoadError::InvalidRecord {
            dataset,
            line: source.position().map(|p| p.line()).unwrap_or(0),
            source,
        })?;
        // header is line 1, first data row is line 2
        let line = records.len() as u64 + 2;
        if let Some((column, _)) = record.keys().into_iter().find(|(_, v)| v.is_empty()) {
            return Err(LoadError::InvalidValue {
                dataset,
                line,
                column,
                value: String::new(),
            });
        }
        records.push(record);
    }
    Ok(records)
}

/// Outcome of loading all seven datasets; each keeps its own result.
#[derive(Debug)]
pub struct SourceData {
    pub orders: Result<Vec<Order>, LoadError>,
    pub delivery: Result<Vec<DeliveryRecord>, LoadError>,
    pub routes: Result<Vec<Route>, LoadError>,
    pub fleet: Result<Vec<Vehicle>, LoadError>,
    pub warehouses: Result<Vec<WarehouseRecord>, LoadError>,
    pub feedback: Result<Vec<FeedbackRecord>, LoadError>,
    pub costs: Result<Vec<CostBreakdown>, LoadError>,
}

impl SourceData {
    /// Load every dataset under `dir`. Only total absence of usable data is fatal.
    pub fn load(dir: &Path) -> Result<Self, Error> {
        info!("Loading datasets from {:?}", dir);
        let data = Self {
            orders: load_dataset(dir),
            delivery: load_dataset(dir),
            routes: load_dataset(dir),
            fleet: load_dataset(dir),
            warehouses: load_dataset(dir),
            feedback: load_dataset(dir),
            costs: load_dataset(dir),
        };

        let failures = data.failures();
        for err in &failures {
            warn!("{}", err);
        }
        if failures.len() == Dataset::ALL.len() {
            return Err(Error::NoUsableData);
        }
        Ok(data)
    }

    /// Wrap already-loaded tables; used by tests and the synthetic generator.
    pub fn from_tables(
        orders: Vec<Order>,
        delivery: Vec<DeliveryRecord>,
        routes: Vec<Route>,
        fleet: Vec<Vehicle>,
        warehouses: Vec<WarehouseRecord>,
        feedback: Vec<FeedbackRecord>,
        costs: Vec<CostBreakdown>,
    ) -> Self {
        Self {
            orders: Ok(orders),
            delivery: Ok(delivery),
            routes: Ok(routes),
            fleet: Ok(fleet),
            warehouses: Ok(warehouses),
            feedback: Ok(feedback),
            costs: Ok(costs),
        }
    }

    pub fn failures(&self) -> Vec<&LoadError> {
        [
            self.orders.as_ref().err(),
            self.delivery.as_ref().err(),
            self.routes.as_ref().err(),
            self.fleet.as_ref().err(),
            self.warehouses.as_ref().err(),
            self.feedback.as_ref().err(),
            self.costs.as_ref().err(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// All seven tables, or the first load error among them.
    pub fn tables(&self) -> Result<SourceTables<'_>, &LoadError> {
        Ok(SourceTables {
            orders: self.orders.as_deref()?,
            delivery: self.delivery.as_deref()?,
            routes: self.routes.as_deref()?,
            fleet: self.fleet.as_deref()?,
            warehouses: self.warehouses.as_deref()?,
            feedback: self.feedback.as_deref()?,
            costs: self.costs.as_deref()?,
        })
    }

    /// Row count per dataset; failed datasets are absent.
    pub fn row_counts(&self) -> Vec<(Dataset, usize)> {
        let counts = [
            self.orders.as_ref().map(Vec::len),
            self.delivery.as_ref().map(Vec::len),
            self.routes.as_ref().map(Vec::len),
            self.fleet.as_ref().map(Vec::len),
            self.warehouses.as_ref().map(Vec::len),
            self.feedback.as_ref().map(Vec::len),
            self.costs.as_ref().map(Vec::len),
        ];
        Dataset::ALL
            .into_iter()
            .zip(counts)
            .filter_map(|(dataset, count)| count.ok().map(|n| (dataset, n)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const ORDERS_CSV: &str = "\
Order_ID,Order_Date,Customer_ID,Product_Category,Order_Value_INR,Carrier,Route_ID,Vehicle_ID,Warehouse_ID,Priority
ORD001,2024-01-05,CUST01,Electronics,1500.5,SpeedyLogistics,R01,V01,WH01,Express
ORD002,2024-01-06,CUST02,Books,,QuickShip,R02,V02,WH02,Standard
";

    #[test]
    fn test_reads_typed_rows_and_blank_measures() {
        let orders: Vec<Order> = read_records(ORDERS_CSV.as_bytes()).unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order_value, Some(1500.5));
        assert_eq!(orders[0].order_date.to_string(), "2024-01-05");
        assert_eq!(orders[1].order_value, None);
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "Order_ID,Fuel_Cost,Labor_Cost,Packaging_Cost,Other_Overhead\nORD001,1,2,3,4\n";
        let err = read_records::<CostBreakdown, _>(csv.as_bytes()).unwrap_err();
        match err {
            LoadError::MissingColumn { dataset, column } => {
                assert_eq!(dataset, Dataset::Costs);
                assert_eq!(column, "Technology_Platform_Fee");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_mistyped_value_is_load_error() {
        let csv = "\
Vehicle_ID,Vehicle_Type,Age_Years,Fuel_Efficiency_KM_per_L,CO2_Emissions_Kg_per_KM,Maintenance_Cost_INR
V01,Truck,old,8.5,0.9,1200
";
        let err = read_records::<Vehicle, _>(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidRecord { dataset: Dataset::Fleet, .. }));
    }

    #[test]
    fn test_blank_key_is_rejected() {
        let csv = "\
Route_ID,Route,Distance_KM,Fuel_Consumption_L,Toll_Charges_INR,Traffic_Delay_Minutes
R01,Mumbai-Pune,150,20,300,15
,Delhi-Agra,230,31,410,40
";
        let err = read_records::<Route, _>(csv.as_bytes()).unwrap_err();
        match err {
            LoadError::InvalidValue { line, column, .. } => {
                assert_eq!(line, 3);
                assert_eq!(column, "Route_ID");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_load_keeps_failures_per_dataset() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("orders.csv"), ORDERS_CSV).unwrap();

        let data = SourceData::load(dir.path()).unwrap();
        assert!(data.orders.is_ok());
        assert_eq!(data.failures().len(), 6);
        assert!(data.tables().is_err());
        assert_eq!(data.row_counts(), vec![(Dataset::Orders, 2)]);
    }

    #[test]
    fn test_no_usable_data() {
        let dir = tempfile::tempdir().unwrap();
        let err = SourceData::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::NoUsableData));
    }
}
