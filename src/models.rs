use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The seven source datasets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    Orders,
    Delivery,
    Routes,
    Fleet,
    Warehouse,
    Feedback,
    Costs,
}

impl Dataset {
    pub const ALL: [Dataset; 7] = [
        Dataset::Orders,
        Dataset::Delivery,
        Dataset::Routes,
        Dataset::Fleet,
        Dataset::Warehouse,
        Dataset::Feedback,
        Dataset::Costs,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Dataset::Orders => "orders.csv",
            Dataset::Delivery => "delivery_performance.csv",
            Dataset::Routes => "routes_distance.csv",
            Dataset::Fleet => "vehicle_fleet.csv",
            Dataset::Warehouse => "warehouse_inventory.csv",
            Dataset::Feedback => "customer_feedback.csv",
            Dataset::Costs => "cost_breakdown.csv",
        }
    }

    /// Columns that must be present in the header row.
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            Dataset::Orders => &[
                "Order_ID",
                "Order_Date",
                "Customer_ID",
                "Product_Category",
                "Order_Value_INR",
                "Carrier",
                "Route_ID",
                "Vehicle_ID",
                "Warehouse_ID",
            ],
            Dataset::Delivery => &[
                "Order_ID",
                "Promised_Delivery_Days",
                "Actual_Delivery_Days",
                "Delivery_Status",
                "Customer_Rating",
            ],
            Dataset::Routes => &[
                "Route_ID",
                "Route",
                "Distance_KM",
                "Fuel_Consumption_L",
                "Toll_Charges_INR",
                "Traffic_Delay_Minutes",
            ],
            Dataset::Fleet => &[
                "Vehicle_ID",
                "Vehicle_Type",
                "Age_Years",
                "Fuel_Efficiency_KM_per_L",
                "CO2_Emissions_Kg_per_KM",
                "Maintenance_Cost_INR",
            ],
            Dataset::Warehouse => &[
                "Warehouse_ID",
                "Location",
                "Product_Category",
                "Inventory_Cost_INR",
                "Storage_Cost_per_Unit",
            ],
            Dataset::Feedback => &["Order_ID", "Rating", "Issue_Category"],
            Dataset::Costs => &[
                "Order_ID",
                "Fuel_Cost",
                "Labor_Cost",
                "Packaging_Cost",
                "Technology_Platform_Fee",
                "Other_Overhead",
            ],
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dataset::Orders => "orders",
            Dataset::Delivery => "delivery performance",
            Dataset::Routes => "route distance",
            Dataset::Fleet => "vehicle fleet",
            Dataset::Warehouse => "warehouse inventory",
            Dataset::Feedback => "customer feedback",
            Dataset::Costs => "cost breakdown",
        };
        f.write_str(name)
    }
}

/// Row of `orders.csv`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    #[serde(rename = "Order_ID")]
    pub order_id: String,
    #[serde(rename = "Order_Date")]
    pub order_date: NaiveDate,
    #[serde(rename = "Customer_ID")]
    pub customer_id: String,
    #[serde(rename = "Product_Category")]
    pub product_category: String,
    #[serde(rename = "Order_Value_INR")]
    pub order_value: Option<f64>,
    #[serde(rename = "Carrier")]
    pub carrier: String,
    #[serde(rename = "Route_ID")]
    pub route_id: String,
    #[serde(rename = "Vehicle_ID")]
    pub vehicle_id: String,
    #[serde(rename = "Warehouse_ID")]
    pub warehouse_id: String,
}

/// Row of `delivery_performance.csv`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryRecord {
    #[serde(rename = "Order_ID")]
    pub order_id: String,
    #[serde(rename = "Promised_Delivery_Days")]
    pub promised_days: Option<f64>,
    #[serde(rename = "Actual_Delivery_Days")]
    pub actual_days: Option<f64>,
    #[serde(rename = "Delivery_Status")]
    pub status: String,
    #[serde(rename = "Customer_Rating")]
    pub customer_rating: Option<f64>,
}

impl DeliveryRecord {
    /// Days late (negative = early)
    pub fn delay_days(&self) -> Option<f64> {
        Some(self.actual_days? - self.promised_days?)
    }
}

/// Row of `routes_distance.csv`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    #[serde(rename = "Route_ID")]
    pub route_id: String,
    #[serde(rename = "Route")]
    pub name: String,
    #[serde(rename = "Distance_KM")]
    pub distance_km: Option<f64>,
    #[serde(rename = "Fuel_Consumption_L")]
    pub fuel_consumption_l: Option<f64>,
    #[serde(rename = "Toll_Charges_INR")]
    pub toll_charges: Option<f64>,
    #[serde(rename = "Traffic_Delay_Minutes")]
    pub traffic_delay_min: Option<f64>,
}

/// Row of `vehicle_fleet.csv`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vehicle {
    #[serde(rename = "Vehicle_ID")]
    pub vehicle_id: String,
    #[serde(rename = "Vehicle_Type")]
    pub vehicle_type: String,
    #[serde(rename = "Age_Years")]
    pub age_years: Option<f64>,
    #[serde(rename = "Fuel_Efficiency_KM_per_L")]
    pub fuel_efficiency: Option<f64>,
    #[serde(rename = "CO2_Emissions_Kg_per_KM")]
    pub co2_per_km: Option<f64>,
    #[serde(rename = "Maintenance_Cost_INR")]
    pub maintenance_cost: Option<f64>,
}

/// Row of `warehouse_inventory.csv`; one warehouse may span several categories
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WarehouseRecord {
    #[serde(rename = "Warehouse_ID")]
    pub warehouse_id: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Product_Category")]
    pub product_category: String,
    #[serde(rename = "Inventory_Cost_INR")]
    pub inventory_cost: Option<f64>,
    #[serde(rename = "Storage_Cost_per_Unit")]
    pub storage_cost_per_unit: Option<f64>,
}

/// Row of `customer_feedback.csv`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackRecord {
    #[serde(rename = "Order_ID")]
    pub order_id: String,
    #[serde(rename = "Rating")]
    pub rating: Option<f64>,
    #[serde(rename = "Feedback_Text", default)]
    pub feedback_text: String,
    #[serde(rename = "Would_Recommend", default)]
    pub would_recommend: Option<String>,
    #[serde(rename = "Issue_Category")]
    pub issue_category: String,
}

/// The five declared cost categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CostType {
    Fuel,
    Labor,
    Packaging,
    Technology,
    Other,
}

impl CostType {
    pub const ALL: [CostType; 5] = [
        CostType::Fuel,
        CostType::Labor,
        CostType::Packaging,
        CostType::Technology,
        CostType::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CostType::Fuel => "Fuel",
            CostType::Labor => "Labor",
            CostType::Packaging => "Packaging",
            CostType::Technology => "Technology",
            CostType::Other => "Other",
        }
    }
}

/// Row of `cost_breakdown.csv`
///
/// `Vehicle_Maintenance` and `Insurance` are optional itemisations of the
/// *other* category; a blank or absent cell adds nothing to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostBreakdown {
    #[serde(rename = "Order_ID")]
    pub order_id: String,
    #[serde(rename = "Fuel_Cost")]
    pub fuel: Option<f64>,
    #[serde(rename = "Labor_Cost")]
    pub labor: Option<f64>,
    #[serde(rename = "Packaging_Cost")]
    pub packaging: Option<f64>,
    #[serde(rename = "Technology_Platform_Fee")]
    pub technology: Option<f64>,
    #[serde(rename = "Other_Overhead")]
    pub other_overhead: Option<f64>,
    #[serde(rename = "Vehicle_Maintenance", default)]
    pub vehicle_maintenance: Option<f64>,
    #[serde(rename = "Insurance", default)]
    pub insurance: Option<f64>,
}

impl CostBreakdown {
    pub fn amount(&self, cost_type: CostType) -> Option<f64> {
        match cost_type {
            CostType::Fuel => self.fuel,
            CostType::Labor => self.labor,
            CostType::Packaging => self.packaging,
            CostType::Technology => self.technology,
            CostType::Other => Some(
                self.other_overhead?
                    + self.vehicle_maintenance.unwrap_or(0.0)
                    + self.insurance.unwrap_or(0.0),
            ),
        }
    }

    /// Sum of all five categories, or `None` if any is missing
    pub fn total(&self) -> Option<f64> {
        CostType::ALL
            .iter()
            .map(|&t| self.amount(t))
            .sum::<Option<f64>>()
    }
}

/// Borrowed view over all seven loaded tables
#[derive(Debug, Clone, Copy)]
pub struct SourceTables<'a> {
    pub orders: &'a [Order],
    pub delivery: &'a [DeliveryRecord],
    pub routes: &'a [Route],
    pub fleet: &'a [Vehicle],
    pub warehouses: &'a [WarehouseRecord],
    pub feedback: &'a [FeedbackRecord],
    pub costs: &'a [CostBreakdown],
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breakdown() -> CostBreakdown {
        CostBreakdown {
            order_id: "ORD001".into(),
            fuel: Some(40.0),
            labor: Some(30.0),
            packaging: Some(10.0),
            technology: Some(5.0),
            other_overhead: Some(3.0),
            vehicle_maintenance: Some(8.0),
            insurance: Some(4.0),
        }
    }

    #[test]
    fn test_other_folds_itemised_components() {
        let costs = breakdown();
        assert_eq!(costs.amount(CostType::Other), Some(15.0));
        assert_eq!(costs.total(), Some(100.0));
    }

    #[test]
    fn test_total_missing_when_category_blank() {
        let costs = CostBreakdown { labor: None, ..breakdown() };
        assert_eq!(costs.total(), None);
        assert_eq!(costs.amount(CostType::Fuel), Some(40.0));
    }

    #[test]
    fn test_delay_days() {
        let delivery = DeliveryRecord {
            order_id: "ORD001".into(),
            promised_days: Some(3.0),
            actual_days: Some(5.0),
            status: "Slightly-Delayed".into(),
            customer_rating: Some(3.0),
        };
        assert_eq!(delivery.delay_days(), Some(2.0));
        let unknown = DeliveryRecord { actual_days: None, ..delivery };
        assert_eq!(unknown.delay_days(), None);
    }
}
