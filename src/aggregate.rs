//! Aggregator - descriptive cost statistics
//!
//! All functions are pure. A row that lacks a field needed by one statistic is
//! left out of that statistic only. Groups without a single usable row never
//! appear, and scalars over no rows are `None`.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::config::AnalysisConfig;
use crate::join::JoinedRow;
use crate::models::{CostType, Vehicle, WarehouseRecord};
use crate::stats::{fit_line, mean, pearson, Accumulator};

// ============================================================================
// Group tables
// ============================================================================

/// One `(group key, value)` pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub key: String,
    /// Rows that contributed to `value`
    pub rows: usize,
    pub value: f64,
}

pub type GroupTable = Vec<Group>;

/// Mean of `value` per `key`, in key order.
pub fn group_mean<R, K>(
    rows: &[R],
    key: impl Fn(&R) -> Option<K>,
    value: impl Fn(&R) -> Option<f64>,
) -> GroupTable
where
    K: Ord + fmt::Display,
{
    let mut groups: BTreeMap<K, Accumulator> = BTreeMap::new();
    for row in rows {
        let Some(v) = value(row).filter(|v| v.is_finite()) else {
            continue;
        };
        if let Some(k) = key(row) {
            groups.entry(k).or_default().push(Some(v));
        }
    }
    groups
        .into_iter()
        .filter_map(|(k, acc)| {
            acc.mean().map(|value| Group {
                key: k.to_string(),
                rows: acc.count,
                value,
            })
        })
        .collect()
}

// ============================================================================
// Buckets
// ============================================================================

/// Label of the on-time delay bucket
pub const ON_TIME_LABEL: &str = "on-time";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayBucket {
    OnTime,
    Minor,
    Major,
}

impl DelayBucket {
    /// `delay <= 0` on time, `0 < delay <= minor_max` minor, above that major
    pub fn classify(delay_days: f64, minor_max: f64) -> Self {
        if delay_days <= 0.0 {
            DelayBucket::OnTime
        } else if delay_days <= minor_max {
            DelayBucket::Minor
        } else {
            DelayBucket::Major
        }
    }

    /// Group label for a given minor-delay threshold: "1-2 days late" and
    /// "3+ days late" for a threshold of 2 days.
    pub fn label(self, minor_max: f64) -> String {
        let whole = minor_max.fract() == 0.0 && minor_max >= 1.0;
        match self {
            DelayBucket::OnTime => ON_TIME_LABEL.to_string(),
            DelayBucket::Minor if whole && minor_max == 1.0 => "1 day late".to_string(),
            DelayBucket::Minor if whole => format!("1-{} days late", minor_max),
            DelayBucket::Minor => format!("up to {} days late", minor_max),
            DelayBucket::Major if whole => format!("{}+ days late", minor_max + 1.0),
            DelayBucket::Major => format!("over {} days late", minor_max),
        }
    }
}

/// Delay bucket carrying its label; orders like the bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct LabelledDelay<'a>(DelayBucket, &'a str);

impl fmt::Display for LabelledDelay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeBucket {
    New,
    Young,
    Mature,
    Old,
}

impl AgeBucket {
    pub fn classify(age_years: f64) -> Self {
        if age_years < 3.0 {
            AgeBucket::New
        } else if age_years < 6.0 {
            AgeBucket::Young
        } else if age_years < 10.0 {
            AgeBucket::Mature
        } else {
            AgeBucket::Old
        }
    }
}

impl fmt::Display for AgeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AgeBucket::New => "0-2 yrs",
            AgeBucket::Young => "3-5 yrs",
            AgeBucket::Mature => "6-9 yrs",
            AgeBucket::Old => "10+ yrs",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SatisfactionBucket {
    Dissatisfied,
    Neutral,
    Satisfied,
}

impl SatisfactionBucket {
    pub fn classify(score: f64) -> Self {
        if score < 3.0 {
            SatisfactionBucket::Dissatisfied
        } else if score < 4.0 {
            SatisfactionBucket::Neutral
        } else {
            SatisfactionBucket::Satisfied
        }
    }
}

impl fmt::Display for SatisfactionBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SatisfactionBucket::Dissatisfied => "dissatisfied",
            SatisfactionBucket::Neutral => "neutral",
            SatisfactionBucket::Satisfied => "satisfied",
        })
    }
}

// ============================================================================
// Aggregate types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub orders: usize,
    pub total_order_value: Option<f64>,
    pub avg_order_value: Option<f64>,
    pub total_cost: Option<f64>,
    /// Mean of the per-order ratios
    pub avg_cost_to_value: Option<f64>,
    pub avg_customer_rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostShare {
    pub cost_type: CostType,
    pub label: &'static str,
    pub total: f64,
    pub average: f64,
    /// Share of total cost; absent when total cost is zero
    pub percent: Option<f64>,
}

/// Cost-type breakdown over orders with all five categories present
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostTypeBreakdown {
    pub orders: usize,
    pub total_cost: f64,
    pub categories: Vec<CostShare>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelayCostAnalysis {
    pub avg_cost: GroupTable,
    pub avg_cost_to_value: GroupTable,
    pub avg_customer_rating: GroupTable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePoint {
    pub route_id: String,
    pub name: String,
    pub orders: usize,
    pub distance_km: Option<f64>,
    pub toll_charges: Option<f64>,
    pub fuel_consumption_l: Option<f64>,
    pub traffic_delay_min: Option<f64>,
    pub avg_total_cost: Option<f64>,
    pub avg_cost_to_value: Option<f64>,
    pub cost_per_km: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteCostAnalysis {
    pub points: Vec<RoutePoint>,
    /// Pearson correlation of route distance and order cost, over orders
    pub distance_cost_correlation: Option<f64>,
    pub toll_cost_correlation: Option<f64>,
    /// Least-squares cost increase per additional km, over orders
    pub cost_per_km_slope: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetProfile {
    pub vehicles: GroupTable,
    pub avg_fuel_efficiency: GroupTable,
    pub avg_maintenance_cost: GroupTable,
    pub avg_emissions: GroupTable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarehouseCosts {
    pub avg_storage_cost: GroupTable,
    pub avg_inventory_cost: GroupTable,
    /// Keyed by `warehouse / category`
    pub avg_storage_cost_by_category: GroupTable,
    pub mean_storage_cost: Option<f64>,
    /// Warehouses whose average storage cost exceeds `mean_storage_cost`
    pub high_cost_warehouses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackCostAnalysis {
    pub avg_cost: GroupTable,
    pub avg_cost_to_value: GroupTable,
    pub avg_delay_days: GroupTable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighCostOrder {
    pub order_id: String,
    pub carrier: String,
    pub order_value: Option<f64>,
    pub total_cost: Option<f64>,
    pub cost_to_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostLeakage {
    pub threshold: f64,
    pub orders_with_ratio: usize,
    pub high_cost_orders: Vec<HighCostOrder>,
    pub high_cost_share: Option<f64>,
    pub ratio_histogram: Vec<HistogramBin>,
    pub avg_cost_to_value_by_carrier: GroupTable,
}

/// Everything computed from the joined table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostAggregates {
    pub summary: Summary,
    pub cost_breakdown: Option<CostTypeBreakdown>,
    pub delay: DelayCostAnalysis,
    pub routes: RouteCostAnalysis,
    pub feedback: FeedbackCostAnalysis,
    pub leakage: CostLeakage,
}

// ============================================================================
// Computation
// ============================================================================

pub fn aggregate(rows: &[JoinedRow], config: &AnalysisConfig) -> CostAggregates {
    CostAggregates {
        summary: summary(rows),
        cost_breakdown: cost_breakdown(rows),
        delay: delay_costs(rows, config.minor_delay_max_days),
        routes: route_costs(rows),
        feedback: feedback_costs(rows),
        leakage: cost_leakage(rows, config.high_cost_ratio, config.ratio_histogram_bins),
    }
}

pub fn summary(rows: &[JoinedRow]) -> Summary {
    let values: Accumulator = rows.iter().map(|r| r.order.order_value).collect();
    let costs: Accumulator = rows.iter().map(|r| r.total_cost).collect();
    Summary {
        orders: rows.len(),
        total_order_value: values.total(),
        avg_order_value: values.mean(),
        total_cost: costs.total(),
        avg_cost_to_value: mean(rows.iter().map(|r| r.cost_to_value)),
        avg_customer_rating: mean(rows.iter().map(|r| r.delivery.customer_rating)),
    }
}

pub fn cost_breakdown(rows: &[JoinedRow]) -> Option<CostTypeBreakdown> {
    let complete: Vec<&JoinedRow> = rows
        .iter()
        .filter(|r| r.total_cost.is_some_and(f64::is_finite))
        .collect();
    if complete.is_empty() {
        return None;
    }

    let total_cost: f64 = complete.iter().filter_map(|r| r.total_cost).sum();
    let n = complete.len() as f64;
    let categories = CostType::ALL
        .iter()
        .map(|&cost_type| {
            let total: f64 = complete
                .iter()
                .filter_map(|r| r.costs.amount(cost_type))
                .sum();
            CostShare {
                cost_type,
                label: cost_type.label(),
                total,
                average: total / n,
                percent: (total_cost.abs() > f64::EPSILON).then(|| total / total_cost * 100.0),
            }
        })
        .collect();

    Some(CostTypeBreakdown {
        orders: complete.len(),
        total_cost,
        categories,
    })
}

pub fn delay_costs(rows: &[JoinedRow], minor_max: f64) -> DelayCostAnalysis {
    let labels = [DelayBucket::OnTime, DelayBucket::Minor, DelayBucket::Major]
        .map(|b| b.label(minor_max));
    let bucket = |r: &JoinedRow| {
        r.delay_days.map(|d| {
            let b = DelayBucket::classify(d, minor_max);
            LabelledDelay(b, labels[b as usize].as_str())
        })
    };
    DelayCostAnalysis {
        avg_cost: group_mean(rows, bucket, |r| r.total_cost),
        avg_cost_to_value: group_mean(rows, bucket, |r| r.cost_to_value),
        avg_customer_rating: group_mean(rows, bucket, |r| r.delivery.customer_rating),
    }
}

pub fn route_costs(rows: &[JoinedRow]) -> RouteCostAnalysis {
    let mut by_route: BTreeMap<&str, Vec<&JoinedRow>> = BTreeMap::new();
    for row in rows {
        by_route.entry(row.route.route_id.as_str()).or_default().push(row);
    }

    let points = by_route
        .into_values()
        .map(|orders| {
            let route = &orders[0].route;
            let avg_total_cost = mean(orders.iter().map(|r| r.total_cost));
            let cost_per_km = match (avg_total_cost, route.distance_km) {
                (Some(cost), Some(km)) if km > 0.0 => Some(cost / km),
                _ => None,
            };
            RoutePoint {
                route_id: route.route_id.clone(),
                name: route.name.clone(),
                orders: orders.len(),
                distance_km: route.distance_km,
                toll_charges: route.toll_charges,
                fuel_consumption_l: route.fuel_consumption_l,
                traffic_delay_min: route.traffic_delay_min,
                avg_total_cost,
                avg_cost_to_value: mean(orders.iter().map(|r| r.cost_to_value)),
                cost_per_km,
            }
        })
        .collect();

    let distance_cost = || rows.iter().map(|r| (r.route.distance_km, r.total_cost));
    RouteCostAnalysis {
        points,
        distance_cost_correlation: pearson(distance_cost()),
        toll_cost_correlation: pearson(rows.iter().map(|r| (r.route.toll_charges, r.total_cost))),
        cost_per_km_slope: fit_line(distance_cost()).map(|line| line.slope),
    }
}

/// Fleet statistics over the vehicle table, each vehicle counted once.
pub fn fleet_profile(fleet: &[Vehicle]) -> FleetProfile {
    let bucket = |v: &Vehicle| v.age_years.filter(|a| a.is_finite()).map(AgeBucket::classify);
    FleetProfile {
        vehicles: group_mean(fleet, bucket, |_| Some(1.0))
            .into_iter()
            .map(|g| Group {
                value: g.rows as f64,
                ..g
            })
            .collect(),
        avg_fuel_efficiency: group_mean(fleet, bucket, |v| v.fuel_efficiency),
        avg_maintenance_cost: group_mean(fleet, bucket, |v| v.maintenance_cost),
        avg_emissions: group_mean(fleet, bucket, |v| v.co2_per_km),
    }
}

/// Warehouse statistics over the inventory table.
pub fn warehouse_costs(records: &[WarehouseRecord]) -> WarehouseCosts {
    let by_warehouse = |w: &WarehouseRecord| Some(w.warehouse_id.clone());
    let avg_storage_cost = group_mean(records, by_warehouse, |w| w.storage_cost_per_unit);
    let mean_storage_cost = mean(records.iter().map(|w| w.storage_cost_per_unit));
    let high_cost_warehouses = match mean_storage_cost {
        Some(overall) => avg_storage_cost
            .iter()
            .filter(|g| g.value > overall)
            .map(|g| g.key.clone())
            .collect(),
        None => Vec::new(),
    };

    WarehouseCosts {
        avg_inventory_cost: group_mean(records, by_warehouse, |w| w.inventory_cost),
        avg_storage_cost_by_category: group_mean(
            records,
            |w| Some(format!("{} / {}", w.warehouse_id, w.product_category)),
            |w| w.storage_cost_per_unit,
        ),
        avg_storage_cost,
        mean_storage_cost,
        high_cost_warehouses,
    }
}

pub fn feedback_costs(rows: &[JoinedRow]) -> FeedbackCostAnalysis {
    let bucket = |r: &JoinedRow| {
        r.feedback
            .rating
            .filter(|s| s.is_finite())
            .map(SatisfactionBucket::classify)
    };
    FeedbackCostAnalysis {
        avg_cost: group_mean(rows, bucket, |r| r.total_cost),
        avg_cost_to_value: group_mean(rows, bucket, |r| r.cost_to_value),
        avg_delay_days: group_mean(rows, bucket, |r| r.delay_days),
    }
}

pub fn cost_leakage(rows: &[JoinedRow], threshold: f64, bins: usize) -> CostLeakage {
    let ratios: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.cost_to_value)
        .filter(|v| v.is_finite())
        .collect();

    let high_cost_orders: Vec<HighCostOrder> = rows
        .iter()
        .filter_map(|r| {
            let ratio = r.cost_to_value.filter(|v| v.is_finite() && *v > threshold)?;
            Some(HighCostOrder {
                order_id: r.order.order_id.clone(),
                carrier: r.order.carrier.clone(),
                order_value: r.order.order_value,
                total_cost: r.total_cost,
                cost_to_value: ratio,
            })
        })
        .collect();

    let high_cost_share =
        (!ratios.is_empty()).then(|| high_cost_orders.len() as f64 / ratios.len() as f64);

    CostLeakage {
        threshold,
        orders_with_ratio: ratios.len(),
        high_cost_share,
        high_cost_orders,
        ratio_histogram: histogram(&ratios, bins),
        avg_cost_to_value_by_carrier: group_mean(
            rows,
            |r| Some(r.order.carrier.clone()),
            |r| r.cost_to_value,
        ),
    }
}

/// Equal-width bins between min and max; the last bin includes max.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max - min <= f64::EPSILON {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: values.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + width * i as f64,
            upper: min + width * (i + 1) as f64,
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::{fixtures::tables, join};

    fn rows(spec: &[(&str, f64, f64, f64)]) -> Vec<JoinedRow> {
        join(tables(spec).view()).rows
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn value_of(table: &GroupTable, key: &str) -> Option<f64> {
        table.iter().find(|g| g.key == key).map(|g| g.value)
    }

    #[test]
    fn test_average_order_value_and_ratio() {
        let rows = rows(&[
            ("A", 100.0, 10.0, 0.0),
            ("B", 200.0, 40.0, 0.0),
            ("C", 300.0, 90.0, 0.0),
        ]);
        let s = summary(&rows);
        assert_eq!(s.orders, 3);
        assert!(approx(s.avg_order_value.unwrap(), 200.0));
        assert!(approx(s.avg_cost_to_value.unwrap(), 0.2));
        assert!(approx(s.total_order_value.unwrap(), 600.0));
        assert!(approx(s.total_cost.unwrap(), 140.0));
    }

    #[test]
    fn test_delay_bucket_averages() {
        let rows = rows(&[
            ("A", 1000.0, 90.0, 0.0),
            ("B", 1000.0, 110.0, -1.0),
            ("C", 1000.0, 110.0, 1.0),
            ("D", 1000.0, 120.0, 2.0),
        ]);
        let delay = delay_costs(&rows, 2.0);
        assert_eq!(delay.avg_cost.len(), 2);
        assert!(approx(value_of(&delay.avg_cost, "on-time").unwrap(), 100.0));
        assert!(approx(value_of(&delay.avg_cost, "1-2 days late").unwrap(), 115.0));
        assert_eq!(value_of(&delay.avg_cost, "3+ days late"), None);
        assert_eq!(delay.avg_cost[0].key, "on-time");
    }

    #[test]
    fn test_delay_labels_follow_threshold() {
        let rows = rows(&[
            ("A", 1000.0, 100.0, 0.0),
            ("B", 1000.0, 110.0, 3.0),
            ("C", 1000.0, 130.0, 5.0),
        ]);
        let delay = delay_costs(&rows, 4.0);
        let keys: Vec<&str> = delay.avg_cost.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, ["on-time", "1-4 days late", "5+ days late"]);
        assert!(approx(value_of(&delay.avg_cost, "1-4 days late").unwrap(), 110.0));

        assert_eq!(DelayBucket::Minor.label(1.0), "1 day late");
        assert_eq!(DelayBucket::Major.label(1.0), "2+ days late");
        assert_eq!(DelayBucket::Minor.label(1.5), "up to 1.5 days late");
        assert_eq!(DelayBucket::Major.label(1.5), "over 1.5 days late");
    }

    #[test]
    fn test_cost_breakdown_sums_to_total() {
        let rows = rows(&[
            ("A", 100.0, 10.0, 0.0),
            ("B", 200.0, 40.0, 0.0),
            ("C", 300.0, 90.0, 0.0),
        ]);
        let breakdown = cost_breakdown(&rows).unwrap();
        let category_total: f64 = breakdown.categories.iter().map(|c| c.total).sum();
        assert!(approx(category_total, breakdown.total_cost));

        let percent: f64 = breakdown.categories.iter().filter_map(|c| c.percent).sum();
        assert!((percent - 100.0).abs() < 1e-6);

        for row in &rows {
            let per_type: f64 = CostType::ALL
                .iter()
                .filter_map(|&t| row.costs.amount(t))
                .sum();
            assert!(approx(per_type, row.total_cost.unwrap()));
        }
    }

    #[test]
    fn test_missing_values_leave_denominator() {
        let mut t = tables(&[("A", 100.0, 10.0, 0.0), ("B", 200.0, 40.0, 0.0)]);
        t.orders[1].order_value = None;
        t.delivery[0].customer_rating = None;
        t.costs[1].labor = None;
        let rows = join(t.view()).rows;

        let s = summary(&rows);
        assert!(approx(s.avg_order_value.unwrap(), 100.0));
        assert!(approx(s.avg_customer_rating.unwrap(), 4.0));
        assert!(approx(s.total_cost.unwrap(), 10.0));
        assert!(approx(s.avg_cost_to_value.unwrap(), 0.1));

        let breakdown = cost_breakdown(&rows).unwrap();
        assert_eq!(breakdown.orders, 1);
    }

    #[test]
    fn test_empty_input_has_no_data() {
        let config = AnalysisConfig::default();
        let aggregates = aggregate(&[], &config);
        assert_eq!(aggregates.summary.orders, 0);
        assert_eq!(aggregates.summary.avg_order_value, None);
        assert_eq!(aggregates.summary.total_cost, None);
        assert_eq!(aggregates.summary.avg_cost_to_value, None);
        assert!(aggregates.cost_breakdown.is_none());
        assert!(aggregates.delay.avg_cost.is_empty());
        assert!(aggregates.routes.points.is_empty());
        assert_eq!(aggregates.routes.distance_cost_correlation, None);
        assert!(aggregates.feedback.avg_cost.is_empty());
        assert!(aggregates.leakage.ratio_histogram.is_empty());
        assert_eq!(aggregates.leakage.high_cost_share, None);

        assert!(fleet_profile(&[]).avg_fuel_efficiency.is_empty());
        assert_eq!(warehouse_costs(&[]).mean_storage_cost, None);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let rows = rows(&[
            ("A", 100.0, 10.0, 0.0),
            ("B", 200.0, 80.0, 3.0),
            ("C", 300.0, 250.0, 1.0),
        ]);
        let config = AnalysisConfig::default();
        assert_eq!(aggregate(&rows, &config), aggregate(&rows, &config));
    }

    #[test]
    fn test_route_cost_relationship() {
        // fixture distances are 100, 110, 120 km
        let rows = rows(&[
            ("A", 1000.0, 100.0, 0.0),
            ("B", 1000.0, 120.0, 0.0),
            ("C", 1000.0, 140.0, 0.0),
        ]);
        let routes = route_costs(&rows);
        assert_eq!(routes.points.len(), 3);
        assert!(approx(routes.distance_cost_correlation.unwrap(), 1.0));
        assert!(approx(routes.cost_per_km_slope.unwrap(), 2.0));
        assert!(approx(routes.points[0].cost_per_km.unwrap(), 1.0));
        // identical tolls on every route
        assert_eq!(routes.toll_cost_correlation, None);
    }

    #[test]
    fn test_fleet_profile_by_age() {
        let mut t = tables(&[("A", 1.0, 1.0, 0.0), ("B", 1.0, 1.0, 0.0), ("C", 1.0, 1.0, 0.0)]);
        t.fleet[0].age_years = Some(1.0);
        t.fleet[0].maintenance_cost = Some(400.0);
        t.fleet[1].age_years = Some(12.0);
        t.fleet[1].maintenance_cost = Some(1200.0);
        t.fleet[2].age_years = Some(11.0);
        t.fleet[2].maintenance_cost = None;

        let profile = fleet_profile(&t.fleet);
        assert_eq!(value_of(&profile.vehicles, "10+ yrs"), Some(2.0));
        assert_eq!(value_of(&profile.avg_maintenance_cost, "0-2 yrs"), Some(400.0));
        assert_eq!(value_of(&profile.avg_maintenance_cost, "10+ yrs"), Some(1200.0));
        let old = profile.avg_maintenance_cost.iter().find(|g| g.key == "10+ yrs").unwrap();
        assert_eq!(old.rows, 1);
    }

    #[test]
    fn test_warehouse_costs() {
        let mut t = tables(&[("A", 1.0, 1.0, 0.0), ("B", 1.0, 1.0, 0.0), ("C", 1.0, 1.0, 0.0)]);
        t.warehouses[0].storage_cost_per_unit = Some(2.0);
        t.warehouses[1].storage_cost_per_unit = Some(4.0);
        t.warehouses[2].storage_cost_per_unit = Some(9.0);
        t.warehouses[2].warehouse_id = "W-A".to_string();
        t.warehouses[2].product_category = "Books".to_string();

        let costs = warehouse_costs(&t.warehouses);
        assert_eq!(value_of(&costs.avg_storage_cost, "W-A"), Some(5.5));
        assert_eq!(costs.mean_storage_cost, Some(5.0));
        assert_eq!(costs.high_cost_warehouses, vec!["W-A".to_string()]);
        assert_eq!(costs.avg_storage_cost_by_category.len(), 3);
        assert_eq!(value_of(&costs.avg_storage_cost_by_category, "W-A / Books"), Some(9.0));
    }

    #[test]
    fn test_feedback_costs() {
        let mut t = tables(&[("A", 100.0, 50.0, 0.0), ("B", 100.0, 70.0, 4.0)]);
        t.feedback[0].rating = Some(5.0);
        t.feedback[1].rating = Some(1.0);
        let rows = join(t.view()).rows;

        let feedback = feedback_costs(&rows);
        assert_eq!(value_of(&feedback.avg_cost, "satisfied"), Some(50.0));
        assert_eq!(value_of(&feedback.avg_delay_days, "dissatisfied"), Some(4.0));
        assert_eq!(value_of(&feedback.avg_cost, "neutral"), None);
    }

    #[test]
    fn test_cost_leakage() {
        let rows = rows(&[
            ("A", 100.0, 70.0, 0.0),
            ("B", 100.0, 20.0, 0.0),
            ("C", 100.0, 65.0, 0.0),
        ]);
        let leakage = cost_leakage(&rows, 0.6, 5);
        assert_eq!(leakage.high_cost_orders.len(), 2);
        assert_eq!(leakage.orders_with_ratio, 3);
        assert!(approx(leakage.high_cost_share.unwrap(), 2.0 / 3.0));
        let counted: usize = leakage.ratio_histogram.iter().map(|b| b.count).sum();
        assert_eq!(counted, 3);
        assert_eq!(leakage.ratio_histogram.len(), 5);
    }

    #[test]
    fn test_histogram_single_value() {
        let bins = histogram(&[0.4, 0.4], 10);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].count, 2);
    }
}
