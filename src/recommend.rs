//! Recommendation Engine
//!
//! Five fixed cost-optimisation strategies. Each has a base savings estimate
//! that is scaled up by the analysis signal it responds to.

use serde::Serialize;

use crate::aggregate::{CostAggregates, FleetProfile, Group, GroupTable, ON_TIME_LABEL};
use crate::forecast::Forecast;

// ============================================================================
// Signals
// ============================================================================

/// Analysis measures that drive the savings estimates. A missing signal leaves
/// its strategy at the base estimate.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Signals {
    /// High-cost orders / orders with a cost-to-value ratio
    pub high_cost_order_share: Option<f64>,
    /// (mean cost-per-km across routes - cheapest) / mean
    pub route_inefficiency: Option<f64>,
    /// Mean ratio of late orders / mean ratio of on-time orders - 1
    pub delay_cost_impact: Option<f64>,
    /// Maintenance cost of the oldest age bucket / youngest - 1
    pub fleet_age_cost_impact: Option<f64>,
    /// Held-out orders off their predicted cost by more than the tolerance
    pub forecast_anomaly_share: Option<f64>,
}

impl Signals {
    pub fn from_analysis(
        aggregates: Option<&CostAggregates>,
        fleet: Option<&FleetProfile>,
        forecast: Option<&Forecast>,
    ) -> Self {
        Self {
            high_cost_order_share: aggregates.and_then(|a| a.leakage.high_cost_share),
            route_inefficiency: aggregates.and_then(route_inefficiency),
            delay_cost_impact: aggregates
                .and_then(|a| delay_cost_impact(&a.delay.avg_cost_to_value)),
            fleet_age_cost_impact: fleet
                .and_then(|f| fleet_age_cost_impact(&f.avg_maintenance_cost)),
            forecast_anomaly_share: forecast.and_then(|f| f.anomaly_share),
        }
    }
}

fn route_inefficiency(aggregates: &CostAggregates) -> Option<f64> {
    let per_km: Vec<f64> = aggregates
        .routes
        .points
        .iter()
        .filter_map(|p| p.cost_per_km)
        .collect();
    if per_km.is_empty() {
        return None;
    }
    let mean = per_km.iter().sum::<f64>() / per_km.len() as f64;
    let min = per_km.iter().copied().fold(f64::INFINITY, f64::min);
    (mean > 0.0).then(|| (mean - min) / mean)
}

fn weighted_mean<'a>(groups: impl Iterator<Item = &'a Group>) -> Option<f64> {
    let (sum, rows) = groups.fold((0.0, 0usize), |(sum, rows), g| {
        (sum + g.value * g.rows as f64, rows + g.rows)
    });
    (rows > 0).then(|| sum / rows as f64)
}

/// Compares late buckets with the on-time bucket of a delay table.
fn delay_cost_impact(by_delay: &GroupTable) -> Option<f64> {
    let on_time = weighted_mean(by_delay.iter().filter(|g| g.key == ON_TIME_LABEL))?;
    let late = weighted_mean(by_delay.iter().filter(|g| g.key != ON_TIME_LABEL))?;
    (on_time > 0.0).then(|| late / on_time - 1.0)
}

/// Age buckets are ordered youngest first.
fn fleet_age_cost_impact(by_age: &GroupTable) -> Option<f64> {
    let youngest = by_age.first()?.value;
    let oldest = by_age.last()?.value;
    (youngest > 0.0).then(|| oldest / youngest - 1.0)
}

// ============================================================================
// Strategies
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    RenegotiateCarrierContracts,
    OptimizeRoutes,
    ConsolidateDeliveries,
    ProactiveMaintenance,
    AutomateInvoiceValidation,
}

struct StrategyDef {
    strategy: Strategy,
    name: &'static str,
    base_savings_pct: f64,
    signal: &'static str,
    rationale: &'static str,
    actions: [&'static str; 2],
}

const STRATEGIES: [StrategyDef; 5] = [
    StrategyDef {
        strategy: Strategy::RenegotiateCarrierContracts,
        name: "Renegotiate Carrier Contracts",
        base_savings_pct: 10.0,
        signal: "high_cost_order_share",
        rationale: "Carriers with high cost-to-value ratios leave room to negotiate",
        actions: [
            "Focus on carriers with the highest average cost-to-value ratio",
            "Use predicted costs to set negotiation thresholds",
        ],
    },
    StrategyDef {
        strategy: Strategy::OptimizeRoutes,
        name: "Optimize Routes",
        base_savings_pct: 15.0,
        signal: "route_inefficiency",
        rationale: "Cost per km varies widely between routes",
        actions: [
            "Review routes with high toll charges or traffic delays",
            "Apply dynamic routing to the most expensive routes",
        ],
    },
    StrategyDef {
        strategy: Strategy::ConsolidateDeliveries,
        name: "Consolidate Deliveries",
        base_savings_pct: 12.0,
        signal: "delay_cost_impact",
        rationale: "Late orders carry a higher cost-to-value ratio than on-time ones",
        actions: [
            "Combine small deliveries to cut per-order fuel and packaging",
            "Batch orders on shared routes",
        ],
    },
    StrategyDef {
        strategy: Strategy::ProactiveMaintenance,
        name: "Proactive Maintenance",
        base_savings_pct: 8.0,
        signal: "fleet_age_cost_impact",
        rationale: "Older vehicles cost more to maintain",
        actions: [
            "Schedule maintenance from age and fuel-efficiency trends",
            "Prioritise replacement of the oldest vehicles",
        ],
    },
    StrategyDef {
        strategy: Strategy::AutomateInvoiceValidation,
        name: "Automate Invoice Validation",
        base_savings_pct: 10.0,
        signal: "forecast_anomaly_share",
        rationale: "Actual costs often deviate from predicted benchmarks",
        actions: [
            "Compare billed costs with predicted costs",
            "Flag orders outside the tolerance band for review",
        ],
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub rank: usize,
    pub strategy: Strategy,
    pub name: &'static str,
    pub base_savings_pct: f64,
    pub estimated_savings_pct: f64,
    pub signal: &'static str,
    pub signal_value: Option<f64>,
    pub rationale: &'static str,
    pub actions: Vec<&'static str>,
}

/// `base × (1 + signal)` with the signal clamped to `[0, 1]` and the result to
/// `[0, 100]`. A missing or non-finite signal keeps the base.
pub fn scale_savings(base: f64, signal: Option<f64>) -> f64 {
    let boost = signal
        .filter(|s| s.is_finite())
        .map_or(0.0, |s| s.clamp(0.0, 1.0));
    (base * (1.0 + boost)).clamp(0.0, 100.0)
}

/// Five recommendations in fixed strategy order.
pub fn recommend(signals: &Signals) -> Vec<Recommendation> {
    let values = [
        signals.high_cost_order_share,
        signals.route_inefficiency,
        signals.delay_cost_impact,
        signals.fleet_age_cost_impact,
        signals.forecast_anomaly_share,
    ];
    STRATEGIES
        .iter()
        .zip(values)
        .enumerate()
        .map(|(i, (def, value))| Recommendation {
            rank: i + 1,
            strategy: def.strategy,
            name: def.name,
            base_savings_pct: def.base_savings_pct,
            estimated_savings_pct: scale_savings(def.base_savings_pct, value),
            signal: def.signal,
            signal_value: value,
            rationale: def.rationale,
            actions: def.actions.to_vec(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, fleet_profile};
    use crate::config::AnalysisConfig;
    use crate::join::{fixtures::tables, join};

    #[test]
    fn test_fixed_order_and_base_values() {
        let recs = recommend(&Signals::default());
        let names: Vec<&str> = recs.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "Renegotiate Carrier Contracts",
                "Optimize Routes",
                "Consolidate Deliveries",
                "Proactive Maintenance",
                "Automate Invoice Validation",
            ]
        );
        let savings: Vec<f64> = recs.iter().map(|r| r.estimated_savings_pct).collect();
        assert_eq!(savings, vec![10.0, 15.0, 12.0, 8.0, 10.0]);
        assert_eq!(recs[4].rank, 5);
    }

    #[test]
    fn test_scaling_is_monotonic_and_bounded() {
        let mut last = 0.0;
        for step in -5..=30 {
            let s = scale_savings(15.0, Some(step as f64 / 10.0));
            assert!(s >= last);
            assert!((0.0..=100.0).contains(&s));
            last = s;
        }
        assert_eq!(scale_savings(15.0, Some(-3.0)), 15.0);
        assert_eq!(scale_savings(15.0, Some(10.0)), 30.0);
        assert_eq!(scale_savings(80.0, Some(1.0)), 100.0);
        assert_eq!(scale_savings(15.0, Some(f64::NAN)), 15.0);
    }

    #[test]
    fn test_signals_from_analysis() {
        let mut t = tables(&[
            ("A", 100.0, 10.0, 0.0),
            ("B", 100.0, 30.0, 1.0),
            ("C", 100.0, 70.0, 4.0),
        ]);
        t.fleet[0].age_years = Some(1.0);
        t.fleet[0].maintenance_cost = Some(400.0);
        t.fleet[1].maintenance_cost = Some(400.0);
        t.fleet[2].age_years = Some(12.0);
        t.fleet[2].maintenance_cost = Some(600.0);
        let rows = join(t.view()).rows;
        let aggregates = aggregate(&rows, &AnalysisConfig::default());
        let fleet = fleet_profile(&t.fleet);

        let signals = Signals::from_analysis(Some(&aggregates), Some(&fleet), None);
        assert!((signals.high_cost_order_share.unwrap() - 1.0 / 3.0).abs() < 1e-9);
        // on-time ratio 0.1, late ratios 0.3 and 0.7
        assert!((signals.delay_cost_impact.unwrap() - 4.0).abs() < 1e-9);
        assert!((signals.fleet_age_cost_impact.unwrap() - 0.5).abs() < 1e-9);
        assert!(signals.route_inefficiency.unwrap() > 0.0);
        assert_eq!(signals.forecast_anomaly_share, None);

        let recs = recommend(&signals);
        assert_eq!(recs[2].estimated_savings_pct, 24.0);
        assert_eq!(recs[3].estimated_savings_pct, 12.0);
        assert_eq!(recs[4].estimated_savings_pct, 10.0);
    }

    #[test]
    fn test_no_analysis_gives_no_signals() {
        assert_eq!(Signals::from_analysis(None, None, None), Signals::default());
    }
}
