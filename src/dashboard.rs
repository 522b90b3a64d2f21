//! Dashboard assembly
//!
//! A view is a pure function of the loaded tables, the configuration and a
//! filter selection. Each section degrades on its own: a table that failed to
//! load or a forecast without enough rows marks only the sections that need
//! it as unavailable.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::aggregate::{
    aggregate, fleet_profile, warehouse_costs, CostAggregates, FleetProfile, WarehouseCosts,
};
use crate::config::Config;
use crate::error::Error;
use crate::forecast::{forecast, Forecast};
use crate::join::{join, JoinReport, JoinedRow, JoinedTable};
use crate::loader::SourceData;
use crate::models::{Dataset, WarehouseRecord};
use crate::recommend::{recommend, Recommendation, Signals};

/// Filter selection; an absent field matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filters {
    pub carrier: Option<String>,
    pub product_category: Option<String>,
    pub warehouse_id: Option<String>,
    /// Inclusive lower bound on order date
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on order date
    pub to: Option<NaiveDate>,
}

fn matches(filter: &Option<String>, value: &str) -> bool {
    filter.as_deref().map_or(true, |f| f == value)
}

impl Filters {
    pub fn matches_row(&self, row: &JoinedRow) -> bool {
        let date = row.order.order_date;
        matches(&self.carrier, &row.order.carrier)
            && matches(&self.product_category, &row.order.product_category)
            && matches(&self.warehouse_id, &row.order.warehouse_id)
            && self.from.map_or(true, |from| date >= from)
            && self.to.map_or(true, |to| date <= to)
    }

    /// Carrier and date do not apply to inventory rows.
    pub fn matches_warehouse(&self, record: &WarehouseRecord) -> bool {
        matches(&self.warehouse_id, &record.warehouse_id)
            && matches(&self.product_category, &record.product_category)
    }

    pub fn apply(&self, rows: &[JoinedRow]) -> Vec<JoinedRow> {
        rows.iter().filter(|r| self.matches_row(r)).cloned().collect()
    }
}

/// One dashboard section
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Section<T> {
    Ready(T),
    Unavailable { reason: String },
}

impl<T> Section<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Section::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Section::Ready(value) => Some(value),
            Section::Unavailable { .. } => None,
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for Section<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Section::Ready(value),
            Err(e) => Section::unavailable(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQuality {
    pub row_counts: BTreeMap<Dataset, usize>,
    pub load_errors: Vec<String>,
    /// Absent when a table needed by the join failed to load
    pub join: Option<JoinReport>,
    /// Joined rows left after filtering
    pub filtered_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub filters: Filters,
    pub data_quality: DataQuality,
    pub aggregates: Section<CostAggregates>,
    pub fleet: Section<FleetProfile>,
    pub warehouses: Section<WarehouseCosts>,
    pub forecast: Section<Forecast>,
    pub signals: Signals,
    pub recommendations: Vec<Recommendation>,
}

/// Loaded tables plus their join, shared read-only by every view.
#[derive(Debug)]
pub struct Dashboard {
    config: Config,
    data: SourceData,
    joined: Result<JoinedTable, String>,
}

impl Dashboard {
    pub fn load(config: Config) -> Result<Self, Error> {
        config.forecast.validate()?;
        let data = SourceData::load(&config.data.data_dir)?;
        Ok(Self::new(data, config))
    }

    pub fn new(data: SourceData, config: Config) -> Self {
        let joined = match data.tables() {
            Ok(tables) => {
                let table = join(tables);
                info!(
                    "Joined {} of {} orders",
                    table.report.joined, table.report.input_orders
                );
                Ok(table)
            }
            Err(e) => Err(format!("joined view unavailable: {}", e)),
        };
        Self {
            config,
            data,
            joined,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn data(&self) -> &SourceData {
        &self.data
    }

    pub fn join_report(&self) -> Option<&JoinReport> {
        self.joined.as_ref().ok().map(|t| &t.report)
    }

    /// Joined rows matching `filters`, or why there are none.
    pub fn rows(&self, filters: &Filters) -> Result<Vec<JoinedRow>, String> {
        self.joined
            .as_ref()
            .map(|t| filters.apply(&t.rows))
            .map_err(Clone::clone)
    }

    pub fn view(&self, filters: &Filters) -> DashboardView {
        let rows = self.rows(filters);
        let filtered_rows = rows.as_ref().map_or(0, Vec::len);
        debug!("Building view for {:?} over {} rows", filters, filtered_rows);

        let aggregates: Section<CostAggregates> = match &rows {
            Ok(rows) if rows.is_empty() => {
                Section::unavailable("no joined orders match the filters")
            }
            Ok(rows) => Section::Ready(aggregate(rows, &self.config.analysis)),
            Err(reason) => Section::unavailable(reason.clone()),
        };
        let forecast: Section<Forecast> = match &rows {
            Ok(rows) => forecast(rows, &self.config.forecast).into(),
            Err(reason) => Section::unavailable(reason.clone()),
        };
        let fleet: Section<FleetProfile> = self.data.fleet.as_deref().map(fleet_profile).into();
        let warehouses: Section<WarehouseCosts> = self
            .data
            .warehouses
            .as_deref()
            .map(|records| {
                let selected: Vec<WarehouseRecord> = records
                    .iter()
                    .filter(|r| filters.matches_warehouse(r))
                    .cloned()
                    .collect();
                warehouse_costs(&selected)
            })
            .into();

        let signals = Signals::from_analysis(aggregates.ready(), fleet.ready(), forecast.ready());
        let recommendations = recommend(&signals);

        DashboardView {
            filters: filters.clone(),
            data_quality: DataQuality {
                row_counts: self.data.row_counts().into_iter().collect(),
                load_errors: self.data.failures().iter().map(|e| e.to_string()).collect(),
                join: self.join_report().cloned(),
                filtered_rows,
            },
            aggregates,
            fleet,
            warehouses,
            forecast,
            signals,
            recommendations,
        }
    }
}
