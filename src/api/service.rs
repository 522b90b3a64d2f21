//! Shared business logic for the dashboard API
//!
//! Views are computed on the blocking pool and memoised per filter selection.
//! The memo holds at most `view_capacity` views; the oldest is evicted first.

use anyhow::{anyhow, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::Config;
use crate::dashboard::{Dashboard, DashboardView, Filters};
use crate::join::JoinedRow;

/// Default number of memoised filter selections
pub const DEFAULT_VIEW_CAPACITY: usize = 32;

#[derive(Default)]
struct ViewCache {
    views: HashMap<Filters, Arc<DashboardView>>,
    /// Insertion order, oldest first
    order: VecDeque<Filters>,
}

impl ViewCache {
    fn insert(&mut self, key: Filters, view: Arc<DashboardView>, capacity: usize) {
        if self.views.insert(key.clone(), view).is_none() {
            self.order.push_back(key);
        }
        while self.order.len() > capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.views.remove(&oldest);
            }
        }
    }
}

pub struct DashboardService {
    dashboard: Arc<Dashboard>,
    cached_views: Arc<RwLock<ViewCache>>,
    view_capacity: usize,
}

impl DashboardService {
    pub fn new(dashboard: Dashboard) -> Self {
        Self::with_view_capacity(dashboard, DEFAULT_VIEW_CAPACITY)
    }

    pub fn with_view_capacity(dashboard: Dashboard, view_capacity: usize) -> Self {
        Self {
            dashboard: Arc::new(dashboard),
            cached_views: Arc::new(RwLock::new(ViewCache::default())),
            view_capacity,
        }
    }

    pub fn config(&self) -> &Config {
        self.dashboard.config()
    }

    pub async fn get_view(&self, filters: Filters) -> Result<Arc<DashboardView>> {
        // Check cache first
        {
            let cache = self.cached_views.read().await;
            if let Some(view) = cache.views.get(&filters) {
                return Ok(view.clone());
            }
        }

        let dashboard = self.dashboard.clone();
        let key = filters.clone();
        let view = tokio::task::spawn_blocking(move || dashboard.view(&filters))
            .await
            .map_err(|e| anyhow!("view computation failed: {}", e))?;
        let view = Arc::new(view);

        // Update cache
        {
            let mut cache = self.cached_views.write().await;
            cache.insert(key.clone(), view.clone(), self.view_capacity);
            debug!("Cached view for {:?} ({} cached)", key, cache.views.len());
        }

        Ok(view)
    }

    /// Joined rows for the selection; the error carries the unavailability reason.
    pub async fn get_orders(&self, filters: Filters, limit: usize) -> Result<Vec<JoinedRow>> {
        let dashboard = self.dashboard.clone();
        tokio::task::spawn_blocking(move || {
            dashboard
                .rows(&filters)
                .map(|rows| rows.into_iter().take(limit).collect())
                .map_err(|reason| anyhow!(reason))
        })
        .await
        .map_err(|e| anyhow!("order lookup failed: {}", e))?
    }

    pub async fn cached_view_count(&self) -> usize {
        self.cached_views.read().await.views.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ForecastConfig};
    use crate::join::fixtures::tables;
    use crate::loader::SourceData;

    fn service(capacity: usize) -> DashboardService {
        let t = tables(&[("A", 100.0, 10.0, 0.0), ("B", 200.0, 40.0, 1.0)]);
        let data = SourceData::from_tables(
            t.orders,
            t.delivery,
            t.routes,
            t.fleet,
            t.warehouses,
            t.feedback,
            t.costs,
        );
        let config = Config {
            forecast: ForecastConfig {
                n_estimators: 2,
                ..ForecastConfig::default()
            },
            ..Config::default()
        };
        DashboardService::with_view_capacity(Dashboard::new(data, config), capacity)
    }

    fn carrier(name: String) -> Filters {
        Filters {
            carrier: Some(name),
            ..Filters::default()
        }
    }

    #[tokio::test]
    async fn test_view_cache_is_bounded() {
        let service = service(3);
        for i in 0..50 {
            service.get_view(carrier(format!("nobody-{}", i))).await.unwrap();
        }
        assert_eq!(service.cached_view_count().await, 3);

        // newest selections survive, the oldest were evicted
        let newest = service.get_view(carrier("nobody-49".to_string())).await.unwrap();
        let again = service.get_view(carrier("nobody-49".to_string())).await.unwrap();
        assert!(Arc::ptr_eq(&newest, &again));
        assert_eq!(service.cached_view_count().await, 3);

        service.get_view(carrier("nobody-0".to_string())).await.unwrap();
        assert_eq!(service.cached_view_count().await, 3);
    }

    #[tokio::test]
    async fn test_repeated_selection_is_cached_once() {
        let service = service(DEFAULT_VIEW_CAPACITY);
        let first = service.get_view(Filters::default()).await.unwrap();
        let second = service.get_view(Filters::default()).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(service.cached_view_count().await, 1);
    }
}
