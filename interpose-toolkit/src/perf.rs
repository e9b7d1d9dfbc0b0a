// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Performance aggregation.
//!
//! A [`PerformanceMonitor`] turns on timing for a session and folds every
//! completed operation into per-key statistics. Keys are the operation kind
//! (`get`) or, when grouping by property, kind and property (`get:name`).

use dashmap::DashMap;
use interpose_core::{
    Configuration, ConfigurationBuilder, Facade, Interposer, ObjectRef, OperationContext,
};
use serde::Serialize;
use std::sync::Arc;

/// Aggregated timings for one key, in microseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationStats {
    pub count: u64,
    pub total_us: u64,
    pub min_us: u64,
    pub max_us: u64,
}

impl OperationStats {
    pub fn new() -> Self {
        Self {
            count: 0,
            total_us: 0,
            min_us: u64::MAX,
            max_us: 0,
        }
    }

    #[inline]
    pub fn record(&mut self, duration_us: u64) {
        self.count += 1;
        self.total_us = self.total_us.saturating_add(duration_us);
        self.min_us = self.min_us.min(duration_us);
        self.max_us = self.max_us.max(duration_us);
    }

    pub fn avg_us(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_us as f64 / self.count as f64
        }
    }
}

impl Default for OperationStats {
    fn default() -> Self {
        Self::new()
    }
}

/// One row of a [`PerformanceReport`].
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub key: String,
    #[serde(flatten)]
    pub stats: OperationStats,
    pub avg_us: f64,
}

/// Snapshot of all statistics, sorted by key.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceReport {
    pub entries: Vec<ReportEntry>,
}

impl PerformanceReport {
    pub fn get(&self, key: &str) -> Option<&ReportEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Concurrent per-operation timing table.
#[derive(Clone, Default)]
pub struct PerformanceMonitor {
    stats: Arc<DashMap<String, OperationStats>>,
    by_property: bool,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group statistics by kind and property instead of kind alone.
    pub fn by_property(mut self) -> Self {
        self.by_property = true;
        self
    }

    /// Enables timing on `builder` and chains the recording after-hook.
    pub fn instrument(&self, builder: ConfigurationBuilder) -> ConfigurationBuilder {
        let monitor = self.clone();
        builder.enable_timing(true).also_on_after(move |ctx| {
            monitor.record(ctx);
            Ok(())
        })
    }

    /// Installs a timed session on `target`.
    pub fn install(
        &self,
        engine: &Interposer,
        target: ObjectRef,
        configuration: Configuration,
        name: Option<&str>,
    ) -> anyhow::Result<Facade> {
        let builder = self.instrument(ConfigurationBuilder::from_config(configuration));
        let facade = engine.install(target, builder, name)?;
        tracing::debug!(session = %facade.session(), "Performance monitor attached");
        Ok(facade)
    }

    /// Folds one completed operation into the table. Contexts without a
    /// duration are ignored.
    pub fn record(&self, ctx: &OperationContext) {
        let Some(duration) = ctx.duration() else {
            return;
        };
        let duration_us = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self.stats
            .entry(self.key_for(ctx))
            .or_default()
            .record(duration_us);
    }

    fn key_for(&self, ctx: &OperationContext) -> String {
        match ctx.property() {
            Some(property) if self.by_property => format!("{}:{}", ctx.kind(), property.as_str()),
            _ => ctx.kind().to_string(),
        }
    }

    pub fn stats(&self, key: &str) -> Option<OperationStats> {
        self.stats.get(key).map(|entry| entry.value().clone())
    }

    pub fn report(&self) -> PerformanceReport {
        let mut entries: Vec<ReportEntry> = self
            .stats
            .iter()
            .map(|entry| ReportEntry {
                key: entry.key().clone(),
                avg_us: entry.value().avg_us(),
                stats: entry.value().clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        PerformanceReport { entries }
    }

    pub fn reset(&self) {
        self.stats.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interpose_core::ConfigSettings;

    #[test]
    fn test_stats_aggregation() {
        let mut stats = OperationStats::new();
        assert_eq!(stats.avg_us(), 0.0);

        for us in [10, 30, 20] {
            stats.record(us);
        }
        assert_eq!(stats.count, 3);
        assert_eq!(stats.total_us, 60);
        assert_eq!(stats.min_us, 10);
        assert_eq!(stats.max_us, 30);
        assert_eq!(stats.avg_us(), 20.0);
    }

    #[test]
    fn test_monitor_records_by_kind() {
        let engine = Interposer::new();
        let monitor = PerformanceMonitor::new();
        let target = ObjectRef::from_entries([("a", 1)]);
        let facade = monitor
            .install(&engine, target, Configuration::default(), None)
            .unwrap();

        facade.get("a").unwrap();
        facade.get("b").unwrap();
        facade.has("a").unwrap();

        assert_eq!(monitor.stats("get").unwrap().count, 2);
        assert_eq!(monitor.stats("has").unwrap().count, 1);
        assert!(monitor.stats("set").is_none());

        let report = monitor.report();
        let keys: Vec<&str> = report.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["get", "has"]);
        assert_eq!(report.to_json()["entries"][0]["count"], 2);

        monitor.reset();
        assert!(monitor.report().entries.is_empty());
    }

    #[test]
    fn test_monitor_keeps_existing_after_hook() {
        let engine = Interposer::new();
        let monitor = PerformanceMonitor::new().by_property();
        let seen = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let s = seen.clone();

        let config = Configuration::builder()
            .on_after(move |_| {
                s.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            })
            .build();
        let facade = monitor
            .install(&engine, ObjectRef::new(), config, None)
            .unwrap();

        facade.set("x", 1).unwrap();
        facade.own_keys().unwrap();

        assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert_eq!(monitor.stats("set:x").unwrap().count, 1);
        assert_eq!(monitor.stats("ownKeys").unwrap().count, 1);
    }

    #[test]
    fn test_settings_layered_over_instrumented_builder() {
        let engine = Interposer::new();
        let monitor = PerformanceMonitor::new();
        let builder = monitor.instrument(Configuration::builder());

        let settings = ConfigSettings::from_json(r#"{"logLevel": "debug"}"#).unwrap();
        let config = settings.apply(builder).unwrap().build();
        assert!(config.enable_timing);

        let facade = engine
            .install(ObjectRef::from_entries([("a", 1)]), config, None)
            .unwrap();
        facade.get("a").unwrap();
        assert_eq!(monitor.stats("get").unwrap().count, 1);
    }
}
