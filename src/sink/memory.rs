//! Recording sink and variable table for tests.
//!
//! These implementations keep everything observable: created charts,
//! registered dimensions, the last value set per dimension, commit counts,
//! and variable lifecycle events. Tests assert against them instead of
//! parsing protocol output.

use std::collections::HashMap;

use super::{
    ChartId, ChartKind, ChartSpec, DimensionId, DimensionKind, DimensionSpec, MetricSink,
    VarHandle, VariableTable,
};

/// A chart recorded by [`MemorySink`].
#[derive(Debug, Clone)]
pub struct RecordedChart {
    pub type_id: String,
    pub id: String,
    pub family: String,
    pub context: String,
    pub title: String,
    pub units: String,
    pub module: String,
    pub priority: u32,
    pub update_every: u64,
    pub kind: ChartKind,
    pub dimensions: Vec<RecordedDimension>,
    pub done_count: u64,
}

/// A dimension recorded by [`MemorySink`].
#[derive(Debug, Clone)]
pub struct RecordedDimension {
    pub name: String,
    pub multiplier: i64,
    pub divisor: i64,
    pub kind: DimensionKind,
    pub last_value: Option<i64>,
}

/// In-memory `MetricSink` that records every operation.
#[derive(Debug, Default)]
pub struct MemorySink {
    charts: Vec<RecordedChart>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of charts created so far.
    pub fn chart_count(&self) -> usize {
        self.charts.len()
    }

    /// Looks up a recorded chart by its "type.id" name.
    pub fn chart(&self, type_id: &str, id: &str) -> Option<&RecordedChart> {
        self.charts
            .iter()
            .find(|c| c.type_id == type_id && c.id == id)
    }

    /// Last value set for a dimension of a chart, by names.
    pub fn last_value(&self, type_id: &str, id: &str, dimension: &str) -> Option<i64> {
        self.chart(type_id, id)?
            .dimensions
            .iter()
            .find(|d| d.name == dimension)?
            .last_value
    }
}

impl MetricSink for MemorySink {
    fn create_chart(&mut self, spec: &ChartSpec<'_>) -> ChartId {
        self.charts.push(RecordedChart {
            type_id: spec.type_id.to_string(),
            id: spec.id.to_string(),
            family: spec.family.to_string(),
            context: spec.context.to_string(),
            title: spec.title.to_string(),
            units: spec.units.to_string(),
            module: spec.module.to_string(),
            priority: spec.priority,
            update_every: spec.update_every,
            kind: spec.kind,
            dimensions: Vec::new(),
            done_count: 0,
        });
        ChartId::new(self.charts.len() - 1)
    }

    fn add_dimension(&mut self, chart: ChartId, spec: &DimensionSpec<'_>) -> DimensionId {
        let chart = &mut self.charts[chart.index()];
        chart.dimensions.push(RecordedDimension {
            name: spec.name.to_string(),
            multiplier: spec.multiplier,
            divisor: spec.divisor,
            kind: spec.kind,
            last_value: None,
        });
        DimensionId::new(chart.dimensions.len() - 1)
    }

    fn set(&mut self, chart: ChartId, dimension: DimensionId, value: i64) {
        self.charts[chart.index()].dimensions[dimension.index()].last_value = Some(value);
    }

    fn done(&mut self, chart: ChartId) {
        self.charts[chart.index()].done_count += 1;
    }
}

/// In-memory `VariableTable` that records acquisitions, values and releases.
#[derive(Debug, Default)]
pub struct MemoryVariables {
    names: Vec<String>,
    values: HashMap<String, f64>,
    set_counts: HashMap<String, u64>,
    active: Vec<bool>,
    release_count: u64,
}

impl MemoryVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a variable, if it was ever set.
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Whether a variable is currently acquired (registered, not released).
    pub fn is_active(&self, name: &str) -> bool {
        self.names
            .iter()
            .position(|n| n == name)
            .is_some_and(|i| self.active[i])
    }

    /// Total number of `release` calls observed.
    pub fn release_count(&self) -> u64 {
        self.release_count
    }

    /// How many times a variable's value has been set.
    pub fn set_count(&self, name: &str) -> u64 {
        self.set_counts.get(name).copied().unwrap_or(0)
    }

    /// How many times a variable has been acquired.
    pub fn acquire_count(&self, name: &str) -> u64 {
        self.names.iter().filter(|n| *n == name).count() as u64
    }
}

impl VariableTable for MemoryVariables {
    fn acquire(&mut self, name: &str) -> VarHandle {
        self.names.push(name.to_string());
        self.active.push(true);
        VarHandle::new(self.names.len() - 1)
    }

    fn set(&mut self, var: &VarHandle, value: f64) {
        let name = self.names[var.index()].clone();
        *self.set_counts.entry(name.clone()).or_insert(0) += 1;
        self.values.insert(name, value);
    }

    fn release(&mut self, var: VarHandle) {
        self.active[var.index()] = false;
        self.release_count += 1;
    }
}
