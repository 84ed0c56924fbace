//! Boundary traits for the external time-series sink.
//!
//! The collector does not own chart storage or history; it hands every
//! extracted value to a `MetricSink` and every named constant to a
//! `VariableTable`. Production uses the line-protocol implementation in
//! `text`; tests use the recording implementations in `memory`.

mod memory;
mod text;

pub use memory::{MemorySink, MemoryVariables, RecordedChart, RecordedDimension};
pub use text::TextSink;

/// Opaque handle to a chart created on a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChartId(usize);

impl ChartId {
    fn new(index: usize) -> Self {
        Self(index)
    }

    fn index(self) -> usize {
        self.0
    }
}

/// Opaque handle to a dimension registered on a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DimensionId(usize);

impl DimensionId {
    fn new(index: usize) -> Self {
        Self(index)
    }

    fn index(self) -> usize {
        self.0
    }
}

/// How a chart is rendered by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Area,
}

impl ChartKind {
    /// Protocol keyword for this chart kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Area => "area",
        }
    }
}

/// How submitted dimension values are interpreted by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionKind {
    /// The value is an absolute gauge reading.
    Absolute,
    /// The value is a monotonic counter; the sink derives a rate.
    Incremental,
}

impl DimensionKind {
    /// Protocol keyword for this algorithm.
    pub fn as_str(self) -> &'static str {
        match self {
            DimensionKind::Absolute => "absolute",
            DimensionKind::Incremental => "incremental",
        }
    }
}

/// Description of a chart to create on the sink.
#[derive(Debug, Clone, Copy)]
pub struct ChartSpec<'a> {
    /// Chart type prefix, e.g. "ipv4".
    pub type_id: &'a str,
    /// Chart id within the type, e.g. "sockstat_tcp_sockets".
    pub id: &'a str,
    /// Menu family the chart is grouped under.
    pub family: &'a str,
    /// Alerting context; empty means "default to the chart name".
    pub context: &'a str,
    /// Human-readable title.
    pub title: &'a str,
    /// Unit label shown on the axis.
    pub units: &'a str,
    /// Module owner tag.
    pub module: &'a str,
    /// Relative ordering among charts.
    pub priority: u32,
    /// Default collection period in seconds.
    pub update_every: u64,
    pub kind: ChartKind,
}

/// Description of a dimension to register on a chart.
///
/// Submitted values are scaled by `multiplier / divisor` on the sink side,
/// so page-counted memory can be stored in KiB without the collector
/// doing the arithmetic.
#[derive(Debug, Clone, Copy)]
pub struct DimensionSpec<'a> {
    pub name: &'a str,
    pub multiplier: i64,
    pub divisor: i64,
    pub kind: DimensionKind,
}

impl<'a> DimensionSpec<'a> {
    /// A 1:1 absolute gauge dimension, the common case.
    pub fn gauge(name: &'a str) -> Self {
        Self {
            name,
            multiplier: 1,
            divisor: 1,
            kind: DimensionKind::Absolute,
        }
    }
}

/// The external time-series sink.
///
/// Charts and dimensions are created once and referenced by handle
/// afterwards; every collection cycle sets current values and commits
/// the chart with `done`.
pub trait MetricSink {
    fn create_chart(&mut self, spec: &ChartSpec<'_>) -> ChartId;

    fn add_dimension(&mut self, chart: ChartId, spec: &DimensionSpec<'_>) -> DimensionId;

    fn set(&mut self, chart: ChartId, dimension: DimensionId, value: i64);

    /// Commits the current collection cycle for a chart.
    fn done(&mut self, chart: ChartId);
}

/// Opaque handle to an acquired host variable.
///
/// Deliberately neither `Clone` nor `Copy`: releasing consumes the handle,
/// so a variable cannot be released twice through the same acquisition.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct VarHandle(usize);

impl VarHandle {
    fn new(index: usize) -> Self {
        Self(index)
    }

    fn index(&self) -> usize {
        self.0
    }
}

/// Process-wide table of named scalar constants shared with alerting.
///
/// Variables follow an acquire/set/release lifecycle: `acquire` registers
/// the name and returns a handle, `set` replaces the value in place, and
/// `release` ends the registration.
pub trait VariableTable {
    fn acquire(&mut self, name: &str) -> VarHandle;

    fn set(&mut self, var: &VarHandle, value: f64);

    fn release(&mut self, var: VarHandle);
}
