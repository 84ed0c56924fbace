//! Line-protocol sink for an external charting host.
//!
//! Emits the text protocol consumed by the host process on the other side
//! of stdout: `CHART` and `DIMENSION` lines once at creation, then a
//! `BEGIN`/`SET`/`END` block per committed collection cycle, and
//! `VARIABLE HOST` lines for published constants.

use std::io::Write;

use tracing::error;

use super::{
    ChartId, ChartSpec, DimensionId, DimensionSpec, MetricSink, VarHandle, VariableTable,
};

struct TextChart {
    /// Full "type.id" chart name used by BEGIN.
    name: String,
    dimensions: Vec<String>,
    /// Values buffered by `set` until the next `done`.
    pending: Vec<(usize, i64)>,
}

/// `MetricSink` and `VariableTable` writing the plugin line protocol.
pub struct TextSink<W: Write> {
    out: W,
    charts: Vec<TextChart>,
    variables: Vec<String>,
    failed: bool,
}

impl TextSink<std::io::Stdout> {
    /// A sink writing to stdout, the normal plugin transport.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            charts: Vec::new(),
            variables: Vec::new(),
            failed: false,
        }
    }

    /// Consumes the sink and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: std::fmt::Arguments<'_>) {
        if self.failed {
            return;
        }
        if let Err(e) = self.out.write_fmt(line).and_then(|_| self.out.flush()) {
            // The host hung up; stop writing but keep the collector alive.
            error!("sink write failed: {}", e);
            self.failed = true;
        }
    }
}

impl<W: Write> MetricSink for TextSink<W> {
    fn create_chart(&mut self, spec: &ChartSpec<'_>) -> ChartId {
        let name = format!("{}.{}", spec.type_id, spec.id);
        // An empty context defaults to the chart name on the host side.
        let context = if spec.context.is_empty() {
            &name
        } else {
            spec.context
        };
        self.write_line(format_args!(
            "CHART {} '' '{}' '{}' '{}' '{}' {} {} {} '' 'sockmon' '{}'\n",
            name,
            spec.title,
            spec.units,
            spec.family,
            context,
            spec.kind.as_str(),
            spec.priority,
            spec.update_every,
            spec.module,
        ));
        self.charts.push(TextChart {
            name,
            dimensions: Vec::new(),
            pending: Vec::new(),
        });
        ChartId::new(self.charts.len() - 1)
    }

    fn add_dimension(&mut self, chart: ChartId, spec: &DimensionSpec<'_>) -> DimensionId {
        self.write_line(format_args!(
            "DIMENSION {} '' {} {} {}\n",
            spec.name,
            spec.kind.as_str(),
            spec.multiplier,
            spec.divisor,
        ));
        let chart = &mut self.charts[chart.index()];
        chart.dimensions.push(spec.name.to_string());
        DimensionId::new(chart.dimensions.len() - 1)
    }

    fn set(&mut self, chart: ChartId, dimension: DimensionId, value: i64) {
        self.charts[chart.index()]
            .pending
            .push((dimension.index(), value));
    }

    fn done(&mut self, chart: ChartId) {
        let pending = std::mem::take(&mut self.charts[chart.index()].pending);
        let name = self.charts[chart.index()].name.clone();

        self.write_line(format_args!("BEGIN {}\n", name));
        for (dim, value) in pending {
            let dim_name = self.charts[chart.index()].dimensions[dim].clone();
            self.write_line(format_args!("SET {} = {}\n", dim_name, value));
        }
        self.write_line(format_args!("END\n"));
    }
}

impl<W: Write> VariableTable for TextSink<W> {
    fn acquire(&mut self, name: &str) -> VarHandle {
        self.variables.push(name.to_string());
        VarHandle::new(self.variables.len() - 1)
    }

    fn set(&mut self, var: &VarHandle, value: f64) {
        let name = self.variables[var.index()].clone();
        self.write_line(format_args!("VARIABLE HOST {} = {}\n", name, value));
    }

    fn release(&mut self, _var: VarHandle) {
        // Nothing to emit; consuming the handle ends the registration.
    }
}
