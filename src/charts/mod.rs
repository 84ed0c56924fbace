//! Publication of counter snapshots onto the metric sink.
//!
//! Each of the nine chart groups creates its chart and dimensions lazily
//! on the first cycle it is allowed to publish, then sets current values
//! and commits every cycle. Groups left on `Auto` latch to `Enabled` the
//! first time data for them is published.

use tracing::debug;

use crate::collector::SockstatSnapshot;
use crate::config::GroupToggles;
use crate::sink::{
    ChartId, ChartKind, ChartSpec, DimensionId, DimensionKind, DimensionSpec, MetricSink,
};

const MODULE: &str = "sockstat";

const PRIO_IP_SOCKETS: u32 = 5100;
const PRIO_TCP_SOCKETS: u32 = 5201;
const PRIO_TCP_MEM: u32 = 5290;
const PRIO_UDP_SOCKETS: u32 = 5300;
const PRIO_UDP_MEM: u32 = 5390;
const PRIO_UDPLITE_SOCKETS: u32 = 5420;
const PRIO_RAW_SOCKETS: u32 = 5450;
const PRIO_FRAG_SOCKETS: u32 = 5460;
const PRIO_FRAG_MEM: u32 = 5470;

struct SingleDim {
    chart: ChartId,
    dim: DimensionId,
}

struct TcpSockets {
    chart: ChartId,
    alloc: DimensionId,
    orphan: DimensionId,
    inuse: DimensionId,
    timewait: DimensionId,
}

/// Chart state for the socket statistics module.
pub struct SockstatCharts {
    update_every: u64,
    page_size: u64,
    toggles: GroupToggles,
    sockets: Option<SingleDim>,
    tcp_sockets: Option<TcpSockets>,
    tcp_mem: Option<SingleDim>,
    udp_sockets: Option<SingleDim>,
    udp_mem: Option<SingleDim>,
    udplite_sockets: Option<SingleDim>,
    raw_sockets: Option<SingleDim>,
    frag_sockets: Option<SingleDim>,
    frag_mem: Option<SingleDim>,
}

impl SockstatCharts {
    /// Creates the publication state.
    ///
    /// `page_size` scales the page-counted TCP/UDP memory dimensions to
    /// KiB on the sink side.
    pub fn new(toggles: GroupToggles, update_every: u64, page_size: u64) -> Self {
        Self {
            update_every,
            page_size,
            toggles,
            sockets: None,
            tcp_sockets: None,
            tcp_mem: None,
            udp_sockets: None,
            udp_mem: None,
            udplite_sockets: None,
            raw_sockets: None,
            frag_sockets: None,
            frag_mem: None,
        }
    }

    /// Current per-group flags, with any Auto → Enabled latches applied.
    pub fn toggles(&self) -> &GroupToggles {
        &self.toggles
    }

    /// Publishes one snapshot: creates missing charts, sets values,
    /// commits each enabled group.
    pub fn publish(&mut self, snap: &SockstatSnapshot, sink: &mut dyn MetricSink) {
        let update_every = self.update_every;
        let page_size = self.page_size;

        if self.toggles.sockets.is_active() {
            self.toggles.sockets = self.toggles.sockets.observe();
            let ids = self.sockets.get_or_insert_with(|| {
                single_gauge_chart(
                    sink,
                    ChartSpec {
                        type_id: "ip",
                        id: "sockstat_sockets",
                        family: "sockets",
                        context: "",
                        title: "Sockets used for all address families",
                        units: "sockets",
                        module: MODULE,
                        priority: PRIO_IP_SOCKETS,
                        update_every,
                        kind: ChartKind::Line,
                    },
                    "used",
                )
            });
            sink.set(ids.chart, ids.dim, clamp(snap.sockets_used));
            sink.done(ids.chart);
        }

        if self.toggles.tcp_sockets.is_active() {
            self.toggles.tcp_sockets = self.toggles.tcp_sockets.observe();
            let ids = self.tcp_sockets.get_or_insert_with(|| {
                let chart = sink.create_chart(&ChartSpec {
                    type_id: "ipv4",
                    id: "sockstat_tcp_sockets",
                    family: "tcp",
                    context: "",
                    title: "TCP Sockets",
                    units: "sockets",
                    module: MODULE,
                    priority: PRIO_TCP_SOCKETS,
                    update_every,
                    kind: ChartKind::Line,
                });
                debug!("created chart ipv4.sockstat_tcp_sockets");
                TcpSockets {
                    chart,
                    alloc: sink.add_dimension(chart, &DimensionSpec::gauge("alloc")),
                    orphan: sink.add_dimension(chart, &DimensionSpec::gauge("orphan")),
                    inuse: sink.add_dimension(chart, &DimensionSpec::gauge("inuse")),
                    timewait: sink.add_dimension(chart, &DimensionSpec::gauge("timewait")),
                }
            });
            sink.set(ids.chart, ids.inuse, clamp(snap.tcp_inuse));
            sink.set(ids.chart, ids.orphan, clamp(snap.tcp_orphan));
            sink.set(ids.chart, ids.timewait, clamp(snap.tcp_tw));
            sink.set(ids.chart, ids.alloc, clamp(snap.tcp_alloc));
            sink.done(ids.chart);
        }

        if self.toggles.tcp_mem.is_active() {
            self.toggles.tcp_mem = self.toggles.tcp_mem.observe();
            let ids = self.tcp_mem.get_or_insert_with(|| {
                paged_mem_chart(
                    sink,
                    ChartSpec {
                        type_id: "ipv4",
                        id: "sockstat_tcp_mem",
                        family: "tcp",
                        context: "",
                        title: "TCP Sockets Memory",
                        units: "KiB",
                        module: MODULE,
                        priority: PRIO_TCP_MEM,
                        update_every,
                        kind: ChartKind::Area,
                    },
                    page_size,
                )
            });
            sink.set(ids.chart, ids.dim, clamp(snap.tcp_mem));
            sink.done(ids.chart);
        }

        if self.toggles.udp_sockets.is_active() {
            self.toggles.udp_sockets = self.toggles.udp_sockets.observe();
            let ids = self.udp_sockets.get_or_insert_with(|| {
                single_gauge_chart(
                    sink,
                    ChartSpec {
                        type_id: "ipv4",
                        id: "sockstat_udp_sockets",
                        family: "udp",
                        context: "",
                        title: "IPv4 UDP Sockets",
                        units: "sockets",
                        module: MODULE,
                        priority: PRIO_UDP_SOCKETS,
                        update_every,
                        kind: ChartKind::Line,
                    },
                    "inuse",
                )
            });
            sink.set(ids.chart, ids.dim, clamp(snap.udp_inuse));
            sink.done(ids.chart);
        }

        if self.toggles.udp_mem.is_active() {
            self.toggles.udp_mem = self.toggles.udp_mem.observe();
            let ids = self.udp_mem.get_or_insert_with(|| {
                paged_mem_chart(
                    sink,
                    ChartSpec {
                        type_id: "ipv4",
                        id: "sockstat_udp_mem",
                        family: "udp",
                        context: "",
                        title: "IPv4 UDP Sockets Memory",
                        units: "KiB",
                        module: MODULE,
                        priority: PRIO_UDP_MEM,
                        update_every,
                        kind: ChartKind::Area,
                    },
                    page_size,
                )
            });
            sink.set(ids.chart, ids.dim, clamp(snap.udp_mem));
            sink.done(ids.chart);
        }

        if self.toggles.udplite_sockets.is_active() {
            self.toggles.udplite_sockets = self.toggles.udplite_sockets.observe();
            let ids = self.udplite_sockets.get_or_insert_with(|| {
                single_gauge_chart(
                    sink,
                    ChartSpec {
                        type_id: "ipv4",
                        id: "sockstat_udplite_sockets",
                        family: "udplite",
                        context: "",
                        title: "IPv4 UDPLITE Sockets",
                        units: "sockets",
                        module: MODULE,
                        priority: PRIO_UDPLITE_SOCKETS,
                        update_every,
                        kind: ChartKind::Line,
                    },
                    "inuse",
                )
            });
            sink.set(ids.chart, ids.dim, clamp(snap.udplite_inuse));
            sink.done(ids.chart);
        }

        if self.toggles.raw_sockets.is_active() {
            self.toggles.raw_sockets = self.toggles.raw_sockets.observe();
            let ids = self.raw_sockets.get_or_insert_with(|| {
                single_gauge_chart(
                    sink,
                    ChartSpec {
                        type_id: "ipv4",
                        id: "sockstat_raw_sockets",
                        family: "raw",
                        context: "",
                        title: "IPv4 RAW Sockets",
                        units: "sockets",
                        module: MODULE,
                        priority: PRIO_RAW_SOCKETS,
                        update_every,
                        kind: ChartKind::Line,
                    },
                    "inuse",
                )
            });
            sink.set(ids.chart, ids.dim, clamp(snap.raw_inuse));
            sink.done(ids.chart);
        }

        if self.toggles.frag_sockets.is_active() {
            self.toggles.frag_sockets = self.toggles.frag_sockets.observe();
            let ids = self.frag_sockets.get_or_insert_with(|| {
                single_gauge_chart(
                    sink,
                    ChartSpec {
                        type_id: "ipv4",
                        id: "sockstat_frag_sockets",
                        family: "fragments",
                        context: "",
                        title: "IPv4 FRAG Sockets",
                        units: "fragments",
                        module: MODULE,
                        priority: PRIO_FRAG_SOCKETS,
                        update_every,
                        kind: ChartKind::Line,
                    },
                    "inuse",
                )
            });
            sink.set(ids.chart, ids.dim, clamp(snap.frag_inuse));
            sink.done(ids.chart);
        }

        if self.toggles.frag_mem.is_active() {
            self.toggles.frag_mem = self.toggles.frag_mem.observe();
            let ids = self.frag_mem.get_or_insert_with(|| {
                // Fragment memory is reported in bytes, not pages.
                let chart = sink.create_chart(&ChartSpec {
                    type_id: "ipv4",
                    id: "sockstat_frag_mem",
                    family: "fragments",
                    context: "",
                    title: "IPv4 FRAG Sockets Memory",
                    units: "KiB",
                    module: MODULE,
                    priority: PRIO_FRAG_MEM,
                    update_every,
                    kind: ChartKind::Area,
                });
                debug!("created chart ipv4.sockstat_frag_mem");
                let dim = sink.add_dimension(
                    chart,
                    &DimensionSpec {
                        name: "mem",
                        multiplier: 1,
                        divisor: 1024,
                        kind: DimensionKind::Absolute,
                    },
                );
                SingleDim { chart, dim }
            });
            sink.set(ids.chart, ids.dim, clamp(snap.frag_memory));
            sink.done(ids.chart);
        }
    }
}

fn clamp(value: u64) -> i64 {
    value.min(i64::MAX as u64) as i64
}

fn single_gauge_chart(
    sink: &mut dyn MetricSink,
    spec: ChartSpec<'_>,
    dim_name: &str,
) -> SingleDim {
    let chart = sink.create_chart(&spec);
    debug!("created chart {}.{}", spec.type_id, spec.id);
    let dim = sink.add_dimension(chart, &DimensionSpec::gauge(dim_name));
    SingleDim { chart, dim }
}

/// Chart for a memory counter the kernel reports in pages; the dimension
/// scale converts pages to KiB on the sink side.
fn paged_mem_chart(
    sink: &mut dyn MetricSink,
    spec: ChartSpec<'_>,
    page_size: u64,
) -> SingleDim {
    let chart = sink.create_chart(&spec);
    debug!("created chart {}.{}", spec.type_id, spec.id);
    let dim = sink.add_dimension(
        chart,
        &DimensionSpec {
            name: "mem",
            multiplier: clamp(page_size),
            divisor: 1024,
            kind: DimensionKind::Absolute,
        },
    );
    SingleDim { chart, dim }
}

/// Convenience check used by the daemon to decide whether a cycle
/// published anything at all.
pub fn any_group_active(toggles: &GroupToggles) -> bool {
    [
        toggles.sockets,
        toggles.tcp_sockets,
        toggles.tcp_mem,
        toggles.udp_sockets,
        toggles.udp_mem,
        toggles.udplite_sockets,
        toggles.raw_sockets,
        toggles.frag_sockets,
        toggles.frag_mem,
    ]
    .iter()
    .any(|flag| flag.is_active())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnableFlag;
    use crate::sink::MemorySink;

    fn snapshot() -> SockstatSnapshot {
        SockstatSnapshot {
            sockets_used: 284,
            tcp_inuse: 12,
            tcp_orphan: 1,
            tcp_tw: 3,
            tcp_alloc: 20,
            tcp_mem: 5,
            udp_inuse: 6,
            udp_mem: 4,
            udplite_inuse: 0,
            raw_inuse: 1,
            frag_inuse: 7,
            frag_memory: 43008,
        }
    }

    #[test]
    fn all_groups_publish_by_default() {
        let mut charts = SockstatCharts::new(GroupToggles::default(), 1, 4096);
        let mut sink = MemorySink::new();

        charts.publish(&snapshot(), &mut sink);

        assert_eq!(sink.chart_count(), 9);
        assert_eq!(sink.last_value("ip", "sockstat_sockets", "used"), Some(284));
        assert_eq!(
            sink.last_value("ipv4", "sockstat_tcp_sockets", "timewait"),
            Some(3)
        );
        assert_eq!(sink.last_value("ipv4", "sockstat_tcp_mem", "mem"), Some(5));
        assert_eq!(
            sink.last_value("ipv4", "sockstat_frag_mem", "mem"),
            Some(43008)
        );
    }

    #[test]
    fn charts_are_created_once_and_committed_every_cycle() {
        let mut charts = SockstatCharts::new(GroupToggles::default(), 1, 4096);
        let mut sink = MemorySink::new();

        charts.publish(&snapshot(), &mut sink);
        charts.publish(&snapshot(), &mut sink);
        charts.publish(&snapshot(), &mut sink);

        assert_eq!(sink.chart_count(), 9);
        assert_eq!(sink.chart("ip", "sockstat_sockets").unwrap().done_count, 3);
        assert_eq!(
            sink.chart("ipv4", "sockstat_tcp_sockets").unwrap().done_count,
            3
        );
    }

    #[test]
    fn disabled_groups_never_create_charts() {
        let mut toggles = GroupToggles::default();
        toggles.tcp_mem = EnableFlag::Disabled;
        toggles.frag_mem = EnableFlag::Disabled;

        let mut charts = SockstatCharts::new(toggles, 1, 4096);
        let mut sink = MemorySink::new();
        charts.publish(&snapshot(), &mut sink);

        assert_eq!(sink.chart_count(), 7);
        assert!(sink.chart("ipv4", "sockstat_tcp_mem").is_none());
        assert!(sink.chart("ipv4", "sockstat_frag_mem").is_none());
        assert_eq!(charts.toggles().tcp_mem, EnableFlag::Disabled);
    }

    #[test]
    fn auto_groups_latch_to_enabled_after_publishing() {
        let mut charts = SockstatCharts::new(GroupToggles::default(), 1, 4096);
        let mut sink = MemorySink::new();

        assert_eq!(charts.toggles().sockets, EnableFlag::Auto);
        charts.publish(&snapshot(), &mut sink);
        assert_eq!(charts.toggles().sockets, EnableFlag::Enabled);
        assert_eq!(charts.toggles().raw_sockets, EnableFlag::Enabled);
    }

    #[test]
    fn paged_memory_dimensions_scale_by_page_size() {
        let mut charts = SockstatCharts::new(GroupToggles::default(), 1, 16384);
        let mut sink = MemorySink::new();
        charts.publish(&snapshot(), &mut sink);

        let tcp_mem = sink.chart("ipv4", "sockstat_tcp_mem").unwrap();
        assert_eq!(tcp_mem.dimensions[0].multiplier, 16384);
        assert_eq!(tcp_mem.dimensions[0].divisor, 1024);

        // Fragment memory arrives in bytes and only needs the KiB divisor.
        let frag_mem = sink.chart("ipv4", "sockstat_frag_mem").unwrap();
        assert_eq!(frag_mem.dimensions[0].multiplier, 1);
        assert_eq!(frag_mem.dimensions[0].divisor, 1024);
    }

    #[test]
    fn tcp_chart_has_the_four_socket_dimensions() {
        let mut charts = SockstatCharts::new(GroupToggles::default(), 1, 4096);
        let mut sink = MemorySink::new();
        charts.publish(&snapshot(), &mut sink);

        let tcp = sink.chart("ipv4", "sockstat_tcp_sockets").unwrap();
        let names: Vec<&str> = tcp.dimensions.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["alloc", "orphan", "inuse", "timewait"]);
    }

    #[test]
    fn full_pipeline_from_file_to_sink() {
        use crate::collector::Collector;
        use crate::collector::mock::MockFs;
        use crate::config::SockstatConfig;
        use crate::sink::MemoryVariables;

        let config = SockstatConfig {
            refresh_constants_every: 1,
            ..SockstatConfig::default()
        };
        let mut collector = Collector::new(MockFs::busy_server(), &config, 1);
        let mut charts = SockstatCharts::new(config.groups, 1, 4096);
        let mut vars = MemoryVariables::new();
        let mut sink = MemorySink::new();

        let snap = collector.collect(&mut vars).unwrap();
        charts.publish(&snap, &mut sink);

        assert_eq!(sink.last_value("ip", "sockstat_sockets", "used"), Some(48211));
        assert_eq!(
            sink.last_value("ipv4", "sockstat_tcp_sockets", "orphan"),
            Some(112)
        );
        assert_eq!(
            sink.last_value("ipv4", "sockstat_tcp_sockets", "timewait"),
            Some(28711)
        );
        assert_eq!(
            sink.last_value("ipv4", "sockstat_frag_mem", "mem"),
            Some(43008)
        );
        assert_eq!(vars.value("tcp_max_orphans"), Some(262144.0));
    }

    #[test]
    fn any_group_active_reflects_toggles() {
        assert!(any_group_active(&GroupToggles::default()));

        let mut toggles = GroupToggles::default();
        for group in [
            "sockets",
            "tcp-sockets",
            "tcp-mem",
            "udp-sockets",
            "udp-mem",
            "udplite-sockets",
            "raw-sockets",
            "frag-sockets",
            "frag-mem",
        ] {
            toggles.set(group, EnableFlag::Disabled).unwrap();
        }
        assert!(!any_group_active(&toggles));
    }
}
