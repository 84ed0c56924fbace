//! sockmond - socket statistics collector daemon.
//!
//! Reads `/proc/net/sockstat` once per interval, republishes the counters
//! as charts on stdout (plugin line protocol) and keeps the TCP memory
//! threshold constants up to date for alerting. Logs go to stderr; stdout
//! belongs to the protocol.

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(target_os = "linux")]
use sockmon::collector::RealFs;
#[cfg(not(target_os = "linux"))]
use sockmon::collector::mock::MockFs;
use sockmon::charts::{SockstatCharts, any_group_active};
use sockmon::collector::Collector;
use sockmon::config::{EnableFlag, GroupToggles, SockstatConfig};
use sockmon::sink::TextSink;
use sockmon::util::page_size;

/// Socket statistics collector daemon.
#[derive(Parser)]
#[command(name = "sockmond", about = "Socket statistics collector daemon", version)]
struct Args {
    /// Collection interval in seconds.
    #[arg(short, long, default_value = "1")]
    interval: u64,

    /// Prefix prepended to every consumed path, for reading another
    /// root's /proc (e.g. from inside a container).
    #[arg(long, default_value = "", value_name = "PATH")]
    host_prefix: String,

    /// Override for the socket statistics source file.
    #[arg(long, value_name = "PATH")]
    sockstat_path: Option<PathBuf>,

    /// How often the threshold constants are re-read, in seconds.
    #[arg(long, default_value = "60", value_name = "SECONDS")]
    constants_every: u64,

    /// Disable a metric group (repeatable). Groups: sockets, tcp-sockets,
    /// tcp-mem, udp-sockets, udp-mem, udplite-sockets, raw-sockets,
    /// frag-sockets, frag-mem.
    #[arg(long, value_name = "GROUP")]
    disable: Vec<String>,

    /// Force-enable a metric group even before data is observed (repeatable).
    #[arg(long, value_name = "GROUP")]
    enable: Vec<String>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Logs are written to stderr; stdout carries the chart protocol.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("sockmond={}", level).parse().unwrap())
        .add_directive(format!("sockmon={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Applies repeated --disable/--enable flags to the group toggles.
fn apply_toggles(toggles: &mut GroupToggles, groups: &[String], flag: EnableFlag) {
    for group in groups {
        if let Err(e) = toggles.set(group, flag) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let mut groups = GroupToggles::default();
    apply_toggles(&mut groups, &args.disable, EnableFlag::Disabled);
    apply_toggles(&mut groups, &args.enable, EnableFlag::Enabled);

    let config = SockstatConfig {
        groups,
        source_path: args.sockstat_path.clone(),
        host_prefix: args.host_prefix.clone(),
        refresh_constants_every: args.constants_every,
    };

    if !any_group_active(&config.groups) {
        warn!("all metric groups are disabled; only threshold constants will be published");
    }

    info!("sockmond {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: interval={}s, constants_every={}s, host_prefix={:?}",
        args.interval, args.constants_every, args.host_prefix
    );

    #[cfg(target_os = "linux")]
    let mut collector = Collector::new(RealFs::new(), &config, args.interval);
    #[cfg(not(target_os = "linux"))]
    let mut collector = Collector::new(MockFs::typical_system(), &config, args.interval);

    if !collector.source_exists() {
        warn!(
            "{} not found; will keep retrying every cycle",
            collector.source_path().display()
        );
    }

    let mut charts = SockstatCharts::new(config.groups, args.interval, page_size());
    let mut sink = TextSink::stdout();

    let interval = Duration::from_secs(args.interval.max(1));

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    info!("Starting collection loop");

    let mut cycle_count: u64 = 0;

    while running.load(Ordering::SeqCst) {
        match collector.collect(&mut sink) {
            Ok(snapshot) => {
                cycle_count += 1;
                charts.publish(&snapshot, &mut sink);
                debug!(
                    "Cycle #{}: sockets_used={}, tcp_inuse={}, tcp_tw={}",
                    cycle_count, snapshot.sockets_used, snapshot.tcp_inuse, snapshot.tcp_tw
                );

                if cycle_count.is_multiple_of(60) {
                    info!(
                        "Cycle #{}: sockets_used={}, tcp_max_orphans={}",
                        cycle_count,
                        snapshot.sockets_used,
                        collector.tcp_max_orphans()
                    );
                }
            }
            Err(e) => {
                // The file can vanish and come back (namespace moves,
                // module unload); keep retrying at the same cadence.
                debug!("{}", e);
            }
        }

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    info!("Shutting down...");
    collector.teardown(&mut sink);
    info!("Shutdown complete");
}
