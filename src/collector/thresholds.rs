//! Low-rate refresh of TCP memory thresholds and the orphan socket limit.
//!
//! The kernel exposes the TCP memory watermarks in pages and the orphan
//! limit as a bare count; both change rarely, so they are re-read on a
//! slower cadence than the socket counters and published as named host
//! constants for alerting rules.

use std::path::PathBuf;

use tracing::debug;

use crate::collector::traits::FileSystem;
use crate::sink::{VarHandle, VariableTable};

const TCP_MEM_FILE: &str = "/proc/sys/net/ipv4/tcp_mem";
const TCP_MAX_ORPHANS_FILE: &str = "/proc/sys/net/ipv4/tcp_max_orphans";

/// Periodic reader of the two threshold files.
///
/// Invoked every collection cycle via [`tick`](Self::tick); internally
/// accumulates elapsed time and only touches the files when the configured
/// interval has passed. Published constants keep their last value when a
/// refresh fails.
pub struct ThresholdRefresher {
    tcp_mem_path: PathBuf,
    max_orphans_path: PathBuf,
    refresh_every: u64,
    accumulated: u64,
    page_size: u64,
    tcp_mem_low: Option<VarHandle>,
    tcp_mem_pressure: Option<VarHandle>,
    tcp_mem_high: Option<VarHandle>,
    tcp_max_orphans: Option<VarHandle>,
    last_max_orphans: u64,
}

impl ThresholdRefresher {
    /// Creates a refresher reading below `host_prefix`.
    ///
    /// `refresh_every` is in seconds; `page_size` is the platform page
    /// size used to convert the page-counted watermarks to kilobytes.
    pub fn new(host_prefix: &str, refresh_every: u64, page_size: u64) -> Self {
        Self {
            tcp_mem_path: PathBuf::from(format!("{host_prefix}{TCP_MEM_FILE}")),
            max_orphans_path: PathBuf::from(format!("{host_prefix}{TCP_MAX_ORPHANS_FILE}")),
            refresh_every,
            accumulated: 0,
            page_size,
            tcp_mem_low: None,
            tcp_mem_pressure: None,
            tcp_mem_high: None,
            tcp_max_orphans: None,
            last_max_orphans: 0,
        }
    }

    /// Accounts one collection cycle of `update_every` seconds and
    /// refreshes the constants when the interval has elapsed.
    ///
    /// Returns the orphan limit from the most recent successful refresh,
    /// or 0 when it is unknown.
    pub fn tick<F: FileSystem>(
        &mut self,
        update_every: u64,
        fs: &F,
        vars: &mut dyn VariableTable,
    ) -> u64 {
        self.accumulated += update_every;
        if self.accumulated < self.refresh_every {
            return self.last_max_orphans;
        }
        self.accumulated = 0;

        self.refresh_tcp_mem(fs, vars);
        self.last_max_orphans = self.refresh_max_orphans(fs, vars);
        self.last_max_orphans
    }

    /// Releases every acquired constant. Safe to call repeatedly and
    /// before the first refresh.
    pub fn teardown(&mut self, vars: &mut dyn VariableTable) {
        let handles = [
            self.tcp_mem_low.take(),
            self.tcp_mem_pressure.take(),
            self.tcp_mem_high.take(),
            self.tcp_max_orphans.take(),
        ];
        for handle in handles.into_iter().flatten() {
            vars.release(handle);
        }
    }

    /// Reads the three page-counted watermarks and publishes them in KiB.
    /// Any read or parse failure abandons the attempt; previously
    /// published values stand.
    fn refresh_tcp_mem<F: FileSystem>(&mut self, fs: &F, vars: &mut dyn VariableTable) {
        let content = match fs.read_to_string(&self.tcp_mem_path) {
            Ok(content) => content,
            Err(e) => {
                debug!("tcp_mem thresholds unavailable: {}", e);
                return;
            }
        };

        let mut fields = content.split_whitespace().map(str::parse::<u64>);
        let (Some(Ok(low)), Some(Ok(pressure)), Some(Ok(high))) =
            (fields.next(), fields.next(), fields.next())
        else {
            debug!("tcp_mem thresholds malformed: {:?}", content.trim());
            return;
        };

        let kib = self.page_size as f64 / 1024.0;
        publish(&mut self.tcp_mem_low, "tcp_mem_low", low as f64 * kib, vars);
        publish(
            &mut self.tcp_mem_pressure,
            "tcp_mem_pressure",
            pressure as f64 * kib,
            vars,
        );
        publish(&mut self.tcp_mem_high, "tcp_mem_high", high as f64 * kib, vars);
    }

    /// Reads and publishes the orphan socket limit. Yields 0 on failure
    /// without touching the previously published value.
    fn refresh_max_orphans<F: FileSystem>(
        &mut self,
        fs: &F,
        vars: &mut dyn VariableTable,
    ) -> u64 {
        let content = match fs.read_to_string(&self.max_orphans_path) {
            Ok(content) => content,
            Err(e) => {
                debug!("tcp_max_orphans unavailable: {}", e);
                return 0;
            }
        };
        let Ok(value) = content.trim().parse::<u64>() else {
            debug!("tcp_max_orphans malformed: {:?}", content.trim());
            return 0;
        };

        publish(&mut self.tcp_max_orphans, "tcp_max_orphans", value as f64, vars);
        value
    }
}

/// Acquires the named constant on first use, then updates it in place.
fn publish(
    handle: &mut Option<VarHandle>,
    name: &str,
    value: f64,
    vars: &mut dyn VariableTable,
) {
    let handle = handle.get_or_insert_with(|| vars.acquire(name));
    vars.set(handle, value);
}
