//! Extraction of socket statistics from kernel pseudo-files.
//!
//! [`Collector`] is the owned context for the whole module: filesystem
//! seam, resolved source path, per-section field registries and the
//! threshold refresher. It is constructed once at startup and driven by
//! the scheduler once per collection cycle.

pub mod mock;
mod registry;
mod snapshot;
mod sockstat;
mod thresholds;
mod traits;

pub use registry::{Convert, FieldRegistry, FieldSlot, parse_u64_saturating};
pub use snapshot::SockstatSnapshot;
pub use sockstat::SockstatCollector;
pub use thresholds::ThresholdRefresher;
pub use traits::{FileSystem, RealFs};

use std::io;
use std::path::{Path, PathBuf};

use crate::config::SockstatConfig;
use crate::sink::VariableTable;
use crate::util::page_size;

const SOCKSTAT_FILE: &str = "/proc/net/sockstat";

/// Error produced by a collection cycle.
#[derive(Debug)]
pub enum CollectError {
    /// The source file could not be read. Not fatal: the caller skips
    /// this cycle and retries on the next one.
    Unavailable { path: PathBuf, source: io::Error },
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::Unavailable { path, source } => {
                write!(
                    f,
                    "socket statistics unavailable at {}: {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::Unavailable { source, .. } => Some(source),
        }
    }
}

/// Owned context driving one extraction cycle per scheduler tick.
pub struct Collector<F: FileSystem> {
    fs: F,
    source_path: PathBuf,
    update_every: u64,
    sockstat: SockstatCollector,
    thresholds: ThresholdRefresher,
    max_orphans: u64,
}

impl<F: FileSystem> Collector<F> {
    /// Builds the collector from resolved configuration.
    ///
    /// `update_every` is the scheduler's cycle length in seconds; the
    /// collector accounts it but never owns the cadence.
    pub fn new(fs: F, config: &SockstatConfig, update_every: u64) -> Self {
        let source_path = config
            .source_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}{}", config.host_prefix, SOCKSTAT_FILE)));

        Self {
            fs,
            source_path,
            update_every,
            sockstat: SockstatCollector::new(),
            thresholds: ThresholdRefresher::new(
                &config.host_prefix,
                config.refresh_constants_every,
                page_size(),
            ),
            max_orphans: 0,
        }
    }

    /// The resolved path of the primary source file.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Whether the primary source file currently exists.
    pub fn source_exists(&self) -> bool {
        self.fs.exists(&self.source_path)
    }

    /// Orphan limit from the most recent threshold refresh, 0 if unknown.
    pub fn tcp_max_orphans(&self) -> u64 {
        self.max_orphans
    }

    /// Runs one full collection cycle: ticks the threshold refresher,
    /// re-reads the source file and scans every line.
    ///
    /// An unreadable source file yields [`CollectError::Unavailable`]; a
    /// readable but empty file is an empty, non-erroring cycle.
    pub fn collect(
        &mut self,
        vars: &mut dyn VariableTable,
    ) -> Result<SockstatSnapshot, CollectError> {
        self.max_orphans = self.thresholds.tick(self.update_every, &self.fs, vars);

        let content = self.fs.read_to_string(&self.source_path).map_err(|source| {
            CollectError::Unavailable {
                path: self.source_path.clone(),
                source,
            }
        })?;
        self.sockstat.scan(&content);

        Ok(self.sockstat.snapshot())
    }

    /// Releases the published threshold constants. Safe to call more than
    /// once and before the first successful cycle.
    pub fn teardown(&mut self, vars: &mut dyn VariableTable) {
        self.thresholds.teardown(vars);
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockFs;
    use super::*;
    use crate::sink::MemoryVariables;

    fn config() -> SockstatConfig {
        SockstatConfig {
            refresh_constants_every: 1,
            ..SockstatConfig::default()
        }
    }

    #[test]
    fn collects_a_full_snapshot() {
        let mut collector = Collector::new(MockFs::typical_system(), &config(), 1);
        let mut vars = MemoryVariables::new();

        let snap = collector.collect(&mut vars).unwrap();
        assert_eq!(snap.sockets_used, 284);
        assert_eq!(snap.tcp_inuse, 12);
        assert_eq!(snap.tcp_tw, 3);
        assert_eq!(snap.udp_mem, 4);

        assert_eq!(collector.tcp_max_orphans(), 65536);
        assert_eq!(vars.value("tcp_max_orphans"), Some(65536.0));
        let kib = page_size() as f64 / 1024.0;
        assert_eq!(vars.value("tcp_mem_low"), Some(190608.0 * kib));
    }

    #[test]
    fn missing_source_is_unavailable_not_fatal() {
        let mut fs = MockFs::typical_system();
        fs.remove_file("/proc/net/sockstat");
        let mut collector = Collector::new(fs, &config(), 1);
        let mut vars = MemoryVariables::new();

        let err = collector.collect(&mut vars).unwrap_err();
        assert!(err.to_string().contains("/proc/net/sockstat"));

        // Threshold constants were still refreshed this cycle.
        assert!(vars.is_active("tcp_mem_low"));
    }

    #[test]
    fn empty_source_is_a_quiet_cycle() {
        let mut fs = MockFs::typical_system();
        let mut collector = Collector::new(fs.clone(), &config(), 1);
        let mut vars = MemoryVariables::new();
        collector.collect(&mut vars).unwrap();

        fs.add_file("/proc/net/sockstat", "");
        let mut collector2 = Collector::new(fs, &config(), 1);
        let snap = collector2.collect(&mut vars).unwrap();
        assert_eq!(snap, SockstatSnapshot::default());
    }

    #[test]
    fn source_path_override_wins() {
        let mut fs = MockFs::new();
        fs.add_file("/run/sockstat-copy", "sockets: used 9\n");

        let mut config = config();
        config.source_path = Some("/run/sockstat-copy".into());

        let mut collector = Collector::new(fs, &config, 1);
        assert_eq!(collector.source_path(), Path::new("/run/sockstat-copy"));
        assert!(collector.source_exists());

        let mut vars = MemoryVariables::new();
        let snap = collector.collect(&mut vars).unwrap();
        assert_eq!(snap.sockets_used, 9);
    }

    #[test]
    fn host_prefix_redirects_every_path() {
        let mut fs = MockFs::new();
        fs.add_file("/host/proc/net/sockstat", "sockets: used 3\n");
        fs.add_file("/host/proc/sys/net/ipv4/tcp_mem", "1 2 3\n");
        fs.add_file("/host/proc/sys/net/ipv4/tcp_max_orphans", "77\n");

        let mut config = config();
        config.host_prefix = "/host".to_string();

        let mut collector = Collector::new(fs, &config, 1);
        let mut vars = MemoryVariables::new();
        let snap = collector.collect(&mut vars).unwrap();

        assert_eq!(snap.sockets_used, 3);
        assert_eq!(collector.tcp_max_orphans(), 77);
    }

    #[test]
    fn teardown_twice_is_safe() {
        let mut collector = Collector::new(MockFs::typical_system(), &config(), 1);
        let mut vars = MemoryVariables::new();
        collector.collect(&mut vars).unwrap();

        collector.teardown(&mut vars);
        collector.teardown(&mut vars);
        assert_eq!(vars.release_count(), 4);
    }
}
