//! Configuration surface for the sockstat module.
//!
//! Every metric group carries a tri-state enable flag. `Auto` groups start
//! publishing as soon as data for them is observed and then stay enabled
//! for the lifetime of the process; `Disabled` groups never publish.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Tri-state enable flag for a metric group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnableFlag {
    #[default]
    Auto,
    Enabled,
    Disabled,
}

impl EnableFlag {
    /// Whether the group may publish this cycle.
    pub fn is_active(self) -> bool {
        !matches!(self, EnableFlag::Disabled)
    }

    /// One-way latch: once data for a group has been observed, `Auto`
    /// becomes `Enabled` and never reverts.
    pub fn observe(self) -> Self {
        match self {
            EnableFlag::Auto => EnableFlag::Enabled,
            other => other,
        }
    }
}

/// Per-group enable flags for the nine published chart groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupToggles {
    pub sockets: EnableFlag,
    pub tcp_sockets: EnableFlag,
    pub tcp_mem: EnableFlag,
    pub udp_sockets: EnableFlag,
    pub udp_mem: EnableFlag,
    pub udplite_sockets: EnableFlag,
    pub raw_sockets: EnableFlag,
    pub frag_sockets: EnableFlag,
    pub frag_mem: EnableFlag,
}

impl GroupToggles {
    /// Sets one group's flag by its external name (as used on the CLI).
    ///
    /// Known names: `sockets`, `tcp-sockets`, `tcp-mem`, `udp-sockets`,
    /// `udp-mem`, `udplite-sockets`, `raw-sockets`, `frag-sockets`,
    /// `frag-mem`.
    pub fn set(&mut self, group: &str, flag: EnableFlag) -> Result<(), UnknownGroup> {
        let slot = match group {
            "sockets" => &mut self.sockets,
            "tcp-sockets" => &mut self.tcp_sockets,
            "tcp-mem" => &mut self.tcp_mem,
            "udp-sockets" => &mut self.udp_sockets,
            "udp-mem" => &mut self.udp_mem,
            "udplite-sockets" => &mut self.udplite_sockets,
            "raw-sockets" => &mut self.raw_sockets,
            "frag-sockets" => &mut self.frag_sockets,
            "frag-mem" => &mut self.frag_mem,
            _ => {
                return Err(UnknownGroup {
                    group: group.to_string(),
                });
            }
        };
        *slot = flag;
        Ok(())
    }
}

/// Error returned for a group name that matches no chart group.
#[derive(Debug, Clone)]
pub struct UnknownGroup {
    pub group: String,
}

impl std::fmt::Display for UnknownGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown metric group '{}' (expected one of: sockets, tcp-sockets, tcp-mem, \
             udp-sockets, udp-mem, udplite-sockets, raw-sockets, frag-sockets, frag-mem)",
            self.group
        )
    }
}

impl std::error::Error for UnknownGroup {}

/// Module-wide configuration, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SockstatConfig {
    /// Per-group enable flags.
    pub groups: GroupToggles,

    /// Override for the primary source file. When unset, the path is
    /// `<host_prefix>/proc/net/sockstat`.
    pub source_path: Option<PathBuf>,

    /// Prefix prepended to every consumed path, for container-root
    /// redirection. Empty on a regular host.
    pub host_prefix: String,

    /// How often the threshold constants are re-read, in seconds.
    pub refresh_constants_every: u64,
}

impl Default for SockstatConfig {
    fn default() -> Self {
        Self {
            groups: GroupToggles::default(),
            source_path: None,
            host_prefix: String::new(),
            refresh_constants_every: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_latches_auto_to_enabled() {
        assert_eq!(EnableFlag::Auto.observe(), EnableFlag::Enabled);
        assert_eq!(EnableFlag::Enabled.observe(), EnableFlag::Enabled);
        assert_eq!(EnableFlag::Disabled.observe(), EnableFlag::Disabled);
    }

    #[test]
    fn disabled_is_never_active() {
        assert!(EnableFlag::Auto.is_active());
        assert!(EnableFlag::Enabled.is_active());
        assert!(!EnableFlag::Disabled.is_active());
    }

    #[test]
    fn toggles_set_by_name() {
        let mut toggles = GroupToggles::default();
        toggles.set("tcp-mem", EnableFlag::Disabled).unwrap();
        toggles.set("frag-sockets", EnableFlag::Enabled).unwrap();

        assert_eq!(toggles.tcp_mem, EnableFlag::Disabled);
        assert_eq!(toggles.frag_sockets, EnableFlag::Enabled);
        assert_eq!(toggles.sockets, EnableFlag::Auto);

        let err = toggles.set("tcp", EnableFlag::Disabled).unwrap_err();
        assert!(err.to_string().contains("unknown metric group 'tcp'"));
    }

    #[test]
    fn default_config_refreshes_every_minute() {
        let config = SockstatConfig::default();
        assert_eq!(config.refresh_constants_every, 60);
        assert!(config.source_path.is_none());
        assert!(config.host_prefix.is_empty());
    }
}
