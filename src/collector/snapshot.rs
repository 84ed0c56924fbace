//! Counter snapshot produced by one extraction cycle.

use serde::{Deserialize, Serialize};

/// All socket counters extracted from one read of the source file.
///
/// Every field is an absolute gauge in the unit the kernel reports:
/// socket counts for the `*_inuse`/`*_alloc`/`*_orphan`/`*_tw` fields,
/// memory pages for `tcp_mem` and `udp_mem`, bytes for `frag_memory`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SockstatSnapshot {
    pub sockets_used: u64,

    pub tcp_inuse: u64,
    pub tcp_orphan: u64,
    pub tcp_tw: u64,
    pub tcp_alloc: u64,
    pub tcp_mem: u64,

    pub udp_inuse: u64,
    pub udp_mem: u64,

    pub udplite_inuse: u64,

    pub raw_inuse: u64,

    pub frag_inuse: u64,
    pub frag_memory: u64,
}
