//! Pre-built mock filesystem scenarios.

use super::filesystem::MockFs;

impl MockFs {
    /// A quiet desktop-class system: every file present, modest counters.
    pub fn typical_system() -> Self {
        let mut fs = MockFs::new();

        fs.add_file(
            "/proc/net/sockstat",
            "\
sockets: used 284\n\
TCP: inuse 12 orphan 0 tw 3 alloc 20 mem 5\n\
UDP: inuse 6 mem 4\n\
UDPLITE: inuse 0\n\
RAW: inuse 1\n\
FRAG: inuse 0 memory 0\n",
        );
        fs.add_file("/proc/sys/net/ipv4/tcp_mem", "190608\t254146\t381216\n");
        fs.add_file("/proc/sys/net/ipv4/tcp_max_orphans", "65536\n");

        fs
    }

    /// A loaded server: many sockets, time-wait churn, fragment reassembly.
    pub fn busy_server() -> Self {
        let mut fs = MockFs::new();

        fs.add_file(
            "/proc/net/sockstat",
            "\
sockets: used 48211\n\
TCP: inuse 18230 orphan 112 tw 28711 alloc 19456 mem 81920\n\
UDP: inuse 340 mem 256\n\
UDPLITE: inuse 0\n\
RAW: inuse 2\n\
FRAG: inuse 14 memory 43008\n",
        );
        fs.add_file("/proc/sys/net/ipv4/tcp_mem", "381216 508288 762432\n");
        fs.add_file("/proc/sys/net/ipv4/tcp_max_orphans", "262144\n");

        fs
    }

    /// A kernel that exposes the sockstat file but neither sysctl file.
    pub fn missing_thresholds() -> Self {
        let mut fs = Self::typical_system();
        fs.remove_file("/proc/sys/net/ipv4/tcp_mem");
        fs.remove_file("/proc/sys/net/ipv4/tcp_max_orphans");
        fs
    }
}
