//! Section-dispatched scanner for the kernel socket statistics file.
//!
//! The source file is a block of lines, each starting with a section label
//! (`sockets`, `TCP`, `UDP`, `UDPLITE`, `RAW`, `FRAG`) followed by
//! name/value token pairs. Each section owns a [`FieldRegistry`] declaring
//! the counters expected in it; a scan pass dispatches every line to its
//! section and fills the bound slots by name.

use xxhash_rust::xxh3::xxh3_64;

use super::registry::{FieldRegistry, FieldSlot};
use super::snapshot::SockstatSnapshot;

const SOCKETS: usize = 0;
const TCP: usize = 1;
const UDP: usize = 2;
const UDPLITE: usize = 3;
const RAW: usize = 4;
const FRAG: usize = 5;

struct Section {
    label: &'static str,
    hash: u64,
    registry: usize,
}

impl Section {
    fn new(label: &'static str, registry: usize) -> Self {
        Self {
            label,
            hash: xxh3_64(label.as_bytes()),
            registry,
        }
    }
}

struct Slots {
    sockets_used: FieldSlot,
    tcp_inuse: FieldSlot,
    tcp_orphan: FieldSlot,
    tcp_tw: FieldSlot,
    tcp_alloc: FieldSlot,
    tcp_mem: FieldSlot,
    udp_inuse: FieldSlot,
    udp_mem: FieldSlot,
    udplite_inuse: FieldSlot,
    raw_inuse: FieldSlot,
    frag_inuse: FieldSlot,
    frag_memory: FieldSlot,
}

/// Scanner for the socket statistics file.
///
/// Registries and section descriptors are built once; slot values live for
/// the lifetime of the scanner and carry over between scans (see
/// [`FieldRegistry::begin_scan`]).
pub struct SockstatCollector {
    registries: Vec<FieldRegistry>,
    sections: Vec<Section>,
    slots: Slots,
}

impl Default for SockstatCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl SockstatCollector {
    pub fn new() -> Self {
        let mut sockets = FieldRegistry::new(1);
        let mut tcp = FieldRegistry::new(5);
        let mut udp = FieldRegistry::new(2);
        let mut udplite = FieldRegistry::new(1);
        let mut raw = FieldRegistry::new(1);
        let mut frag = FieldRegistry::new(2);

        let slots = Slots {
            sockets_used: sockets.expect("used"),
            tcp_inuse: tcp.expect("inuse"),
            tcp_orphan: tcp.expect("orphan"),
            tcp_tw: tcp.expect("tw"),
            tcp_alloc: tcp.expect("alloc"),
            tcp_mem: tcp.expect("mem"),
            udp_inuse: udp.expect("inuse"),
            udp_mem: udp.expect("mem"),
            udplite_inuse: udplite.expect("inuse"),
            raw_inuse: raw.expect("inuse"),
            frag_inuse: frag.expect("inuse"),
            frag_memory: frag.expect("memory"),
        };

        Self {
            registries: vec![sockets, tcp, udp, udplite, raw, frag],
            sections: vec![
                Section::new("sockets", SOCKETS),
                Section::new("TCP", TCP),
                Section::new("UDP", UDP),
                Section::new("UDPLITE", UDPLITE),
                Section::new("RAW", RAW),
                Section::new("FRAG", FRAG),
            ],
            slots,
        }
    }

    /// Runs one scan pass over the full file contents.
    ///
    /// Lines with an unrecognized section label are skipped. Within a
    /// recognized section, token pairs are consumed until the first pair
    /// whose name the section does not expect; the rest of that line is
    /// not attempted.
    pub fn scan(&mut self, content: &str) {
        for line in content.lines() {
            let tokens: Vec<&str> = line
                .split([' ', '\t', ':'])
                .filter(|t| !t.is_empty())
                .collect();

            let Some(&label) = tokens.first() else {
                continue;
            };
            let hash = xxh3_64(label.as_bytes());
            let Some(section) = self
                .sections
                .iter()
                .find(|s| s.hash == hash && s.label == label)
            else {
                continue;
            };

            let registry = &mut self.registries[section.registry];
            registry.begin_scan();

            let mut w = 1;
            while w + 1 < tokens.len() {
                if !registry.check(tokens[w], tokens[w + 1]) {
                    break;
                }
                w += 2;
            }
        }
    }

    /// Copies the current slot values into a snapshot.
    pub fn snapshot(&self) -> SockstatSnapshot {
        let s = &self.slots;
        SockstatSnapshot {
            sockets_used: self.registries[SOCKETS].get(s.sockets_used),
            tcp_inuse: self.registries[TCP].get(s.tcp_inuse),
            tcp_orphan: self.registries[TCP].get(s.tcp_orphan),
            tcp_tw: self.registries[TCP].get(s.tcp_tw),
            tcp_alloc: self.registries[TCP].get(s.tcp_alloc),
            tcp_mem: self.registries[TCP].get(s.tcp_mem),
            udp_inuse: self.registries[UDP].get(s.udp_inuse),
            udp_mem: self.registries[UDP].get(s.udp_mem),
            udplite_inuse: self.registries[UDPLITE].get(s.udplite_inuse),
            raw_inuse: self.registries[RAW].get(s.raw_inuse),
            frag_inuse: self.registries[FRAG].get(s.frag_inuse),
            frag_memory: self.registries[FRAG].get(s.frag_memory),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_all_sections() {
        let mut collector = SockstatCollector::new();
        collector.scan(
            "sockets: used 284\n\
             TCP: inuse 12 orphan 1 tw 3 alloc 20 mem 5\n\
             UDP: inuse 6 mem 4\n\
             UDPLITE: inuse 2\n\
             RAW: inuse 1\n\
             FRAG: inuse 7 memory 43008\n",
        );

        let snap = collector.snapshot();
        assert_eq!(snap.sockets_used, 284);
        assert_eq!(snap.tcp_inuse, 12);
        assert_eq!(snap.tcp_orphan, 1);
        assert_eq!(snap.tcp_tw, 3);
        assert_eq!(snap.tcp_alloc, 20);
        assert_eq!(snap.tcp_mem, 5);
        assert_eq!(snap.udp_inuse, 6);
        assert_eq!(snap.udp_mem, 4);
        assert_eq!(snap.udplite_inuse, 2);
        assert_eq!(snap.raw_inuse, 1);
        assert_eq!(snap.frag_inuse, 7);
        assert_eq!(snap.frag_memory, 43008);
    }

    #[test]
    fn field_order_within_a_section_does_not_matter() {
        let mut collector = SockstatCollector::new();
        collector.scan("TCP: mem 5 alloc 20 tw 3 orphan 1 inuse 12\n");

        let snap = collector.snapshot();
        assert_eq!(snap.tcp_inuse, 12);
        assert_eq!(snap.tcp_mem, 5);
        assert_eq!(snap.tcp_alloc, 20);
    }

    #[test]
    fn unknown_sections_change_nothing() {
        let mut collector = SockstatCollector::new();
        collector.scan("TCP: inuse 12\n");
        collector.scan("TCP6: inuse 99\nMPTCP: inuse 50\n");

        let snap = collector.snapshot();
        assert_eq!(snap.tcp_inuse, 12);
    }

    #[test]
    fn first_unexpected_pair_stops_the_line() {
        let mut collector = SockstatCollector::new();
        // "handshakes" is not expected; "alloc 20" after it must not be read.
        collector.scan("TCP: inuse 12 handshakes 99 alloc 20\n");

        let snap = collector.snapshot();
        assert_eq!(snap.tcp_inuse, 12);
        assert_eq!(snap.tcp_alloc, 0);
    }

    #[test]
    fn trailing_name_without_a_value_is_ignored() {
        let mut collector = SockstatCollector::new();
        collector.scan("UDP: inuse 6 mem\n");

        let snap = collector.snapshot();
        assert_eq!(snap.udp_inuse, 6);
        assert_eq!(snap.udp_mem, 0);
    }

    #[test]
    fn rescanning_unchanged_content_is_idempotent() {
        let content = "sockets: used 42\nTCP: inuse 5 orphan 0 tw 0 alloc 10 mem 1024\n";
        let mut collector = SockstatCollector::new();

        collector.scan(content);
        let first = collector.snapshot();
        collector.scan(content);
        let second = collector.snapshot();

        assert_eq!(first, second);
        assert_eq!(first.sockets_used, 42);
        assert_eq!(first.tcp_alloc, 10);
        assert_eq!(first.tcp_mem, 1024);
        // Sections that never appeared stay at zero.
        assert_eq!(first.udp_inuse, 0);
        assert_eq!(first.frag_memory, 0);
    }

    #[test]
    fn absent_fields_keep_previous_values() {
        let mut collector = SockstatCollector::new();
        collector.scan("TCP: inuse 12 orphan 4 tw 3 alloc 20 mem 5\n");
        collector.scan("TCP: inuse 13\n");

        let snap = collector.snapshot();
        assert_eq!(snap.tcp_inuse, 13);
        assert_eq!(snap.tcp_orphan, 4);
        assert_eq!(snap.tcp_mem, 5);
    }

    #[test]
    fn tabs_and_colons_are_token_separators() {
        let mut collector = SockstatCollector::new();
        collector.scan("TCP:\tinuse\t12\torphan\t1\n");

        let snap = collector.snapshot();
        assert_eq!(snap.tcp_inuse, 12);
        assert_eq!(snap.tcp_orphan, 1);
    }

    #[test]
    fn empty_content_is_a_quiet_cycle() {
        let mut collector = SockstatCollector::new();
        collector.scan("TCP: inuse 8\n");
        collector.scan("");

        assert_eq!(collector.snapshot().tcp_inuse, 8);
    }
}
