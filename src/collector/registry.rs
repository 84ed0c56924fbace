//! Expected-field lookup table for irregular key/value text blocks.
//!
//! Kernel statistics files do not guarantee field order, and fields come
//! and go across kernel versions. The registry declares the expected field
//! names up front, each bound to a value slot, and fills the slots by name
//! during a scan. Unknown names are ignored; declared names that never
//! appear keep whatever value they last held.

use xxhash_rust::xxh3::xxh3_64;

/// Converts raw value text into a slot value.
pub type Convert = fn(&str) -> u64;

/// Parses leading ASCII digits as an unsigned integer.
///
/// Accumulation saturates at `u64::MAX`; anything that is not a leading
/// digit run (including an empty string) yields 0. Trailing garbage after
/// the digits is ignored.
pub fn parse_u64_saturating(raw: &str) -> u64 {
    let mut value: u64 = 0;
    for b in raw.trim_start().bytes() {
        match b {
            b'0'..=b'9' => {
                value = value
                    .saturating_mul(10)
                    .saturating_add(u64::from(b - b'0'));
            }
            _ => break,
        }
    }
    value
}

/// Handle to a value slot registered with [`FieldRegistry::expect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSlot(usize);

struct Entry {
    name: Box<str>,
    hash: u64,
    value: u64,
}

/// Table of expected field names bound to value slots.
pub struct FieldRegistry {
    entries: Vec<Entry>,
    /// Index of the entry expected to match next. Fields usually arrive
    /// in declaration order, so this turns the common case into a single
    /// hash comparison.
    cursor: usize,
    convert: Convert,
}

impl FieldRegistry {
    /// Creates an empty registry sized for `capacity` expected fields,
    /// converting values with [`parse_u64_saturating`].
    pub fn new(capacity: usize) -> Self {
        Self::with_convert(capacity, parse_u64_saturating)
    }

    /// Creates an empty registry with a custom value conversion.
    pub fn with_convert(capacity: usize, convert: Convert) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            cursor: 0,
            convert,
        }
    }

    /// Registers an expected field name and returns the handle used to
    /// read its value after a scan. The expectation list is append-only.
    pub fn expect(&mut self, name: &str) -> FieldSlot {
        self.entries.push(Entry {
            name: name.into(),
            hash: xxh3_64(name.as_bytes()),
            value: 0,
        });
        FieldSlot(self.entries.len() - 1)
    }

    /// Starts a new scan pass.
    ///
    /// Only the fast-path cursor is reset. Slot values are intentionally
    /// preserved: a declared field absent from the current read keeps its
    /// previous value instead of flickering to zero.
    pub fn begin_scan(&mut self) {
        self.cursor = 0;
    }

    /// Offers one (name, value) token pair to the registry.
    ///
    /// On a name match the value text is converted and stored in the bound
    /// slot and the call returns true. Unknown names return false and
    /// change nothing.
    pub fn check(&mut self, name: &str, raw_value: &str) -> bool {
        let hash = xxh3_64(name.as_bytes());

        let index = if self.matches(self.cursor, hash, name) {
            self.cursor
        } else {
            match (0..self.entries.len()).find(|&i| self.matches(i, hash, name)) {
                Some(i) => i,
                None => return false,
            }
        };

        self.entries[index].value = (self.convert)(raw_value);
        self.cursor = index + 1;
        true
    }

    /// Current value of a slot.
    pub fn get(&self, slot: FieldSlot) -> u64 {
        self.entries[slot.0].value
    }

    fn matches(&self, index: usize, hash: u64, name: &str) -> bool {
        self.entries
            .get(index)
            .is_some_and(|e| e.hash == hash && &*e.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tcp_registry() -> (FieldRegistry, [FieldSlot; 5]) {
        let mut reg = FieldRegistry::new(8);
        let slots = [
            reg.expect("inuse"),
            reg.expect("orphan"),
            reg.expect("tw"),
            reg.expect("alloc"),
            reg.expect("mem"),
        ];
        (reg, slots)
    }

    #[test]
    fn fills_slots_in_declared_order() {
        let (mut reg, [inuse, orphan, tw, alloc, mem]) = tcp_registry();

        reg.begin_scan();
        assert!(reg.check("inuse", "12"));
        assert!(reg.check("orphan", "0"));
        assert!(reg.check("tw", "3"));
        assert!(reg.check("alloc", "20"));
        assert!(reg.check("mem", "5"));

        assert_eq!(reg.get(inuse), 12);
        assert_eq!(reg.get(orphan), 0);
        assert_eq!(reg.get(tw), 3);
        assert_eq!(reg.get(alloc), 20);
        assert_eq!(reg.get(mem), 5);
    }

    #[test]
    fn field_order_does_not_matter() {
        let (mut reg, [inuse, _, tw, _, mem]) = tcp_registry();

        reg.begin_scan();
        assert!(reg.check("mem", "5"));
        assert!(reg.check("inuse", "12"));
        assert!(reg.check("tw", "3"));

        assert_eq!(reg.get(mem), 5);
        assert_eq!(reg.get(inuse), 12);
        assert_eq!(reg.get(tw), 3);
    }

    #[test]
    fn unknown_names_are_rejected_without_side_effects() {
        let (mut reg, [inuse, ..]) = tcp_registry();

        reg.begin_scan();
        assert!(reg.check("inuse", "7"));
        assert!(!reg.check("handshakes", "999"));
        assert_eq!(reg.get(inuse), 7);
    }

    #[test]
    fn values_persist_across_scans_for_absent_fields() {
        let (mut reg, [inuse, orphan, ..]) = tcp_registry();

        reg.begin_scan();
        assert!(reg.check("inuse", "7"));
        assert!(reg.check("orphan", "2"));

        // Next scan only reports inuse; orphan keeps its previous value.
        reg.begin_scan();
        assert!(reg.check("inuse", "9"));
        assert_eq!(reg.get(inuse), 9);
        assert_eq!(reg.get(orphan), 2);
    }

    #[test]
    fn conversion_is_pluggable() {
        fn kib(raw: &str) -> u64 {
            parse_u64_saturating(raw) / 1024
        }

        let mut reg = FieldRegistry::with_convert(1, kib);
        let bytes = reg.expect("bytes");

        reg.begin_scan();
        assert!(reg.check("bytes", "8192"));
        assert_eq!(reg.get(bytes), 8);
    }

    #[test]
    fn parse_saturates_and_tolerates_garbage() {
        assert_eq!(parse_u64_saturating("42"), 42);
        assert_eq!(parse_u64_saturating("  42"), 42);
        assert_eq!(parse_u64_saturating("42kB"), 42);
        assert_eq!(parse_u64_saturating(""), 0);
        assert_eq!(parse_u64_saturating("x42"), 0);
        assert_eq!(parse_u64_saturating("-1"), 0);
        assert_eq!(parse_u64_saturating("18446744073709551615"), u64::MAX);
        assert_eq!(parse_u64_saturating("99999999999999999999999"), u64::MAX);
    }
}
