//! Utility modules for sockmon.

/// Size of a memory page in bytes.
///
/// Kernel socket memory counters are reported in pages; charts and
/// threshold constants convert them to KiB using this value.
/// Falls back to 4096 if sysconf refuses to answer.
pub fn page_size() -> u64 {
    // SAFETY: sysconf with a valid name has no preconditions.
    match unsafe { libc::sysconf(libc::_SC_PAGESIZE) } {
        -1 => 4096,
        x => x as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_a_power_of_two() {
        let ps = page_size();
        assert!(ps >= 4096);
        assert_eq!(ps & (ps - 1), 0);
    }
}
