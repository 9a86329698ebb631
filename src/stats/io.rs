//! Block I/O byte counters aggregated across all devices.
//!
//! The runtime reports one entry per device and operation (`read`, `write`,
//! `sync`, `async`, `discard`, `total`, in varying capitalization). Only read
//! and write entries are summed; everything else is ignored.

/// Aggregated block I/O counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoStat {
    /// Total number of bytes read across all devices.
    pub read_bytes: u64,
    /// Total number of bytes written across all devices.
    pub write_bytes: u64,
}

impl IoStat {
    /// Adds a single `(operation, bytes)` entry.
    pub fn add_entry(&mut self, op: &str, value: u64) {
        if op.eq_ignore_ascii_case("read") {
            self.read_bytes = self.read_bytes.saturating_add(value);
        } else if op.eq_ignore_ascii_case("write") {
            self.write_bytes = self.write_bytes.saturating_add(value);
        }
    }
}

impl<'a> FromIterator<(&'a str, u64)> for IoStat {
    fn from_iter<T: IntoIterator<Item = (&'a str, u64)>>(iter: T) -> Self {
        let mut stat = IoStat::default();
        for (op, value) in iter {
            stat.add_entry(op, value);
        }
        stat
    }
}
