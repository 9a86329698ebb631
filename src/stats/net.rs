use std::collections::BTreeMap;

/// Byte counters of a single network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkStat {
    /// Bytes received.
    pub rx_bytes: u64,
    /// Bytes transmitted.
    pub tx_bytes: u64,
}

/// Per-interface counters keyed by interface name. Ordered so that repeated
/// scrapes emit interfaces in the same order.
pub type Networks = BTreeMap<String, NetworkStat>;
