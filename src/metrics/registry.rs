use super::{Metric, ValueKind};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid metric name prefix {0:?}: must match [a-zA-Z_:][a-zA-Z0-9_:]*")]
    InvalidPrefix(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Name, help text, label schema and kind of one exported metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub metric: Metric,
    pub name: String,
    pub help: &'static str,
    pub labels: &'static [&'static str],
    pub kind: ValueKind,
}

/// The authoritative, immutable set of descriptors.
#[derive(Debug, Clone)]
pub struct Registry {
    prefix: String,
    descriptors: Vec<MetricDescriptor>,
}

impl Registry {
    /// Builds the descriptors for every [`Metric`] using the given name prefix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPrefix`] if the prefix is not a valid metric name.
    pub fn new(prefix: &str) -> Result<Self> {
        if !is_valid_metric_name(prefix) {
            return Err(Error::InvalidPrefix(prefix.to_owned()));
        }

        let descriptors = Metric::ALL
            .iter()
            .map(|&metric| MetricDescriptor {
                metric,
                name: format!("{prefix}_{}", metric.suffix()),
                help: metric.help(),
                labels: metric.labels(),
                kind: metric.kind(),
            })
            .collect();

        Ok(Self {
            prefix: prefix.to_owned(),
            descriptors,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn descriptor(&self, metric: Metric) -> &MetricDescriptor {
        &self.descriptors[metric.index()]
    }

    /// All descriptors in exposition order.
    pub fn descriptors(&self) -> impl Iterator<Item = &MetricDescriptor> {
        self.descriptors.iter()
    }
}

fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}
