use super::Metric;

/// One emitted data point.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub metric: Metric,
    /// Label values, in the order of [`Metric::labels`].
    pub labels: Vec<String>,
    pub value: f64,
}

/// The ordered samples produced by one scrape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSet {
    samples: Vec<MetricSample>,
}

impl MetricSet {
    /// Appends a sample.
    ///
    /// The number of label values must match the metric's label schema.
    pub fn push(&mut self, metric: Metric, labels: Vec<String>, value: f64) {
        debug_assert_eq!(
            labels.len(),
            metric.labels().len(),
            "label arity mismatch for {metric:?}"
        );
        self.samples.push(MetricSample {
            metric,
            labels,
            value,
        });
    }

    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples of a single metric, in emission order.
    pub fn of(&self, metric: Metric) -> impl Iterator<Item = &MetricSample> {
        self.samples.iter().filter(move |s| s.metric == metric)
    }

    /// Value of the first sample of `metric` whose labels equal `labels`.
    pub fn value(&self, metric: Metric, labels: &[&str]) -> Option<f64> {
        self.of(metric)
            .find(|s| s.labels.iter().map(String::as_str).eq(labels.iter().copied()))
            .map(|s| s.value)
    }
}

impl IntoIterator for MetricSet {
    type Item = MetricSample;
    type IntoIter = std::vec::IntoIter<MetricSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.into_iter()
    }
}
