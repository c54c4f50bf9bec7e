use std::collections::HashMap;

use edgeplug_types::Metric;

use crate::error::{BirthSetError, PublishError};

/// The birth metric set of a node or device, with the last-known value per
/// metric.
///
/// The set is fixed for the lifetime of the session: updates may only touch
/// metrics that appeared in the birth, with the datatype declared there.
pub(crate) struct MetricStore {
    order: Vec<String>,
    metrics: HashMap<String, Metric>,
}

impl MetricStore {
    pub fn new(birth_metrics: Vec<Metric>) -> Result<Self, BirthSetError> {
        let mut order = Vec::with_capacity(birth_metrics.len());
        let mut metrics = HashMap::with_capacity(birth_metrics.len());
        for metric in birth_metrics {
            metric.validate()?;
            let name = metric.name.clone().ok_or(BirthSetError::UnnamedMetric)?;
            if metrics.insert(name.clone(), metric).is_some() {
                return Err(BirthSetError::DuplicateMetric(name));
            }
            order.push(name);
        }
        Ok(Self { order, metrics })
    }

    /// The full metric set with last-known values, in birth order.
    pub fn birth_metrics(&self) -> Vec<Metric> {
        self.order
            .iter()
            .filter_map(|name| self.metrics.get(name).cloned())
            .collect()
    }

    /// Validate an update against the birth set, then record the new
    /// last-known values. Nothing is recorded when any metric is rejected.
    pub fn update(&mut self, metrics: &[Metric]) -> Result<(), PublishError> {
        for metric in metrics {
            let name = metric.name.as_ref().ok_or(PublishError::UnnamedMetric)?;
            let current = self
                .metrics
                .get(name)
                .ok_or_else(|| PublishError::NotInBirthSet(name.clone()))?;
            if current.datatype != metric.datatype {
                return Err(PublishError::DataTypeMismatch {
                    name: name.clone(),
                    provided: metric.datatype,
                    expected: current.datatype,
                });
            }
            metric.validate()?;
        }
        for metric in metrics {
            if let Some(name) = &metric.name {
                self.metrics.insert(name.clone(), metric.clone());
            }
        }
        Ok(())
    }
}
