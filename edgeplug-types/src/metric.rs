use thiserror::Error;

use crate::metadata::MetaData;
use crate::payload::{self, DataType};
use crate::utils::timestamp;
use crate::value::{FromValueError, MetricValue};

#[derive(Debug, Error, PartialEq)]
pub enum MetricError {
    #[error("Metric value error: {0}")]
    Value(#[from] FromValueError),
    #[error("Metric datatype {datatype:?} does not admit a {value:?} value")]
    DatatypeMismatch { datatype: DataType, value: DataType },
    #[error("Datatype {0:?} is not supported")]
    UnsupportedDataType(DataType),
    #[error("Unknown datatype tag {0}")]
    UnknownDataType(u32),
}

fn check_supported(datatype: DataType) -> Result<(), MetricError> {
    match datatype {
        DataType::Unknown
        | DataType::DataSet
        | DataType::Template
        | DataType::PropertySet
        | DataType::PropertySetList => Err(MetricError::UnsupportedDataType(datatype)),
        _ => Ok(()),
    }
}

/// A Sparkplug B metric.
///
/// A `None` value is the explicit null: it round-trips as `is_null = true`
/// with no value slot on the wire. The name is required when the metric is
/// provided to a birth payload; aliases are not implemented, so published
/// metrics always carry their name.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: Option<String>,
    pub timestamp: Option<u64>,
    pub datatype: DataType,
    pub value: Option<MetricValue>,
    pub is_historical: bool,
    pub is_transient: bool,
    pub metadata: Option<MetaData>,
}

impl Metric {
    /// Create a named metric with a value, timestamped now.
    pub fn new<S: Into<String>, V: Into<MetricValue>>(
        name: S,
        datatype: DataType,
        value: V,
    ) -> Self {
        Self {
            name: Some(name.into()),
            timestamp: Some(timestamp()),
            datatype,
            value: Some(value.into()),
            is_historical: false,
            is_transient: false,
            metadata: None,
        }
    }

    /// Create a named null metric, timestamped now.
    pub fn new_null<S: Into<String>>(name: S, datatype: DataType) -> Self {
        Self {
            name: Some(name.into()),
            timestamp: Some(timestamp()),
            datatype,
            value: None,
            is_historical: false,
            is_transient: false,
            metadata: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_metadata(mut self, metadata: MetaData) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn historical(mut self, is_historical: bool) -> Self {
        self.is_historical = is_historical;
        self
    }

    pub fn transient(mut self, is_transient: bool) -> Self {
        self.is_transient = is_transient;
        self
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    /// Check datatype support and datatype/value consistency without encoding.
    pub fn validate(&self) -> Result<(), MetricError> {
        check_supported(self.datatype)?;
        if let Some(value) = &self.value {
            if value.datatype() != self.datatype {
                return Err(MetricError::DatatypeMismatch {
                    datatype: self.datatype,
                    value: value.datatype(),
                });
            }
        }
        Ok(())
    }

    pub fn into_proto(self) -> Result<payload::Metric, MetricError> {
        self.validate()?;
        let value = match self.value {
            Some(value) => Some(value.into_proto()?),
            None => None,
        };
        Ok(payload::Metric {
            name: self.name,
            alias: None,
            timestamp: self.timestamp,
            datatype: Some(self.datatype as u32),
            is_historical: self.is_historical.then_some(true),
            is_transient: self.is_transient.then_some(true),
            is_null: if value.is_none() { Some(true) } else { None },
            metadata: self.metadata.map(MetaData::into),
            value,
        })
    }

    pub fn from_proto(metric: payload::Metric) -> Result<Self, MetricError> {
        let tag = metric.datatype.unwrap_or(DataType::Unknown as u32);
        let datatype =
            DataType::try_from(tag).map_err(|_| MetricError::UnknownDataType(tag))?;
        check_supported(datatype)?;
        let value = match metric.value {
            Some(value) => Some(MetricValue::from_proto(datatype, value)?),
            None => None,
        };
        Ok(Self {
            name: metric.name,
            timestamp: metric.timestamp,
            datatype,
            value,
            is_historical: metric.is_historical.unwrap_or(false),
            is_transient: metric.is_transient.unwrap_or(false),
            metadata: metric.metadata.map(payload::MetaData::into),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_fields() {
        let metric = Metric::new("m", DataType::UInt8, 42u8)
            .with_timestamp(123)
            .historical(true)
            .with_metadata(MetaData {
                content_type: Some("application/octet-stream".into()),
                size: Some(9),
                ..Default::default()
            });
        let back = Metric::from_proto(metric.clone().into_proto().unwrap()).unwrap();
        assert_eq!(metric, back);
    }

    #[test]
    fn null_metric_round_trips_with_is_null_flag() {
        let metric = Metric::new_null("m", DataType::Int32).with_timestamp(7);
        let proto = metric.clone().into_proto().unwrap();
        assert_eq!(proto.is_null, Some(true));
        assert_eq!(proto.value, None);
        let back = Metric::from_proto(proto).unwrap();
        assert!(back.is_null());
        assert_eq!(metric, back);
    }

    #[test]
    fn value_present_clears_is_null() {
        let proto = Metric::new("m", DataType::Boolean, true)
            .into_proto()
            .unwrap();
        assert_eq!(proto.is_null, None);
        assert!(proto.value.is_some());
    }

    #[test]
    fn datatype_value_mismatch_is_rejected() {
        let metric = Metric::new("m", DataType::UInt8, 300u16);
        assert_eq!(
            metric.into_proto(),
            Err(MetricError::DatatypeMismatch {
                datatype: DataType::UInt8,
                value: DataType::UInt16,
            })
        );
    }

    #[test]
    fn unsupported_datatype_fails_encode_and_decode() {
        let metric = Metric::new_null("m", DataType::Template);
        assert_eq!(
            metric.into_proto(),
            Err(MetricError::UnsupportedDataType(DataType::Template))
        );

        let mut proto = payload::Metric::new();
        proto
            .set_name("m".into())
            .set_datatype(DataType::Template)
            .set_null();
        assert_eq!(
            Metric::from_proto(proto),
            Err(MetricError::UnsupportedDataType(DataType::Template))
        );
    }

    #[test]
    fn unknown_datatype_tag_is_rejected() {
        let mut proto = payload::Metric::new();
        proto.set_name("m".into()).set_null();
        proto.datatype = Some(900);
        assert_eq!(Metric::from_proto(proto), Err(MetricError::UnknownDataType(900)));
    }

    #[test]
    fn missing_datatype_is_unsupported() {
        let mut proto = payload::Metric::new();
        proto.set_name("m".into()).set_null();
        assert_eq!(
            Metric::from_proto(proto),
            Err(MetricError::UnsupportedDataType(DataType::Unknown))
        );
    }
}
