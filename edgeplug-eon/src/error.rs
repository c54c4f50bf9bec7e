use edgeplug_types::kinds::PayloadError;
use edgeplug_types::payload::DataType;
use edgeplug_types::topic::TopicError;
use edgeplug_types::MetricError;
use thiserror::Error;

/// The node is not in a state that allows the requested operation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("The node is offline")]
    Offline,
    #[error("The node has not published its birth certificate")]
    UnBirthed,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("No metrics provided")]
    NoMetrics,
    #[error("State error: {0}")]
    State(#[from] StateError),
    #[error("Metric {0} is not in the birth set")]
    NotInBirthSet(String),
    #[error("Metric {name} datatype {provided:?} does not match birth datatype {expected:?}")]
    DataTypeMismatch {
        name: String,
        provided: DataType,
        expected: DataType,
    },
    #[error("Metric must have a defined name")]
    UnnamedMetric,
    #[error("Invalid metric: {0}")]
    InvalidMetric(#[from] MetricError),
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] PayloadError),
    #[error("No device {0} is registered with this edge node")]
    UnknownDevice(String),
}

/// Problems with a birth metric set provided at construction or device
/// registration.
#[derive(Debug, Error)]
pub enum BirthSetError {
    #[error("Duplicate metric {0}")]
    DuplicateMetric(String),
    #[error("Metric must have a defined name in a birth set")]
    UnnamedMetric,
    #[error("Invalid metric: {0}")]
    InvalidMetric(#[from] MetricError),
}

#[derive(Debug, Error)]
pub enum DeviceRegistrationError {
    #[error("Duplicate device")]
    DuplicateDevice,
    #[error("Invalid device name: {0}")]
    InvalidName(TopicError),
    #[error("Invalid birth set: {0}")]
    Birth(#[from] BirthSetError),
}
