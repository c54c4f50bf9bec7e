//! Typed payload kinds, one per Sparkplug message type.
//!
//! The message type on the topic is the discriminator: [PayloadKind::decode]
//! picks the variant, runs the protobuf codec (or the STATE JSON codec) and
//! validates the variant's invariants.

use prost::Message as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metric::{Metric, MetricError};
use crate::payload::Payload;
use crate::topic::MessageType;

#[derive(Debug, Error, PartialEq)]
pub enum PayloadError {
    #[error("There was an error decoding the payload: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("Invalid metric: {0}")]
    Metric(#[from] MetricError),
    #[error("Payload missing required {0} field")]
    MissingField(&'static str),
    #[error("Metric {0} must have a defined name in a birth payload")]
    UnnamedBirthMetric(usize),
    #[error("Unable to decode state message as json: {0}")]
    StateJsonDecode(String),
}

fn metrics_from_payload(metrics: Vec<crate::payload::Metric>) -> Result<Vec<Metric>, PayloadError> {
    metrics
        .into_iter()
        .map(|m| Metric::from_proto(m).map_err(PayloadError::from))
        .collect()
}

fn metrics_to_payload(metrics: &[Metric]) -> Result<Vec<crate::payload::Metric>, PayloadError> {
    metrics
        .iter()
        .map(|m| m.clone().into_proto().map_err(PayloadError::from))
        .collect()
}

/// An NBIRTH or DBIRTH payload: the full metric set of a node or device.
#[derive(Debug, Clone, PartialEq)]
pub struct Birth {
    pub timestamp: u64,
    pub seq: u64,
    pub metrics: Vec<Metric>,
}

impl Birth {
    fn check_metric_names(&self) -> Result<(), PayloadError> {
        for (i, metric) in self.metrics.iter().enumerate() {
            if metric.name.is_none() {
                return Err(PayloadError::UnnamedBirthMetric(i));
            }
        }
        Ok(())
    }

    pub fn into_payload(self) -> Result<Payload, PayloadError> {
        self.check_metric_names()?;
        Ok(Payload {
            timestamp: Some(self.timestamp),
            seq: Some(self.seq),
            metrics: metrics_to_payload(&self.metrics)?,
            uuid: None,
            body: None,
        })
    }

    pub fn from_payload(payload: Payload) -> Result<Self, PayloadError> {
        let birth = Self {
            timestamp: payload
                .timestamp
                .ok_or(PayloadError::MissingField("timestamp"))?,
            seq: payload.seq.ok_or(PayloadError::MissingField("seq"))?,
            metrics: metrics_from_payload(payload.metrics)?,
        };
        birth.check_metric_names()?;
        Ok(birth)
    }
}

/// An NDATA or DDATA payload: updates to some of the birth metric set.
#[derive(Debug, Clone, PartialEq)]
pub struct Data {
    pub timestamp: u64,
    pub seq: u64,
    pub metrics: Vec<Metric>,
}

impl Data {
    pub fn into_payload(self) -> Result<Payload, PayloadError> {
        Ok(Payload {
            timestamp: Some(self.timestamp),
            seq: Some(self.seq),
            metrics: metrics_to_payload(&self.metrics)?,
            uuid: None,
            body: None,
        })
    }

    pub fn from_payload(payload: Payload) -> Result<Self, PayloadError> {
        Ok(Self {
            timestamp: payload
                .timestamp
                .ok_or(PayloadError::MissingField("timestamp"))?,
            seq: payload.seq.ok_or(PayloadError::MissingField("seq"))?,
            metrics: metrics_from_payload(payload.metrics)?,
        })
    }
}

/// An NCMD or DCMD payload. Commands sit outside the session's sequence
/// space and carry no seq.
#[derive(Debug, Clone, PartialEq)]
pub struct Cmd {
    pub timestamp: u64,
    pub metrics: Vec<Metric>,
}

impl Cmd {
    pub fn into_payload(self) -> Result<Payload, PayloadError> {
        Ok(Payload {
            timestamp: Some(self.timestamp),
            seq: None,
            metrics: metrics_to_payload(&self.metrics)?,
            uuid: None,
            body: None,
        })
    }

    pub fn from_payload(payload: Payload) -> Result<Self, PayloadError> {
        Ok(Self {
            timestamp: payload
                .timestamp
                .ok_or(PayloadError::MissingField("timestamp"))?,
            metrics: metrics_from_payload(payload.metrics)?,
        })
    }
}

/// An NDEATH payload: only the `bdSeq` metric pairing this death with its
/// birth. No seq.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDeath {
    pub timestamp: Option<u64>,
    pub bd_seq_metric: Metric,
}

impl NodeDeath {
    pub fn into_payload(self) -> Result<Payload, PayloadError> {
        Ok(Payload {
            timestamp: self.timestamp,
            seq: None,
            metrics: vec![self.bd_seq_metric.into_proto()?],
            uuid: None,
            body: None,
        })
    }

    pub fn from_payload(payload: Payload) -> Result<Self, PayloadError> {
        let mut metrics = metrics_from_payload(payload.metrics)?;
        if metrics.is_empty() {
            return Err(PayloadError::MissingField("bdSeq metric"));
        }
        Ok(Self {
            timestamp: payload.timestamp,
            bd_seq_metric: metrics.swap_remove(0),
        })
    }
}

/// A DDEATH payload. Carries a seq but no metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDeath {
    pub timestamp: u64,
    pub seq: u64,
}

impl DeviceDeath {
    pub fn into_payload(self) -> Payload {
        Payload {
            timestamp: Some(self.timestamp),
            seq: Some(self.seq),
            metrics: Vec::new(),
            uuid: None,
            body: None,
        }
    }

    pub fn from_payload(payload: Payload) -> Result<Self, PayloadError> {
        Ok(Self {
            timestamp: payload
                .timestamp
                .ok_or(PayloadError::MissingField("timestamp"))?,
            seq: payload.seq.ok_or(PayloadError::MissingField("seq"))?,
        })
    }
}

/// A primary-host STATE payload. A UTF-8 JSON object rather than protobuf,
/// outside the sequence-numbered space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub online: bool,
    pub timestamp: u64,
}

impl State {
    pub fn encode(&self) -> Vec<u8> {
        /* a plain bool and u64 cannot fail to serialize */
        serde_json::to_vec(self).unwrap()
    }

    pub fn decode(raw: &[u8]) -> Result<Self, PayloadError> {
        serde_json::from_slice(raw).map_err(|e| PayloadError::StateJsonDecode(e.to_string()))
    }
}

/// The payload of a Sparkplug message, discriminated by the message type on
/// its topic.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadKind {
    NBirth(Birth),
    DBirth(Birth),
    NData(Data),
    DData(Data),
    NCmd(Cmd),
    DCmd(Cmd),
    NDeath(NodeDeath),
    DDeath(DeviceDeath),
    State(State),
}

impl PayloadKind {
    /// Decode raw payload bytes as the variant `message_type` dictates.
    pub fn decode(message_type: MessageType, raw: &[u8]) -> Result<Self, PayloadError> {
        if message_type == MessageType::State {
            return Ok(PayloadKind::State(State::decode(raw)?));
        }
        let payload = Payload::decode(raw)?;
        let kind = match message_type {
            MessageType::NBirth => PayloadKind::NBirth(Birth::from_payload(payload)?),
            MessageType::DBirth => PayloadKind::DBirth(Birth::from_payload(payload)?),
            MessageType::NData => PayloadKind::NData(Data::from_payload(payload)?),
            MessageType::DData => PayloadKind::DData(Data::from_payload(payload)?),
            MessageType::NCmd => PayloadKind::NCmd(Cmd::from_payload(payload)?),
            MessageType::DCmd => PayloadKind::DCmd(Cmd::from_payload(payload)?),
            MessageType::NDeath => PayloadKind::NDeath(NodeDeath::from_payload(payload)?),
            MessageType::DDeath => PayloadKind::DDeath(DeviceDeath::from_payload(payload)?),
            MessageType::State => unreachable!(),
        };
        Ok(kind)
    }

    /// Encode into the wire bytes for this variant.
    pub fn encode(&self) -> Result<Vec<u8>, PayloadError> {
        let payload = match self.clone() {
            PayloadKind::NBirth(p) | PayloadKind::DBirth(p) => p.into_payload()?,
            PayloadKind::NData(p) | PayloadKind::DData(p) => p.into_payload()?,
            PayloadKind::NCmd(p) | PayloadKind::DCmd(p) => p.into_payload()?,
            PayloadKind::NDeath(p) => p.into_payload()?,
            PayloadKind::DDeath(p) => p.into_payload(),
            PayloadKind::State(p) => return Ok(p.encode()),
        };
        Ok(payload.encode_to_vec())
    }
}
