use std::str::Utf8Error;

use edgeplug_types::kinds::{PayloadError, PayloadKind, State};
use edgeplug_types::payload::Payload;
use edgeplug_types::topic::{MessageType, NodeTopic, QoS, StateTopic, TopicError};
use thiserror::Error;

/// Error types for message processing operations.
///
/// This enum represents the various error conditions that can occur when
/// decoding sparkplug protobuf payloads, validating topics, or handling
/// payloads.
#[derive(Error, Debug, PartialEq)]
pub enum MessageError {
    #[error("The topic was invalid: {0}")]
    InvalidTopic(#[from] TopicError),
    #[error("Topic utf8 decode error: {0}")]
    TopicUtf8(#[from] Utf8Error),
    #[error("Invalid payload: {0}")]
    Payload(#[from] PayloadError),
}

/// Transport errors surfaced by a [Client](crate::Client) implementation.
///
/// A closed enumeration so callers can match on the failure mode without
/// depending on the underlying MQTT library.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("The connection was refused")]
    ConnectionRefused,
    #[error("Not authorized")]
    NotAuthorized,
    #[error("A protocol error occurred when communicating with the broker")]
    Protocol,
    #[error("The operation timed out")]
    Timeout,
    #[error("The client is not currently connected")]
    Disconnected,
    #[error("Message queue full")]
    QueueFull,
    #[error("A TLS error occurred")]
    Tls,
    #[error("I/O error: {0}")]
    Io(String),
}

/// A message from a Node, with the payload already decoded as the topic's
/// message type dictates.
#[derive(Debug, PartialEq)]
pub struct NodeMessage {
    /// The group the node belongs to.
    pub group_id: String,
    /// The nodes unique identifier.
    pub node_id: String,
    /// The decoded payload.
    pub payload: PayloadKind,
}

/// A message from a Device.
#[derive(Debug, PartialEq)]
pub struct DeviceMessage {
    /// The group the node belongs to.
    pub group_id: String,
    /// The nodes unique identifier.
    pub node_id: String,
    /// The devices unique identifier.
    pub device_id: String,
    /// The decoded payload.
    pub payload: PayloadKind,
}

/// An enum that represents the different types of events an
/// [EventLoop](crate::EventLoop) implementation can produce.
#[derive(Debug, PartialEq)]
pub enum Event {
    Offline,
    Online,
    Node(NodeMessage),
    Device(DeviceMessage),
    State {
        host_id: String,
        payload: State,
    },
    InvalidPublish {
        reason: MessageError,
        topic: Vec<u8>,
        payload: Vec<u8>,
    },
}

/// Structure representing the last will of a Node or Application
#[derive(Debug, Clone, PartialEq)]
pub struct LastWill {
    pub topic: String,
    pub retain: bool,
    pub qos: QoS,
    pub payload: Vec<u8>,
}

impl LastWill {
    pub fn new_node(group_id: &str, node_id: &str, payload: Payload) -> Self {
        let topic = NodeTopic::new(group_id, MessageType::NDeath, node_id);
        let (qos, retain) = topic.publish_quality_retain();
        Self {
            retain,
            qos,
            payload: payload.into(),
            topic: topic.to_string(),
        }
    }

    pub fn new_host(host_id: &str, timestamp: u64) -> Self {
        let topic = StateTopic::new_host(host_id);
        let (qos, retain) = topic.publish_quality_retain();
        Self {
            topic: topic.to_string(),
            retain,
            qos,
            payload: State {
                online: false,
                timestamp,
            }
            .encode(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_last_will_targets_the_ndeath_topic() {
        let will = LastWill::new_node(
            "g",
            "n",
            Payload {
                timestamp: None,
                metrics: vec![],
                seq: None,
                uuid: None,
                body: None,
            },
        );
        assert_eq!(will.topic, "spBv1.0/g/NDEATH/n");
        assert_eq!(will.qos, QoS::AtLeastOnce);
        assert!(!will.retain);
    }

    #[test]
    fn host_last_will_is_retained_offline_state() {
        let will = LastWill::new_host("scada", 42);
        assert_eq!(will.topic, "spBv1.0/STATE/scada");
        assert!(will.retain);
        assert_eq!(State::decode(&will.payload).unwrap().online, false);
    }
}
