use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::constants::{
    DBIRTH, DCMD, DDATA, DDEATH, MULTI_LEVEL_WILDCARD, NBIRTH, NCMD, NDATA, NDEATH,
    SINGLE_LEVEL_WILDCARD, SPBV10, STATE,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopicError {
    #[error("Topic has invalid namespace {0}")]
    InvalidNamespace(String),
    #[error("Unknown message type {0}")]
    UnknownMessageType(String),
    #[error("Topic is missing its {0} component")]
    MissingComponent(&'static str),
    #[error("Topic has trailing components")]
    TrailingComponents,
    #[error("Topic component must not be empty")]
    EmptyComponent,
    #[error("Topic component {0} contains a reserved '/', '+' or '#' character")]
    ReservedCharacter(String),
}

/// Check that an id is usable as a concrete topic component.
///
/// Group, edge node, device and host ids all become topic levels, so they
/// must be non-empty and free of the MQTT separator and wildcard characters.
pub fn validate_component(id: &str) -> Result<(), TopicError> {
    if id.is_empty() {
        return Err(TopicError::EmptyComponent);
    }
    if id.chars().any(|c| matches!(c, '/' | '+' | '#')) {
        return Err(TopicError::ReservedCharacter(id.to_string()));
    }
    Ok(())
}

/// The message-type element of the Sparkplug topic namespace. It dictates how
/// the MQTT payload of the message is decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    NBirth,
    NData,
    NCmd,
    NDeath,
    DBirth,
    DData,
    DCmd,
    DDeath,
    State,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::NBirth => NBIRTH,
            MessageType::NData => NDATA,
            MessageType::NCmd => NCMD,
            MessageType::NDeath => NDEATH,
            MessageType::DBirth => DBIRTH,
            MessageType::DData => DDATA,
            MessageType::DCmd => DCMD,
            MessageType::DDeath => DDEATH,
            MessageType::State => STATE,
        }
    }

    /// Device message types address a device below an edge node and carry a
    /// fifth topic component.
    pub fn is_device_message(&self) -> bool {
        matches!(
            self,
            MessageType::DBirth | MessageType::DData | MessageType::DCmd | MessageType::DDeath
        )
    }

    /// The QoS and retain flag Sparkplug mandates when publishing this
    /// message type.
    pub fn publish_quality_retain(&self) -> (QoS, bool) {
        match self {
            MessageType::NBirth => (QoS::AtLeastOnce, false),
            MessageType::NData => (QoS::AtMostOnce, false),
            MessageType::NCmd => (QoS::AtMostOnce, false),
            MessageType::NDeath => (QoS::AtLeastOnce, false),
            MessageType::DBirth => (QoS::AtLeastOnce, false),
            MessageType::DData => (QoS::AtMostOnce, false),
            MessageType::DCmd => (QoS::AtMostOnce, false),
            MessageType::DDeath => (QoS::AtLeastOnce, false),
            MessageType::State => (QoS::AtLeastOnce, true),
        }
    }
}

impl FromStr for MessageType {
    type Err = TopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            NBIRTH => Ok(MessageType::NBirth),
            NDATA => Ok(MessageType::NData),
            NCMD => Ok(MessageType::NCmd),
            NDEATH => Ok(MessageType::NDeath),
            DBIRTH => Ok(MessageType::DBirth),
            DDATA => Ok(MessageType::DData),
            DCMD => Ok(MessageType::DCmd),
            DDEATH => Ok(MessageType::DDeath),
            STATE => Ok(MessageType::State),
            other => Err(TopicError::UnknownMessageType(other.to_string())),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A 4-component topic addressing an edge node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeTopic {
    pub group_id: String,
    pub message_type: MessageType,
    pub edge_node_id: String,
}

impl NodeTopic {
    pub fn new(group_id: &str, message_type: MessageType, edge_node_id: &str) -> Self {
        debug_assert!(!message_type.is_device_message() && message_type != MessageType::State);
        Self {
            group_id: group_id.to_string(),
            message_type,
            edge_node_id: edge_node_id.to_string(),
        }
    }

    pub fn publish_quality_retain(&self) -> (QoS, bool) {
        self.message_type.publish_quality_retain()
    }
}

impl fmt::Display for NodeTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            SPBV10, self.group_id, self.message_type, self.edge_node_id
        )
    }
}

/// A 5-component topic addressing a device below an edge node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeviceTopic {
    pub group_id: String,
    pub message_type: MessageType,
    pub edge_node_id: String,
    pub device_id: String,
}

impl DeviceTopic {
    pub fn new(
        group_id: &str,
        message_type: MessageType,
        edge_node_id: &str,
        device_id: &str,
    ) -> Self {
        debug_assert!(message_type.is_device_message());
        Self {
            group_id: group_id.to_string(),
            message_type,
            edge_node_id: edge_node_id.to_string(),
            device_id: device_id.to_string(),
        }
    }

    pub fn publish_quality_retain(&self) -> (QoS, bool) {
        self.message_type.publish_quality_retain()
    }
}

impl fmt::Display for DeviceTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            SPBV10, self.group_id, self.message_type, self.edge_node_id, self.device_id
        )
    }
}

/// The primary-host STATE topic, outside the group namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StateTopic {
    pub host_id: String,
}

impl StateTopic {
    pub fn new_host(host_id: &str) -> Self {
        Self {
            host_id: host_id.to_string(),
        }
    }

    pub fn publish_quality_retain(&self) -> (QoS, bool) {
        MessageType::State.publish_quality_retain()
    }
}

impl fmt::Display for StateTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", SPBV10, STATE, self.host_id)
    }
}

/// A fully-resolved Sparkplug topic, as carried by a publish. Wildcards are
/// rejected here; subscription patterns are built with [FilterTopic].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    Node(NodeTopic),
    Device(DeviceTopic),
    State(StateTopic),
}

impl Topic {
    pub fn message_type(&self) -> MessageType {
        match self {
            Topic::Node(t) => t.message_type,
            Topic::Device(t) => t.message_type,
            Topic::State(_) => MessageType::State,
        }
    }
}

fn checked_component(part: &str) -> Result<&str, TopicError> {
    validate_component(part)?;
    Ok(part)
}

impl FromStr for Topic {
    type Err = TopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');
        let namespace = parts.next().unwrap_or_default();
        if namespace != SPBV10 {
            return Err(TopicError::InvalidNamespace(namespace.to_string()));
        }

        let group_or_state = parts
            .next()
            .ok_or(TopicError::MissingComponent("group_id"))?;
        if group_or_state == STATE {
            let host_id = parts
                .next()
                .ok_or(TopicError::MissingComponent("host_id"))?;
            let topic = Topic::State(StateTopic::new_host(checked_component(host_id)?));
            return match parts.next() {
                Some(_) => Err(TopicError::TrailingComponents),
                None => Ok(topic),
            };
        }

        let group_id = checked_component(group_or_state)?;
        let message_type: MessageType = parts
            .next()
            .ok_or(TopicError::MissingComponent("message_type"))?
            .parse()?;
        if message_type == MessageType::State {
            return Err(TopicError::UnknownMessageType(STATE.to_string()));
        }
        let edge_node_id = checked_component(
            parts
                .next()
                .ok_or(TopicError::MissingComponent("edge_node_id"))?,
        )?;

        let topic = if message_type.is_device_message() {
            let device_id = checked_component(
                parts
                    .next()
                    .ok_or(TopicError::MissingComponent("device_id"))?,
            )?;
            Topic::Device(DeviceTopic::new(
                group_id,
                message_type,
                edge_node_id,
                device_id,
            ))
        } else {
            Topic::Node(NodeTopic::new(group_id, message_type, edge_node_id))
        };

        match parts.next() {
            Some(_) => Err(TopicError::TrailingComponents),
            None => Ok(topic),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Node(t) => t.fmt(f),
            Topic::Device(t) => t.fmt(f),
            Topic::State(t) => t.fmt(f),
        }
    }
}

/// MQTT quality of service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

/// Subscription patterns. Unlike [Topic], these may carry MQTT wildcards.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FilterTopic {
    /// A single node topic, e.g. the NCMD topic of one edge node.
    Node(NodeTopic),
    /// A device topic; the device component may be a wildcard.
    Device(DeviceTopic),
    /// Every message of one edge node: `spBv1.0/<group>/+/<node>/#`.
    NodeMessages { group_id: String, node_id: String },
    /// Every message of a group: `spBv1.0/<group>/#`.
    Group { group_id: String },
    /// The whole Sparkplug namespace: `spBv1.0/#`.
    Namespace,
    /// Every primary host state topic: `spBv1.0/STATE/#`.
    State,
    /// One primary host's state topic.
    StateHost { host_id: String },
}

impl From<FilterTopic> for String {
    fn from(value: FilterTopic) -> Self {
        match value {
            FilterTopic::Node(topic) => topic.to_string(),
            FilterTopic::Device(topic) => topic.to_string(),
            FilterTopic::NodeMessages { group_id, node_id } => format!(
                "{}/{}/{}/{}/{}",
                SPBV10, group_id, SINGLE_LEVEL_WILDCARD, node_id, MULTI_LEVEL_WILDCARD
            ),
            FilterTopic::Group { group_id } => {
                format!("{}/{}/{}", SPBV10, group_id, MULTI_LEVEL_WILDCARD)
            }
            FilterTopic::Namespace => format!("{}/{}", SPBV10, MULTI_LEVEL_WILDCARD),
            FilterTopic::State => format!("{}/{}/{}", SPBV10, STATE, MULTI_LEVEL_WILDCARD),
            FilterTopic::StateHost { host_id } => StateTopic::new_host(&host_id).to_string(),
        }
    }
}

/// A subscription: a filter pattern and the QoS to subscribe with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopicFilter {
    pub topic: FilterTopic,
    pub qos: QoS,
}

impl TopicFilter {
    pub fn new(topic: FilterTopic) -> Self {
        Self::new_with_qos(topic, QoS::AtMostOnce)
    }

    pub fn new_with_qos(topic: FilterTopic, qos: QoS) -> Self {
        Self { topic, qos }
    }
}
