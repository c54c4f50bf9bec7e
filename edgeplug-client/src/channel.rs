use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use edgeplug_types::kinds::State;
use edgeplug_types::payload::Payload;
use edgeplug_types::topic::{DeviceTopic, FilterTopic, NodeTopic, StateTopic, TopicFilter};
use tokio::sync::mpsc;

use crate::{ClientError, Event, LastWill};

/// A [Client](crate::Client) implementation that uses channels for message
/// passing.
///
/// Useful for writing tests where it is not appropriate to be running a real
/// MQTT client and broker setup. See [ChannelEventLoop].
#[derive(Clone)]
pub struct ChannelClient {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl ChannelClient {
    fn send(&self, message: OutboundMessage) -> Result<(), ClientError> {
        self.tx
            .send(message)
            .map_err(|_| ClientError::Disconnected)
    }
}

#[async_trait]
impl crate::Client for ChannelClient {
    async fn disconnect(&self) -> Result<(), ClientError> {
        self.send(OutboundMessage::Disconnect)
    }

    async fn publish_state_message(
        &self,
        topic: StateTopic,
        payload: State,
    ) -> Result<(), ClientError> {
        self.send(OutboundMessage::StateMessage { topic, payload })
    }

    async fn try_publish_state_message(
        &self,
        topic: StateTopic,
        payload: State,
    ) -> Result<(), ClientError> {
        self.publish_state_message(topic, payload).await
    }

    async fn publish_node_message(
        &self,
        topic: NodeTopic,
        payload: Payload,
    ) -> Result<(), ClientError> {
        self.send(OutboundMessage::NodeMessage { topic, payload })
    }

    async fn try_publish_node_message(
        &self,
        topic: NodeTopic,
        payload: Payload,
    ) -> Result<(), ClientError> {
        self.publish_node_message(topic, payload).await
    }

    async fn publish_device_message(
        &self,
        topic: DeviceTopic,
        payload: Payload,
    ) -> Result<(), ClientError> {
        self.send(OutboundMessage::DeviceMessage { topic, payload })
    }

    async fn try_publish_device_message(
        &self,
        topic: DeviceTopic,
        payload: Payload,
    ) -> Result<(), ClientError> {
        self.publish_device_message(topic, payload).await
    }

    async fn subscribe_many(&self, topics: Vec<TopicFilter>) -> Result<(), ClientError> {
        self.send(OutboundMessage::Subscribe(topics))
    }

    async fn unsubscribe(&self, topic: FilterTopic) -> Result<(), ClientError> {
        self.send(OutboundMessage::Unsubscribe(topic))
    }
}

/// An Enum representing different messages and requests a [ChannelClient]
/// can send to the [ChannelBroker]
#[derive(Clone, Debug, PartialEq)]
pub enum OutboundMessage {
    Disconnect,
    StateMessage {
        topic: StateTopic,
        payload: State,
    },
    NodeMessage {
        topic: NodeTopic,
        payload: Payload,
    },
    DeviceMessage {
        topic: DeviceTopic,
        payload: Payload,
    },
    Subscribe(Vec<TopicFilter>),
    Unsubscribe(FilterTopic),
}

/// A "broker" that manages the communication between a [ChannelClient] and a
/// [ChannelEventLoop].
///
/// Used to send events to the event loop and inspect messages/requests
/// produced by the client.
pub struct ChannelBroker {
    pub rx_outbound: mpsc::UnboundedReceiver<OutboundMessage>,
    pub tx_event: mpsc::UnboundedSender<Event>,
    last_will: Arc<Mutex<Option<LastWill>>>,
}

impl ChannelBroker {
    /// Retrieves the current last will message set by the EventLoop, if set.
    pub fn last_will(&self) -> Option<LastWill> {
        self.last_will.lock().unwrap().clone()
    }
}

/// An [EventLoop](crate::EventLoop) implementation that uses channels.
///
/// See [ChannelBroker].
pub struct ChannelEventLoop {
    rx: mpsc::UnboundedReceiver<Event>,
    last_will: Arc<Mutex<Option<LastWill>>>,
}

impl ChannelEventLoop {
    /// Creates a new event loop along with the corresponding client and
    /// broker.
    pub fn new() -> (Self, ChannelClient, ChannelBroker) {
        let (tx_event, rx_event) = mpsc::unbounded_channel();
        let (tx_outbound, rx_outbound) = mpsc::unbounded_channel();
        let last_will = Arc::new(Mutex::new(None));
        let el = Self {
            rx: rx_event,
            last_will: last_will.clone(),
        };
        (
            el,
            ChannelClient { tx: tx_outbound },
            ChannelBroker {
                rx_outbound,
                tx_event,
                last_will,
            },
        )
    }
}

#[async_trait]
impl crate::EventLoop for ChannelEventLoop {
    async fn poll(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    fn set_last_will(&mut self, will: LastWill) {
        let mut lw = self.last_will.lock().unwrap();
        *lw = Some(will)
    }
}
