use async_trait::async_trait;
use edgeplug_types::kinds::State;
use edgeplug_types::payload::Payload;
use edgeplug_types::topic::{DeviceTopic, FilterTopic, NodeTopic, StateTopic, TopicFilter};

use crate::{ClientError, Event, LastWill};

/// The publish/subscribe surface an MQTT transport must expose.
///
/// Payloads arrive already framed; implementations apply the QoS and retain
/// flags the topic type mandates and hand the bytes to the broker.
#[async_trait]
pub trait Client {
    /// Disconnects the client cleanly, so that the broker does not fire the
    /// armed will.
    async fn disconnect(&self) -> Result<(), ClientError>;

    /// Publishes a state message to the specified state topic.
    ///
    /// This method will yield to the async runtime until the message is
    /// accepted by the client.
    async fn publish_state_message(
        &self,
        topic: StateTopic,
        payload: State,
    ) -> Result<(), ClientError>;

    /// Attempts to publish a state message to the specified state topic.
    ///
    /// Unlike `publish_state_message`, this method may return early if the
    /// client cannot process the message e.g. the message queue is full.
    async fn try_publish_state_message(
        &self,
        topic: StateTopic,
        payload: State,
    ) -> Result<(), ClientError>;

    /// Publishes a message to a node-specific topic.
    async fn publish_node_message(
        &self,
        topic: NodeTopic,
        payload: Payload,
    ) -> Result<(), ClientError>;

    /// Attempts to publish a message to a node-specific topic, returning
    /// early if the message cannot be queued.
    async fn try_publish_node_message(
        &self,
        topic: NodeTopic,
        payload: Payload,
    ) -> Result<(), ClientError>;

    /// Publishes a message to a device-specific topic.
    async fn publish_device_message(
        &self,
        topic: DeviceTopic,
        payload: Payload,
    ) -> Result<(), ClientError>;

    /// Attempts to publish a message to a device-specific topic, returning
    /// early if the message cannot be queued.
    async fn try_publish_device_message(
        &self,
        topic: DeviceTopic,
        payload: Payload,
    ) -> Result<(), ClientError>;

    /// Subscribes to a single topic filter.
    async fn subscribe(&self, topic: TopicFilter) -> Result<(), ClientError> {
        self.subscribe_many(vec![topic]).await
    }

    /// Subscribes to multiple topic filters in a single operation.
    async fn subscribe_many(&self, topics: Vec<TopicFilter>) -> Result<(), ClientError>;

    /// Unsubscribes from a previously subscribed topic filter.
    async fn unsubscribe(&self, topic: FilterTopic) -> Result<(), ClientError>;
}

pub type DynClient = dyn Client + Send + Sync;

/// The inbound half of the transport: a stream of [Event]s plus control of
/// the will armed for the next connection.
#[async_trait]
pub trait EventLoop {
    /// Produce the next event. `None` means the event loop has terminated
    /// and no further events will be produced.
    async fn poll(&mut self) -> Option<Event>;

    /// Arm the will the broker publishes if this session ends ungracefully.
    /// Takes effect on the next CONNECT; an established session keeps the
    /// will it connected with.
    fn set_last_will(&mut self, will: LastWill);
}

pub type DynEventLoop = dyn EventLoop + Send;
