use async_trait::async_trait;
use log::{error, trace};
use rumqttc::{AsyncClient as RuClient, EventLoop as RuEventLoop, Outgoing, Packet, SubscribeFilter};

use edgeplug_client::{topic_and_payload_to_event, ClientError, Event, LastWill};
use edgeplug_types::kinds::State;
use edgeplug_types::payload::{Message, Payload};
use edgeplug_types::topic::{DeviceTopic, FilterTopic, NodeTopic, QoS, StateTopic, TopicFilter};

use crate::options::{MqttOptions, OptionsError};

fn qos_to_mqtt_qos(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
        QoS::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
        QoS::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
    }
}

fn topic_filter_to_mqtt_filter(topic_filter: TopicFilter) -> SubscribeFilter {
    SubscribeFilter::new(topic_filter.topic.into(), qos_to_mqtt_qos(topic_filter.qos))
}

/// An [edgeplug_client::Client] implementation using [rumqttc]
#[derive(Clone)]
pub struct Client {
    client: RuClient,
}

impl Client {
    async fn publish(
        &self,
        topic: String,
        qos: rumqttc::QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), ClientError> {
        self.client
            .publish(topic, qos, retain, payload)
            .await
            .map_err(|_| ClientError::Disconnected)
    }

    fn try_publish(
        &self,
        topic: String,
        qos: rumqttc::QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), ClientError> {
        self.client
            .try_publish(topic, qos, retain, payload)
            .map_err(|_| ClientError::QueueFull)
    }
}

#[async_trait]
impl edgeplug_client::Client for Client {
    async fn disconnect(&self) -> Result<(), ClientError> {
        self.client
            .disconnect()
            .await
            .map_err(|_| ClientError::Disconnected)
    }

    async fn publish_state_message(
        &self,
        topic: StateTopic,
        payload: State,
    ) -> Result<(), ClientError> {
        let (qos, retain) = topic.publish_quality_retain();
        self.publish(
            topic.to_string(),
            qos_to_mqtt_qos(qos),
            retain,
            payload.encode(),
        )
        .await
    }

    async fn try_publish_state_message(
        &self,
        topic: StateTopic,
        payload: State,
    ) -> Result<(), ClientError> {
        let (qos, retain) = topic.publish_quality_retain();
        self.try_publish(
            topic.to_string(),
            qos_to_mqtt_qos(qos),
            retain,
            payload.encode(),
        )
    }

    async fn publish_node_message(
        &self,
        topic: NodeTopic,
        payload: Payload,
    ) -> Result<(), ClientError> {
        let (qos, retain) = topic.publish_quality_retain();
        self.publish(
            topic.to_string(),
            qos_to_mqtt_qos(qos),
            retain,
            payload.encode_to_vec(),
        )
        .await
    }

    async fn try_publish_node_message(
        &self,
        topic: NodeTopic,
        payload: Payload,
    ) -> Result<(), ClientError> {
        let (qos, retain) = topic.publish_quality_retain();
        self.try_publish(
            topic.to_string(),
            qos_to_mqtt_qos(qos),
            retain,
            payload.encode_to_vec(),
        )
    }

    async fn publish_device_message(
        &self,
        topic: DeviceTopic,
        payload: Payload,
    ) -> Result<(), ClientError> {
        let (qos, retain) = topic.publish_quality_retain();
        self.publish(
            topic.to_string(),
            qos_to_mqtt_qos(qos),
            retain,
            payload.encode_to_vec(),
        )
        .await
    }

    async fn try_publish_device_message(
        &self,
        topic: DeviceTopic,
        payload: Payload,
    ) -> Result<(), ClientError> {
        let (qos, retain) = topic.publish_quality_retain();
        self.try_publish(
            topic.to_string(),
            qos_to_mqtt_qos(qos),
            retain,
            payload.encode_to_vec(),
        )
    }

    async fn subscribe_many(&self, topics: Vec<TopicFilter>) -> Result<(), ClientError> {
        let filters: Vec<SubscribeFilter> =
            topics.into_iter().map(topic_filter_to_mqtt_filter).collect();
        self.client
            .subscribe_many(filters)
            .await
            .map_err(|_| ClientError::Disconnected)
    }

    async fn unsubscribe(&self, topic: FilterTopic) -> Result<(), ClientError> {
        self.client
            .unsubscribe(String::from(topic))
            .await
            .map_err(|_| ClientError::Disconnected)
    }
}

enum ConnectionState {
    Disconnected,
    ManualDisconnected,
    Connected,
}

/// An [edgeplug_client::EventLoop] implementation using [rumqttc]
pub struct EventLoop {
    state: ConnectionState,
    el: RuEventLoop,
}

impl EventLoop {
    /// Create a new `EventLoop`.
    ///
    /// `options` are the mqtt options to create the rumqtt client with. Some
    /// options will be overwritten to ensure Sparkplug compliance.
    ///
    /// `cap` specifies the capacity of the bounded async channel for the
    /// client handle.
    pub fn new(options: MqttOptions, cap: usize) -> Result<(Self, Client), OptionsError> {
        let options = options.into_rumqtt()?;
        let (client, eventloop) = RuClient::new(options, cap);
        Ok((
            EventLoop {
                el: eventloop,
                state: ConnectionState::Disconnected,
            },
            Client { client },
        ))
    }

    async fn poll_rumqtt(&mut self) -> Option<Option<Event>> {
        match self.el.poll().await {
            Ok(event) => {
                trace!("{event:?}");
                match event {
                    rumqttc::Event::Incoming(Packet::ConnAck(_)) => {
                        self.state = ConnectionState::Connected;
                        Some(Some(Event::Online))
                    }
                    rumqttc::Event::Incoming(Packet::Disconnect) => {
                        self.state = ConnectionState::Disconnected;
                        Some(Some(Event::Offline))
                    }
                    rumqttc::Event::Incoming(Packet::Publish(publish)) => {
                        let event = match topic_and_payload_to_event(
                            publish.topic.as_bytes(),
                            &publish.payload,
                        ) {
                            Ok(event) => event,
                            Err(reason) => Event::InvalidPublish {
                                reason,
                                topic: publish.topic.into_bytes(),
                                payload: publish.payload.to_vec(),
                            },
                        };
                        Some(Some(event))
                    }
                    rumqttc::Event::Outgoing(Outgoing::Disconnect) => {
                        self.state = ConnectionState::ManualDisconnected;
                        Some(Some(Event::Offline))
                    }
                    _ => None,
                }
            }
            Err(e) => match self.state {
                ConnectionState::Connected => {
                    error!("Client error: {e}");
                    self.state = ConnectionState::Disconnected;
                    Some(Some(Event::Offline))
                }
                ConnectionState::Disconnected => {
                    error!("Client error on reconnect attempt: {e}");
                    tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
                    None
                }
                ConnectionState::ManualDisconnected => Some(None),
            },
        }
    }
}

#[async_trait]
impl edgeplug_client::EventLoop for EventLoop {
    async fn poll(&mut self) -> Option<Event> {
        loop {
            if let Some(event) = self.poll_rumqtt().await {
                return event;
            }
        }
    }

    fn set_last_will(&mut self, will: LastWill) {
        let qos = qos_to_mqtt_qos(will.qos);
        let mqtt_will = rumqttc::LastWill::new(will.topic, will.payload, qos, will.retain);
        self.el.mqtt_options.set_last_will(mqtt_will);
    }
}
