use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::select;
use tokio::sync::{
    mpsc::{self, Sender, UnboundedSender},
    oneshot,
};
use tokio::task;
use tokio::time::timeout;

use edgeplug_client::{
    DeviceMessage, DynClient, DynEventLoop, Event, LastWill, NodeMessage,
};
use edgeplug_types::constants::{BDSEQ, NODE_CONTROL_REBIRTH, SINGLE_LEVEL_WILDCARD};
use edgeplug_types::kinds::{Birth, Cmd, Data, PayloadKind};
use edgeplug_types::payload::{self, DataType, Payload};
use edgeplug_types::topic::{
    validate_component, DeviceTopic, FilterTopic, MessageType, NodeTopic, QoS, TopicFilter,
};
use edgeplug_types::utils::timestamp;
use edgeplug_types::{Metric, MetricValue};

use crate::builder::EdgeNodeBuilder;
use crate::device::DeviceMap;
use crate::error::{DeviceRegistrationError, PublishError, StateError};
use crate::store::MetricStore;
use crate::{DCmdCallback, NCmdCallback};

pub(crate) struct EonConfig {
    pub node_rebirth_request_cooldown: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BirthType {
    Birth,
    Rebirth,
}

pub(crate) struct EonState {
    /// Birth/death sequence number. Monotonic across sessions; pairs every
    /// NBIRTH with its NDEATH.
    bdseq: AtomicU64,
    /// Session sequence number, shared by NDATA, DBIRTH, DDATA and DDEATH
    /// publishes. Wraps mod 256.
    seq: AtomicU8,
    online: AtomicBool,
    birthed: AtomicBool,
    pub group_id: String,
    pub edge_node_id: String,
    pub ndata_topic: NodeTopic,
}

impl EonState {
    pub(crate) fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) as u64
    }

    pub(crate) fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub(crate) fn birthed(&self) -> bool {
        self.birthed.load(Ordering::SeqCst)
    }

    pub(crate) fn bdseq(&self) -> u64 {
        self.bdseq.load(Ordering::SeqCst)
    }

    fn check_publish_state(&self) -> Result<(), StateError> {
        if !self.is_online() {
            return Err(StateError::Offline);
        }
        if !self.birthed() {
            return Err(StateError::UnBirthed);
        }
        Ok(())
    }

    fn birth_topic(&self) -> NodeTopic {
        NodeTopic::new(&self.group_id, MessageType::NBirth, &self.edge_node_id)
    }

    fn death_topic(&self) -> NodeTopic {
        NodeTopic::new(&self.group_id, MessageType::NDeath, &self.edge_node_id)
    }

    fn sub_topics(&self) -> Vec<TopicFilter> {
        vec![
            TopicFilter::new_with_qos(
                FilterTopic::Node(NodeTopic::new(
                    &self.group_id,
                    MessageType::NCmd,
                    &self.edge_node_id,
                )),
                QoS::AtLeastOnce,
            ),
            TopicFilter::new_with_qos(
                FilterTopic::Device(DeviceTopic::new(
                    &self.group_id,
                    MessageType::DCmd,
                    &self.edge_node_id,
                    SINGLE_LEVEL_WILDCARD,
                )),
                QoS::AtLeastOnce,
            ),
            TopicFilter::new_with_qos(FilterTopic::State, QoS::AtLeastOnce),
        ]
    }
}

#[derive(Debug)]
struct EonShutdown;

/// A handle for interacting with the Edge Node.
///
/// `NodeHandle` provides the interface for node lifecycle operations, device
/// management and metric publishing while [EdgeNode::run] drives the session.
#[derive(Clone)]
pub struct NodeHandle {
    node: Arc<Node>,
}

impl NodeHandle {
    /// Stop all operations: send death certificates for every device and the
    /// node, then disconnect from the broker cleanly.
    ///
    /// This will cancel [EdgeNode::run]. The explicit NDEATH publish pairs
    /// with the session's NBIRTH; the armed will does not fire because the
    /// disconnect is graceful.
    pub async fn cancel(&self) {
        info!("Edge node stopping. Node = {}", self.node.state.edge_node_id);
        let devices = self.node.devices.lock().unwrap().snapshot();
        for device in devices {
            device.death(true).await;
        }
        let payload = self.node.generate_death_payload();
        match self
            .node
            .client
            .try_publish_node_message(self.node.state.death_topic(), payload)
            .await
        {
            Ok(_) => (),
            Err(_) => debug!("Unable to publish node death certificate on exit"),
        };
        _ = self.node.stop_tx.send(EonShutdown).await;
        _ = self.node.client.disconnect().await;
    }

    /// Manually trigger a rebirth for the node and all its devices.
    pub async fn rebirth(&self) {
        self.node.birth(BirthType::Rebirth).await;
    }

    /// Registers a new device with the node and, when the session is live,
    /// publishes its DBIRTH.
    ///
    /// Returns an error if a device with the same name is already registered,
    /// the name is not a valid topic component, or the birth set is invalid.
    pub async fn register_device<S: Into<String>>(
        &self,
        name: S,
        birth_metrics: Vec<Metric>,
    ) -> Result<(), DeviceRegistrationError> {
        let name = name.into();
        validate_component(&name).map_err(DeviceRegistrationError::InvalidName)?;
        let device = self.node.devices.lock().unwrap().add_device(
            name,
            birth_metrics,
            self.node.state.clone(),
            self.node.client.clone(),
        )?;
        if self.node.state.check_publish_state().is_ok() {
            device.birth(BirthType::Birth).await;
        }
        Ok(())
    }

    /// Remove a device from the node, sending a DDEATH when the session is
    /// live.
    pub async fn deregister_device(&self, name: &str) -> Result<(), PublishError> {
        let device = self
            .node
            .devices
            .lock()
            .unwrap()
            .remove(name)
            .ok_or_else(|| PublishError::UnknownDevice(name.to_string()))?;
        device.death(true).await;
        Ok(())
    }

    /// Publish an NDATA update for some (or all) of the node's birth metrics.
    ///
    /// Metrics that did not appear in the NBIRTH, or whose datatype differs
    /// from the birth declaration, are rejected and nothing is published.
    pub async fn update(&self, metrics: Vec<Metric>) -> Result<(), PublishError> {
        if metrics.is_empty() {
            return Err(PublishError::NoMetrics);
        }
        self.node.state.check_publish_state()?;
        /* build the payload under the store lock, publish outside it */
        let payload = {
            let mut store = self.node.metrics.lock().unwrap();
            store.update(&metrics)?;
            Data {
                timestamp: timestamp(),
                seq: self.node.state.next_seq(),
                metrics,
            }
            .into_payload()?
        };
        self.node
            .client
            .publish_node_message(self.node.state.ndata_topic.clone(), payload)
            .await
            .map_err(|_| PublishError::State(StateError::Offline))
    }

    /// Publish a DDATA update on the device's own topic, using the node's
    /// shared sequence counter.
    pub async fn update_device(
        &self,
        device_id: &str,
        metrics: Vec<Metric>,
    ) -> Result<(), PublishError> {
        if metrics.is_empty() {
            return Err(PublishError::NoMetrics);
        }
        self.node.state.check_publish_state()?;
        let device = self
            .node
            .devices
            .lock()
            .unwrap()
            .get(device_id)
            .ok_or_else(|| PublishError::UnknownDevice(device_id.to_string()))?;
        device.update(metrics).await
    }
}

pub(crate) struct Node {
    pub(crate) state: Arc<EonState>,
    pub(crate) client: Arc<DynClient>,
    pub(crate) devices: Mutex<DeviceMap>,
    metrics: Mutex<MetricStore>,
    config: EonConfig,
    ncmd_callback: Box<NCmdCallback>,
    dcmd_callback: Box<DCmdCallback>,
    stop_tx: Sender<EonShutdown>,
    last_node_rebirth_request: AtomicU64,
    // The birth guard stops a user driving a birth from the NodeHandle while
    // a death or birth is in progress due to an event from the event loop.
    birth_guard: tokio::sync::Mutex<()>,
}

impl Node {
    fn generate_birth_payload(&self) -> Result<Payload, PublishError> {
        let ts = timestamp();
        let birth_set = self.metrics.lock().unwrap().birth_metrics();
        let mut metrics = Vec::with_capacity(1 + birth_set.len());
        /* [tck-id-payloads-nbirth-bdseq] bdSeq pairs this birth with the
        armed will; it leads the metric set */
        metrics.push(Metric::new(BDSEQ, DataType::UInt64, self.state.bdseq()).with_timestamp(ts));
        metrics.extend(birth_set);

        let birth = Birth {
            timestamp: ts,
            seq: 0,
            metrics,
        };
        Ok(birth.into_payload()?)
    }

    async fn node_birth(&self) {
        /* [tck-id-topics-nbirth-seq-num] The NBIRTH MUST include a sequence
        number in the payload and it MUST have a value of 0. */
        self.state.birthed.store(false, Ordering::SeqCst);
        self.state.seq.store(0, Ordering::SeqCst);
        let payload = match self.generate_birth_payload() {
            Ok(payload) => payload,
            Err(e) => {
                error!("Unable to build node birth payload: {e}");
                return;
            }
        };
        let topic = self.state.birth_topic();
        self.state.seq.store(1, Ordering::SeqCst);
        match self.client.publish_node_message(topic, payload).await {
            Ok(_) => self.state.birthed.store(true, Ordering::SeqCst),
            Err(_) => error!("Publishing birth message failed"),
        }
    }

    async fn birth(&self, birth_type: BirthType) {
        let guard = self.birth_guard.lock().await;
        info!(
            "Birthing node. Node = {}, Type = {:?}",
            self.state.edge_node_id, birth_type
        );
        self.node_birth().await;
        if self.state.birthed() {
            let devices = self.devices.lock().unwrap().snapshot();
            for device in devices {
                device.birth(birth_type).await;
            }
        }
        drop(guard)
    }

    fn mark_death(&self) {
        self.state.birthed.store(false, Ordering::SeqCst);
        self.state.bdseq.fetch_add(1, Ordering::SeqCst);
        let devices = self.devices.lock().unwrap().snapshot();
        for device in devices {
            device.mark_unbirthed();
        }
    }

    async fn on_online(&self) {
        if self.state.online.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Edge node online. Node = {}", self.state.edge_node_id);
        if self.client.subscribe_many(self.state.sub_topics()).await.is_ok() {
            self.birth(BirthType::Birth).await
        }
    }

    async fn on_offline(&self, will_sender: oneshot::Sender<LastWill>) {
        if !self.state.online.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("Edge node offline. Node = {}", self.state.edge_node_id);
        self.mark_death();
        _ = will_sender.send(self.create_last_will());
    }

    async fn on_node_message(&self, message: NodeMessage) {
        let PayloadKind::NCmd(cmd) = message.payload else {
            return;
        };
        let rebirth = cmd.metrics.iter().any(|metric| {
            let Some(name) = &metric.name else {
                return false;
            };
            if name != NODE_CONTROL_REBIRTH {
                return false;
            }
            match metric.value {
                Some(MetricValue::Boolean(true)) => true,
                _ => {
                    warn!("Received invalid CMD Rebirth metric - ignoring request");
                    false
                }
            }
        });
        (self.ncmd_callback)(cmd);
        if rebirth {
            let now = timestamp();
            let time_since_last =
                now.saturating_sub(self.last_node_rebirth_request.load(Ordering::Relaxed));
            if time_since_last < self.config.node_rebirth_request_cooldown.as_millis() as u64 {
                info!("Got Rebirth CMD but cooldown time not expired. Ignoring");
                return;
            }
            info!("Got Rebirth CMD - Rebirthing Node");
            self.birth(BirthType::Rebirth).await;
            self.last_node_rebirth_request.store(now, Ordering::Relaxed);
        }
    }

    async fn on_device_message(&self, message: DeviceMessage) {
        let PayloadKind::DCmd(cmd) = message.payload else {
            return;
        };
        if !self.devices.lock().unwrap().contains(&message.device_id) {
            warn!("Received DCMD for unknown device {}", message.device_id);
            return;
        }
        (self.dcmd_callback)(&message.device_id, cmd);
    }

    fn generate_death_payload(&self) -> Payload {
        let mut metric = payload::Metric::new();
        metric
            .set_name(BDSEQ.to_string())
            .set_datatype(DataType::UInt64)
            .set_timestamp(timestamp())
            .set_value(payload::metric::Value::LongValue(self.state.bdseq()));
        Payload {
            timestamp: Some(timestamp()),
            metrics: vec![metric],
            seq: None,
            uuid: None,
            body: None,
        }
    }

    fn create_last_will(&self) -> LastWill {
        LastWill::new_node(
            &self.state.group_id,
            &self.state.edge_node_id,
            self.generate_death_payload(),
        )
    }
}

enum EonNodeMessage {
    Stopped,
    Online,
    SparkplugMessage(NodeMessage),
    SparkplugDeviceMessage(DeviceMessage),
    Offline(oneshot::Sender<LastWill>),
}

/// Structure that represents a Sparkplug Edge Node instance.
///
/// See [EdgeNodeBuilder] on how to create an [EdgeNode] instance.
pub struct EdgeNode {
    eventloop: Box<DynEventLoop>,
    node: Arc<Node>,
    stop_rx: mpsc::Receiver<EonShutdown>,
}

impl EdgeNode {
    pub(crate) fn new_from_builder(
        builder: EdgeNodeBuilder,
    ) -> Result<(Self, NodeHandle), String> {
        let group_id = builder
            .group_id
            .ok_or("group id must be provided".to_string())?;
        let node_id = builder
            .node_id
            .ok_or("node id must be provided".to_string())?;
        validate_component(&group_id).map_err(|e| e.to_string())?;
        validate_component(&node_id).map_err(|e| e.to_string())?;

        let metrics = MetricStore::new(builder.birth_metrics).map_err(|e| e.to_string())?;
        let (eventloop, client) = builder.eventloop_client;
        let (stop_tx, stop_rx) = mpsc::channel(1);

        let state = Arc::new(EonState {
            seq: AtomicU8::new(0),
            bdseq: AtomicU64::new(0),
            online: AtomicBool::new(false),
            birthed: AtomicBool::new(false),
            ndata_topic: NodeTopic::new(&group_id, MessageType::NData, &node_id),
            group_id,
            edge_node_id: node_id,
        });

        let node = Arc::new(Node {
            state,
            client,
            devices: Mutex::new(DeviceMap::new()),
            metrics: Mutex::new(metrics),
            config: EonConfig {
                node_rebirth_request_cooldown: builder.node_rebirth_request_cooldown,
            },
            ncmd_callback: builder
                .ncmd_callback
                .unwrap_or_else(|| Box::new(|cmd: Cmd| info!("Received node command {cmd:?}"))),
            dcmd_callback: builder.dcmd_callback.unwrap_or_else(|| {
                Box::new(|device_id: &str, cmd: Cmd| {
                    info!("Received device command for {device_id}: {cmd:?}")
                })
            }),
            stop_tx,
            last_node_rebirth_request: AtomicU64::new(0),
            birth_guard: tokio::sync::Mutex::new(()),
        });

        let eon = Self {
            node,
            eventloop,
            stop_rx,
        };
        let handle = NodeHandle {
            node: eon.node.clone(),
        };
        Ok((eon, handle))
    }

    fn update_last_will(&mut self, lastwill: LastWill) {
        self.eventloop.set_last_will(lastwill);
    }

    async fn on_offline(&mut self, node_tx: &UnboundedSender<EonNodeMessage>) {
        let (lastwill_tx, lastwill_rx) = oneshot::channel();
        _ = node_tx.send(EonNodeMessage::Offline(lastwill_tx));
        if let Ok(will) = lastwill_rx.await {
            self.update_last_will(will)
        }
    }

    async fn handle_event(&mut self, event: Event, node_tx: &UnboundedSender<EonNodeMessage>) {
        match event {
            Event::Online => _ = node_tx.send(EonNodeMessage::Online),
            Event::Offline => self.on_offline(node_tx).await,
            Event::Node(node_message) => {
                _ = node_tx.send(EonNodeMessage::SparkplugMessage(node_message))
            }
            Event::Device(device_message) => {
                _ = node_tx.send(EonNodeMessage::SparkplugDeviceMessage(device_message))
            }
            Event::State { .. } => (),
            Event::InvalidPublish { .. } => (),
        }
    }

    async fn poll_until_offline(&mut self, node_tx: &UnboundedSender<EonNodeMessage>) {
        while self.node.state.is_online() {
            match self.eventloop.poll().await {
                Some(Event::Offline) => {
                    self.on_offline(node_tx).await;
                    break;
                }
                Some(_) => (),
                None => break,
            }
        }
    }

    /// Run the Edge Node
    ///
    /// Runs the Edge Node until [NodeHandle::cancel] is called
    pub async fn run(&mut self) {
        info!("Edge node running. Node = {}", self.node.state.edge_node_id);

        let (node_tx, mut node_rx) = mpsc::unbounded_channel();

        self.update_last_will(self.node.create_last_will());

        let node = self.node.clone();
        task::spawn(async move {
            while let Some(msg) = node_rx.recv().await {
                match msg {
                    EonNodeMessage::Online => node.on_online().await,
                    EonNodeMessage::Offline(sender) => node.on_offline(sender).await,
                    EonNodeMessage::SparkplugMessage(message) => {
                        node.on_node_message(message).await
                    }
                    EonNodeMessage::SparkplugDeviceMessage(message) => {
                        node.on_device_message(message).await
                    }
                    EonNodeMessage::Stopped => break,
                }
            }
        });

        loop {
            select! {
              event = self.eventloop.poll() => match event {
                Some(event) => self.handle_event(event, &node_tx).await,
                None => break,
              },
              Some(_) = self.stop_rx.recv() => break,
            }
        }

        if timeout(Duration::from_secs(1), self.poll_until_offline(&node_tx))
            .await
            .is_err()
        {
            self.on_offline(&node_tx).await;
        }

        _ = node_tx.send(EonNodeMessage::Stopped);
        info!("Edge node stopped. Node = {}", self.node.state.edge_node_id);
    }
}
