use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::error;

use edgeplug_client::DynClient;
use edgeplug_types::kinds::{Birth, Data, DeviceDeath};
use edgeplug_types::payload::Payload;
use edgeplug_types::topic::{DeviceTopic, MessageType};
use edgeplug_types::utils::timestamp;
use edgeplug_types::Metric;

use crate::error::{DeviceRegistrationError, PublishError, StateError};
use crate::node::{BirthType, EonState};
use crate::store::MetricStore;

/// A device attached to an edge node. Device publishes draw from the node's
/// shared sequence counter and session.
pub(crate) struct Device {
    pub(crate) name: String,
    birthed: AtomicBool,
    metrics: Mutex<MetricStore>,
    // Serializes birth/death publishes for this device against each other.
    birth_lock: tokio::sync::Mutex<()>,
    eon_state: Arc<EonState>,
    client: Arc<DynClient>,
    ddata_topic: DeviceTopic,
}

impl Device {
    fn topic(&self, message_type: MessageType) -> DeviceTopic {
        DeviceTopic::new(
            &self.eon_state.group_id,
            message_type,
            &self.eon_state.edge_node_id,
            &self.name,
        )
    }

    fn generate_birth_payload(&self) -> Result<Payload, PublishError> {
        let metrics = self.metrics.lock().unwrap().birth_metrics();
        let birth = Birth {
            timestamp: timestamp(),
            seq: self.eon_state.next_seq(),
            metrics,
        };
        Ok(birth.into_payload()?)
    }

    fn generate_death_payload(&self) -> Payload {
        DeviceDeath {
            timestamp: timestamp(),
            seq: self.eon_state.next_seq(),
        }
        .into_payload()
    }

    pub(crate) async fn birth(&self, birth_type: BirthType) {
        let guard = self.birth_lock.lock().await;
        if !self.eon_state.birthed() {
            return;
        }
        if birth_type == BirthType::Birth && self.birthed.load(Ordering::SeqCst) {
            return;
        }
        let payload = match self.generate_birth_payload() {
            Ok(payload) => payload,
            Err(e) => {
                error!("Unable to build device birth payload. Device = {}: {e}", self.name);
                return;
            }
        };
        match self
            .client
            .publish_device_message(self.topic(MessageType::DBirth), payload)
            .await
        {
            Ok(_) => self.birthed.store(true, Ordering::SeqCst),
            Err(_) => error!("Publishing device birth failed. Device = {}", self.name),
        }
        drop(guard)
    }

    pub(crate) async fn death(&self, publish: bool) {
        let guard = self.birth_lock.lock().await;
        if !self.birthed.load(Ordering::SeqCst) {
            return;
        }
        if publish {
            let payload = self.generate_death_payload();
            if self
                .client
                .publish_device_message(self.topic(MessageType::DDeath), payload)
                .await
                .is_err()
            {
                error!("Publishing device death failed. Device = {}", self.name)
            }
        }
        self.birthed.store(false, Ordering::SeqCst);
        drop(guard)
    }

    /// The session ended without a clean device death on the wire.
    pub(crate) fn mark_unbirthed(&self) {
        self.birthed.store(false, Ordering::SeqCst)
    }

    pub(crate) async fn update(&self, metrics: Vec<Metric>) -> Result<(), PublishError> {
        if !self.birthed.load(Ordering::SeqCst) {
            return Err(StateError::UnBirthed.into());
        }
        let payload = {
            let mut store = self.metrics.lock().unwrap();
            store.update(&metrics)?;
            Data {
                timestamp: timestamp(),
                seq: self.eon_state.next_seq(),
                metrics,
            }
            .into_payload()?
        };
        self.client
            .publish_device_message(self.ddata_topic.clone(), payload)
            .await
            .map_err(|_| PublishError::State(StateError::Offline))
    }
}

/// The device registry of an edge node.
///
/// Kept behind the node's mutex; paths that publish for every device
/// ([snapshot](DeviceMap::snapshot)) copy the list out under the lock and
/// iterate the copy, so user tasks can register and deregister devices while
/// a (re)birth fan-out is in flight.
pub(crate) struct DeviceMap {
    devices: Vec<Arc<Device>>,
}

impl DeviceMap {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
        }
    }

    pub fn add_device(
        &mut self,
        name: String,
        birth_metrics: Vec<Metric>,
        eon_state: Arc<EonState>,
        client: Arc<DynClient>,
    ) -> Result<Arc<Device>, DeviceRegistrationError> {
        if self.devices.iter().any(|d| d.name == name) {
            return Err(DeviceRegistrationError::DuplicateDevice);
        }
        let metrics = MetricStore::new(birth_metrics)?;
        let ddata_topic = DeviceTopic::new(
            &eon_state.group_id,
            MessageType::DData,
            &eon_state.edge_node_id,
            &name,
        );
        let device = Arc::new(Device {
            name,
            birthed: AtomicBool::new(false),
            metrics: Mutex::new(metrics),
            birth_lock: tokio::sync::Mutex::new(()),
            eon_state,
            client,
            ddata_topic,
        });
        self.devices.push(device.clone());
        Ok(device)
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<Device>> {
        let index = self.devices.iter().position(|d| d.name == name)?;
        Some(self.devices.remove(index))
    }

    pub fn get(&self, name: &str) -> Option<Arc<Device>> {
        self.devices.iter().find(|d| d.name == name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.devices.iter().any(|d| d.name == name)
    }

    /// Copy of the registry in registration order.
    pub fn snapshot(&self) -> Vec<Arc<Device>> {
        self.devices.clone()
    }
}
