use std::sync::Arc;
use std::time::Duration;

use edgeplug_client::{Client, DynClient, DynEventLoop, EventLoop};
use edgeplug_types::Metric;

use crate::{DCmdCallback, EdgeNode, NCmdCallback, NodeHandle};

/// A builder for creating and configuring [EdgeNode] instances.
pub struct EdgeNodeBuilder {
    pub(crate) group_id: Option<String>,
    pub(crate) node_id: Option<String>,
    pub(crate) birth_metrics: Vec<Metric>,
    pub(crate) eventloop_client: (Box<DynEventLoop>, Arc<DynClient>),
    pub(crate) ncmd_callback: Option<Box<NCmdCallback>>,
    pub(crate) dcmd_callback: Option<Box<DCmdCallback>>,
    pub(crate) node_rebirth_request_cooldown: Duration,
}

impl EdgeNodeBuilder {
    /// Creates a new builder with the specified event loop and client.
    pub fn new<E: EventLoop + Send + 'static, C: Client + Send + Sync + 'static>(
        eventloop: E,
        client: C,
    ) -> Self {
        Self {
            group_id: None,
            node_id: None,
            birth_metrics: Vec::new(),
            eventloop_client: (Box::new(eventloop), Arc::new(client)),
            ncmd_callback: None,
            dcmd_callback: None,
            node_rebirth_request_cooldown: Duration::ZERO,
        }
    }

    /// Sets the group ID for the node.
    ///
    /// The group ID identifies the group to which this node belongs.
    pub fn with_group_id<S: Into<String>>(mut self, group_id: S) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Sets the node ID.
    ///
    /// The node ID uniquely identifies this node within its group.
    pub fn with_node_id<S: Into<String>>(mut self, node_id: S) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    /// Sets the node's birth metric set: the metrics announced in every
    /// NBIRTH and the only metrics [NodeHandle::update] may touch.
    pub fn with_birth_metrics(mut self, metrics: Vec<Metric>) -> Self {
        self.birth_metrics = metrics;
        self
    }

    /// Callback invoked with every NCMD addressed to the node. Rebirth
    /// requests are handled by the node itself, before the callback runs.
    pub fn with_ncmd_callback<F: Fn(edgeplug_types::kinds::Cmd) + Send + Sync + 'static>(
        mut self,
        callback: F,
    ) -> Self {
        self.ncmd_callback = Some(Box::new(callback));
        self
    }

    /// Callback invoked with every DCMD addressed to a registered device.
    pub fn with_dcmd_callback<
        F: Fn(&str, edgeplug_types::kinds::Cmd) + Send + Sync + 'static,
    >(
        mut self,
        callback: F,
    ) -> Self {
        self.dcmd_callback = Some(Box::new(callback));
        self
    }

    /// Minimum time between honored NCMD rebirth requests. Zero disables the
    /// cooldown.
    pub fn with_rebirth_request_cooldown(mut self, cooldown: Duration) -> Self {
        self.node_rebirth_request_cooldown = cooldown;
        self
    }

    /// Builds the node with the configured settings.
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn build(self) -> Result<(EdgeNode, NodeHandle), String> {
        EdgeNode::new_from_builder(self)
    }
}
