mod builder;
mod device;
mod error;
mod node;
mod store;

pub use builder::EdgeNodeBuilder;
pub use error::{BirthSetError, DeviceRegistrationError, PublishError, StateError};
pub use node::{EdgeNode, NodeHandle};

/// Callback invoked with NCMD payloads addressed to the node.
pub type NCmdCallback = dyn Fn(edgeplug_types::kinds::Cmd) + Send + Sync;
/// Callback invoked with DCMD payloads; the first argument is the device id.
pub type DCmdCallback = dyn Fn(&str, edgeplug_types::kinds::Cmd) + Send + Sync;
