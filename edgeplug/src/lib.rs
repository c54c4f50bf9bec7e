//! Sparkplug B for Rust.
//!
//! `edgeplug` implements the Eclipse Sparkplug B specification on top of
//! MQTT 3.1.1: the payload codec, the topic namespace, and the edge node
//! session lifecycle (birth/death certificates, sequence numbers, rebirth
//! handling).
//!
//! # Example
//!
//! ```no_run
//! use edgeplug::client::rumqtt;
//! use edgeplug::eon::EdgeNodeBuilder;
//! use edgeplug::types::payload::DataType;
//! use edgeplug::types::Metric;
//!
//! #[tokio::main]
//! async fn main() {
//!     let options = rumqtt::MqttOptions::new("edgeplug-demo", "localhost", 1883);
//!     let (eventloop, client) = rumqtt::EventLoop::new(options, 10).unwrap();
//!
//!     let (mut node, handle) = EdgeNodeBuilder::new(eventloop, client)
//!         .with_group_id("factory")
//!         .with_node_id("line1")
//!         .with_birth_metrics(vec![Metric::new("Temperature", DataType::Double, 20.5f64)])
//!         .build()
//!         .unwrap();
//!
//!     tokio::spawn(async move { node.run().await });
//!
//!     handle
//!         .update(vec![Metric::new("Temperature", DataType::Double, 21.0f64)])
//!         .await
//!         .unwrap();
//!     handle.cancel().await;
//! }
//! ```

pub use edgeplug_eon as eon;
pub use edgeplug_types as types;
pub mod client {
    pub use edgeplug_client::*;

    pub mod rumqtt {
        pub use edgeplug_client_rumqtt::*;
    }
}

/// Library version, baked in at compile time.
pub const VERSION: &str = edgeplug_types::constants::VERSION;
