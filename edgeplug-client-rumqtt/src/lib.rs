mod client;
mod options;

pub use client::{Client, EventLoop};
pub use options::{MqttOptions, MqttProtocol, OptionsError, TlsOptions, Transport, WsOptions};
