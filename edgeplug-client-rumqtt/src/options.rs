use std::path::PathBuf;
use std::time::Duration;

use edgeplug_types::constants::{DEFAULT_CLIENT_KEEPALIVE_SECS, DEFAULT_CLIENT_PORT};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("MQTT protocol {0:?} is not supported by this client")]
    UnsupportedProtocol(MqttProtocol),
    #[error("TLS transport requires a CA certificate file")]
    MissingCaCertificate,
    #[error("Unable to read {path}: {err}")]
    ReadCertificate {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
}

/// MQTT protocol revision. rumqttc speaks 3.1.1 only; requesting 3.1 fails
/// at options conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MqttProtocol {
    V31,
    V311,
}

/// TLS settings for `tls` and `wss` transports.
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    /// PEM file with the certificate authorities to trust.
    pub ca_file: Option<PathBuf>,
    /// PEM client certificate and key files for mutual TLS.
    pub client_auth: Option<(PathBuf, PathBuf)>,
    pub alpn: Option<Vec<Vec<u8>>>,
}

/// Websocket settings for `ws` and `wss` transports.
#[derive(Debug, Clone)]
pub struct WsOptions {
    /// The MQTT endpoint path on the broker.
    pub path: String,
}

impl Default for WsOptions {
    fn default() -> Self {
        Self {
            path: "/mqtt".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Transport {
    Tcp,
    Tls(TlsOptions),
    Ws(WsOptions),
    Wss(WsOptions, TlsOptions),
}

/// Connection options for the rumqttc client.
pub struct MqttOptions {
    pub broker_addr: String,
    pub port: u16,
    pub client_id: String,
    pub protocol: MqttProtocol,
    pub transport: Transport,
    pub credentials: Option<(String, String)>,
    pub keepalive: Duration,
}

impl MqttOptions {
    pub fn new<S: Into<String>, S1: Into<String>>(client_id: S, addr: S1, port: u16) -> Self {
        Self {
            broker_addr: addr.into(),
            port,
            client_id: client_id.into(),
            protocol: MqttProtocol::V311,
            transport: Transport::Tcp,
            credentials: None,
            keepalive: Duration::from_secs(DEFAULT_CLIENT_KEEPALIVE_SECS),
        }
    }

    pub fn new_default_port<S: Into<String>, S1: Into<String>>(client_id: S, addr: S1) -> Self {
        Self::new(client_id, addr, DEFAULT_CLIENT_PORT)
    }

    pub fn with_credentials<S: Into<String>, S1: Into<String>>(
        mut self,
        username: S,
        password: S1,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    pub fn with_keepalive(mut self, keepalive: Duration) -> Self {
        self.keepalive = keepalive;
        self
    }

    pub fn with_protocol(mut self, protocol: MqttProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Build the rumqttc options. Some settings are forced for Sparkplug
    /// compliance: a session must not outlive the connection, so clean
    /// session is always set.
    pub(crate) fn into_rumqtt(self) -> Result<rumqttc::MqttOptions, OptionsError> {
        if self.protocol != MqttProtocol::V311 {
            return Err(OptionsError::UnsupportedProtocol(self.protocol));
        }

        let broker_addr = match &self.transport {
            Transport::Tcp | Transport::Tls(_) => self.broker_addr.clone(),
            Transport::Ws(ws) => format!("ws://{}:{}{}", self.broker_addr, self.port, ws.path),
            Transport::Wss(ws, _) => {
                format!("wss://{}:{}{}", self.broker_addr, self.port, ws.path)
            }
        };

        let mut options = rumqttc::MqttOptions::new(self.client_id, broker_addr, self.port);
        options.set_keep_alive(self.keepalive);
        options.set_clean_session(true);
        if let Some((username, password)) = self.credentials {
            options.set_credentials(username, password);
        }
        match self.transport {
            Transport::Tcp => {
                options.set_transport(rumqttc::Transport::Tcp);
            }
            Transport::Tls(tls) => {
                options.set_transport(rumqttc::Transport::Tls(tls_configuration(tls)?));
            }
            Transport::Ws(_) => {
                options.set_transport(rumqttc::Transport::Ws);
            }
            Transport::Wss(_, tls) => {
                options.set_transport(rumqttc::Transport::Wss(tls_configuration(tls)?));
            }
        }
        Ok(options)
    }
}

fn read_pem(path: PathBuf) -> Result<Vec<u8>, OptionsError> {
    std::fs::read(&path).map_err(|err| OptionsError::ReadCertificate { path, err })
}

fn tls_configuration(tls: TlsOptions) -> Result<rumqttc::TlsConfiguration, OptionsError> {
    let ca = match tls.ca_file {
        Some(path) => read_pem(path)?,
        None => return Err(OptionsError::MissingCaCertificate),
    };
    let client_auth = match tls.client_auth {
        Some((cert_path, key_path)) => Some((read_pem(cert_path)?, read_pem(key_path)?)),
        None => None,
    };
    Ok(rumqttc::TlsConfiguration::Simple {
        ca,
        alpn: tls.alpn,
        client_auth,
    })
}
