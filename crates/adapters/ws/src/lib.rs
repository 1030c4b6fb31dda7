//! # ovenctl-adapter-ws
//!
//! Websocket cloud transport — bridges the vendor's command/telemetry
//! channel into ovenctl.
//!
//! Deliberately thin: it authenticates with a bearer token, frames
//! [`WireCommand`]s into JSON envelopes, and translates pushed device lists
//! and state events into the [`Transport`] port vocabulary. All protocol
//! parsing is in [`codec`], which is pure and unit-tested; this module only
//! owns the socket lifecycle.
//!
//! ## Dependency rule
//!
//! Depends on `ovenctl-app` (port traits) and `ovenctl-domain` only.

pub mod codec;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt as _, StreamExt as _};
use tokio::sync::{broadcast, mpsc, oneshot, Notify};
use tokio_tungstenite::tungstenite::Message;

use ovenctl_app::dispatcher::WireCommand;
use ovenctl_app::ports::{DeviceUpdate, Transport};
use ovenctl_domain::device::{CookerId, Device};
use ovenctl_domain::error::{CommandError, ConfigurationError, OvenError};

use codec::Incoming;

/// Connection settings for the cloud channel.
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Websocket endpoint, `ws://` or `wss://`.
    pub url: String,
    /// Account bearer token.
    pub token: String,
    /// How long to wait for the socket to open.
    pub connect_timeout: Duration,
    /// How long to wait for a command acknowledgement.
    pub ack_timeout: Duration,
}

struct Shared {
    devices: Mutex<Vec<Device>>,
    device_list_seen: Notify,
    acks: Mutex<HashMap<String, oneshot::Sender<Option<String>>>>,
}

/// Websocket-backed [`Transport`].
pub struct WsTransport {
    outbound: mpsc::Sender<Message>,
    shared: Arc<Shared>,
    telemetry_tx: broadcast::Sender<DeviceUpdate>,
    ack_timeout: Duration,
}

impl WsTransport {
    /// Validate the configuration and open the cloud connection.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] for a missing token or malformed url
    /// (fatal, before any connection attempt), or [`CommandError::Transport`]
    /// when the socket cannot be opened within the connect timeout.
    pub async fn connect(config: WsConfig) -> Result<Self, OvenError> {
        if config.token.is_empty() {
            return Err(ConfigurationError::MissingToken.into());
        }
        if !config.url.starts_with("ws://") && !config.url.starts_with("wss://") {
            return Err(ConfigurationError::InvalidUrl { url: config.url }.into());
        }

        let url = format!("{}?token={}&supportedAccessories=APO", config.url, config.token);
        let (socket, _response) =
            tokio::time::timeout(config.connect_timeout, tokio_tungstenite::connect_async(&url))
                .await
                .map_err(|_| CommandError::Transport("connect timed out".into()))?
                .map_err(|err| CommandError::Transport(err.to_string()))?;
        tracing::info!(url = %config.url, "connected to appliance cloud");

        let (mut ws_tx, mut ws_rx) = socket.split();
        let (outbound, mut outbound_rx) = mpsc::channel::<Message>(32);
        let (telemetry_tx, _) = broadcast::channel(64);
        let shared = Arc::new(Shared {
            devices: Mutex::new(Vec::new()),
            device_list_seen: Notify::new(),
            acks: Mutex::new(HashMap::new()),
        });

        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if let Err(err) = ws_tx.send(message).await {
                    tracing::warn!(%err, "websocket writer stopped");
                    break;
                }
            }
        });

        let reader_shared = Arc::clone(&shared);
        let reader_telemetry = telemetry_tx.clone();
        tokio::spawn(async move {
            while let Some(message) = ws_rx.next().await {
                let text = match message {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => continue,
                };
                match codec::parse_frame(&text) {
                    Some(Incoming::Response { request_id, error }) => {
                        let waiter = reader_shared
                            .acks
                            .lock()
                            .expect("ack table poisoned")
                            .remove(&request_id);
                        if let Some(waiter) = waiter {
                            let _ = waiter.send(error);
                        }
                    }
                    Some(Incoming::DeviceList(devices)) => {
                        *reader_shared.devices.lock().expect("device list poisoned") = devices;
                        reader_shared.device_list_seen.notify_waiters();
                    }
                    Some(Incoming::StateEvent(update)) => {
                        let _ = reader_telemetry.send(update);
                    }
                    None => {}
                }
            }
            tracing::info!("websocket reader stopped");
        });

        Ok(Self {
            outbound,
            shared,
            telemetry_tx,
            ack_timeout: config.ack_timeout,
        })
    }

    fn devices_snapshot(&self) -> Vec<Device> {
        self.shared.devices.lock().expect("device list poisoned").clone()
    }
}

impl Transport for WsTransport {
    fn discover(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<Device>, OvenError>> + Send {
        async move {
            // The cloud pushes the paired-device list shortly after the
            // socket opens; wait for the first push or the deadline.
            let pushed = self.shared.device_list_seen.notified();
            let snapshot = self.devices_snapshot();
            if !snapshot.is_empty() {
                return Ok(snapshot);
            }
            let _ = tokio::time::timeout(timeout, pushed).await;
            Ok(self.devices_snapshot())
        }
    }

    fn send(
        &self,
        device_id: &CookerId,
        command: WireCommand,
    ) -> impl Future<Output = Result<(), CommandError>> + Send {
        let (request_id, frame) = codec::encode_envelope(device_id, &command);
        async move {
            let (ack_tx, ack_rx) = oneshot::channel();
            self.shared
                .acks
                .lock()
                .expect("ack table poisoned")
                .insert(request_id.clone(), ack_tx);

            let sent = self
                .outbound
                .send(Message::Text(frame.to_string()))
                .await;
            if sent.is_err() {
                self.shared
                    .acks
                    .lock()
                    .expect("ack table poisoned")
                    .remove(&request_id);
                return Err(CommandError::Transport("connection closed".into()));
            }

            match tokio::time::timeout(self.ack_timeout, ack_rx).await {
                Ok(Ok(None)) => Ok(()),
                Ok(Ok(Some(reason))) => Err(CommandError::Rejected { reason }),
                Ok(Err(_closed)) => Err(CommandError::Transport("connection closed".into())),
                Err(_elapsed) => {
                    self.shared
                        .acks
                        .lock()
                        .expect("ack table poisoned")
                        .remove(&request_id);
                    Err(CommandError::Transport("acknowledgement timed out".into()))
                }
            }
        }
    }

    fn telemetry(&self) -> broadcast::Receiver<DeviceUpdate> {
        self.telemetry_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str, token: &str) -> WsConfig {
        WsConfig {
            url: url.to_string(),
            token: token.to_string(),
            connect_timeout: Duration::from_millis(100),
            ack_timeout: Duration::from_millis(100),
        }
    }

    #[tokio::test]
    async fn should_fail_fast_without_a_token() {
        let result = WsTransport::connect(config("wss://example.invalid", "")).await;
        assert!(matches!(
            result,
            Err(OvenError::Configuration(ConfigurationError::MissingToken))
        ));
    }

    #[tokio::test]
    async fn should_reject_non_websocket_urls() {
        let result = WsTransport::connect(config("https://example.invalid", "token")).await;
        assert!(matches!(
            result,
            Err(OvenError::Configuration(
                ConfigurationError::InvalidUrl { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn should_surface_unreachable_endpoints_as_transport_errors() {
        let result = WsTransport::connect(config("ws://127.0.0.1:1", "token")).await;
        assert!(matches!(
            result,
            Err(OvenError::Command(CommandError::Transport(_)))
        ));
    }
}
