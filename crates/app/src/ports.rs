//! Transport port — the boundary between the session and the network.
//!
//! A transport bridges the vendor's command/telemetry channel (cloud
//! websocket, simulated oven, …) into the system. The session only needs
//! three operations: discovery, command delivery, and a telemetry stream.

use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast;

use ovenctl_domain::device::{CookerId, Device, DeviceState};
use ovenctl_domain::error::{CommandError, OvenError};
use ovenctl_domain::temperature::Temperature;

use crate::dispatcher::WireCommand;

/// A device-state change reported by the appliance.
///
/// Fields are optional because the appliance reports them independently —
/// a temperature tick carries no lifecycle state and vice versa.
#[derive(Debug, Clone)]
pub struct DeviceUpdate {
    pub device_id: CookerId,
    pub state: Option<DeviceState>,
    pub temperature: Option<Temperature>,
}

/// Outbound port to the appliance's command/telemetry channel.
///
/// This is a **port** — implementations live in adapter crates
/// (e.g. the websocket cloud adapter, or the simulated oven used in tests).
pub trait Transport: Send + Sync {
    /// Wait up to `timeout` for paired appliances to respond.
    ///
    /// An empty result is a normal outcome, not an error — the session
    /// reports it as "no devices found".
    fn discover(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<Device>, OvenError>> + Send;

    /// Deliver one wire command to one appliance.
    ///
    /// Transient delivery failures must surface as
    /// [`CommandError::Transport`] so the session's retry loop can
    /// classify them; a refusal by the appliance is
    /// [`CommandError::Rejected`] and is never retried.
    fn send(
        &self,
        device_id: &CookerId,
        command: WireCommand,
    ) -> impl Future<Output = Result<(), CommandError>> + Send;

    /// Subscribe to device-state changes.
    ///
    /// Returns a receiver that gets all updates published *after* the
    /// subscription is created.
    fn telemetry(&self) -> broadcast::Receiver<DeviceUpdate>;
}

/// A shared reference is itself a transport, so callers can keep direct
/// access to an adapter (to inspect it, say) while a session drives it.
impl<T: Transport> Transport for &T {
    fn discover(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<Device>, OvenError>> + Send {
        (**self).discover(timeout)
    }

    fn send(
        &self,
        device_id: &CookerId,
        command: WireCommand,
    ) -> impl Future<Output = Result<(), CommandError>> + Send {
        (**self).send(device_id, command)
    }

    fn telemetry(&self) -> broadcast::Receiver<DeviceUpdate> {
        (**self).telemetry()
    }
}
