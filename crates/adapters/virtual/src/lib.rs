//! # ovenctl-adapter-virtual
//!
//! Simulated oven transport for testing and demonstration purposes.
//!
//! The virtual oven honors the command protocol: a start command moves the
//! device to `cooking`, a stop moves it back to `idle`, and every lifecycle
//! change is published on the telemetry channel. Transient transport
//! failures can be injected to exercise the session's retry loop, and every
//! delivered command is recorded for inspection.
//!
//! ## Dependency rule
//!
//! Depends on `ovenctl-app` (port traits) and `ovenctl-domain` only.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::broadcast;

use ovenctl_app::dispatcher::WireCommand;
use ovenctl_app::ports::{DeviceUpdate, Transport};
use ovenctl_domain::device::{CookerId, Device, DeviceState, HardwareRevision};
use ovenctl_domain::error::{CommandError, OvenError};

/// Simulated command/telemetry channel to a set of virtual ovens.
pub struct VirtualTransport {
    inner: Mutex<Inner>,
    telemetry_tx: broadcast::Sender<DeviceUpdate>,
    /// Simulated network latency before discovery answers.
    discovery_delay: Duration,
}

struct Inner {
    devices: Vec<Device>,
    sent: Vec<(CookerId, WireCommand)>,
    transient_failures: u32,
}

impl Default for VirtualTransport {
    /// Two simulated ovens: a current-generation `virtual-apo2` and a
    /// first-generation `virtual-apo1`.
    fn default() -> Self {
        Self::with_devices(vec![
            Device::builder("virtual-apo2")
                .name("Virtual Oven")
                .revision(HardwareRevision::V2)
                .build()
                .expect("static device definition"),
            Device::builder("virtual-apo1")
                .name("Virtual Oven (gen 1)")
                .revision(HardwareRevision::V1)
                .build()
                .expect("static device definition"),
        ])
    }
}

impl VirtualTransport {
    /// Create a transport backed by the given simulated devices.
    #[must_use]
    pub fn with_devices(devices: Vec<Device>) -> Self {
        let (telemetry_tx, _) = broadcast::channel(64);
        Self {
            inner: Mutex::new(Inner {
                devices,
                sent: Vec::new(),
                transient_failures: 0,
            }),
            telemetry_tx,
            discovery_delay: Duration::from_millis(10),
        }
    }

    /// Make the next `count` sends fail with a transient transport error.
    pub fn inject_failures(&self, count: u32) {
        self.inner.lock().expect("virtual state poisoned").transient_failures = count;
    }

    /// Every command delivered so far, in order.
    #[must_use]
    pub fn delivered(&self) -> Vec<(CookerId, WireCommand)> {
        self.inner.lock().expect("virtual state poisoned").sent.clone()
    }

    /// Push a telemetry update, mutating the simulated device to match.
    pub fn report(&self, update: DeviceUpdate) {
        {
            let mut inner = self.inner.lock().expect("virtual state poisoned");
            for device in inner.devices.iter_mut().filter(|d| d.id == update.device_id) {
                if let Some(state) = update.state {
                    device.state = state;
                }
                if let Some(temperature) = update.temperature {
                    device.current_temperature = Some(temperature);
                }
            }
        }
        let _ = self.telemetry_tx.send(update);
    }

    fn apply_command(&self, device_id: &CookerId, command: &WireCommand) -> Result<(), CommandError> {
        let new_state = match command {
            WireCommand::StartSimpleCook { .. } | WireCommand::StartProgram { .. } => {
                Some(DeviceState::Cooking)
            }
            WireCommand::StopCook => Some(DeviceState::Idle),
            WireCommand::SetProbe { .. } => None,
        };

        let mut inner = self.inner.lock().expect("virtual state poisoned");
        let device = inner
            .devices
            .iter_mut()
            .find(|d| &d.id == device_id)
            .ok_or_else(|| CommandError::Rejected {
                reason: format!("unknown device {device_id}"),
            })?;
        if let Some(state) = new_state {
            device.state = state;
        }
        inner.sent.push((device_id.clone(), command.clone()));
        drop(inner);

        if let Some(state) = new_state {
            let _ = self.telemetry_tx.send(DeviceUpdate {
                device_id: device_id.clone(),
                state: Some(state),
                temperature: None,
            });
        }
        Ok(())
    }
}

impl Transport for VirtualTransport {
    fn discover(
        &self,
        _timeout: Duration,
    ) -> impl Future<Output = Result<Vec<Device>, OvenError>> + Send {
        let delay = self.discovery_delay;
        let devices = self.inner.lock().expect("virtual state poisoned").devices.clone();
        async move {
            tokio::time::sleep(delay).await;
            Ok(devices)
        }
    }

    fn send(
        &self,
        device_id: &CookerId,
        command: WireCommand,
    ) -> impl Future<Output = Result<(), CommandError>> + Send {
        let result = {
            let mut inner = self.inner.lock().expect("virtual state poisoned");
            if inner.transient_failures > 0 {
                inner.transient_failures -= 1;
                Err(CommandError::Transport("simulated connection drop".into()))
            } else {
                Ok(())
            }
        }
        .and_then(|()| {
            tracing::debug!(device = %device_id, ?command, "virtual oven received command");
            self.apply_command(device_id, &command)
        });
        async move { result }
    }

    fn telemetry(&self) -> broadcast::Receiver<DeviceUpdate> {
        self.telemetry_tx.subscribe()
    }
}
