//! Device session — discovery, binding, and the command state machine.
//!
//! One logical session per appliance. The session serializes every command
//! to its bound device through a single async gate, in submission order:
//! the appliance protocol has no pipelining, and out-of-order delivery
//! could start a new cook while a stop is in flight. Discovery does not
//! take the gate, so it may run while a bound device is being commanded.
//!
//! State machine:
//!
//! ```text
//! Disconnected → Discovering → Discovered → Bound → Commanding → Bound …
//!                                                      ↓ (retries exhausted / close)
//!                                                 Disconnected
//! ```
//!
//! Transient transport failures are retried with exponential backoff up to
//! a bounded ceiling; exhaustion surfaces as
//! [`CommandError::RetriesExhausted`] and drops the session back to
//! `Disconnected`, forcing an explicit re-discovery.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::broadcast;

use ovenctl_domain::device::{CookerId, Device};
use ovenctl_domain::error::{CommandError, DeviceNotFoundError, OvenError};
use ovenctl_domain::plan::CookPlan;
use ovenctl_domain::temperature::Temperature;

use crate::dispatcher::{self, WireCommand};
use crate::ports::{DeviceUpdate, Transport};

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per command, including the first.
    pub max_attempts: u32,
    /// Backoff before the second attempt.
    pub initial_backoff: Duration,
    /// Backoff ceiling.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Backoff before attempt `attempt + 1` (attempts count from 1).
    fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Observable session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Discovering,
    Discovered,
    Bound,
    Commanding,
}

#[derive(Debug)]
struct SessionInner {
    state: SessionState,
    /// Snapshot of the last discovery result.
    devices: Vec<Device>,
    bound: Option<Device>,
}

/// Session driving one appliance through a [`Transport`].
pub struct DeviceSession<T> {
    transport: T,
    retry: RetryPolicy,
    inner: Mutex<SessionInner>,
    telemetry: Mutex<broadcast::Receiver<DeviceUpdate>>,
    /// Serializes all commands to the bound device.
    command_gate: tokio::sync::Mutex<()>,
}

impl<T: Transport> DeviceSession<T> {
    /// Create a session over the given transport.
    #[must_use]
    pub fn new(transport: T, retry: RetryPolicy) -> Self {
        let telemetry = transport.telemetry();
        Self {
            transport,
            retry,
            inner: Mutex::new(SessionInner {
                state: SessionState::Disconnected,
                devices: Vec::new(),
                bound: None,
            }),
            telemetry: Mutex::new(telemetry),
            command_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.lock().expect("session state poisoned").state
    }

    /// Snapshot of the last discovery result.
    #[must_use]
    pub fn devices(&self) -> Vec<Device> {
        self.inner
            .lock()
            .expect("session state poisoned")
            .devices
            .clone()
    }

    /// Snapshot of the bound device, if any.
    #[must_use]
    pub fn bound_device(&self) -> Option<Device> {
        self.apply_telemetry();
        self.inner
            .lock()
            .expect("session state poisoned")
            .bound
            .clone()
    }

    /// Discover paired appliances, waiting up to `timeout`.
    ///
    /// An empty result after the timeout is a normal outcome. Discovery is
    /// always explicit and caller-controlled — no other operation triggers
    /// it implicitly, so device-set snapshots stay consistent within one
    /// command sequence.
    #[tracing::instrument(skip(self))]
    pub async fn discover(&self, timeout: Duration) -> Result<Vec<Device>, OvenError> {
        self.transition(|inner| {
            if inner.bound.is_none() {
                inner.state = SessionState::Discovering;
            }
        });

        let devices = match tokio::time::timeout(timeout, self.transport.discover(timeout)).await {
            Ok(result) => result?,
            // The transport never answered: report no devices, not an error.
            Err(_elapsed) => Vec::new(),
        };

        tracing::debug!(count = devices.len(), "discovery finished");
        self.transition(|inner| {
            inner.devices.clone_from(&devices);
            if inner.bound.is_none() {
                inner.state = SessionState::Discovered;
            }
        });
        Ok(devices)
    }

    /// Bind the session to one device from the last discovery result.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceNotFoundError`] when `device_id` was not discovered.
    /// Never re-discovers implicitly.
    #[tracing::instrument(skip(self), fields(device = %device_id))]
    pub fn bind(&self, device_id: &CookerId) -> Result<Device, OvenError> {
        let mut inner = self.inner.lock().expect("session state poisoned");
        let device = inner
            .devices
            .iter()
            .find(|d| &d.id == device_id)
            .cloned()
            .ok_or_else(|| DeviceNotFoundError {
                id: device_id.to_string(),
            })?;
        inner.bound = Some(device.clone());
        inner.state = SessionState::Bound;
        Ok(device)
    }

    /// Close the session, dropping the discovery snapshot and binding.
    pub fn close(&self) {
        self.transition(|inner| {
            inner.devices.clear();
            inner.bound = None;
            inner.state = SessionState::Disconnected;
        });
    }

    /// Validate `plan` against the bound device and start it.
    ///
    /// Nothing is transmitted when validation fails or the device is not in
    /// a state accepting cook commands — an in-progress cook is never
    /// silently overridden.
    pub async fn start(&self, plan: &CookPlan) -> Result<(), OvenError> {
        self.start_with_deadline(plan, None).await
    }

    /// [`Self::start`] with a caller-specified deadline.
    ///
    /// When the deadline elapses after any command may already have been
    /// delivered, a best-effort stop is sent before reporting
    /// [`CommandError::Cancelled`].
    #[tracing::instrument(skip(self, plan), fields(stages = plan.stages().len()))]
    pub async fn start_with_deadline(
        &self,
        plan: &CookPlan,
        deadline: Option<Duration>,
    ) -> Result<(), OvenError> {
        let _gate = self.command_gate.lock().await;
        let device = self.bound_for_command()?;

        if !device.state.accepts_cook_commands() {
            return self.finish_command(Err(CommandError::Busy {
                state: device.state,
            }
            .into()));
        }
        if let Err(err) = plan.validate_for(&device) {
            return self.finish_command(Err(err.into()));
        }

        let commands = dispatcher::to_device_commands(plan);
        let transmitted = AtomicBool::new(false);
        let deliver = async {
            for command in commands {
                transmitted.store(true, Ordering::SeqCst);
                self.send_with_retry(&device.id, command).await?;
            }
            Ok(())
        };

        let result = match deadline {
            None => deliver.await,
            Some(limit) => match tokio::time::timeout(limit, deliver).await {
                Ok(result) => result,
                Err(_elapsed) => {
                    if transmitted.load(Ordering::SeqCst) {
                        tracing::warn!("start cancelled mid-flight, sending best-effort stop");
                        let _ = self.transport.send(&device.id, WireCommand::StopCook).await;
                    }
                    Err(CommandError::Cancelled.into())
                }
            },
        };
        self.finish_command(result)
    }

    /// Stop any cook on the bound device. Idempotent — stopping an idle
    /// device succeeds without error.
    #[tracing::instrument(skip(self))]
    pub async fn stop(&self) -> Result<(), OvenError> {
        let _gate = self.command_gate.lock().await;
        let device = self.bound_for_command()?;
        let result = self.send_with_retry(&device.id, WireCommand::StopCook).await;
        self.finish_command(result)
    }

    /// Set the secondary probe target, independent of the stage sequence.
    ///
    /// # Errors
    ///
    /// Returns [`OvenError::Validation`] when `target` is outside the
    /// probe-specific safe range.
    #[tracing::instrument(skip(self), fields(target = %target))]
    pub async fn probe(&self, target: Temperature) -> Result<(), OvenError> {
        let target = target.validate_probe_range()?;
        let _gate = self.command_gate.lock().await;
        let device = self.bound_for_command()?;
        let result = self
            .send_with_retry(
                &device.id,
                WireCommand::SetProbe {
                    target_c: target.celsius(),
                },
            )
            .await;
        self.finish_command(result)
    }

    /// Fetch the bound device with fresh telemetry applied.
    fn bound_for_command(&self) -> Result<Device, OvenError> {
        self.apply_telemetry();
        let mut inner = self.inner.lock().expect("session state poisoned");
        let device = inner.bound.clone().ok_or_else(|| DeviceNotFoundError {
            id: String::from("<unbound>"),
        })?;
        inner.state = SessionState::Commanding;
        Ok(device)
    }

    /// Leave the `Commanding` state: back to `Bound` on success or a
    /// rejection, down to `Disconnected` when the transport is gone.
    fn finish_command(&self, result: Result<(), OvenError>) -> Result<(), OvenError> {
        match result {
            Err(err @ OvenError::Command(CommandError::RetriesExhausted { .. })) => {
                self.close();
                Err(err)
            }
            other => {
                self.transition(|inner| {
                    if inner.state == SessionState::Commanding {
                        inner.state = SessionState::Bound;
                    }
                });
                other
            }
        }
    }

    /// Deliver one command, retrying transient transport failures.
    async fn send_with_retry(
        &self,
        device_id: &CookerId,
        command: WireCommand,
    ) -> Result<(), OvenError> {
        let mut attempt = 1;
        loop {
            match self.transport.send(device_id, command.clone()).await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_transient() && attempt < self.retry.max_attempts => {
                    let backoff = self.retry.backoff_after(attempt);
                    tracing::warn!(%err, attempt, ?backoff, "transient transport failure, retrying");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) if err.is_transient() => {
                    tracing::error!(%err, attempts = attempt, "retry budget exhausted");
                    return Err(CommandError::RetriesExhausted { attempts: attempt }.into());
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Drain pending telemetry into the device snapshots.
    fn apply_telemetry(&self) {
        let mut receiver = self.telemetry.lock().expect("telemetry receiver poisoned");
        let mut inner = self.inner.lock().expect("session state poisoned");
        let inner = &mut *inner;
        loop {
            let update = match receiver.try_recv() {
                Ok(update) => update,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "telemetry receiver lagged");
                    continue;
                }
                Err(_) => break,
            };
            for device in inner
                .devices
                .iter_mut()
                .chain(inner.bound.as_mut())
                .filter(|d| d.id == update.device_id)
            {
                if let Some(state) = update.state {
                    device.state = state;
                }
                if let Some(temperature) = update.temperature {
                    device.current_temperature = Some(temperature);
                }
            }
        }
    }

    fn transition(&self, f: impl FnOnce(&mut SessionInner)) {
        let mut inner = self.inner.lock().expect("session state poisoned");
        f(&mut inner);
    }
}
