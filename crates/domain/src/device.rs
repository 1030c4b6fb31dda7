//! Appliance identity, hardware revision, and lifecycle state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::temperature::Temperature;

/// Vendor-assigned appliance identifier.
///
/// Opaque string handed out by the cloud service at pairing time — not a
/// UUID, so it is kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CookerId(String);

impl CookerId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CookerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for CookerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CookerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Appliance generation, gating which features and commands are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareRevision {
    V1,
    V2,
}

impl HardwareRevision {
    /// Whether this revision can inject steam during a dry-mode stage.
    #[must_use]
    pub fn supports_dry_steam(self) -> bool {
        matches!(self, Self::V2)
    }

    /// Maximum number of stages in one cook program.
    #[must_use]
    pub fn max_stages(self) -> usize {
        match self {
            Self::V1 => 1,
            Self::V2 => 10,
        }
    }

    /// Maximum stage timer duration in seconds.
    #[must_use]
    pub fn max_timer_secs(self) -> u32 {
        match self {
            Self::V1 => 86_400,  // 24h
            Self::V2 => 259_200, // 72h
        }
    }
}

impl fmt::Display for HardwareRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => f.write_str("v1"),
            Self::V2 => f.write_str("v2"),
        }
    }
}

/// Appliance lifecycle state as last reported over telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    Idle,
    Preheating,
    Cooking,
    Unreachable,
}

impl DeviceState {
    /// Whether the appliance will accept a new cook command in this state.
    ///
    /// An in-progress cook is never silently overridden — `Preheating` and
    /// `Cooking` require an explicit stop first.
    #[must_use]
    pub fn accepts_cook_commands(self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Preheating => f.write_str("preheating"),
            Self::Cooking => f.write_str("cooking"),
            Self::Unreachable => f.write_str("unreachable"),
        }
    }
}

/// A discovered appliance.
///
/// Owned by the session that discovered it; everything above the session
/// only ever sees cloned snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: CookerId,
    pub name: String,
    pub revision: HardwareRevision,
    pub state: DeviceState,
    pub paired_at: Option<chrono::DateTime<chrono::Utc>>,
    pub current_temperature: Option<Temperature>,
}

impl Device {
    /// Create a builder for constructing a [`Device`].
    #[must_use]
    pub fn builder(id: impl Into<CookerId>) -> DeviceBuilder {
        DeviceBuilder::new(id.into())
    }
}

/// Step-by-step builder for [`Device`].
#[derive(Debug)]
pub struct DeviceBuilder {
    id: CookerId,
    name: Option<String>,
    revision: HardwareRevision,
    state: DeviceState,
    paired_at: Option<chrono::DateTime<chrono::Utc>>,
    current_temperature: Option<Temperature>,
}

impl DeviceBuilder {
    #[must_use]
    fn new(id: CookerId) -> Self {
        Self {
            id,
            name: None,
            revision: HardwareRevision::V2,
            state: DeviceState::Idle,
            paired_at: None,
            current_temperature: None,
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn revision(mut self, revision: HardwareRevision) -> Self {
        self.revision = revision;
        self
    }

    #[must_use]
    pub fn state(mut self, state: DeviceState) -> Self {
        self.state = state;
        self
    }

    #[must_use]
    pub fn paired_at(mut self, ts: chrono::DateTime<chrono::Utc>) -> Self {
        self.paired_at = Some(ts);
        self
    }

    #[must_use]
    pub fn current_temperature(mut self, temperature: Temperature) -> Self {
        self.current_temperature = Some(temperature);
        self
    }

    /// Consume the builder, validate, and return a [`Device`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyName`] when no name was given.
    pub fn build(self) -> Result<Device, ValidationError> {
        let name = self.name.unwrap_or_default();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(Device {
            id: self.id,
            name,
            revision: self.revision,
            state: self.state,
            paired_at: self.paired_at,
            current_temperature: self.current_temperature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_build_device_with_defaults() {
        let device = Device::builder("device123").name("Kitchen Oven").build().unwrap();
        assert_eq!(device.id.as_str(), "device123");
        assert_eq!(device.revision, HardwareRevision::V2);
        assert_eq!(device.state, DeviceState::Idle);
        assert!(device.current_temperature.is_none());
    }

    #[test]
    fn should_reject_device_without_name() {
        assert!(matches!(
            Device::builder("device123").build(),
            Err(ValidationError::EmptyName)
        ));
    }

    #[test]
    fn should_only_accept_cook_commands_when_idle() {
        assert!(DeviceState::Idle.accepts_cook_commands());
        assert!(!DeviceState::Preheating.accepts_cook_commands());
        assert!(!DeviceState::Cooking.accepts_cook_commands());
        assert!(!DeviceState::Unreachable.accepts_cook_commands());
    }

    #[test]
    fn should_gate_capabilities_by_revision() {
        assert!(!HardwareRevision::V1.supports_dry_steam());
        assert!(HardwareRevision::V2.supports_dry_steam());
        assert_eq!(HardwareRevision::V1.max_stages(), 1);
        assert!(HardwareRevision::V2.max_timer_secs() > HardwareRevision::V1.max_timer_secs());
    }

    #[test]
    fn should_parse_revision_from_recipe_document_notation() {
        let revision: HardwareRevision = serde_json::from_str("\"v2\"").unwrap();
        assert_eq!(revision, HardwareRevision::V2);
    }
}
