//! One cooking stage — temperature, airflow, heat sources, timing, steam.
//!
//! Structural invariants (element mask, percentage ranges, temperature
//! envelope) are validated eagerly at [`StageBuilder::build`]; a stage that
//! fails them is never materialized. Hardware-revision-dependent rules are
//! deliberately *not* checked here — they live in
//! [`CookPlan::validate_for`](crate::plan::CookPlan::validate_for), because
//! they need a concrete device.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::temperature::Temperature;

/// Cavity heating mode for a stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HeatMode {
    /// Dry-bulb heating (no humidity control).
    #[default]
    Dry,
    /// Wet-bulb heating (sous-vide style, humidity-aware).
    Wet,
}

/// Independent flags for the three heating elements.
///
/// The rear (convection) element may not run while *both* top and bottom
/// are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatingElements {
    pub top: bool,
    pub bottom: bool,
    pub rear: bool,
}

impl HeatingElements {
    /// Build a mask, rejecting the forbidden all-three combination.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::AllElementsActive`] for
    /// `top && bottom && rear`.
    pub fn new(top: bool, bottom: bool, rear: bool) -> Result<Self, ValidationError> {
        let elements = Self { top, bottom, rear };
        elements.validate()?;
        Ok(elements)
    }

    /// Check the element-mask invariant.
    pub fn validate(self) -> Result<(), ValidationError> {
        if self.top && self.bottom && self.rear {
            return Err(ValidationError::AllElementsActive);
        }
        Ok(())
    }
}

impl Default for HeatingElements {
    /// Vendor default: rear-only convection.
    fn default() -> Self {
        Self {
            top: false,
            bottom: false,
            rear: true,
        }
    }
}

/// When a stage timer begins counting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerStart {
    /// Counts from the moment the stage starts.
    #[default]
    Immediate,
    /// Counts only after the appliance reports the target temperature.
    WhenPreheated,
}

/// A stage timer. Absent timer means the stage runs until advanced/stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    /// Initial duration in seconds.
    pub initial_secs: u32,
    /// When the countdown begins.
    #[serde(default)]
    pub start: TimerStart,
}

impl Timer {
    /// A timer counting from stage start.
    #[must_use]
    pub fn new(initial_secs: u32) -> Self {
        Self {
            initial_secs,
            start: TimerStart::Immediate,
        }
    }

    /// A timer that waits for preheat before counting.
    #[must_use]
    pub fn when_preheated(initial_secs: u32) -> Self {
        Self {
            initial_secs,
            start: TimerStart::WhenPreheated,
        }
    }
}

/// Steam control — two mutually exclusive representations of the same
/// physical control, so exactly one numeric field per mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SteamSettings {
    /// Target relative humidity, 0..=100 percent.
    RelativeHumidity(u8),
    /// Steam generator duty, 0..=100 percent.
    SteamPercentage(u8),
}

impl SteamSettings {
    /// Check that the percentage is in range.
    pub fn validate(self) -> Result<(), ValidationError> {
        let (field, value) = match self {
            Self::RelativeHumidity(v) => ("relative_humidity", v),
            Self::SteamPercentage(v) => ("steam_percentage", v),
        };
        if value > 100 {
            return Err(ValidationError::PercentOutOfRange { field, value });
        }
        Ok(())
    }
}

/// One validated cooking stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSpec {
    pub temperature: Temperature,
    pub mode: HeatMode,
    pub timer: Option<Timer>,
    pub heating_elements: HeatingElements,
    /// Fan speed percentage, 0..=100.
    pub fan_speed: u8,
    pub steam: Option<SteamSettings>,
    pub rack_position: Option<u8>,
    pub title: String,
    pub description: String,
}

impl StageSpec {
    /// Create a builder for constructing a [`StageSpec`].
    #[must_use]
    pub fn builder(temperature: Temperature) -> StageBuilder {
        StageBuilder::new(temperature)
    }

    /// Whether this stage uses only the features the appliance's
    /// "simple cook" command variant can express: no steam, no preheat-gated
    /// timer, the default element mask, no rack position.
    #[must_use]
    pub fn is_simple(&self) -> bool {
        self.steam.is_none()
            && self.rack_position.is_none()
            && self.heating_elements == HeatingElements::default()
            && self
                .timer
                .is_none_or(|t| t.start == TimerStart::Immediate)
    }
}

/// Step-by-step builder for [`StageSpec`].
#[derive(Debug)]
pub struct StageBuilder {
    temperature: Temperature,
    mode: HeatMode,
    timer: Option<Timer>,
    heating_elements: HeatingElements,
    fan_speed: u8,
    steam: Option<SteamSettings>,
    rack_position: Option<u8>,
    title: String,
    description: String,
}

impl StageBuilder {
    #[must_use]
    pub fn new(temperature: Temperature) -> Self {
        Self {
            temperature,
            mode: HeatMode::Dry,
            timer: None,
            heating_elements: HeatingElements::default(),
            fan_speed: 100,
            steam: None,
            rack_position: None,
            title: String::new(),
            description: String::new(),
        }
    }

    #[must_use]
    pub fn mode(mut self, mode: HeatMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn timer(mut self, timer: Timer) -> Self {
        self.timer = Some(timer);
        self
    }

    #[must_use]
    pub fn heating_elements(mut self, elements: HeatingElements) -> Self {
        self.heating_elements = elements;
        self
    }

    #[must_use]
    pub fn fan_speed(mut self, fan_speed: u8) -> Self {
        self.fan_speed = fan_speed;
        self
    }

    #[must_use]
    pub fn steam(mut self, steam: SteamSettings) -> Self {
        self.steam = Some(steam);
        self
    }

    #[must_use]
    pub fn rack_position(mut self, rack_position: u8) -> Self {
        self.rack_position = Some(rack_position);
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Consume the builder, validate structural invariants, and return a
    /// [`StageSpec`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the fan speed or a steam percentage
    /// leaves 0..=100, or the element mask is forbidden.
    pub fn build(self) -> Result<StageSpec, ValidationError> {
        if self.fan_speed > 100 {
            return Err(ValidationError::PercentOutOfRange {
                field: "fan_speed",
                value: self.fan_speed,
            });
        }
        self.heating_elements.validate()?;
        if let Some(steam) = self.steam {
            steam.validate()?;
        }
        Ok(StageSpec {
            temperature: self.temperature,
            mode: self.mode,
            timer: self.timer,
            heating_elements: self.heating_elements,
            fan_speed: self.fan_speed,
            steam: self.steam,
            rack_position: self.rack_position,
            title: self.title,
            description: self.description,
        })
    }
}
