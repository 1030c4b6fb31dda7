//! An ordered multi-stage cook program.
//!
//! Validation is two-phase: structural invariants are enforced when the plan
//! is built, while hardware-revision-dependent rules wait until the plan is
//! bound to a concrete [`Device`] via [`CookPlan::validate_for`]. That split
//! lets a recipe be parsed and listed even when no compatible appliance is
//! currently known.

use crate::device::{Device, HardwareRevision};
use crate::error::{CompatibilityRule, ValidationError};
use crate::stage::{HeatMode, StageSpec};

/// An ordered sequence of at least one stage. Stage order is execution
/// order and is significant.
#[derive(Debug, Clone, PartialEq)]
pub struct CookPlan {
    stages: Vec<StageSpec>,
    revision: Option<HardwareRevision>,
}

impl CookPlan {
    /// Build a plan from an ordered stage list.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyPlan`] when `stages` is empty.
    pub fn new(stages: Vec<StageSpec>) -> Result<Self, ValidationError> {
        if stages.is_empty() {
            return Err(ValidationError::EmptyPlan);
        }
        Ok(Self {
            stages,
            revision: None,
        })
    }

    /// Build a single-stage plan.
    #[must_use]
    pub fn single(stage: StageSpec) -> Self {
        Self {
            stages: vec![stage],
            revision: None,
        }
    }

    /// Constrain the plan to one hardware revision.
    #[must_use]
    pub fn with_revision(mut self, revision: HardwareRevision) -> Self {
        self.revision = Some(revision);
        self
    }

    /// The stages, in execution order.
    #[must_use]
    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    /// The target hardware revision constraint, if any.
    #[must_use]
    pub fn revision(&self) -> Option<HardwareRevision> {
        self.revision
    }

    /// Apply hardware-revision-dependent rules against a concrete device.
    ///
    /// Checks, in order: the plan's own revision constraint, the stage-count
    /// cap, then per-stage dry-mode steam support and timer caps. The first
    /// broken rule is reported with the offending stage index.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::RevisionMismatch`],
    /// [`ValidationError::TooManyStages`], or
    /// [`ValidationError::StageIncompatible`].
    pub fn validate_for(&self, device: &Device) -> Result<(), ValidationError> {
        let revision = device.revision;
        if let Some(required) = self.revision {
            if required != revision {
                return Err(ValidationError::RevisionMismatch {
                    plan: required,
                    device: revision,
                });
            }
        }

        if self.stages.len() > revision.max_stages() {
            return Err(ValidationError::TooManyStages {
                count: self.stages.len(),
                max: revision.max_stages(),
            });
        }

        for (index, stage) in self.stages.iter().enumerate() {
            if stage.mode == HeatMode::Dry
                && stage.steam.is_some()
                && !revision.supports_dry_steam()
            {
                return Err(ValidationError::StageIncompatible {
                    stage: index,
                    rule: CompatibilityRule::DrySteamUnsupported,
                });
            }
            if let Some(timer) = stage.timer {
                if timer.initial_secs > revision.max_timer_secs() {
                    return Err(ValidationError::StageIncompatible {
                        stage: index,
                        rule: CompatibilityRule::TimerTooLong {
                            max_secs: revision.max_timer_secs(),
                        },
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{SteamSettings, Timer};
    use crate::temperature::Temperature;

    fn stage(celsius: f64) -> StageSpec {
        StageSpec::builder(Temperature::from_celsius(celsius).unwrap())
            .build()
            .unwrap()
    }

    fn device(revision: HardwareRevision) -> Device {
        Device::builder("device123")
            .name("Test Oven")
            .revision(revision)
            .build()
            .unwrap()
    }

    #[test]
    fn should_reject_empty_plan() {
        assert!(matches!(
            CookPlan::new(vec![]),
            Err(ValidationError::EmptyPlan)
        ));
    }

    #[test]
    fn should_preserve_stage_order() {
        let plan = CookPlan::new(vec![stage(55.0), stage(250.0)]).unwrap();
        assert!((plan.stages()[0].temperature.celsius() - 55.0).abs() < 1e-9);
        assert!((plan.stages()[1].temperature.celsius() - 250.0).abs() < 1e-9);
    }

    #[test]
    fn should_validate_single_stage_against_v1() {
        let plan = CookPlan::single(stage(200.0));
        assert!(plan.validate_for(&device(HardwareRevision::V1)).is_ok());
    }

    #[test]
    fn should_reject_multi_stage_plan_on_v1() {
        let plan = CookPlan::new(vec![stage(55.0), stage(250.0)]).unwrap();
        assert!(matches!(
            plan.validate_for(&device(HardwareRevision::V1)),
            Err(ValidationError::TooManyStages { count: 2, max: 1 })
        ));
    }

    #[test]
    fn should_reject_dry_steam_on_v1_with_stage_index() {
        let dry_steam = StageSpec::builder(Temperature::from_celsius(180.0).unwrap())
            .steam(SteamSettings::SteamPercentage(30))
            .build()
            .unwrap();
        let plan = CookPlan::single(dry_steam);
        assert!(matches!(
            plan.validate_for(&device(HardwareRevision::V1)),
            Err(ValidationError::StageIncompatible {
                stage: 0,
                rule: CompatibilityRule::DrySteamUnsupported,
            })
        ));
        assert!(plan.validate_for(&device(HardwareRevision::V2)).is_ok());
    }

    #[test]
    fn should_allow_wet_steam_on_any_revision() {
        let wet = StageSpec::builder(Temperature::from_celsius(85.0).unwrap())
            .mode(HeatMode::Wet)
            .steam(SteamSettings::RelativeHumidity(80))
            .build()
            .unwrap();
        let plan = CookPlan::single(wet);
        assert!(plan.validate_for(&device(HardwareRevision::V1)).is_ok());
    }

    #[test]
    fn should_reject_timer_over_the_revision_cap() {
        let long = StageSpec::builder(Temperature::from_celsius(60.0).unwrap())
            .timer(Timer::new(90_000)) // 25h, over the 24h V1 cap
            .build()
            .unwrap();
        let plan = CookPlan::single(long);
        assert!(matches!(
            plan.validate_for(&device(HardwareRevision::V1)),
            Err(ValidationError::StageIncompatible {
                stage: 0,
                rule: CompatibilityRule::TimerTooLong { .. },
            })
        ));
        assert!(plan.validate_for(&device(HardwareRevision::V2)).is_ok());
    }

    #[test]
    fn should_reject_plan_constrained_to_other_revision() {
        let plan = CookPlan::single(stage(200.0)).with_revision(HardwareRevision::V2);
        assert!(matches!(
            plan.validate_for(&device(HardwareRevision::V1)),
            Err(ValidationError::RevisionMismatch { .. })
        ));
        assert!(plan.validate_for(&device(HardwareRevision::V2)).is_ok());
    }
}
