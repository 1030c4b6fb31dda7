//! Command dispatcher — maps a [`CookPlan`] into wire commands.
//!
//! Pure and deterministic: no IO, no device interaction. The appliance
//! protocol has two start variants — a "simple cook" shortcut and a full
//! multi-stage program submission. A single-stage plan using no advanced
//! features collapses to the shortcut; everything else goes out as one
//! program command carrying all stages in plan order. Both forms produce
//! identical appliance behavior for an equivalent single stage.

use serde::{Deserialize, Serialize};

use ovenctl_domain::plan::CookPlan;
use ovenctl_domain::stage::{HeatMode, HeatingElements, SteamSettings, StageSpec, Timer};

/// One stage as submitted inside a program command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireStage {
    pub temperature_c: f64,
    pub mode: HeatMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer: Option<Timer>,
    pub heating_elements: HeatingElements,
    pub fan_speed: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steam: Option<SteamSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rack_position: Option<u8>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
}

impl From<&StageSpec> for WireStage {
    fn from(stage: &StageSpec) -> Self {
        Self {
            temperature_c: stage.temperature.celsius(),
            mode: stage.mode,
            timer: stage.timer,
            heating_elements: stage.heating_elements,
            fan_speed: stage.fan_speed,
            steam: stage.steam,
            rack_position: stage.rack_position,
            title: stage.title.clone(),
        }
    }
}

/// The appliance's command vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload", rename_all = "camelCase")]
pub enum WireCommand {
    /// Single-stage shortcut for plain cooks.
    StartSimpleCook {
        temperature_c: f64,
        mode: HeatMode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timer_secs: Option<u32>,
        fan_speed: u8,
    },
    /// Full multi-stage program submission, stages in execution order.
    StartProgram { stages: Vec<WireStage> },
    /// Stop the current cook, if any.
    StopCook,
    /// Set the secondary (food-core probe) target.
    SetProbe { target_c: f64 },
}

/// Map a plan into the ordered wire command sequence that starts it.
#[must_use]
pub fn to_device_commands(plan: &CookPlan) -> Vec<WireCommand> {
    match plan.stages() {
        [stage] if stage.is_simple() => vec![WireCommand::StartSimpleCook {
            temperature_c: stage.temperature.celsius(),
            mode: stage.mode,
            timer_secs: stage.timer.map(|t| t.initial_secs),
            fan_speed: stage.fan_speed,
        }],
        stages => vec![WireCommand::StartProgram {
            stages: stages.iter().map(WireStage::from).collect(),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovenctl_domain::temperature::Temperature;

    fn stage(celsius: f64) -> StageSpec {
        StageSpec::builder(Temperature::from_celsius(celsius).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn should_collapse_plain_single_stage_to_simple_cook() {
        let plan = CookPlan::single(
            StageSpec::builder(Temperature::from_celsius(200.0).unwrap())
                .timer(Timer::new(1800))
                .build()
                .unwrap(),
        );
        let commands = to_device_commands(&plan);
        assert_eq!(commands.len(), 1);
        assert_eq!(
            commands[0],
            WireCommand::StartSimpleCook {
                temperature_c: 200.0,
                mode: HeatMode::Dry,
                timer_secs: Some(1800),
                fan_speed: 100,
            }
        );
    }

    #[test]
    fn should_emit_program_for_multi_stage_plan() {
        let plan = CookPlan::new(vec![stage(55.0), stage(250.0)]).unwrap();
        let commands = to_device_commands(&plan);
        assert_eq!(commands.len(), 1);
        match &commands[0] {
            WireCommand::StartProgram { stages } => {
                assert_eq!(stages.len(), 2);
                assert!((stages[0].temperature_c - 55.0).abs() < 1e-9);
                assert!((stages[1].temperature_c - 250.0).abs() < 1e-9);
            }
            other => panic!("expected StartProgram, got {other:?}"),
        }
    }

    #[test]
    fn should_emit_program_for_single_advanced_stage() {
        let advanced = StageSpec::builder(Temperature::from_celsius(100.0).unwrap())
            .mode(HeatMode::Wet)
            .steam(SteamSettings::SteamPercentage(100))
            .build()
            .unwrap();
        let commands = to_device_commands(&CookPlan::single(advanced));
        assert!(matches!(commands[0], WireCommand::StartProgram { .. }));
    }

    #[test]
    fn should_produce_equivalent_payloads_for_equivalent_single_stage() {
        // The collapse is an optimization, not a behavior change: the
        // shortcut and the one-stage program must describe the same cook.
        let plan = CookPlan::single(stage(200.0));
        let [simple] = &to_device_commands(&plan)[..] else {
            panic!("expected one command");
        };
        let WireCommand::StartSimpleCook {
            temperature_c,
            mode,
            timer_secs,
            fan_speed,
        } = simple
        else {
            panic!("expected simple cook");
        };
        let wire = WireStage::from(&plan.stages()[0]);
        assert!((wire.temperature_c - temperature_c).abs() < 1e-9);
        assert_eq!(wire.mode, *mode);
        assert_eq!(wire.timer.map(|t| t.initial_secs), *timer_secs);
        assert_eq!(wire.fan_speed, *fan_speed);
    }

    #[test]
    fn should_be_deterministic_for_the_same_plan() {
        let plan = CookPlan::new(vec![stage(55.0), stage(250.0)]).unwrap();
        assert_eq!(to_device_commands(&plan), to_device_commands(&plan));
    }

    #[test]
    fn should_serialize_commands_with_tagged_envelope() {
        let json = serde_json::to_value(WireCommand::SetProbe { target_c: 65.0 }).unwrap();
        assert_eq!(json["command"], "setProbe");
        assert!((json["payload"]["target_c"].as_f64().unwrap() - 65.0).abs() < 1e-9);

        let stop = serde_json::to_value(WireCommand::StopCook).unwrap();
        assert_eq!(stop["command"], "stopCook");
    }
}
