//! Wire codec — JSON envelopes for the vendor's websocket protocol.
//!
//! Outbound frames wrap a [`WireCommand`] with a request id and the target
//! appliance id. Inbound frames are either a command response, a pushed
//! device list, or a device-state event. Everything here is pure so it can
//! be tested without a socket.

use serde::Deserialize;
use serde_json::Value;

use ovenctl_app::dispatcher::WireCommand;
use ovenctl_app::ports::DeviceUpdate;
use ovenctl_domain::device::{CookerId, Device, DeviceState, HardwareRevision};
use ovenctl_domain::temperature::Temperature;

/// Wrap a command in an outbound envelope. Returns the generated request id
/// alongside the frame so the caller can correlate the response.
pub fn encode_envelope(device_id: &CookerId, command: &WireCommand) -> (String, Value) {
    let request_id = uuid::Uuid::new_v4().to_string();
    let mut frame = serde_json::to_value(command).unwrap_or(Value::Null);
    if let Value::Object(ref mut map) = frame {
        map.insert("requestId".into(), Value::String(request_id.clone()));
        map.insert("deviceId".into(), Value::String(device_id.to_string()));
    }
    (request_id, frame)
}

/// A parsed inbound frame.
#[derive(Debug)]
pub enum Incoming {
    /// Ack or rejection for a previously sent request.
    Response {
        request_id: String,
        error: Option<String>,
    },
    /// The cloud pushed the account's paired-device list.
    DeviceList(Vec<Device>),
    /// A device reported a lifecycle-state or temperature change.
    StateEvent(DeviceUpdate),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "command")]
enum Frame {
    #[serde(rename = "response")]
    Response { payload: ResponsePayload },
    #[serde(rename = "deviceList")]
    DeviceList { payload: Vec<DeviceEntry> },
    #[serde(rename = "stateEvent")]
    StateEvent { payload: StatePayload },
}

#[derive(Debug, Deserialize)]
struct ResponsePayload {
    #[serde(rename = "requestId")]
    request_id: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeviceEntry {
    #[serde(rename = "cookerId")]
    cooker_id: String,
    name: String,
    #[serde(rename = "type")]
    revision: HardwareRevision,
    #[serde(default)]
    state: Option<DeviceState>,
    #[serde(rename = "pairedAt", default)]
    paired_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
struct StatePayload {
    #[serde(rename = "cookerId")]
    cooker_id: String,
    #[serde(default)]
    state: Option<DeviceState>,
    #[serde(rename = "temperatureC", default)]
    temperature_c: Option<f64>,
}

/// Parse one inbound frame. Unknown frame kinds and frames that fail to
/// parse yield `None` — the protocol carries event types this client does
/// not consume, and skipping them is the documented behavior.
pub fn parse_frame(text: &str) -> Option<Incoming> {
    let frame: Frame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(err) => {
            tracing::trace!(%err, "skipping unrecognized frame");
            return None;
        }
    };
    match frame {
        Frame::Response { payload } => Some(Incoming::Response {
            request_id: payload.request_id,
            error: payload.error,
        }),
        Frame::DeviceList { payload } => {
            let devices = payload
                .into_iter()
                .filter_map(|entry| {
                    let mut builder = Device::builder(entry.cooker_id)
                        .name(entry.name)
                        .revision(entry.revision)
                        .state(entry.state.unwrap_or(DeviceState::Idle));
                    if let Some(ts) = entry.paired_at {
                        builder = builder.paired_at(ts);
                    }
                    builder
                        .build()
                        .inspect_err(|err| tracing::warn!(%err, "dropping malformed device entry"))
                        .ok()
                })
                .collect();
            Some(Incoming::DeviceList(devices))
        }
        Frame::StateEvent { payload } => Some(Incoming::StateEvent(DeviceUpdate {
            device_id: CookerId::from(payload.cooker_id),
            state: payload.state,
            temperature: payload
                .temperature_c
                .and_then(|celsius| Temperature::from_celsius(celsius).ok()),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovenctl_domain::stage::HeatMode;

    #[test]
    fn should_stamp_request_and_device_ids_on_the_envelope() {
        let (request_id, frame) = encode_envelope(
            &CookerId::from("device123"),
            &WireCommand::SetProbe { target_c: 65.0 },
        );
        assert_eq!(frame["requestId"], request_id.as_str());
        assert_eq!(frame["deviceId"], "device123");
        assert_eq!(frame["command"], "setProbe");
    }

    #[test]
    fn should_generate_distinct_request_ids() {
        let id = CookerId::from("device123");
        let (a, _) = encode_envelope(&id, &WireCommand::StopCook);
        let (b, _) = encode_envelope(&id, &WireCommand::StopCook);
        assert_ne!(a, b);
    }

    #[test]
    fn should_keep_command_payload_in_the_envelope() {
        let (_, frame) = encode_envelope(
            &CookerId::from("device123"),
            &WireCommand::StartSimpleCook {
                temperature_c: 200.0,
                mode: HeatMode::Dry,
                timer_secs: Some(1800),
                fan_speed: 100,
            },
        );
        assert_eq!(frame["payload"]["timer_secs"], 1800);
        assert_eq!(frame["payload"]["mode"], "DRY");
    }

    #[test]
    fn should_parse_a_device_list_push() {
        let text = r#"{
            "command": "deviceList",
            "payload": [
                {"cookerId": "device123", "name": "Kitchen Oven", "type": "v2",
                 "state": "idle", "pairedAt": "2024-01-01T00:00:00Z"},
                {"cookerId": "device456", "name": "Garage Oven", "type": "v1"}
            ]
        }"#;
        let Some(Incoming::DeviceList(devices)) = parse_frame(text) else {
            panic!("expected device list");
        };
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].id.as_str(), "device123");
        assert_eq!(devices[0].revision, HardwareRevision::V2);
        assert!(devices[0].paired_at.is_some());
        assert_eq!(devices[1].state, DeviceState::Idle);
    }

    #[test]
    fn should_parse_a_state_event_into_telemetry() {
        let text = r#"{
            "command": "stateEvent",
            "payload": {"cookerId": "device123", "state": "cooking", "temperatureC": 182.5}
        }"#;
        let Some(Incoming::StateEvent(update)) = parse_frame(text) else {
            panic!("expected state event");
        };
        assert_eq!(update.device_id.as_str(), "device123");
        assert_eq!(update.state, Some(DeviceState::Cooking));
        assert!((update.temperature.unwrap().celsius() - 182.5).abs() < 1e-9);
    }

    #[test]
    fn should_parse_a_rejection_response() {
        let text = r#"{
            "command": "response",
            "payload": {"requestId": "abc", "error": "oven door open"}
        }"#;
        let Some(Incoming::Response { request_id, error }) = parse_frame(text) else {
            panic!("expected response");
        };
        assert_eq!(request_id, "abc");
        assert_eq!(error.as_deref(), Some("oven door open"));
    }

    #[test]
    fn should_skip_unknown_frames() {
        assert!(parse_frame(r#"{"command": "firmwareUpdate", "payload": {}}"#).is_none());
        assert!(parse_frame("not json at all").is_none());
    }

    #[test]
    fn should_drop_out_of_envelope_temperatures() {
        let text = r#"{
            "command": "stateEvent",
            "payload": {"cookerId": "device123", "temperatureC": 9000.0}
        }"#;
        let Some(Incoming::StateEvent(update)) = parse_frame(text) else {
            panic!("expected state event");
        };
        assert!(update.temperature.is_none());
    }
}
