use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::{Validate, ValidationError};

use crate::constants::{EMPTY_SECRET_ERROR, MAX_SECRET_LENGTH, PARTICIPANTS};
use crate::error::SessionError;
use crate::timer::{ParticipantId, TimerUpdate};

/// A task on the wheel, as the server describes it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Task {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GameState {
    #[default]
    Waiting,
    Active,
    Completed,
}

impl GameState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameState::Waiting => "waiting",
            GameState::Active => "active",
            GameState::Completed => "completed",
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct CurrentState {
    #[serde(default)]
    pub current_task: Option<Task>,
    #[serde(default)]
    pub used_indices: Option<Vec<usize>>,
    #[serde(default)]
    pub player_names: Option<BTreeMap<ParticipantId, String>>,
    #[serde(default)]
    pub slave_solutions: Option<BTreeMap<ParticipantId, bool>>,
    #[serde(default)]
    pub game_state: GameState,
    #[serde(default)]
    pub used_count: Option<usize>,
    #[serde(default)]
    pub total_count: Option<usize>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TaskSelected {
    pub task: Task,
    #[serde(default)]
    pub task_index: Option<usize>,
    #[serde(default)]
    pub used_indices: Option<Vec<usize>>,
    #[serde(default)]
    pub used_count: Option<usize>,
    #[serde(default)]
    pub total_count: Option<usize>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct WheelSpinning {
    pub task: Task,
    pub task_index: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct GameStateUpdate {
    #[serde(default)]
    pub game_state: GameState,
    #[serde(default)]
    pub current_task: Option<Task>,
    #[serde(default)]
    pub used_indices: Option<Vec<usize>>,
    #[serde(default)]
    pub slave_solutions: Option<BTreeMap<ParticipantId, bool>>,
    #[serde(default)]
    pub player_names: Option<BTreeMap<ParticipantId, String>>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Ack {
    pub id: u32,
    #[serde(default)]
    pub payload: Value,
}

/// Events pushed by the server of record.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    CurrentState(CurrentState),
    TaskSelected(TaskSelected),
    WheelSpinning(WheelSpinning),
    GameStateUpdate(GameStateUpdate),
    TimerUpdate(TimerUpdate),
    GameReset,
    SlavesReset,
    RoundCanceled,
    Ack(Ack),
}

#[derive(Deserialize)]
struct InboundFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

fn payload<T: DeserializeOwned>(event: &str, data: Value) -> Result<T, SessionError> {
    serde_json::from_value(data).map_err(|e| SessionError::MalformedPayload {
        event: event.to_string(),
        reason: e.to_string(),
    })
}

impl ServerEvent {
    /// Parses one text frame. Unknown event names yield `Ok(None)`.
    pub fn decode(text: &str) -> Result<Option<ServerEvent>, SessionError> {
        let frame: InboundFrame = serde_json::from_str(text).map_err(|e| SessionError::MalformedPayload {
            event: "frame".to_string(),
            reason: e.to_string(),
        })?;
        let InboundFrame { event, data } = frame;

        let decoded = match event.as_str() {
            "current_state" => ServerEvent::CurrentState(payload(&event, data)?),
            "task_selected" => ServerEvent::TaskSelected(payload(&event, data)?),
            "wheel_spinning" => ServerEvent::WheelSpinning(payload(&event, data)?),
            "game_state_update" => ServerEvent::GameStateUpdate(payload(&event, data)?),
            "timer_update" => ServerEvent::TimerUpdate(payload(&event, data)?),
            "game_reset" => ServerEvent::GameReset,
            "slaves_reset" => ServerEvent::SlavesReset,
            "round_canceled" => ServerEvent::RoundCanceled,
            "ack" => ServerEvent::Ack(payload(&event, data)?),
            other => {
                log::debug!("ignoring unknown event {}", other);
                return Ok(None);
            }
        };
        Ok(Some(decoded))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct AddTimeRequest {
    #[validate(range(min = 1, max = 2))]
    pub slave_id: u8,
    #[validate(range(min = 1, max = 3600))]
    pub seconds: u32,
}

impl AddTimeRequest {
    pub fn new(slave_id: ParticipantId, seconds: u32) -> Result<Self, SessionError> {
        let request = Self { slave_id, seconds };
        request.validate()?;
        Ok(request)
    }
}

fn validate_secret(secret: &str) -> Result<(), ValidationError> {
    if secret.trim().is_empty() {
        return Err(ValidationError::new("empty_secret"));
    }
    if secret.chars().count() > MAX_SECRET_LENGTH {
        return Err(ValidationError::new("secret_too_long"));
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct VerifySecretRequest {
    #[validate(custom = "validate_secret")]
    pub secret: String,
    #[validate(range(min = 1, max = 2))]
    pub slave_id: u8,
}

impl VerifySecretRequest {
    pub fn new(secret: &str, slave_id: ParticipantId) -> Result<Self, SessionError> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(SessionError::InvalidRequest(EMPTY_SECRET_ERROR.to_string()));
        }
        let request = Self {
            secret: secret.to_string(),
            slave_id,
        };
        request.validate()?;
        Ok(request)
    }
}

pub fn is_participant(id: ParticipantId) -> bool {
    PARTICIPANTS.contains(&id)
}

/// Requests sent to the server of record.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    JoinMasterRoom,
    GetCurrentState,
    GetTimerState,
    SpinWheel,
    WheelStopped { task_index: usize },
    AddTimeToSlave(AddTimeRequest),
    VerifySecret(VerifySecretRequest),
    ResetGame,
    ResetSlaves,
    StopGame,
    CancelRound,
}

impl ClientRequest {
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientRequest::JoinMasterRoom => "join_master_room",
            ClientRequest::GetCurrentState => "get_current_state",
            ClientRequest::GetTimerState => "get_timer_state",
            ClientRequest::SpinWheel => "spin_wheel",
            ClientRequest::WheelStopped { .. } => "wheel_stopped",
            ClientRequest::AddTimeToSlave(_) => "add_time_to_slave",
            ClientRequest::VerifySecret(_) => "verify_secret",
            ClientRequest::ResetGame => "reset_game",
            ClientRequest::ResetSlaves => "reset_slaves",
            ClientRequest::StopGame => "stop_game",
            ClientRequest::CancelRound => "cancel_round",
        }
    }

    /// Whether the server answers this request with an acknowledgement.
    pub fn expects_ack(&self) -> bool {
        !matches!(
            self,
            ClientRequest::JoinMasterRoom
                | ClientRequest::GetCurrentState
                | ClientRequest::GetTimerState
                | ClientRequest::WheelStopped { .. }
        )
    }

    pub fn data(&self) -> Value {
        match self {
            ClientRequest::WheelStopped { task_index } => json!({ "task_index": task_index }),
            ClientRequest::AddTimeToSlave(request) => json!(request),
            ClientRequest::VerifySecret(request) => json!(request),
            _ => Value::Null,
        }
    }

    pub fn encode(&self, ack: Option<u32>) -> String {
        let mut frame = json!({
            "event": self.event_name(),
            "data": self.data(),
        });
        if let Some(id) = ack {
            frame["ack"] = json!(id);
        }
        frame.to_string()
    }
}

/// Reply to `spin_wheel`.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct SpinAck {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub task: Option<Task>,
    #[serde(default)]
    pub task_index: Option<usize>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Reply to every other acknowledged request.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct ActionAck {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{INVALID_PLAYER_ERROR, INVALID_SECONDS_ERROR, SECRET_TOO_LONG_ERROR};

    #[test]
    fn decodes_wheel_spinning() {
        let event = ServerEvent::decode(
            r#"{"event":"wheel_spinning","data":{"task":{"name":"Crack the vault","category":"crypto","type":"Static","link":"vault.zip"},"task_index":4}}"#,
        )
        .unwrap()
        .unwrap();
        match event {
            ServerEvent::WheelSpinning(spin) => {
                assert_eq!(spin.task_index, 4);
                assert_eq!(spin.task.kind, "Static");
                assert_eq!(spin.task.secret, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn decodes_timer_update_with_string_keys() {
        let event = ServerEvent::decode(
            r#"{"event":"timer_update","data":{"1":{"remaining_time":30,"running":true,"max_time":300},"2":{"remaining_time":300,"running":false,"max_time":300}}}"#,
        )
        .unwrap()
        .unwrap();
        let ServerEvent::TimerUpdate(timers) = event else {
            panic!("expected timer update");
        };
        assert_eq!(timers[&1].remaining_seconds, 30);
        assert!(!timers[&2].running);
    }

    #[test]
    fn current_state_without_used_indices() {
        let event = ServerEvent::decode(
            r#"{"event":"current_state","data":{"current_task":null,"used_count":0,"total_count":12,"game_state":"waiting","slave_solutions":{"1":false,"2":false},"player_names":{"1":"Ada","2":"Linus"}}}"#,
        )
        .unwrap()
        .unwrap();
        let ServerEvent::CurrentState(state) = event else {
            panic!("expected current state");
        };
        assert_eq!(state.used_indices, None);
        assert_eq!(state.player_names.unwrap()[&1], "Ada");
        assert_eq!(state.game_state, GameState::Waiting);
    }

    #[test]
    fn unit_events_accept_missing_or_empty_data() {
        assert_eq!(ServerEvent::decode(r#"{"event":"game_reset"}"#).unwrap(), Some(ServerEvent::GameReset));
        assert_eq!(
            ServerEvent::decode(r#"{"event":"slaves_reset","data":{}}"#).unwrap(),
            Some(ServerEvent::SlavesReset)
        );
    }

    #[test]
    fn unknown_event_is_skipped() {
        assert_eq!(ServerEvent::decode(r#"{"event":"confetti","data":1}"#).unwrap(), None);
    }

    #[test]
    fn malformed_payload_names_the_event() {
        let err = ServerEvent::decode(r#"{"event":"timer_update","data":{"1":{"remaining_time":"soon"}}}"#).unwrap_err();
        assert!(matches!(err, SessionError::MalformedPayload { ref event, .. } if event == "timer_update"));
        assert!(ServerEvent::decode("not json").is_err());
    }

    #[test]
    fn encodes_requests_with_ack_ids() {
        let frame: Value = serde_json::from_str(&ClientRequest::WheelStopped { task_index: 7 }.encode(None)).unwrap();
        assert_eq!(frame["event"], "wheel_stopped");
        assert_eq!(frame["data"]["task_index"], 7);
        assert!(frame.get("ack").is_none());

        let request = ClientRequest::AddTimeToSlave(AddTimeRequest::new(2, 30).unwrap());
        assert!(request.expects_ack());
        let frame: Value = serde_json::from_str(&request.encode(Some(9))).unwrap();
        assert_eq!(frame["ack"], 9);
        assert_eq!(frame["data"]["slave_id"], 2);
        assert_eq!(frame["data"]["seconds"], 30);
    }

    #[test]
    fn add_time_rejects_bad_values() {
        let err = AddTimeRequest::new(3, 30).unwrap_err();
        assert_eq!(err.to_string(), INVALID_PLAYER_ERROR);
        let err = AddTimeRequest::new(1, 0).unwrap_err();
        assert_eq!(err.to_string(), INVALID_SECONDS_ERROR);
        assert!(AddTimeRequest::new(1, 3601).is_err());
        assert!(AddTimeRequest::new(1, 60).is_ok());
    }

    #[test]
    fn secret_is_trimmed_and_required() {
        let request = VerifySecretRequest::new("  flag{wheel}  ", 1).unwrap();
        assert_eq!(request.secret, "flag{wheel}");
        let err = VerifySecretRequest::new("   ", 1).unwrap_err();
        assert_eq!(err.to_string(), EMPTY_SECRET_ERROR);
        let err = VerifySecretRequest::new(&"x".repeat(300), 1).unwrap_err();
        assert_eq!(err.to_string(), SECRET_TOO_LONG_ERROR);
        let err = VerifySecretRequest::new("flag", 7).unwrap_err();
        assert_eq!(err.to_string(), INVALID_PLAYER_ERROR);
    }

    #[test]
    fn spin_ack_carries_server_reason() {
        let ack: SpinAck = serde_json::from_value(json!({"success": false, "error": "No tasks available"})).unwrap();
        assert!(!ack.success);
        assert_eq!(ack.error.as_deref(), Some("No tasks available"));
    }
}
