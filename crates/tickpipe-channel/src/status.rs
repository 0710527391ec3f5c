use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured status payloads published by the host.
///
/// Serialized as a single-line JSON object tagged by `type`:
/// ```text
/// {"type":"turn_start","turn":12,"player":0,"state":{...}}
/// {"type":"turn_complete","turn":12,"player":0,"activePlayer":1,...}
/// {"type":"sample","data":{"Sample":"Foo"}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum StatusMessage {
    TurnStart {
        turn: i32,
        player: i32,
        state: Value,
    },
    TurnComplete {
        turn: i32,
        player: i32,
        active_player: i32,
        active_player_name: String,
        is_human: bool,
        state: Value,
    },
    Sample {
        data: Value,
    },
}

impl StatusMessage {
    /// The payload used to check the channel end to end.
    pub fn sample() -> Self {
        Self::Sample {
            data: serde_json::json!({ "Sample": "Foo" }),
        }
    }

    /// Wire tag, also used as the kind label in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TurnStart { .. } => "turn_start",
            Self::TurnComplete { .. } => "turn_complete",
            Self::Sample { .. } => "sample",
        }
    }

    pub fn turn(&self) -> Option<i32> {
        match self {
            Self::TurnStart { turn, .. } | Self::TurnComplete { turn, .. } => Some(*turn),
            Self::Sample { .. } => None,
        }
    }

    /// Serialize to one line of JSON without the terminator.
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
