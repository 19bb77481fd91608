//! Typed frames.
//!
//! Client → server:
//! - `{"type":"connect","id":"<player-id>"}`
//! - `{"type":"option_response","selected":"<text>"}`
//!
//! Server → client:
//! - `{"type":"connection","result":"success"}`
//! - `{"type":"connection","result":"failed","reason":"invalid id"}`
//! - `{"type":"select","options":[..],"additional options":[..],"reason":".."}`
//! - `{"type":"event","event_type":"<name>","first":true,"values":{..}}`
//!
//! Admin endpoint (game provisioning):
//! - `{"type":"create_game","game_id":"g","players":2}`
//! - `{"type":"create_game","ids":"id1,id2"}` (`ids` is `null` on failure)

use loon_core::{EventRecord, SelectRequest};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::wire_types::{ConnectionResult, REASON_INVALID_CONNECTION, REASON_INVALID_ID};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Connect { id: String },
    OptionResponse { selected: String },
}

impl ClientMessage {
    pub fn connect(id: impl Into<String>) -> Self {
        ClientMessage::Connect { id: id.into() }
    }

    pub fn response(selected: impl Into<String>) -> Self {
        ClientMessage::OptionResponse {
            selected: selected.into(),
        }
    }

    /// Structural check of a decoded frame. `None` for anything that is not
    /// a client message: wrong discriminant, missing or mistyped fields.
    pub fn from_value(value: Value) -> Option<Self> {
        serde_json::from_value(value).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connection {
        result: ConnectionResult,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Select {
        options: Vec<String>,
        #[serde(rename = "additional options")]
        additional_options: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Event {
        event_type: String,
        first: bool,
        values: Map<String, Value>,
    },
}

impl ServerMessage {
    pub fn connection_success() -> Self {
        ServerMessage::Connection {
            result: ConnectionResult::Success,
            reason: None,
        }
    }

    pub fn connection_failed(reason: impl Into<String>) -> Self {
        ServerMessage::Connection {
            result: ConnectionResult::Failed,
            reason: Some(reason.into()),
        }
    }

    pub fn invalid_connection() -> Self {
        Self::connection_failed(REASON_INVALID_CONNECTION)
    }

    pub fn invalid_id() -> Self {
        Self::connection_failed(REASON_INVALID_ID)
    }

    pub fn select(request: &SelectRequest) -> Self {
        ServerMessage::Select {
            options: request.options.clone(),
            additional_options: request.additional_options.clone(),
            reason: request.reason.clone(),
        }
    }

    pub fn event(record: &EventRecord, first: bool) -> Self {
        ServerMessage::Event {
            event_type: record.event_type.clone(),
            first,
            values: record.values.clone(),
        }
    }
}

fn default_players() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdminRequest {
    CreateGame {
        game_id: String,
        #[serde(default = "default_players")]
        players: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdminResponse {
    /// Comma-joined player ids, or `None` when creation failed.
    CreateGame { ids: Option<String> },
}

impl AdminResponse {
    pub fn created(ids: &[String]) -> Self {
        AdminResponse::CreateGame {
            ids: Some(ids.join(",")),
        }
    }

    pub fn failed() -> Self {
        AdminResponse::CreateGame { ids: None }
    }

    /// Player ids carried by a successful reply.
    pub fn player_ids(&self) -> Option<Vec<String>> {
        match self {
            AdminResponse::CreateGame { ids: Some(ids) } => {
                Some(ids.split(',').filter(|id| !id.is_empty()).map(str::to_string).collect())
            }
            AdminResponse::CreateGame { ids: None } => None,
        }
    }
}
