//! Outbound JSON shapes.
//!
//! Response fields are declared in alphabetical order so serde writes them
//! with sorted keys; `data` values use `serde_json`'s ordered map.

use serde::Serialize;
use serde_json::Value;

use crate::message::ErrorKind;

/// `{"accepted": true, "data"?, "id"}`
#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse<'a> {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<&'a Value>,
    pub id: &'a str,
}

impl<'a> SuccessResponse<'a> {
    pub fn new(id: &'a str, data: Option<&'a Value>) -> Self {
        Self {
            accepted: true,
            data,
            id,
        }
    }
}

/// `{"error", "id", "reason"}`
#[derive(Debug, Clone, Serialize)]
pub struct FailureResponse<'a> {
    pub error: ErrorKind,
    pub id: &'a str,
    pub reason: &'a str,
}

/// `{"targetId", "event", "data"?}`
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingNotification<'a> {
    #[serde(rename = "targetId")]
    pub target_id: &'a str,
    pub event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<&'a Value>,
}
