use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::channel::WeakChannel;
use crate::error::{ChannelError, Result};
use crate::response::{FailureResponse, SuccessResponse};

/// A classified inbound message.
#[derive(Debug)]
pub enum Message {
    /// Expects exactly one response.
    Request(Request),
    /// One-way; nothing to answer.
    Notification(Notification),
}

impl Message {
    /// The request method or notification event name.
    pub fn name(&self) -> &str {
        match self {
            Message::Request(request) => request.method(),
            Message::Notification(notification) => notification.event(),
        }
    }
}

/// Error category reported in a failure response's `error` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Any failure without a more specific kind. Sent as `"Error"`.
    #[serde(rename = "Error")]
    Generic,
    /// The request carried a value of the wrong type. Sent as `"TypeError"`.
    #[serde(rename = "TypeError")]
    TypeMismatch,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Generic => "Error",
            ErrorKind::TypeMismatch => "TypeError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request failed, as reported back to the controller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct RequestError {
    kind: ErrorKind,
    reason: String,
}

impl RequestError {
    pub fn new(kind: ErrorKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    /// A failure reported as `"Error"`.
    pub fn generic(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Generic, reason)
    }

    /// A failure reported as `"TypeError"`.
    pub fn type_mismatch(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch, reason)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// An inbound call awaiting a response.
///
/// Holds a non-owning handle to the channel it arrived on. Call exactly one
/// of [`Request::succeed`] or [`Request::failed`]; this is not enforced.
pub struct Request {
    id: String,
    method: String,
    data: Option<Value>,
    internal: Option<Value>,
    channel: WeakChannel,
}

impl Request {
    pub(crate) fn new(
        id: String,
        method: String,
        data: Option<Value>,
        internal: Option<Value>,
        channel: WeakChannel,
    ) -> Self {
        Self {
            id,
            method,
            data,
            internal,
            channel,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Opaque handler reference supplied by the controller.
    pub fn internal(&self) -> Option<&Value> {
        self.internal.as_ref()
    }

    /// Deserialize the request data. Absent data deserializes from `null`.
    ///
    /// A shape mismatch is a [`ErrorKind::TypeMismatch`] error, ready to be
    /// passed to [`Request::failed`].
    pub fn data_as<T: DeserializeOwned>(&self) -> std::result::Result<T, RequestError> {
        deserialize_data(self.data.as_ref())
    }

    /// Send `{"accepted": true, "data"?, "id"}`.
    pub fn succeed(&self, data: Option<Value>) -> Result<()> {
        let body = serde_json::to_string(&SuccessResponse::new(&self.id, data.as_ref()))?;
        debug!(id = %self.id, method = %self.method, "request succeeded");
        self.send(&body)
    }

    /// Send `{"error", "id", "reason"}`.
    pub fn failed(&self, error: &RequestError) -> Result<()> {
        let body = serde_json::to_string(&FailureResponse {
            error: error.kind(),
            id: &self.id,
            reason: error.reason(),
        })?;
        debug!(id = %self.id, method = %self.method, kind = %error.kind(), "request failed");
        self.send(&body)
    }

    /// Send the response matching `outcome`.
    pub fn respond(&self, outcome: std::result::Result<Option<Value>, RequestError>) -> Result<()> {
        match outcome {
            Ok(data) => self.succeed(data),
            Err(err) => self.failed(&err),
        }
    }

    fn send(&self, body: &str) -> Result<()> {
        let channel = self.channel.upgrade().ok_or(ChannelError::Closed)?;
        channel.send(body)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("data", &self.data)
            .field("internal", &self.internal)
            .finish_non_exhaustive()
    }
}

/// An inbound one-way event.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    event: String,
    data: Option<Value>,
    internal: Option<Value>,
}

impl Notification {
    pub(crate) fn new(event: String, data: Option<Value>, internal: Option<Value>) -> Self {
        Self {
            event,
            data,
            internal,
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn internal(&self) -> Option<&Value> {
        self.internal.as_ref()
    }

    pub fn data_as<T: DeserializeOwned>(&self) -> std::result::Result<T, RequestError> {
        deserialize_data(self.data.as_ref())
    }
}

fn deserialize_data<T: DeserializeOwned>(
    data: Option<&Value>,
) -> std::result::Result<T, RequestError> {
    let value = data.cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|err| RequestError::type_mismatch(err.to_string()))
}
