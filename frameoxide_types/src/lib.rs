use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A request sent by the host to a content process over a channel
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MethodCall {
    /// Identifier for this method call
    ///
    /// [`MethodCall`] id's are unique for the whole lifetime of a channel, they
    /// are never reset when the channel's transport is swapped.
    pub id: CallId,
    /// The logical connection inside the channel this call belongs to
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub method: Cow<'static, str>,
    pub params: serde_json::Value,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallId(usize);

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallId({})", self.0)
    }
}

impl CallId {
    pub fn new(id: usize) -> Self {
        CallId(id)
    }
}

/// A fire and forget notification, travels in both directions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EventMessage {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    /// Name of the method
    pub method: Cow<'static, str>,
    /// Json params
    #[serde(default)]
    pub params: serde_json::Value,
}

impl EventMessage {
    pub fn new(
        session_id: impl Into<String>,
        method: impl Into<Cow<'static, str>>,
        params: serde_json::Value,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            method: method.into(),
            params,
        }
    }
}

impl Method for EventMessage {
    fn identifier(&self) -> Cow<'static, str> {
        self.method.clone()
    }
}

pub trait Method {
    /// The whole string identifier for this method like: `Runtime.evaluate`
    fn identifier(&self) -> Cow<'static, str>;

    /// The name of the domain this method belongs to: `Runtime`
    fn domain_name(&self) -> Cow<'static, str> {
        self.split().0
    }

    /// The standalone identifier of the method inside the domain: `evaluate`
    fn method_name(&self) -> Cow<'static, str> {
        self.split().1
    }

    /// Tuple of (`domain_name`, `method_name`) : (`Runtime`, `evaluate`)
    ///
    /// Identifiers without a domain yield an empty domain name.
    fn split(&self) -> (Cow<'static, str>, Cow<'static, str>) {
        let id = self.identifier();
        if let Some((domain, method)) = id.split_once('.') {
            return (domain.to_string().into(), method.to_string().into());
        }
        (Cow::Borrowed(""), id)
    }
}

/// A typed request with a typed response
pub trait Command: serde::ser::Serialize + Method {
    type Response: DeserializeOwned + fmt::Debug;
}

pub struct CommandResponse<T>
where
    T: fmt::Debug,
{
    pub id: CallId,
    pub result: T,
    pub method: Cow<'static, str>,
}

impl<T: fmt::Debug> fmt::Debug for CommandResponse<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandResponse")
            .field("id", &self.id)
            .field("result", &self.result)
            .field("method", &self.method)
            .finish()
    }
}

pub type CommandResult<T> = Result<CommandResponse<T>, Error>;

impl<T: fmt::Debug> Deref for CommandResponse<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.result
    }
}

/// A response to a [`MethodCall`] from a content process
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Response {
    /// Numeric identifier for the exact request
    pub id: CallId,
    /// The response payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// The Reason why the [`MethodCall`] failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Error>,
}

impl Response {
    pub fn ok(id: CallId, result: serde_json::Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: CallId, error: Error) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Everything a content process sends back to the host
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Message {
    Response(Response),
    Event(EventMessage),
}

/// Everything the host sends to a content process
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Outgoing {
    Call(MethodCall),
    Event(EventMessage),
}

impl Outgoing {
    pub fn method(&self) -> &str {
        match self {
            Outgoing::Call(call) => call.method.as_ref(),
            Outgoing::Event(ev) => ev.method.as_ref(),
        }
    }

    pub fn as_call(&self) -> Option<&MethodCall> {
        match self {
            Outgoing::Call(call) => Some(call),
            Outgoing::Event(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Error {
    /// Error code
    #[serde(default)]
    pub code: i64,
    /// Error Message
    pub message: String,
}

impl Error {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn split_identifier() {
        let ev = EventMessage::new("page", "Runtime.console", json!({}));
        assert_eq!(ev.domain_name(), "Runtime");
        assert_eq!(ev.method_name(), "console");

        let ev = EventMessage::new("worker", "dispatch", json!({}));
        assert_eq!(ev.domain_name(), "");
        assert_eq!(ev.method_name(), "dispatch");
    }

    #[test]
    fn decode_untagged_message() {
        let resp: Message = serde_json::from_value(json!({"id": 3, "result": {"a": 1}})).unwrap();
        assert_eq!(resp, Message::Response(Response::ok(CallId::new(3), json!({"a": 1}))));

        let err: Message = serde_json::from_value(
            json!({"id": 4, "error": {"code": -1, "message": "boom"}}),
        )
        .unwrap();
        assert_eq!(
            err,
            Message::Response(Response::err(CallId::new(4), Error::new(-1, "boom")))
        );

        let ev: Message = serde_json::from_value(
            json!({"sessionId": "page", "method": "Page.eventFired", "params": {"name": "load"}}),
        )
        .unwrap();
        assert!(matches!(ev, Message::Event(ev) if ev.method == "Page.eventFired"));
    }
}
