//! JSON-RPC 2.0 wire types and structural validation.
//!
//! A [`Payload`] is only ever built from untrusted text through
//! [`Payload::parse`] / [`Payload::from_value`], which perform an explicit
//! discriminated check:
//!
//! - `method` present, `id` present → [`Request`]
//! - `method` present, `id` absent → [`Notification`]
//! - `method` absent, `id` present, exactly one of `result` / `error` → [`Response`]
//!
//! Everything else is rejected with a [`PayloadError`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::PayloadError;

/// The protocol version tag carried by every payload.
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC identifier: string, integer, or `null` (responses only).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum RpcId {
    Number(i64),
    String(String),
    Null,
}

impl RpcId {
    /// Accepts the identifier forms valid on a request: string or integer.
    fn from_request_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Number),
            Value::String(s) => Some(Self::String(s.clone())),
            _ => None,
        }
    }
}

impl From<i32> for RpcId {
    fn from(n: i32) -> Self {
        Self::Number(n.into())
    }
}

impl From<i64> for RpcId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<u32> for RpcId {
    fn from(n: u32) -> Self {
        Self::Number(n.into())
    }
}

impl From<String> for RpcId {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for RpcId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl std::fmt::Display for RpcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorResponse {
    fn from_value(value: Value) -> Result<Self, PayloadError> {
        let Value::Object(mut obj) = value else {
            return Err(PayloadError::InvalidErrorObject("not an object"));
        };
        let code = obj
            .get("code")
            .and_then(Value::as_i64)
            .ok_or(PayloadError::InvalidErrorObject("`code` must be an integer"))?;
        let message = match obj.remove("message") {
            Some(Value::String(message)) => message,
            _ => return Err(PayloadError::InvalidErrorObject("`message` must be a string")),
        };
        Ok(Self {
            code,
            message,
            data: obj.remove("data"),
        })
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: RpcId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(id: impl Into<RpcId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id: id.into(),
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 notification (a request without an identifier).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            method: method.into(),
            params,
        }
    }
}

/// The two mutually exclusive outcomes a response can carry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseOutcome {
    Result(Value),
    Error(ErrorResponse),
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: RpcId,
    #[serde(flatten)]
    pub outcome: ResponseOutcome,
}

impl Response {
    pub fn success(id: impl Into<RpcId>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id: id.into(),
            outcome: ResponseOutcome::Result(result),
        }
    }

    pub fn failure(id: impl Into<RpcId>, error: ErrorResponse) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id: id.into(),
            outcome: ResponseOutcome::Error(error),
        }
    }

    /// Returns `true` if this response carries a result.
    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, ResponseOutcome::Result(_))
    }

    /// Unwrap the result value or return the error object.
    pub fn into_result(self) -> Result<Value, ErrorResponse> {
        match self.outcome {
            ResponseOutcome::Result(value) => Ok(value),
            ResponseOutcome::Error(err) => Err(err),
        }
    }
}

/// Which of the three payload shapes a [`Payload`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Request,
    Notification,
    Response,
}

impl std::fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request => write!(f, "request"),
            Self::Notification => write!(f, "notification"),
            Self::Response => write!(f, "response"),
        }
    }
}

/// Any structurally valid JSON-RPC 2.0 message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Request(Request),
    Notification(Notification),
    Response(Response),
}

impl Payload {
    /// Parse raw wire text into a validated payload.
    pub fn parse(text: &str) -> Result<Self, PayloadError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Validate an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, PayloadError> {
        let Value::Object(mut obj) = value else {
            return Err(PayloadError::NotAnObject);
        };
        match obj.get("jsonrpc") {
            Some(Value::String(version)) if version == JSONRPC_VERSION => {}
            _ => return Err(PayloadError::Version),
        }

        if let Some(method) = obj.remove("method") {
            let Value::String(method) = method else {
                return Err(PayloadError::InvalidMethod);
            };
            let params = take_params(&mut obj)?;
            return match obj.remove("id") {
                None => Ok(Self::Notification(Notification::new(method, params))),
                Some(id) => {
                    let id = RpcId::from_request_value(&id).ok_or(PayloadError::InvalidId)?;
                    Ok(Self::Request(Request::new(id, method, params)))
                }
            };
        }

        let id = match obj.remove("id") {
            None => return Err(PayloadError::MissingId),
            Some(Value::Null) => RpcId::Null,
            Some(id) => RpcId::from_request_value(&id).ok_or(PayloadError::InvalidId)?,
        };
        let outcome = match (obj.remove("result"), obj.remove("error")) {
            (Some(result), None) => ResponseOutcome::Result(result),
            (None, Some(error)) => ResponseOutcome::Error(ErrorResponse::from_value(error)?),
            (Some(_), Some(_)) => return Err(PayloadError::AmbiguousOutcome),
            (None, None) => return Err(PayloadError::MissingOutcome),
        };
        Ok(Self::Response(Response {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            outcome,
        }))
    }

    /// Serialize to compact wire text.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::Request(_) => PayloadKind::Request,
            Self::Notification(_) => PayloadKind::Notification,
            Self::Response(_) => PayloadKind::Response,
        }
    }

    /// The identifier, for requests and responses.
    pub fn id(&self) -> Option<&RpcId> {
        match self {
            Self::Request(r) => Some(&r.id),
            Self::Notification(_) => None,
            Self::Response(r) => Some(&r.id),
        }
    }

    /// The method name, for requests and notifications.
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(r) => Some(&r.method),
            Self::Notification(n) => Some(&n.method),
            Self::Response(_) => None,
        }
    }
}

impl From<Request> for Payload {
    fn from(r: Request) -> Self {
        Self::Request(r)
    }
}

impl From<Notification> for Payload {
    fn from(n: Notification) -> Self {
        Self::Notification(n)
    }
}

impl From<Response> for Payload {
    fn from(r: Response) -> Self {
        Self::Response(r)
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

fn take_params(obj: &mut Map<String, Value>) -> Result<Option<Value>, PayloadError> {
    match obj.remove("params") {
        None => Ok(None),
        Some(params @ (Value::Array(_) | Value::Object(_))) => Ok(Some(params)),
        Some(_) => Err(PayloadError::InvalidParams),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serialization() {
        let req = Request::new(1, "getblockcount", None);
        let json = Payload::from(req).to_json().unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"method\":\"getblockcount\""));
        assert!(!json.contains("params"));
    }

    #[test]
    fn response_serializes_exactly_one_outcome() {
        let ok = serde_json::to_value(Response::success(7, json!("0x1"))).unwrap();
        assert_eq!(ok, json!({"jsonrpc": "2.0", "id": 7, "result": "0x1"}));

        let err = Response::failure(
            "abc",
            ErrorResponse {
                code: -32601,
                message: "Method not found".into(),
                data: None,
            },
        );
        let err = serde_json::to_value(err).unwrap();
        assert_eq!(
            err,
            json!({
                "jsonrpc": "2.0",
                "id": "abc",
                "error": {"code": -32601, "message": "Method not found"}
            })
        );
    }

    #[test]
    fn classifies_the_three_shapes() {
        let req = Payload::parse(r#"{"jsonrpc":"2.0","id":"a","method":"getAccount"}"#).unwrap();
        assert_eq!(req.kind(), PayloadKind::Request);
        assert_eq!(req.id(), Some(&RpcId::String("a".into())));

        let note =
            Payload::parse(r#"{"jsonrpc":"2.0","method":"accountChanged","params":{"x":1}}"#)
                .unwrap();
        assert_eq!(note.kind(), PayloadKind::Notification);
        assert_eq!(note.method(), Some("accountChanged"));
        assert!(note.id().is_none());

        let resp = Payload::parse(r#"{"jsonrpc":"2.0","id":3,"result":null}"#).unwrap();
        assert_eq!(resp.kind(), PayloadKind::Response);
        let Payload::Response(resp) = resp else { unreachable!() };
        assert!(resp.is_ok());
        assert_eq!(resp.into_result().unwrap(), Value::Null);
    }

    #[test]
    fn error_response_keeps_data() {
        let raw = r#"{"jsonrpc":"2.0","id":null,
            "error":{"code":-32700,"message":"Parse error","data":"line 1"}}"#;
        let payload = Payload::parse(raw).unwrap();
        let Payload::Response(resp) = payload else { panic!("expected response") };
        assert_eq!(resp.id, RpcId::Null);
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.code, -32700);
        assert_eq!(err.data, Some(json!("line 1")));
    }

    #[test]
    fn rejects_malformed_messages() {
        let cases = [
            "not json",
            "[1,2,3]",
            r#"{"id":1,"method":"m"}"#,
            r#"{"jsonrpc":"1.0","id":1,"method":"m"}"#,
            r#"{"jsonrpc":"2.0","id":1,"method":5}"#,
            r#"{"jsonrpc":"2.0","id":{"x":1},"method":"m"}"#,
            r#"{"jsonrpc":"2.0","id":1.5,"method":"m"}"#,
            r#"{"jsonrpc":"2.0","method":"m","params":"flat"}"#,
            r#"{"jsonrpc":"2.0","id":1}"#,
            r#"{"jsonrpc":"2.0","id":1,"result":1,"error":{"code":1,"message":"x"}}"#,
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":"x","message":"x"}}"#,
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000}}"#,
            r#"{"jsonrpc":"2.0","result":1}"#,
        ];
        for raw in cases {
            assert!(Payload::parse(raw).is_err(), "accepted: {raw}");
        }
    }

    #[test]
    fn specific_rejection_reasons() {
        assert!(matches!(
            Payload::parse(r#"{"jsonrpc":"2.0","id":1}"#),
            Err(PayloadError::MissingOutcome)
        ));
        let both = r#"{"jsonrpc":"2.0","id":1,"result":1,"error":{"code":1,"message":"x"}}"#;
        assert!(matches!(
            Payload::parse(both),
            Err(PayloadError::AmbiguousOutcome)
        ));
        assert!(matches!(Payload::parse("{"), Err(PayloadError::Json(_))));
    }

    #[test]
    fn deserialize_validates() {
        let ok: Payload =
            serde_json::from_value(json!({"jsonrpc": "2.0", "method": "ping"})).unwrap();
        assert_eq!(ok.kind(), PayloadKind::Notification);
        assert!(serde_json::from_value::<Payload>(json!({"jsonrpc": "2.0", "id": 1})).is_err());
    }

    #[test]
    fn request_roundtrip_is_identical() {
        let original: Payload =
            Request::new(42, "invokeRead", Some(json!([{"scriptHash": "0xabc"}]))).into();
        let wire = original.to_json().unwrap();
        assert_eq!(Payload::parse(&wire).unwrap(), original);
    }
}
