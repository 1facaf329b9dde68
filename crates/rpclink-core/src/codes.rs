//! Standard JSON-RPC 2.0 error codes and their canonical messages.
//!
//! Two classification rules live here:
//! - [`is_server_error_code`] is a range test over `-32099..=-32000`, the
//!   block JSON-RPC reserves for implementation-defined server errors.
//! - [`is_reserved_error_code`] checks the explicit list of named codes.
//!
//! They agree on every named code except that [`StandardErrorCode::ServerError`]
//! (`-32000`) is also the upper bound of the server range. Codes in
//! `-32099..=-32001` are server errors but not reserved names.

use serde_json::Value;

use crate::payload::ErrorResponse;

/// Lowest code of the implementation-defined server error range.
pub const SERVER_ERROR_CODE_MIN: i64 = -32099;
/// Highest code of the implementation-defined server error range.
pub const SERVER_ERROR_CODE_MAX: i64 = -32000;

/// Explicit list of codes with a reserved, named meaning.
pub const RESERVED_ERROR_CODES: [i64; 6] = [-32700, -32600, -32601, -32602, -32603, -32000];

/// The closed set of named JSON-RPC error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ServerError,
}

impl StandardErrorCode {
    pub const ALL: [StandardErrorCode; 6] = [
        Self::ParseError,
        Self::InvalidRequest,
        Self::MethodNotFound,
        Self::InvalidParams,
        Self::InternalError,
        Self::ServerError,
    ];

    pub fn code(self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ServerError => -32000,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::ServerError => "Server error",
        }
    }

    /// Look up the named code for `code`, if there is one.
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }
}

impl std::fmt::Display for StandardErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// Returns `true` if `code` is one of the six named codes.
pub fn is_standard_error_code(code: i64) -> bool {
    StandardErrorCode::from_code(code).is_some()
}

/// Returns `true` if `code` lies within `-32099..=-32000`.
pub fn is_server_error_code(code: i64) -> bool {
    (SERVER_ERROR_CODE_MIN..=SERVER_ERROR_CODE_MAX).contains(&code)
}

/// Returns `true` if `code` is in [`RESERVED_ERROR_CODES`].
pub fn is_reserved_error_code(code: i64) -> bool {
    RESERVED_ERROR_CODES.contains(&code)
}

/// Canonical `{code, message}` for a standard code.
///
/// Any other code is normalized to `InternalError`, so the returned entry
/// always carries a well-known message.
pub fn get_standard_error(code: i64) -> ErrorResponse {
    let standard = StandardErrorCode::from_code(code).unwrap_or(StandardErrorCode::InternalError);
    ErrorResponse {
        code: standard.code(),
        message: standard.message().to_string(),
        data: None,
    }
}

/// Alias of [`get_standard_error`].
pub fn get_error_by_code(code: i64) -> ErrorResponse {
    get_standard_error(code)
}

/// Like [`get_standard_error`], attaching caller-specific detail as `data`.
pub fn standard_error_with_data(code: i64, data: impl Into<Value>) -> ErrorResponse {
    ErrorResponse {
        data: Some(data.into()),
        ..get_standard_error(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_messages() {
        let expected = [
            (-32700, "Parse error"),
            (-32600, "Invalid Request"),
            (-32601, "Method not found"),
            (-32602, "Invalid params"),
            (-32603, "Internal error"),
            (-32000, "Server error"),
        ];
        for (code, message) in expected {
            let err = get_standard_error(code);
            assert_eq!(err.code, code);
            assert_eq!(err.message, message);
            assert!(err.data.is_none());
        }
    }

    #[test]
    fn unknown_codes_fall_back_to_internal_error() {
        for code in [0, 1, -1, -32001, -32099, -32604, -32768, i64::MIN, i64::MAX] {
            let err = get_error_by_code(code);
            assert_eq!(err.code, -32603, "code {code}");
            assert_eq!(err.message, "Internal error");
        }
    }

    #[test]
    fn server_range_is_inclusive() {
        assert!(is_server_error_code(-32099));
        assert!(is_server_error_code(-32050));
        assert!(is_server_error_code(-32000));
        assert!(!is_server_error_code(-32100));
        assert!(!is_server_error_code(-31999));
        assert!(!is_server_error_code(-32603));
        assert!(!is_server_error_code(0));
    }

    #[test]
    fn reserved_list_agrees_with_named_codes() {
        for code in StandardErrorCode::ALL {
            assert!(is_standard_error_code(code.code()));
            assert!(is_reserved_error_code(code.code()));
        }
        // server-range codes other than -32000 are not named
        assert!(is_server_error_code(-32001));
        assert!(!is_reserved_error_code(-32001));
        assert!(!is_standard_error_code(-32001));
    }

    #[test]
    fn detail_goes_into_data() {
        let err = standard_error_with_data(
            StandardErrorCode::InvalidParams.code(),
            "Script and invocations are inconsistent",
        );
        assert_eq!(err.code, -32602);
        assert_eq!(err.message, "Invalid params");
        assert_eq!(
            err.data,
            Some(Value::String("Script and invocations are inconsistent".into()))
        );

        let err = standard_error_with_data(42, serde_json::json!({"reason": "boom"}));
        assert_eq!(err.code, -32603);
        assert_eq!(err.data.unwrap()["reason"], "boom");
    }

    #[test]
    fn from_code_roundtrips_names() {
        assert_eq!(
            StandardErrorCode::from_code(-32601),
            Some(StandardErrorCode::MethodNotFound)
        );
        assert_eq!(StandardErrorCode::from_code(-32001), None);
        assert_eq!(StandardErrorCode::ParseError.to_string(), "-32700: Parse error");
    }
}
