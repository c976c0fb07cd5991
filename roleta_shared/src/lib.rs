use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Machine-readable reason a link cannot be redeemed. The wire encoding is
/// stable; clients branch on it rather than parsing messages.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    NotFound,
    AlreadyRedeemed,
    Expired,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerateLinkResponse {
    pub id: String,
    /// Absolute spin URL, ready for QR display.
    pub link: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<InvalidReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidateResponse {
    pub fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
            error: None,
        }
    }

    pub fn invalid(reason: InvalidReason, error: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpinResponse {
    pub prize: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorResponse {
    pub error: String,
    pub reason: InvalidReason,
    /// Present when `reason` is `already_redeemed`: the prize recorded by
    /// the first successful spin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize: Option<String>,
}

/// One successful redemption, as kept by the server's in-memory log.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RedemptionRecord {
    pub ts: DateTime<Utc>,
    pub link_id: String,
    pub prize: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("internal server error")]
    Internal,
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_codes_are_stable() {
        for (reason, code) in [
            (InvalidReason::NotFound, "\"not_found\""),
            (InvalidReason::AlreadyRedeemed, "\"already_redeemed\""),
            (InvalidReason::Expired, "\"expired\""),
        ] {
            assert_eq!(serde_json::to_string(&reason).unwrap(), code);
        }
    }

    #[test]
    fn validate_response_omits_empty_fields() {
        let json = serde_json::to_string(&ValidateResponse::ok()).unwrap();
        assert_eq!(json, r#"{"valid":true}"#);

        let json =
            serde_json::to_string(&ValidateResponse::invalid(InvalidReason::Expired, "link expired"))
                .unwrap();
        assert_eq!(
            json,
            r#"{"valid":false,"reason":"expired","error":"link expired"}"#
        );
    }
}
