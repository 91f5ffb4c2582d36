//! Mock response rules.
//!
//! A [`MockRule`] answers a fixed path with a canned status and body without
//! contacting any backend. The gateway uses them to stand in for platform
//! endpoints that are absent from this deployment, e.g. model-deployment
//! calls when models are pre-deployed.
//!
//! Pattern syntax, evaluated per `/`-separated segment:
//!
//! ```text
//! /v1/deployment/model-deployments              — exact
//! /v1/deployment/model-deployments/{ns}/{name}  — {param} matches one segment
//! /v1/mock/*                                    — trailing * matches the rest
//! ```

use super::error::GatewayError;
use super::types::HttpMethod;
use serde::{Deserialize, Serialize};

fn default_status() -> u16 {
    200
}

fn default_content_type() -> String {
    "application/json".to_string()
}

/// A canned response served for matching requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MockRule {
    /// Unique stable identifier.
    pub id: String,
    /// Path pattern (see module docs).
    pub path_pattern: String,
    /// Accepted methods. Empty means all.
    #[serde(default)]
    pub methods: Vec<HttpMethod>,
    /// Response status code.
    #[serde(default = "default_status")]
    pub status: u16,
    /// Response body, returned verbatim.
    #[serde(default)]
    pub body: String,
    /// `content-type` of the response.
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

impl MockRule {
    /// `200 application/json` rule with the given body.
    pub fn json(
        id: impl Into<String>,
        path_pattern: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            path_pattern: path_pattern.into(),
            methods: Vec::new(),
            status: default_status(),
            body: body.into(),
            content_type: default_content_type(),
        }
    }

    /// Builder: restrict to specific HTTP methods.
    pub fn with_methods(mut self, methods: Vec<HttpMethod>) -> Self {
        self.methods = methods;
        self
    }

    /// Builder: override the status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Builder: override the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Whether this rule accepts `method`.
    pub fn accepts(&self, method: &HttpMethod) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }

    pub(crate) fn validate(&self) -> Result<(), GatewayError> {
        if self.id.trim().is_empty() {
            return Err(GatewayError::EmptyMockId);
        }
        if !self.path_pattern.starts_with('/') {
            return Err(GatewayError::InvalidMock(
                self.id.clone(),
                "path pattern must start with '/'".to_string(),
            ));
        }
        let segments: Vec<&str> = self.path_pattern.trim_matches('/').split('/').collect();
        if let Some(pos) = segments.iter().position(|s| *s == "*")
            && pos != segments.len() - 1
        {
            return Err(GatewayError::InvalidMock(
                self.id.clone(),
                "'*' is only allowed as the last segment".to_string(),
            ));
        }
        if !(100..=599).contains(&self.status) {
            return Err(GatewayError::InvalidMock(
                self.id.clone(),
                format!("status {} is outside 100..=599", self.status),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_must_be_last() {
        let rule = MockRule::json("m", "/v1/*/models", "{}");
        assert!(matches!(rule.validate(), Err(GatewayError::InvalidMock(_, _))));
        assert!(MockRule::json("m", "/v1/models/*", "{}").validate().is_ok());
    }

    #[test]
    fn status_out_of_range_rejected() {
        let rule = MockRule::json("m", "/x", "").with_status(99);
        assert!(rule.validate().is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let rule: MockRule =
            serde_json::from_str(r#"{"id":"m","path_pattern":"/v1/x"}"#).unwrap();
        assert_eq!(rule.status, 200);
        assert_eq!(rule.content_type, "application/json");
        assert!(rule.methods.is_empty());
    }
}
