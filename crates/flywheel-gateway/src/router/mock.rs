//! Mock responder: answers fixed paths from [`MockRule`]s.
//!
//! Patterns are matched segment by segment. `{param}` captures one segment,
//! a trailing `*` captures the rest of the path (including nothing).

use flywheel_kernel::gateway::{GatewayResponse, HttpMethod, MockRule};
use std::collections::HashMap;

/// A matched mock rule plus the captured path parameters.
#[derive(Debug, Clone)]
pub struct MockMatch<'a> {
    pub rule: &'a MockRule,
    pub params: HashMap<String, String>,
}

impl MockMatch<'_> {
    /// Build the canned response.
    pub fn response(&self) -> GatewayResponse {
        GatewayResponse::new(self.rule.status, format!("mock:{}", self.rule.id))
            .with_header("content-type", self.rule.content_type.as_str())
            .with_body(self.rule.body.clone())
    }
}

/// Ordered set of mock rules. The first matching rule wins.
#[derive(Debug, Default, Clone)]
pub struct MockResponder {
    rules: Vec<MockRule>,
}

impl MockResponder {
    pub fn new(rules: Vec<MockRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[MockRule] {
        &self.rules
    }

    /// Find the first rule accepting `(method, path)`.
    pub fn find(&self, method: &HttpMethod, path: &str) -> Option<MockMatch<'_>> {
        let path = path.split('?').next().unwrap_or(path);
        self.rules
            .iter()
            .filter(|r| r.accepts(method))
            .find_map(|rule| {
                Self::match_pattern(&rule.path_pattern, path).map(|params| MockMatch { rule, params })
            })
    }

    /// Match a concrete path against a pattern such as
    /// `/v1/deployment/model-deployments/{namespace}/{name}`.
    ///
    /// Returns `Some(params)` on match, `None` otherwise.
    fn match_pattern(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
        let t_parts: Vec<&str> = pattern.trim_matches('/').split('/').collect();
        let p_parts: Vec<&str> = path.trim_matches('/').split('/').collect();

        let wildcard = t_parts.last() == Some(&"*");
        let fixed = if wildcard { &t_parts[..t_parts.len() - 1] } else { &t_parts[..] };

        if wildcard {
            if p_parts.len() < fixed.len() {
                return None;
            }
        } else if t_parts.len() != p_parts.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (t, p) in fixed.iter().zip(p_parts.iter()) {
            if t.starts_with('{') && t.ends_with('}') && t.len() > 2 {
                if p.is_empty() {
                    return None;
                }
                params.insert(t[1..t.len() - 1].to_string(), p.to_string());
            } else if t != p {
                return None;
            }
        }
        if wildcard {
            params.insert("*".to_string(), p_parts[fixed.len()..].join("/"));
        }
        Some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flywheel_kernel::gateway::GatewayConfig;

    fn flywheel_mocks() -> MockResponder {
        MockResponder::new(GatewayConfig::data_flywheel("flywheel").mocks)
    }

    #[test]
    fn deployment_status_captures_namespace_and_name() {
        let mocks = flywheel_mocks();
        let m = mocks
            .find(
                &HttpMethod::Get,
                "/v1/deployment/model-deployments/dfwbp/meta-llama-3.2-1b",
            )
            .unwrap();
        assert_eq!(m.rule.id, "deployment-status");
        assert_eq!(m.params["namespace"], "dfwbp");
        assert_eq!(m.params["name"], "meta-llama-3.2-1b");
        let resp = m.response();
        assert_eq!(resp.status, 200);
        assert!(String::from_utf8_lossy(&resp.body).contains("ready"));
    }

    #[test]
    fn method_selects_between_rules_on_same_path() {
        let mocks = flywheel_mocks();
        let list = mocks
            .find(&HttpMethod::Get, "/v1/deployment/model-deployments")
            .unwrap();
        assert_eq!(list.rule.id, "list-deployments");
        let create = mocks
            .find(&HttpMethod::Post, "/v1/deployment/model-deployments")
            .unwrap();
        assert_eq!(create.rule.id, "create-deployment");
        assert!(mocks
            .find(&HttpMethod::Delete, "/v1/deployment/model-deployments")
            .is_none());
    }

    #[test]
    fn wildcard_matches_remaining_segments() {
        let mocks = MockResponder::new(vec![MockRule::json("w", "/v1/stub/*", "{}")]);
        let m = mocks.find(&HttpMethod::Get, "/v1/stub/a/b/c").unwrap();
        assert_eq!(m.params["*"], "a/b/c");
        assert!(mocks.find(&HttpMethod::Get, "/v1/stub").is_some());
        assert!(mocks.find(&HttpMethod::Get, "/v1/other").is_none());
    }

    #[test]
    fn non_matching_paths_fall_through() {
        let mocks = flywheel_mocks();
        assert!(mocks.find(&HttpMethod::Get, "/v1/datasets").is_none());
        assert!(mocks
            .find(&HttpMethod::Get, "/v1/deployment/model-deployments/only-one")
            .is_none());
    }
}
