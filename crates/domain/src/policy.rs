use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Terminal action of a policy rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyAction {
    Block,
    Allow,
    Redirect,
    Forward,
}

impl PolicyAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyAction::Block => "BLOCK",
            PolicyAction::Allow => "ALLOW",
            PolicyAction::Redirect => "REDIRECT",
            PolicyAction::Forward => "FORWARD",
        }
    }
}

/// A user policy rule as stored and listed. The compiled expression is held
/// by the engine, keyed by `name`; rules evaluate in declaration order,
/// first match wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    pub name: Arc<str>,
    /// Source expression, e.g. `DomainEndsWith(Domain, ".ads.example") && Hour >= 22`.
    pub logic: String,
    pub action: PolicyAction,
    /// REDIRECT: an IPv4/IPv6 literal. FORWARD: comma-separated upstreams.
    #[serde(default)]
    pub action_data: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl PolicyRule {
    pub fn new(name: &str, logic: &str, action: PolicyAction) -> Self {
        Self {
            name: Arc::from(name),
            logic: logic.to_string(),
            action,
            action_data: None,
            enabled: true,
        }
    }

    pub fn with_action_data(mut self, data: &str) -> Self {
        self.action_data = Some(data.to_string());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
