use super::ast::Expr;
use super::context::EvalContext;
use super::eval::{evaluate, Value};
use super::parser;
use arc_swap::ArcSwap;
use gloryhole_domain::{DomainError, PolicyAction, PolicyRule, UpstreamEndpoint};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// A matched rule, with its pre-parsed action data.
#[derive(Debug, Clone)]
pub struct PolicyMatch {
    pub rule_name: Arc<str>,
    pub action: PolicyAction,
    /// REDIRECT target.
    pub redirect: Option<IpAddr>,
    /// FORWARD upstream set.
    pub upstreams: Option<Arc<Vec<UpstreamEndpoint>>>,
}

struct CompiledRule {
    rule: PolicyRule,
    expr: Expr,
    redirect: Option<IpAddr>,
    upstreams: Option<Arc<Vec<UpstreamEndpoint>>>,
}

/// Compiled rule list behind an atomic pointer. Rule mutations compile
/// first and publish a whole new list; a compilation error leaves the
/// engine unchanged. Evaluation walks enabled rules in declaration order,
/// first truthy match wins.
pub struct PolicyEngine {
    rules: ArcSwap<Vec<Arc<CompiledRule>>>,
    /// Serializes writers; readers never take it.
    write_lock: Mutex<()>,
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self {
            rules: ArcSwap::from_pointee(Vec::new()),
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_rules(rules: Vec<PolicyRule>) -> Result<Self, DomainError> {
        let engine = Self::new();
        for rule in rules {
            engine.add_rule(rule)?;
        }
        Ok(engine)
    }

    fn compile(rule: PolicyRule) -> Result<CompiledRule, DomainError> {
        let expr = parser::parse(&rule.logic).map_err(|reason| DomainError::PolicyCompile {
            rule: rule.name.to_string(),
            reason,
        })?;

        let mut redirect = None;
        let mut upstreams = None;
        match rule.action {
            PolicyAction::Redirect => {
                let data = rule.action_data.as_deref().unwrap_or_default();
                let ip: IpAddr = data.parse().map_err(|_| DomainError::PolicyCompile {
                    rule: rule.name.to_string(),
                    reason: format!("REDIRECT needs an IP literal, got '{data}'"),
                })?;
                redirect = Some(ip);
            }
            PolicyAction::Forward => {
                let data = rule.action_data.as_deref().unwrap_or_default();
                let endpoints = UpstreamEndpoint::parse_list(data).map_err(|e| {
                    DomainError::PolicyCompile {
                        rule: rule.name.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                if endpoints.is_empty() {
                    return Err(DomainError::PolicyCompile {
                        rule: rule.name.to_string(),
                        reason: "FORWARD needs at least one upstream".into(),
                    });
                }
                upstreams = Some(Arc::new(endpoints));
            }
            PolicyAction::Block | PolicyAction::Allow => {}
        }

        Ok(CompiledRule {
            rule,
            expr,
            redirect,
            upstreams,
        })
    }

    /// Compile-check an expression without touching the rule list.
    pub fn test_compile(logic: &str) -> Result<(), DomainError> {
        parser::parse(logic)
            .map(|_| ())
            .map_err(|reason| DomainError::PolicyCompile {
                rule: "<test>".into(),
                reason,
            })
    }

    pub fn add_rule(&self, rule: PolicyRule) -> Result<(), DomainError> {
        let compiled = Self::compile(rule)?;
        let _guard = self.write_lock.lock().unwrap();

        let current = self.rules.load_full();
        if current.iter().any(|r| r.rule.name == compiled.rule.name) {
            return Err(DomainError::DuplicatePolicyRule(
                compiled.rule.name.to_string(),
            ));
        }
        let mut next = (*current).clone();
        info!(rule = %compiled.rule.name, action = compiled.rule.action.as_str(), "Policy rule added");
        next.push(Arc::new(compiled));
        self.rules.store(Arc::new(next));
        Ok(())
    }

    /// Replace the rule with the same name, keeping its position.
    pub fn update_rule(&self, rule: PolicyRule) -> Result<(), DomainError> {
        let compiled = Self::compile(rule)?;
        let _guard = self.write_lock.lock().unwrap();

        let current = self.rules.load_full();
        let position = current
            .iter()
            .position(|r| r.rule.name == compiled.rule.name)
            .ok_or_else(|| DomainError::PolicyRuleNotFound(compiled.rule.name.to_string()))?;

        let mut next = (*current).clone();
        next[position] = Arc::new(compiled);
        self.rules.store(Arc::new(next));
        Ok(())
    }

    pub fn remove_rule(&self, name: &str) -> Result<(), DomainError> {
        let _guard = self.write_lock.lock().unwrap();

        let current = self.rules.load_full();
        let position = current
            .iter()
            .position(|r| &*r.rule.name == name)
            .ok_or_else(|| DomainError::PolicyRuleNotFound(name.to_string()))?;

        let mut next = (*current).clone();
        next.remove(position);
        self.rules.store(Arc::new(next));
        info!(rule = name, "Policy rule removed");
        Ok(())
    }

    pub fn list(&self) -> Vec<PolicyRule> {
        self.rules.load().iter().map(|r| r.rule.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First enabled rule whose expression evaluates to `true`. Evaluation
    /// errors (runtime type mismatches) are non-matches and never halt the
    /// walk.
    pub fn evaluate(&self, ctx: &EvalContext) -> Option<PolicyMatch> {
        let rules = self.rules.load();
        for compiled in rules.iter() {
            if !compiled.rule.enabled {
                continue;
            }
            match evaluate(&compiled.expr, ctx) {
                Ok(Value::Bool(true)) => {
                    return Some(PolicyMatch {
                        rule_name: Arc::clone(&compiled.rule.name),
                        action: compiled.rule.action,
                        redirect: compiled.redirect,
                        upstreams: compiled.upstreams.clone(),
                    })
                }
                Ok(Value::Bool(false)) => {}
                Ok(other) => {
                    debug!(
                        rule = %compiled.rule.name,
                        result = other.type_name(),
                        "Policy rule evaluated to a non-boolean; treated as non-match"
                    );
                }
                Err(e) => {
                    debug!(
                        rule = %compiled.rule.name,
                        error = %e,
                        "Policy rule evaluation failed; treated as non-match"
                    );
                }
            }
        }
        None
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}
