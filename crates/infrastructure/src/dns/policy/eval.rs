use super::ast::{CmpOp, ContextVar, Expr};
use super::context::EvalContext;
use super::functions;
use std::fmt;

/// Runtime value of a sub-expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
        }
    }
}

/// A runtime type error. Reported at debug level and treated as a
/// non-match for the rule; evaluation of later rules continues.
#[derive(Debug)]
pub struct EvalError(pub String);

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn evaluate(expr: &Expr, ctx: &EvalContext) -> Result<Value, EvalError> {
    match expr {
        Expr::Int(value) => Ok(Value::Int(*value)),
        Expr::Str(value) => Ok(Value::Str(value.to_string())),
        Expr::Bool(value) => Ok(Value::Bool(*value)),
        Expr::Var(var) => Ok(var_value(*var, ctx)),

        Expr::Not(inner) => match evaluate(inner, ctx)? {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            other => Err(EvalError(format!("'!' applied to {}", other.type_name()))),
        },

        Expr::And(lhs, rhs) => match evaluate(lhs, ctx)? {
            Value::Bool(false) => Ok(Value::Bool(false)),
            Value::Bool(true) => as_bool(evaluate(rhs, ctx)?, "&&"),
            other => Err(EvalError(format!("'&&' applied to {}", other.type_name()))),
        },

        Expr::Or(lhs, rhs) => match evaluate(lhs, ctx)? {
            Value::Bool(true) => Ok(Value::Bool(true)),
            Value::Bool(false) => as_bool(evaluate(rhs, ctx)?, "||"),
            other => Err(EvalError(format!("'||' applied to {}", other.type_name()))),
        },

        Expr::Cmp(op, lhs, rhs) => {
            let lhs = evaluate(lhs, ctx)?;
            let rhs = evaluate(rhs, ctx)?;
            compare(*op, &lhs, &rhs)
        }

        Expr::Contains(lhs, rhs) => {
            match (evaluate(lhs, ctx)?, evaluate(rhs, ctx)?) {
                (Value::Str(haystack), Value::Str(needle)) => {
                    Ok(Value::Bool(haystack.contains(&needle)))
                }
                (lhs, rhs) => Err(EvalError(format!(
                    "'contains' needs strings, got {} and {}",
                    lhs.type_name(),
                    rhs.type_name()
                ))),
            }
        }

        Expr::Call(builtin, args) => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate(arg, ctx)?);
            }
            functions::call(*builtin, &values)
        }

        Expr::Regex(arg, regex, pattern) => match evaluate(arg, ctx)? {
            Value::Str(value) => Ok(Value::Bool(
                regex.is_match(&value).map_err(|e| {
                    EvalError(format!("regex '{pattern}' failed: {e}"))
                })?,
            )),
            other => Err(EvalError(format!(
                "DomainRegex needs a string, got {}",
                other.type_name()
            ))),
        },
    }
}

fn var_value(var: ContextVar, ctx: &EvalContext) -> Value {
    match var {
        ContextVar::Domain => Value::Str(ctx.domain.to_string()),
        ContextVar::ClientIp => Value::Str(ctx.client_ip.to_string()),
        ContextVar::QueryType => Value::Str(ctx.query_type.as_str().to_string()),
        ContextVar::Hour => Value::Int(ctx.hour),
        ContextVar::Minute => Value::Int(ctx.minute),
        ContextVar::Day => Value::Int(ctx.day),
        ContextVar::Month => Value::Int(ctx.month),
        ContextVar::Weekday => Value::Int(ctx.weekday),
        ContextVar::Time => Value::Str(ctx.time.clone()),
    }
}

fn as_bool(value: Value, op: &str) -> Result<Value, EvalError> {
    match value {
        Value::Bool(_) => Ok(value),
        other => Err(EvalError(format!("'{op}' applied to {}", other.type_name()))),
    }
}

fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let ordering = match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        // Lexicographic; lets `Time >= "22:00"` read naturally.
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => {
            return match op {
                CmpOp::Eq => Ok(Value::Bool(a == b)),
                CmpOp::Ne => Ok(Value::Bool(a != b)),
                _ => Err(EvalError("ordered comparison of bools".into())),
            }
        }
        (lhs, rhs) => {
            return Err(EvalError(format!(
                "cannot compare {} with {}",
                lhs.type_name(),
                rhs.type_name()
            )))
        }
    };

    let result = match op {
        CmpOp::Eq => ordering.is_eq(),
        CmpOp::Ne => !ordering.is_eq(),
        CmpOp::Lt => ordering.is_lt(),
        CmpOp::Le => ordering.is_le(),
        CmpOp::Gt => ordering.is_gt(),
        CmpOp::Ge => ordering.is_ge(),
    };
    Ok(Value::Bool(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::policy::parser::parse;
    use chrono::{Local, TimeZone};
    use gloryhole_domain::RecordType;
    use std::sync::Arc;

    fn ctx() -> EvalContext {
        // Saturday 22:30.
        EvalContext::at(
            Arc::from("sub.ads.example.com"),
            "192.168.1.50".parse().unwrap(),
            RecordType::A,
            Local.with_ymd_and_hms(2026, 8, 1, 22, 30, 0).unwrap(),
        )
    }

    fn eval_bool(input: &str) -> Result<bool, EvalError> {
        match evaluate(&parse(input).unwrap(), &ctx())? {
            Value::Bool(b) => Ok(b),
            other => panic!("expected bool, got {other:?}"),
        }
    }

    #[test]
    fn comparisons_and_boolean_logic() {
        assert!(eval_bool("Hour >= 22 && Hour < 23").unwrap());
        assert!(eval_bool("Hour == 5 || Minute == 30").unwrap());
        assert!(!eval_bool("!(Minute == 30)").unwrap());
    }

    #[test]
    fn string_equality_and_contains() {
        assert!(eval_bool(r#"Domain == "sub.ads.example.com""#).unwrap());
        assert!(eval_bool(r#"Domain contains "ads""#).unwrap());
        assert!(!eval_bool(r#"Domain contains "video""#).unwrap());
    }

    #[test]
    fn time_string_comparison_is_lexicographic() {
        assert!(eval_bool(r#"Time >= "22:00""#).unwrap());
        assert!(!eval_bool(r#"Time >= "23:00""#).unwrap());
    }

    #[test]
    fn deterministic_for_fixed_context() {
        let expr = parse(r#"Hour >= 22 && DomainEndsWith(Domain, ".example.com")"#).unwrap();
        let a = evaluate(&expr, &ctx()).unwrap();
        let b = evaluate(&expr, &ctx()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn type_mismatch_is_an_error_not_a_panic() {
        assert!(eval_bool(r#"Hour == "22""#).is_err());
        assert!(eval_bool("Hour && Minute == 1").is_err());
        assert!(eval_bool(r#"Domain contains 5"#).is_err());
    }

    #[test]
    fn regex_node_evaluates() {
        assert!(eval_bool(r#"DomainRegex(Domain, "^sub\\.")"#).unwrap());
        assert!(!eval_bool(r#"DomainRegex(Domain, "^video\\.")"#).unwrap());
    }

    #[test]
    fn short_circuit_skips_rhs_errors() {
        // The rhs would be a type error, but the lhs decides.
        assert!(!eval_bool(r#"Hour == 5 && (Domain contains 7)"#).unwrap());
        assert!(eval_bool(r#"Hour == 22 || (Domain contains 7)"#).unwrap());
    }
}
