use super::ast::Builtin;
use super::eval::{EvalError, Value};
use ipnetwork::IpNetwork;
use std::net::IpAddr;

/// Evaluate a builtin against already-evaluated arguments. Arity was
/// checked at compile time; argument types are checked here.
pub fn call(builtin: Builtin, args: &[Value]) -> Result<Value, EvalError> {
    match builtin {
        Builtin::DomainMatches => {
            let (domain, pattern) = two_strings(builtin, args)?;
            Ok(Value::Bool(domain_matches(&domain, &pattern)))
        }
        Builtin::DomainEndsWith => {
            let (domain, suffix) = two_strings(builtin, args)?;
            Ok(Value::Bool(
                domain.to_ascii_lowercase().ends_with(&suffix.to_ascii_lowercase()),
            ))
        }
        Builtin::DomainStartsWith => {
            let (domain, prefix) = two_strings(builtin, args)?;
            Ok(Value::Bool(
                domain.to_ascii_lowercase().starts_with(&prefix.to_ascii_lowercase()),
            ))
        }
        Builtin::DomainLevelCount => {
            let domain = one_string(builtin, args)?;
            let count = if domain.is_empty() {
                0
            } else {
                domain.split('.').count() as i64
            };
            Ok(Value::Int(count))
        }
        Builtin::IpInCidr => {
            let (ip, cidr) = two_strings(builtin, args)?;
            let ip = parse_ip(&ip)?;
            let network: IpNetwork = cidr
                .parse()
                .map_err(|e| EvalError(format!("invalid CIDR '{cidr}': {e}")))?;
            Ok(Value::Bool(network.contains(ip)))
        }
        Builtin::IpEquals => {
            let (a, b) = two_strings(builtin, args)?;
            Ok(Value::Bool(parse_ip(&a)? == parse_ip(&b)?))
        }
        Builtin::QueryTypeIn => {
            let query_type = match &args[0] {
                Value::Str(s) => s,
                other => {
                    return Err(EvalError(format!(
                        "QueryTypeIn needs strings, got {}",
                        other.type_name()
                    )))
                }
            };
            for candidate in &args[1..] {
                match candidate {
                    Value::Str(s) if s.eq_ignore_ascii_case(query_type) => {
                        return Ok(Value::Bool(true))
                    }
                    Value::Str(_) => {}
                    other => {
                        return Err(EvalError(format!(
                            "QueryTypeIn needs strings, got {}",
                            other.type_name()
                        )))
                    }
                }
            }
            Ok(Value::Bool(false))
        }
        Builtin::IsWeekend => match &args[0] {
            Value::Int(weekday) => Ok(Value::Bool(*weekday == 0 || *weekday == 6)),
            other => Err(EvalError(format!(
                "IsWeekend needs an int weekday, got {}",
                other.type_name()
            ))),
        },
        Builtin::InTimeRange => {
            let mut ints = [0i64; 6];
            for (slot, value) in ints.iter_mut().zip(args) {
                match value {
                    Value::Int(v) => *slot = *v,
                    other => {
                        return Err(EvalError(format!(
                            "InTimeRange needs ints, got {}",
                            other.type_name()
                        )))
                    }
                }
            }
            let [hour, minute, start_h, start_m, end_h, end_m] = ints;
            let current = hour * 60 + minute;
            let start = start_h * 60 + start_m;
            let end = end_h * 60 + end_m;

            // Half-open [start, end); an inverted range wraps overnight.
            let inside = if start <= end {
                current >= start && current < end
            } else {
                current >= start || current < end
            };
            Ok(Value::Bool(inside))
        }
    }
}

/// Substring match, case-insensitive. A leading dot turns the pattern into
/// a suffix match that also accepts the bare suffix name.
fn domain_matches(domain: &str, pattern: &str) -> bool {
    let domain = domain.to_ascii_lowercase();
    let pattern = pattern.to_ascii_lowercase();

    if let Some(suffix) = pattern.strip_prefix('.') {
        return domain == suffix || domain.ends_with(&pattern);
    }
    domain.contains(&pattern)
}

fn parse_ip(s: &str) -> Result<IpAddr, EvalError> {
    s.parse::<IpAddr>()
        .map(|ip| ip.to_canonical())
        .map_err(|_| EvalError(format!("invalid IP address '{s}'")))
}

fn one_string(builtin: Builtin, args: &[Value]) -> Result<String, EvalError> {
    match &args[0] {
        Value::Str(s) => Ok(s.clone()),
        other => Err(EvalError(format!(
            "{} needs a string, got {}",
            builtin.name(),
            other.type_name()
        ))),
    }
}

fn two_strings(builtin: Builtin, args: &[Value]) -> Result<(String, String), EvalError> {
    match (&args[0], &args[1]) {
        (Value::Str(a), Value::Str(b)) => Ok((a.clone(), b.clone())),
        (a, b) => Err(EvalError(format!(
            "{} needs strings, got {} and {}",
            builtin.name(),
            a.type_name(),
            b.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::Str(v.to_string())
    }

    fn i(v: i64) -> Value {
        Value::Int(v)
    }

    fn truthy(builtin: Builtin, args: &[Value]) -> bool {
        matches!(call(builtin, args).unwrap(), Value::Bool(true))
    }

    #[test]
    fn domain_matches_is_substring_by_default() {
        // Pins the source behavior: a pattern that is neither a suffix nor
        // empty matches anywhere in the name.
        assert!(truthy(Builtin::DomainMatches, &[s("ads.example.com"), s("example")]));
        assert!(truthy(Builtin::DomainMatches, &[s("ads.example.com"), s("ADS.")]));
        assert!(!truthy(Builtin::DomainMatches, &[s("ads.example.com"), s("video")]));
    }

    #[test]
    fn domain_matches_leading_dot_is_suffix() {
        assert!(truthy(Builtin::DomainMatches, &[s("foo.ads.example"), s(".ads.example")]));
        assert!(truthy(Builtin::DomainMatches, &[s("ads.example"), s(".ads.example")]));
        assert!(!truthy(Builtin::DomainMatches, &[s("bads.example"), s(".ads.example")]));
    }

    #[test]
    fn starts_and_ends_with_are_case_insensitive() {
        assert!(truthy(Builtin::DomainEndsWith, &[s("x.Example.COM"), s(".example.com")]));
        assert!(truthy(Builtin::DomainStartsWith, &[s("ADS.example"), s("ads.")]));
    }

    #[test]
    fn level_count() {
        assert_eq!(call(Builtin::DomainLevelCount, &[s("a.b.c")]).unwrap(), i(3));
        assert_eq!(call(Builtin::DomainLevelCount, &[s("")]).unwrap(), i(0));
    }

    #[test]
    fn ip_in_cidr_normalizes_families() {
        assert!(truthy(Builtin::IpInCidr, &[s("192.168.1.20"), s("192.168.1.0/24")]));
        assert!(!truthy(Builtin::IpInCidr, &[s("192.168.2.20"), s("192.168.1.0/24")]));
        // IPv4-mapped IPv6 collapses to IPv4.
        assert!(truthy(Builtin::IpInCidr, &[s("::ffff:192.168.1.20"), s("192.168.1.0/24")]));
        assert!(truthy(Builtin::IpInCidr, &[s("fd00::1"), s("fd00::/8")]));
    }

    #[test]
    fn ip_equals_normalizes() {
        assert!(truthy(Builtin::IpEquals, &[s("::ffff:10.0.0.1"), s("10.0.0.1")]));
        assert!(!truthy(Builtin::IpEquals, &[s("10.0.0.1"), s("10.0.0.2")]));
        assert!(call(Builtin::IpEquals, &[s("not-an-ip"), s("10.0.0.1")]).is_err());
    }

    #[test]
    fn query_type_in_is_case_insensitive() {
        assert!(truthy(Builtin::QueryTypeIn, &[s("PTR"), s("a"), s("ptr")]));
        assert!(!truthy(Builtin::QueryTypeIn, &[s("TXT"), s("A"), s("AAAA")]));
    }

    #[test]
    fn weekend() {
        assert!(truthy(Builtin::IsWeekend, &[i(0)]));
        assert!(truthy(Builtin::IsWeekend, &[i(6)]));
        assert!(!truthy(Builtin::IsWeekend, &[i(3)]));
    }

    #[test]
    fn time_range_half_open() {
        // [09:00, 17:00)
        assert!(truthy(Builtin::InTimeRange, &[i(9), i(0), i(9), i(0), i(17), i(0)]));
        assert!(truthy(Builtin::InTimeRange, &[i(16), i(59), i(9), i(0), i(17), i(0)]));
        assert!(!truthy(Builtin::InTimeRange, &[i(17), i(0), i(9), i(0), i(17), i(0)]));
    }

    #[test]
    fn time_range_wraps_overnight() {
        // [22:00, 06:00) spanning midnight.
        assert!(truthy(Builtin::InTimeRange, &[i(23), i(30), i(22), i(0), i(6), i(0)]));
        assert!(truthy(Builtin::InTimeRange, &[i(2), i(0), i(22), i(0), i(6), i(0)]));
        assert!(!truthy(Builtin::InTimeRange, &[i(12), i(0), i(22), i(0), i(6), i(0)]));
    }
}
