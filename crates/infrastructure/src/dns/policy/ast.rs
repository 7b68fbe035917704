use fancy_regex::Regex;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Context variables available to rule expressions. Any other free
/// identifier is a compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextVar {
    Domain,
    ClientIp,
    QueryType,
    Hour,
    Minute,
    Day,
    Month,
    Weekday,
    Time,
}

impl ContextVar {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Domain" => Some(ContextVar::Domain),
            "ClientIP" => Some(ContextVar::ClientIp),
            "QueryType" => Some(ContextVar::QueryType),
            "Hour" => Some(ContextVar::Hour),
            "Minute" => Some(ContextVar::Minute),
            "Day" => Some(ContextVar::Day),
            "Month" => Some(ContextVar::Month),
            "Weekday" => Some(ContextVar::Weekday),
            "Time" => Some(ContextVar::Time),
            _ => None,
        }
    }
}

/// Built-in callables (case-sensitive names). `DomainRegex` is not here:
/// it compiles into the dedicated `Expr::Regex` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    DomainMatches,
    DomainEndsWith,
    DomainStartsWith,
    DomainLevelCount,
    IpInCidr,
    IpEquals,
    QueryTypeIn,
    IsWeekend,
    InTimeRange,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "DomainMatches" => Some(Builtin::DomainMatches),
            "DomainEndsWith" => Some(Builtin::DomainEndsWith),
            "DomainStartsWith" => Some(Builtin::DomainStartsWith),
            "DomainLevelCount" => Some(Builtin::DomainLevelCount),
            "IPInCIDR" => Some(Builtin::IpInCidr),
            "IPEquals" => Some(Builtin::IpEquals),
            "QueryTypeIn" => Some(Builtin::QueryTypeIn),
            "IsWeekend" => Some(Builtin::IsWeekend),
            "InTimeRange" => Some(Builtin::InTimeRange),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::DomainMatches => "DomainMatches",
            Builtin::DomainEndsWith => "DomainEndsWith",
            Builtin::DomainStartsWith => "DomainStartsWith",
            Builtin::DomainLevelCount => "DomainLevelCount",
            Builtin::IpInCidr => "IPInCIDR",
            Builtin::IpEquals => "IPEquals",
            Builtin::QueryTypeIn => "QueryTypeIn",
            Builtin::IsWeekend => "IsWeekend",
            Builtin::InTimeRange => "InTimeRange",
        }
    }

    /// (min, max) argument count.
    pub fn arity(&self) -> (usize, usize) {
        match self {
            Builtin::DomainMatches
            | Builtin::DomainEndsWith
            | Builtin::DomainStartsWith
            | Builtin::IpInCidr
            | Builtin::IpEquals => (2, 2),
            Builtin::DomainLevelCount | Builtin::IsWeekend => (1, 1),
            Builtin::QueryTypeIn => (2, usize::MAX),
            Builtin::InTimeRange => (6, 6),
        }
    }
}

/// Typed expression tree. Compiled once per rule, evaluated per query.
#[derive(Debug, Clone)]
pub enum Expr {
    Int(i64),
    Str(Arc<str>),
    Bool(bool),
    Var(ContextVar),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
    Contains(Box<Expr>, Box<Expr>),
    Call(Builtin, Vec<Expr>),
    /// `DomainRegex(arg, pattern)` with the pattern compiled at rule
    /// compile time. The source pattern is kept for display.
    Regex(Box<Expr>, Arc<Regex>, Arc<str>),
}
