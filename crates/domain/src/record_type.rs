use serde::{Deserialize, Serialize};
use std::fmt;

/// DNS record types the pipeline understands by name. Anything else is
/// carried through as `Other` so unknown types still forward and log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Ns,
    Ptr,
    Soa,
    Srv,
    Txt,
    Https,
    Other(u16),
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Ns => "NS",
            RecordType::Ptr => "PTR",
            RecordType::Soa => "SOA",
            RecordType::Srv => "SRV",
            RecordType::Txt => "TXT",
            RecordType::Https => "HTTPS",
            RecordType::Other(_) => "OTHER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Some(RecordType::A),
            "AAAA" => Some(RecordType::Aaaa),
            "CNAME" => Some(RecordType::Cname),
            "MX" => Some(RecordType::Mx),
            "NS" => Some(RecordType::Ns),
            "PTR" => Some(RecordType::Ptr),
            "SOA" => Some(RecordType::Soa),
            "SRV" => Some(RecordType::Srv),
            "TXT" => Some(RecordType::Txt),
            "HTTPS" => Some(RecordType::Https),
            _ => None,
        }
    }

    /// Numeric type code (RFC 1035 / 2782 / 9460).
    pub fn code(&self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::Ns => 2,
            RecordType::Cname => 5,
            RecordType::Soa => 6,
            RecordType::Ptr => 12,
            RecordType::Mx => 15,
            RecordType::Txt => 16,
            RecordType::Aaaa => 28,
            RecordType::Srv => 33,
            RecordType::Https => 65,
            RecordType::Other(code) => *code,
        }
    }

    pub fn from_code(code: u16) -> Self {
        match code {
            1 => RecordType::A,
            2 => RecordType::Ns,
            5 => RecordType::Cname,
            6 => RecordType::Soa,
            12 => RecordType::Ptr,
            15 => RecordType::Mx,
            16 => RecordType::Txt,
            28 => RecordType::Aaaa,
            33 => RecordType::Srv,
            65 => RecordType::Https,
            other => RecordType::Other(other),
        }
    }

    /// True for the address types the local-record CNAME chase terminates on.
    pub fn is_address(&self) -> bool {
        matches!(self, RecordType::A | RecordType::Aaaa)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::Other(code) => write!(f, "TYPE{code}"),
            other => f.write_str(other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(RecordType::parse("aaaa"), Some(RecordType::Aaaa));
        assert_eq!(RecordType::parse("Ptr"), Some(RecordType::Ptr));
        assert_eq!(RecordType::parse("bogus"), None);
    }

    #[test]
    fn code_round_trip() {
        for rt in [
            RecordType::A,
            RecordType::Aaaa,
            RecordType::Cname,
            RecordType::Mx,
            RecordType::Ns,
            RecordType::Ptr,
            RecordType::Soa,
            RecordType::Srv,
            RecordType::Txt,
            RecordType::Https,
        ] {
            assert_eq!(RecordType::from_code(rt.code()), rt);
        }
        assert_eq!(RecordType::from_code(255), RecordType::Other(255));
    }
}
