use chrono::{DateTime, Datelike, Local, Timelike};
use gloryhole_domain::RecordType;
use std::net::IpAddr;
use std::sync::Arc;

/// Read-only evaluation context, built once per query.
///
/// Weekday numbering: 0 = Sunday … 6 = Saturday. `time` is `HH:MM`.
#[derive(Debug, Clone)]
pub struct EvalContext {
    pub domain: Arc<str>,
    pub client_ip: IpAddr,
    pub query_type: RecordType,
    pub hour: i64,
    pub minute: i64,
    pub day: i64,
    pub month: i64,
    pub weekday: i64,
    pub time: String,
}

impl EvalContext {
    pub fn new(domain: Arc<str>, client_ip: IpAddr, query_type: RecordType) -> Self {
        Self::at(domain, client_ip, query_type, Local::now())
    }

    pub fn at(
        domain: Arc<str>,
        client_ip: IpAddr,
        query_type: RecordType,
        now: DateTime<Local>,
    ) -> Self {
        Self {
            domain,
            client_ip,
            query_type,
            hour: i64::from(now.hour()),
            minute: i64::from(now.minute()),
            day: i64::from(now.day()),
            month: i64::from(now.month()),
            weekday: i64::from(now.weekday().num_days_from_sunday()),
            time: format!("{:02}:{:02}", now.hour(), now.minute()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn clock_fields() {
        // 2026-08-01 is a Saturday.
        let now = Local.with_ymd_and_hms(2026, 8, 1, 22, 5, 0).unwrap();
        let ctx = EvalContext::at(
            Arc::from("example.com"),
            "192.168.1.2".parse().unwrap(),
            RecordType::A,
            now,
        );
        assert_eq!(ctx.hour, 22);
        assert_eq!(ctx.minute, 5);
        assert_eq!(ctx.day, 1);
        assert_eq!(ctx.month, 8);
        assert_eq!(ctx.weekday, 6);
        assert_eq!(ctx.time, "22:05");
    }
}
