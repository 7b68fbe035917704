//! Response synthesis: every message the pipeline produces locally
//! (blocked NXDOMAIN, redirects, local records, cache hits, errors) is
//! built here so header handling stays in one place.

use super::cache::CachedAnswer;
use super::local_records::LocalAnswerRecord;
use gloryhole_domain::{DomainError, LocalRecordData, RecordType};
use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::rdata::{A, AAAA, CNAME, MX, PTR, SOA, SRV, TXT};
use hickory_proto::rr::{DNSClass, Name, RData, Record};
use std::net::IpAddr;
use std::str::FromStr;

/// Response skeleton echoing the request: same id and question, RD copied,
/// RA set.
pub fn response_template(request: &Message) -> Message {
    let mut response = Message::new(
        request.id(),
        MessageType::Response,
        request.op_code(),
    );
    response.set_recursion_desired(request.recursion_desired());
    response.set_recursion_available(true);
    for query in request.queries() {
        response.add_query(query.clone());
    }
    response
}

/// Synthetic SOA for negative answers, in the authority section.
pub fn soa_record(ttl: u32) -> Record {
    let mname = Name::from_ascii("ns.glory-hole.").unwrap();
    let rname = Name::from_ascii("hostmaster.glory-hole.").unwrap();
    let soa = SOA::new(mname, rname, 1, 3600, 1800, 604_800, ttl);
    let mut record = Record::from_rdata(Name::from_ascii("glory-hole.").unwrap(), ttl, RData::SOA(soa));
    record.set_dns_class(DNSClass::IN);
    record
}

pub fn nxdomain(request: &Message, soa_ttl: u32) -> Message {
    let mut response = response_template(request);
    response.set_response_code(ResponseCode::NXDomain);
    response.set_authoritative(true);
    response.add_name_server(soa_record(soa_ttl));
    response
}

/// Empty NOERROR (NODATA).
pub fn nodata(request: &Message, soa_ttl: u32) -> Message {
    let mut response = response_template(request);
    response.set_response_code(ResponseCode::NoError);
    response.set_authoritative(true);
    response.add_name_server(soa_record(soa_ttl));
    response
}

pub fn refused(request: &Message) -> Message {
    let mut response = response_template(request);
    response.set_response_code(ResponseCode::Refused);
    response
}

pub fn servfail(request: &Message) -> Message {
    let mut response = response_template(request);
    response.set_response_code(ResponseCode::ServFail);
    response
}

pub fn formerr(request: &Message) -> Message {
    let mut response = response_template(request);
    response.set_response_code(ResponseCode::FormErr);
    response
}

/// A/AAAA answer for a policy REDIRECT. `None` when the literal's family
/// does not match the query type (the caller answers NODATA instead).
pub fn redirect_answer(request: &Message, ip: IpAddr, ttl: u32) -> Option<Message> {
    let query = request.queries().first()?;
    let rdata = match (ip, RecordType::from_code(u16::from(query.query_type()))) {
        (IpAddr::V4(v4), RecordType::A) => RData::A(A(v4)),
        (IpAddr::V6(v6), RecordType::Aaaa) => RData::AAAA(AAAA(v6)),
        _ => return None,
    };

    let mut record = Record::from_rdata(query.name().clone(), ttl, rdata);
    record.set_dns_class(DNSClass::IN);

    let mut response = response_template(request);
    response.set_response_code(ResponseCode::NoError);
    response.set_authoritative(true);
    response.add_answer(record);
    Some(response)
}

/// Wire records for one local answer row.
pub fn records_for_local(row: &LocalAnswerRecord) -> Result<Vec<Record>, DomainError> {
    let owner = Name::from_str(&row.owner)
        .map_err(|e| DomainError::InvalidDomainName(format!("'{}': {e}", row.owner)))?;
    let target_name = |target: &str| {
        Name::from_str(target)
            .map_err(|e| DomainError::InvalidDomainName(format!("'{target}': {e}")))
    };

    let rdatas: Vec<RData> = match &row.data {
        LocalRecordData::Addresses(ips) => ips
            .iter()
            .map(|ip| match ip {
                IpAddr::V4(v4) => RData::A(A(*v4)),
                IpAddr::V6(v6) => RData::AAAA(AAAA(*v6)),
            })
            .collect(),
        LocalRecordData::Cname(target) => vec![RData::CNAME(CNAME(target_name(target)?))],
        LocalRecordData::Ptr(target) => vec![RData::PTR(PTR(target_name(target)?))],
        LocalRecordData::Mx {
            preference,
            exchange,
        } => vec![RData::MX(MX::new(*preference, target_name(exchange)?))],
        LocalRecordData::Srv {
            priority,
            weight,
            port,
            target,
        } => vec![RData::SRV(SRV::new(
            *priority,
            *weight,
            *port,
            target_name(target)?,
        ))],
        LocalRecordData::Txt(strings) => vec![RData::TXT(TXT::new(strings.clone()))],
    };

    Ok(rdatas
        .into_iter()
        .map(|rdata| {
            let mut record = Record::from_rdata(owner.clone(), row.ttl, rdata);
            record.set_dns_class(DNSClass::IN);
            record
        })
        .collect())
}

/// Authoritative answer from the local records store.
pub fn local_answer(
    request: &Message,
    rows: &[LocalAnswerRecord],
) -> Result<Message, DomainError> {
    let mut response = response_template(request);
    response.set_response_code(ResponseCode::NoError);
    response.set_authoritative(true);
    for row in rows {
        for record in records_for_local(row)? {
            response.add_answer(record);
        }
    }
    Ok(response)
}

/// Serve a cached answer: records are cloned with their TTLs rewritten to
/// the entry's remaining lifetime.
pub fn from_cached(request: &Message, answer: &CachedAnswer, remaining_ttl: u32) -> Message {
    let mut response = response_template(request);
    response.set_response_code(answer.response_code);
    if answer.negative {
        response.set_authoritative(true);
    }
    for record in &answer.answers {
        let mut record = record.clone();
        record.set_ttl(remaining_ttl.min(record.ttl()));
        response.add_answer(record);
    }
    for record in &answer.authorities {
        let mut record = record.clone();
        record.set_ttl(remaining_ttl.min(record.ttl()));
        response.add_name_server(record);
    }
    response
}

/// Relay an upstream response under the client's message id.
pub fn pass_through(request: &Message, upstream: &Message) -> Message {
    let mut response = response_template(request);
    response.set_response_code(upstream.response_code());
    for record in upstream.answers() {
        response.add_answer(record.clone());
    }
    for record in upstream.name_servers() {
        response.add_name_server(record.clone());
    }
    response
}

/// Smallest answer TTL, for the cache hint on positive responses.
pub fn min_answer_ttl(message: &Message) -> Option<u32> {
    message.answers().iter().map(Record::ttl).min()
}
