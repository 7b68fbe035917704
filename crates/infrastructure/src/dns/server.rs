use super::handler::QueryHandler;
use hickory_proto::op::{Edns, Header, Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::Record;
use hickory_server::authority::MessageResponseBuilder;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};
use std::io;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Wire-facing adapter: translates hickory requests into pipeline calls
/// and writes the pipeline's answer back. EDNS0 negotiation and rate-limit
/// `drop` (no response at all) are handled here; truncation against the
/// client's advertised buffer is hickory-server's job.
#[derive(Clone)]
pub struct DnsServerHandler {
    handler: Arc<QueryHandler>,
}

impl DnsServerHandler {
    pub fn new(handler: Arc<QueryHandler>) -> Self {
        Self { handler }
    }

    async fn try_handle<R: ResponseHandler>(
        &self,
        request: &Request,
        response_handle: &mut R,
    ) -> io::Result<ResponseInfo> {
        if request.message_type() != MessageType::Query
            || request.op_code() != OpCode::Query
        {
            warn!(op_code = ?request.op_code(), "Unsupported operation");
            let builder = MessageResponseBuilder::from_message_request(request);
            return response_handle
                .send_response(builder.error_msg(request.header(), ResponseCode::NotImp))
                .await;
        }

        // EDNS version gate, RFC 6891.
        let response_edns = match request.edns() {
            Some(req_edns) if req_edns.version() > 0 => {
                warn!(version = req_edns.version(), "Unsupported EDNS version");
                let mut header = Header::response_from_request(request.header());
                header.set_response_code(ResponseCode::BADVERS);
                let mut edns = Edns::new();
                edns.set_max_payload(1232);
                edns.set_rcode_high(ResponseCode::BADVERS.high());
                let mut builder = MessageResponseBuilder::from_message_request(request);
                builder.edns(edns);
                return response_handle
                    .send_response(builder.build_no_records(header))
                    .await;
            }
            Some(req_edns) => {
                let mut edns = Edns::new();
                edns.set_max_payload(1232);
                edns.set_version(0);
                edns.set_dnssec_ok(req_edns.flags().dnssec_ok);
                Some(edns)
            }
            None => None,
        };

        let request_info = request
            .request_info()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        let mut message = Message::new(request.id(), MessageType::Query, OpCode::Query);
        message.set_recursion_desired(request.header().recursion_desired());
        message.add_query(request_info.query.original().clone());

        let client = request_info.src.ip();
        let outcome = self.handler.handle_query(&message, client).await;

        let Some(answer) = outcome.message else {
            // Rate-limit drop: the client hears nothing.
            debug!(client = %client, "Query dropped without response");
            let mut header = Header::response_from_request(request.header());
            header.set_response_code(ResponseCode::Refused);
            return Ok(header.into());
        };

        let mut header = Header::response_from_request(request.header());
        header.set_response_code(answer.response_code());
        header.set_authoritative(answer.authoritative());
        header.set_recursion_available(true);

        let mut builder = MessageResponseBuilder::from_message_request(request);
        if let Some(edns) = response_edns {
            builder.edns(edns);
        }
        let response = builder.build(
            header,
            answer.answers(),
            answer.name_servers(),
            &[] as &[Record],
            &[] as &[Record],
        );
        response_handle.send_response(response).await
    }
}

#[async_trait::async_trait]
impl RequestHandler for DnsServerHandler {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> ResponseInfo {
        match self.try_handle(request, &mut response_handle).await {
            Ok(info) => info,
            Err(e) => {
                error!(error = %e, "Request handling failed");
                let mut header = Header::response_from_request(request.header());
                header.set_response_code(ResponseCode::ServFail);
                header.into()
            }
        }
    }
}
