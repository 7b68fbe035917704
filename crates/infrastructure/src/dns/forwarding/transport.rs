use async_trait::async_trait;
use gloryhole_domain::{DomainError, Transport, UpstreamEndpoint};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tracing::{debug, warn};

/// Maximum UDP DNS response size with EDNS(0).
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

/// Wire exchange with one upstream. The trait is the seam that lets the
/// handler tests script upstream behavior without sockets.
#[async_trait]
pub trait UpstreamExchanger: Send + Sync {
    async fn exchange(
        &self,
        endpoint: &UpstreamEndpoint,
        query: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, DomainError>;
}

/// Real network transport: UDP datagrams or length-prefixed TCP.
pub struct NetExchanger;

#[async_trait]
impl UpstreamExchanger for NetExchanger {
    async fn exchange(
        &self,
        endpoint: &UpstreamEndpoint,
        query: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, DomainError> {
        match endpoint.transport {
            Transport::Udp => udp_exchange(endpoint.addr, query, timeout).await,
            Transport::Tcp => tcp_exchange(endpoint.addr, query, timeout).await,
        }
    }
}

pub async fn udp_exchange(
    server: SocketAddr,
    query: &[u8],
    timeout: Duration,
) -> Result<Vec<u8>, DomainError> {
    let bind_addr: SocketAddr = if server.is_ipv4() {
        "0.0.0.0:0".parse().unwrap()
    } else {
        "[::]:0".parse().unwrap()
    };
    let socket = UdpSocket::bind(bind_addr)
        .await
        .map_err(|e| DomainError::IoError(format!("bind udp socket: {e}")))?;

    tokio::time::timeout(timeout, socket.send_to(query, server))
        .await
        .map_err(|_| DomainError::QueryTimeout)?
        .map_err(|e| DomainError::IoError(format!("send to {server}: {e}")))?;

    let mut buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
    let (received, from) = tokio::time::timeout(timeout, socket.recv_from(&mut buf))
        .await
        .map_err(|_| DomainError::QueryTimeout)?
        .map_err(|e| DomainError::IoError(format!("recv from {server}: {e}")))?;

    if from.ip() != server.ip() {
        warn!(expected = %server, received_from = %from, "UDP response from unexpected source");
    }

    buf.truncate(received);
    debug!(server = %server, bytes = received, "UDP exchange complete");
    Ok(buf)
}

pub async fn tcp_exchange(
    server: SocketAddr,
    query: &[u8],
    timeout: Duration,
) -> Result<Vec<u8>, DomainError> {
    let exchange = async {
        let mut stream = TcpStream::connect(server)
            .await
            .map_err(|e| DomainError::IoError(format!("connect {server}: {e}")))?;

        let len = u16::try_from(query.len())
            .map_err(|_| DomainError::MalformedMessage("query exceeds 64KiB".into()))?;
        stream
            .write_all(&len.to_be_bytes())
            .await
            .map_err(|e| DomainError::IoError(format!("write to {server}: {e}")))?;
        stream
            .write_all(query)
            .await
            .map_err(|e| DomainError::IoError(format!("write to {server}: {e}")))?;

        let mut len_buf = [0u8; 2];
        stream
            .read_exact(&mut len_buf)
            .await
            .map_err(|e| DomainError::IoError(format!("read from {server}: {e}")))?;
        let response_len = usize::from(u16::from_be_bytes(len_buf));

        let mut response = vec![0u8; response_len];
        stream
            .read_exact(&mut response)
            .await
            .map_err(|e| DomainError::IoError(format!("read from {server}: {e}")))?;

        debug!(server = %server, bytes = response_len, "TCP exchange complete");
        Ok(response)
    };

    tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| DomainError::QueryTimeout)?
}
