use gloryhole_domain::config::ServerConfig;
use gloryhole_infrastructure::dns::DnsServerHandler;
use hickory_server::ServerFuture;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub async fn start_dns_server(
    config: ServerConfig,
    handler: DnsServerHandler,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let socket_addr: SocketAddr = config.listen_address.parse()?;

    info!(bind_address = %socket_addr, "Starting DNS server");

    let mut server = ServerFuture::new(handler);

    if config.udp_enabled {
        let domain = if socket_addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };
        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;

        socket.set_reuse_address(true)?;
        #[cfg(unix)]
        socket.set_reuse_port(true)?;

        // Default kernel buffers (~256KB) drop datagrams under burst load.
        socket.set_recv_buffer_size(8 * 1024 * 1024)?;
        socket.set_send_buffer_size(4 * 1024 * 1024)?;

        socket.bind(&socket_addr.into())?;
        socket.set_nonblocking(true)?;

        let std_socket: std::net::UdpSocket = socket.into();
        let udp_socket = UdpSocket::from_std(std_socket)?;
        server.register_socket(udp_socket);
        info!("UDP listener registered");
    }

    if config.tcp_enabled {
        let tcp_listener = TcpListener::bind(socket_addr).await?;
        server.register_listener(
            tcp_listener,
            Duration::from_millis(config.tcp_idle_timeout_ms),
        );
        info!("TCP listener registered");
    }

    info!("DNS server ready");

    tokio::select! {
        result = server.block_until_done() => {
            result?;
        }
        _ = shutdown.cancelled() => {
            info!("Draining in-flight queries before shutdown");
            let drain = Duration::from_millis(config.shutdown_drain_ms);
            let _ = tokio::time::timeout(drain, server.shutdown_gracefully()).await;
        }
    }

    Ok(())
}
