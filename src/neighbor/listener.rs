//! UDP listener for discovery broadcasts

use super::mndp::DiscoveryMessage;
use crate::config::DiscoveryConfig;
use crate::error::{Result, ResultExt, RouterViewError};
use crossbeam_channel::Sender;
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

const MAX_DATAGRAM: usize = 1500;

/// Background thread decoding discovery datagrams into a channel
///
/// The socket is read with a timeout so [`stop`](Self::stop) takes effect
/// within one poll interval. The thread also exits once the receiving side of
/// the feed is dropped.
pub struct DiscoveryListener {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DiscoveryListener {
    /// Bind the configured socket and start forwarding decoded datagrams to `feed`
    pub fn spawn(config: &DiscoveryConfig, feed: Sender<DiscoveryMessage>) -> Result<Self> {
        let bind = SocketAddr::new(config.bind_address, config.port);
        let socket = UdpSocket::bind(bind)
            .map_err(RouterViewError::from)
            .with_context(|| format!("Failed to bind discovery socket {}", bind))?;
        socket.set_broadcast(true)?;
        socket.set_read_timeout(Some(config.poll_interval()))?;
        let local_addr = socket.local_addr()?;

        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let handle = std::thread::Builder::new()
            .name("routerview-discovery".to_string())
            .spawn(move || receive_loop(socket, feed, flag))
            .map_err(RouterViewError::from)
            .context("Failed to spawn discovery listener")?;

        tracing::info!(%local_addr, "Listening for neighbor discovery");
        Ok(Self {
            local_addr,
            running,
            handle: Some(handle),
        })
    }

    /// Address the socket is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the receive thread and wait for it; idempotent
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Discovery listener panicked");
            }
            tracing::info!(local_addr = %self.local_addr, "Stopped neighbor discovery");
        }
    }
}

impl Drop for DiscoveryListener {
    fn drop(&mut self) {
        self.stop();
    }
}

fn receive_loop(socket: UdpSocket, feed: Sender<DiscoveryMessage>, running: Arc<AtomicBool>) {
    let mut buf = [0u8; MAX_DATAGRAM];
    while running.load(Ordering::SeqCst) {
        let (len, src) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => continue,
            Err(e) => {
                tracing::warn!("Discovery socket error: {}", e);
                break;
            }
        };
        match DiscoveryMessage::decode(src, &buf[..len]) {
            Ok(message) => {
                if feed.send(message).is_err() {
                    tracing::debug!("Discovery feed closed");
                    break;
                }
            }
            Err(e) => tracing::debug!(%src, "Skipping datagram: {}", e),
        }
    }
    running.store(false, Ordering::SeqCst);
}
