//! Parley production server.
//!
//! Runs the transport-independent chat core from `parley-core` over
//! plain TCP with Tokio:
//!
//! ```text
//! parley-server
//!   ├─ Server             (listener + accept loop, capacity gate)
//!   ├─ TcpLineConnection  (Connection impl over a split TcpStream)
//!   └─ one spawned Session task per accepted connection
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod transport;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use error::ServerError;
use parley_core::{ChatRoom, ConnId, SERVER_FULL_NOTICE, Session};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
pub use transport::TcpLineConnection;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8989;

/// Default participant cap.
pub const DEFAULT_MAX_CLIENTS: usize = 10;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on (0 picks an ephemeral port).
    pub port: u16,
    /// Maximum number of concurrently admitted participants.
    pub max_clients: usize,
    /// Banner logo asset; a missing file falls back to the plain banner.
    pub logo_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_clients: DEFAULT_MAX_CLIENTS,
            logo_path: PathBuf::from("logo.txt"),
        }
    }
}

/// Production chat server: a TCP listener in front of one [`ChatRoom`].
pub struct Server {
    listener: TcpListener,
    room: Arc<ChatRoom>,
    banner: String,
}

impl Server {
    /// Bind the listening socket and load the banner asset.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the port cannot be bound; this
    /// is the only error fatal to the process.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(("0.0.0.0", config.port))
            .await
            .map_err(ServerError::Bind)?;
        let banner = load_banner(&config.logo_path);
        let room = Arc::new(ChatRoom::new(config.max_clients));
        Ok(Self { listener, room, banner })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever, one session task per connection.
    ///
    /// The capacity gate runs here, before name negotiation: a
    /// connection accepted while the room is full gets the server-full
    /// notice and is closed without occupying a slot.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Listening for connections on {}", self.local_addr()?);

        let mut next_conn = 0u64;
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    next_conn += 1;
                    let conn_id = ConnId::new(next_conn);

                    if self.room.registry().count() >= self.room.registry().capacity() {
                        tracing::info!("rejecting {}: participant cap reached", peer);
                        tokio::spawn(reject_full(stream));
                        continue;
                    }

                    tracing::debug!("accepted {} from {}", conn_id, peer);
                    match TcpLineConnection::new(stream) {
                        Ok(conn) => {
                            let session = Session::new(
                                conn_id,
                                Arc::new(conn),
                                Arc::clone(&self.room),
                                self.banner.clone(),
                            );
                            tokio::spawn(async move {
                                if let Err(e) = session.run().await {
                                    tracing::debug!("{} closed: {}", conn_id, e);
                                }
                            });
                        },
                        Err(e) => {
                            tracing::warn!("failed to set up connection from {}: {}", peer, e);
                        },
                    }
                },
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                },
            }
        }
    }
}

/// Write the server-full notice and drop the connection.
async fn reject_full(mut stream: TcpStream) {
    if let Err(e) = stream.write_all(SERVER_FULL_NOTICE.as_bytes()).await {
        tracing::debug!("failed to send server-full notice: {}", e);
    }
}

/// Assemble the welcome banner, logo included when the asset is
/// readable.
fn load_banner(logo_path: &Path) -> String {
    match std::fs::read_to_string(logo_path) {
        Ok(logo) => format!("Welcome to TCP-Chat!\n{logo}\n[ENTER YOUR NAME]: "),
        Err(e) => {
            tracing::warn!("could not read logo {}: {}", logo_path.display(), e);
            "Welcome to TCP-Chat!\n[ENTER YOUR NAME]: ".to_string()
        },
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn banner_includes_logo_when_asset_exists() {
        let mut asset = tempfile::NamedTempFile::new().unwrap();
        writeln!(asset, "( ascii art )").unwrap();

        let banner = load_banner(asset.path());
        assert!(banner.starts_with("Welcome to TCP-Chat!\n"));
        assert!(banner.contains("( ascii art )"));
        assert!(banner.ends_with("\n[ENTER YOUR NAME]: "));
    }

    #[test]
    fn banner_falls_back_without_asset() {
        let banner = load_banner(Path::new("definitely-missing-logo.txt"));
        assert_eq!(banner, "Welcome to TCP-Chat!\n[ENTER YOUR NAME]: ");
    }
}
