//! TCP implementation of the core connection capability.

use async_trait::async_trait;
use parley_core::Connection;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// Line-oriented [`Connection`] over a TCP stream.
///
/// The stream is split so the owning session can block in `read_line`
/// while other sessions' broadcasts write concurrently; each half sits
/// behind its own async mutex.
pub struct TcpLineConnection {
    reader: tokio::sync::Mutex<BufReader<OwnedReadHalf>>,
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    peer: String,
}

impl TcpLineConnection {
    /// Wrap a freshly accepted stream.
    pub fn new(stream: TcpStream) -> std::io::Result<Self> {
        let peer = stream.peer_addr()?.to_string();
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: tokio::sync::Mutex::new(BufReader::new(read_half)),
            writer: tokio::sync::Mutex::new(write_half),
            peer,
        })
    }
}

#[async_trait]
impl Connection for TcpLineConnection {
    async fn send_text(&self, text: &str) -> std::io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(text.as_bytes()).await?;
        writer.flush().await
    }

    async fn read_line(&self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        let read = self.reader.lock().await.read_line(&mut line).await?;
        if read == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }

    fn remote_identity(&self) -> String {
        self.peer.clone()
    }
}

impl std::fmt::Debug for TcpLineConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpLineConnection").field("peer", &self.peer).finish_non_exhaustive()
    }
}
