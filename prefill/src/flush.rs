//! Clearing the platform's backing store before a run.
//!
//! The platform keeps its data in a Redis-protocol store. Flushing takes a
//! single inline command, so the flusher speaks the wire protocol directly
//! over a TCP connection instead of pulling in a full client.

use crate::api::StoreFlusher;
use async_trait::async_trait;
use prefill_common::{PrefillError, RemoteCall, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::info;

const FLUSHDB: &[u8] = b"*1\r\n$7\r\nFLUSHDB\r\n";

/// Sends `FLUSHDB` to the store at `addr` and waits for the reply.
#[derive(Debug, Clone)]
pub struct RedisFlusher {
    addr: String,
}

impl RedisFlusher {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

fn connection_error(e: std::io::Error) -> PrefillError {
    PrefillError::connection(RemoteCall::StoreFlush, e.to_string())
}

/// Interpret a single-line store reply.
fn parse_reply(line: &str) -> Result<()> {
    let line = line.trim_end_matches(['\r', '\n']);
    match line.split_at_checked(1) {
        Some(("+", _)) => Ok(()),
        Some(("-", message)) => Err(PrefillError::application(
            RemoteCall::StoreFlush,
            message.trim(),
        )),
        _ => Err(PrefillError::malformed(
            RemoteCall::StoreFlush,
            format!("unexpected reply '{line}'"),
        )),
    }
}

#[async_trait]
impl StoreFlusher for RedisFlusher {
    async fn flush(&self) -> Result<()> {
        info!(addr = %self.addr, "flushing db...");
        let mut stream = TcpStream::connect(&self.addr)
            .await
            .map_err(connection_error)?;
        stream.write_all(FLUSHDB).await.map_err(connection_error)?;

        let mut reader = BufReader::new(stream);
        let mut reply = String::new();
        let read = reader
            .read_line(&mut reply)
            .await
            .map_err(connection_error)?;
        if read == 0 {
            return Err(PrefillError::connection(
                RemoteCall::StoreFlush,
                "store closed the connection without replying",
            ));
        }

        parse_reply(&reply)
    }
}
