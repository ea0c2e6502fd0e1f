// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TCP transport with length-delimited batch frames.
//!
//! Frame layout: a big-endian `u32` byte length followed by that many bytes
//! of consecutive message records, answered by a single ack byte. The ack is
//! what lets the sender distinguish "delivered" from "connection died with
//! the batch in flight".

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tributary_core::message;
use tributary_core::Message;

use super::{Connection, Endpoint, NetError, Transport};

const ACK_OK: u8 = 0x01;

/// Production transport over plain TCP.
#[derive(Debug, Clone, Default)]
pub struct TcpTransport;

impl TcpTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        timeout: Duration,
    ) -> Result<Box<dyn Connection>, NetError> {
        let addr = (endpoint.host.as_str(), endpoint.port);
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| NetError::ConnectTimeout(timeout))??;
        let _ = stream.set_nodelay(true);
        Ok(Box::new(TcpConnection { stream }))
    }
}

struct TcpConnection {
    stream: TcpStream,
}

#[async_trait]
impl Connection for TcpConnection {
    async fn send_batch(&mut self, batch: &[Message]) -> Result<(), NetError> {
        let mut body = Vec::with_capacity(batch.iter().map(Message::record_len).sum());
        message::encode_batch(batch, &mut body);

        self.stream
            .write_all(&(body.len() as u32).to_be_bytes())
            .await?;
        self.stream.write_all(&body).await?;
        self.stream.flush().await?;

        let mut ack = [0u8; 1];
        self.stream.read_exact(&mut ack).await?;
        if ack[0] == ACK_OK {
            Ok(())
        } else {
            Err(NetError::Rejected)
        }
    }

    async fn shutdown(&mut self) {
        let _ = self.stream.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn local_listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[tokio::test]
    async fn sends_framed_batch_and_reads_ack() {
        let (listener, port) = local_listener().await;
        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut len = [0u8; 4];
            sock.read_exact(&mut len).await.unwrap();
            let mut body = vec![0u8; u32::from_be_bytes(len) as usize];
            sock.read_exact(&mut body).await.unwrap();
            sock.write_all(&[ACK_OK]).await.unwrap();
            body
        });

        let transport = TcpTransport::new();
        let endpoint = Endpoint::new("127.0.0.1", port);
        let mut conn = transport
            .connect(&endpoint, Duration::from_secs(1))
            .await
            .unwrap();

        let batch = vec![Message::new("web", &b"hello"[..])];
        conn.send_batch(&batch).await.unwrap();

        let body = server.await.unwrap();
        let (decoded, _) = message::decode_batch(&body);
        assert_eq!(decoded, batch);
    }

    #[tokio::test]
    async fn non_ack_byte_is_a_rejection() {
        let (listener, port) = local_listener().await;
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut len = [0u8; 4];
            sock.read_exact(&mut len).await.unwrap();
            let mut body = vec![0u8; u32::from_be_bytes(len) as usize];
            sock.read_exact(&mut body).await.unwrap();
            sock.write_all(&[0x00]).await.unwrap();
        });

        let transport = TcpTransport::new();
        let endpoint = Endpoint::new("127.0.0.1", port);
        let mut conn = transport
            .connect(&endpoint, Duration::from_secs(1))
            .await
            .unwrap();

        let batch = vec![Message::new("web", &b"hello"[..])];
        assert!(matches!(
            conn.send_batch(&batch).await,
            Err(NetError::Rejected)
        ));
    }

    #[tokio::test]
    async fn connect_to_closed_port_fails() {
        let transport = TcpTransport::new();
        // bind-then-drop to get a port nothing listens on
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let endpoint = Endpoint::new("127.0.0.1", port);
        assert!(transport
            .connect(&endpoint, Duration::from_secs(1))
            .await
            .is_err());
    }
}
