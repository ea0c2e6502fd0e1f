// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RESP wire client for redis-compatible servers.
//!
//! Speaks just enough of the protocol for the sink: LPUSH as an array of
//! bulk strings, one reply line per command. Replies other than an integer
//! (`:n`) or simple string (`+OK`) fail the push.

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use super::{KvConn, KvConnector, KvError};
use crate::forward::Endpoint;

#[derive(Debug, Clone, Default)]
pub struct RespConnector;

impl RespConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl KvConnector for RespConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn KvConn>, KvError> {
        let stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port)).await?;
        Ok(Box::new(RespConn {
            stream: BufReader::new(stream),
        }))
    }
}

struct RespConn {
    stream: BufReader<TcpStream>,
}

fn encode_lpush(key: &str, value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(32 + key.len() + value.len());
    out.extend_from_slice(b"*3\r\n$5\r\nLPUSH\r\n");
    out.extend_from_slice(format!("${}\r\n", key.len()).as_bytes());
    out.extend_from_slice(key.as_bytes());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(format!("${}\r\n", value.len()).as_bytes());
    out.extend_from_slice(value);
    out.extend_from_slice(b"\r\n");
    out
}

impl RespConn {
    /// Reads one CRLF-terminated reply line.
    async fn read_reply(&mut self) -> Result<Vec<u8>, KvError> {
        let mut line = Vec::new();
        loop {
            let byte = self.stream.read_u8().await?;
            if byte == b'\n' && line.last() == Some(&b'\r') {
                line.pop();
                return Ok(line);
            }
            // cap protects against a stream that never terminates the line
            if line.len() > 4096 {
                return Err(KvError::MalformedReply);
            }
            line.push(byte);
        }
    }
}

#[async_trait]
impl KvConn for RespConn {
    async fn push(&mut self, key: &str, value: &[u8]) -> Result<(), KvError> {
        let command = encode_lpush(key, value);
        self.stream.get_mut().write_all(&command).await?;
        self.stream.get_mut().flush().await?;

        let reply = self.read_reply().await?;
        match reply.first() {
            Some(b':') | Some(b'+') => Ok(()),
            Some(b'-') => Err(KvError::Server(
                String::from_utf8_lossy(&reply[1..]).into_owned(),
            )),
            _ => Err(KvError::MalformedReply),
        }
    }

    async fn quit(&mut self) {
        let _ = self.stream.get_mut().write_all(b"*1\r\n$4\r\nQUIT\r\n").await;
        let _ = self.stream.get_mut().shutdown().await;
    }
}
