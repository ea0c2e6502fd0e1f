// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message and batch model.
//!
//! A message is a category name plus an opaque payload; the core imposes no
//! structure on the payload beyond optional key extraction for partitioning.
//! The record codec here is the single framing used both for spooled batches
//! on disk and for forwarding batches over a stream.

use serde::{Deserialize, Serialize};

/// A single category-tagged log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub category: String,
    pub payload: Vec<u8>,
}

/// Ordered group of messages handled by one call.
///
/// Handling mutates a batch in place on failure: afterwards it holds exactly
/// the messages that were not durably handled, in their original order.
pub type Batch = Vec<Message>;

impl Message {
    pub fn new(category: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            category: category.into(),
            payload: payload.into(),
        }
    }

    /// The partition key: payload bytes before the first `delimiter`.
    ///
    /// Returns `None` when the payload contains no delimiter. An empty key
    /// (payload starting with the delimiter) is returned as `Some(&[])`.
    pub fn key(&self, delimiter: u8) -> Option<&[u8]> {
        let pos = self.payload.iter().position(|b| *b == delimiter)?;
        Some(&self.payload[..pos])
    }

    /// A copy of this message with the key and its delimiter removed.
    ///
    /// Messages without a delimiter are returned unchanged.
    pub fn without_key(&self, delimiter: u8) -> Message {
        match self.payload.iter().position(|b| *b == delimiter) {
            Some(pos) => Message {
                category: self.category.clone(),
                payload: self.payload[pos + 1..].to_vec(),
            },
            None => self.clone(),
        }
    }

    /// Bytes this message contributes to a framed record.
    pub fn record_len(&self) -> usize {
        8 + self.category.len() + self.payload.len()
    }

    /// Appends this message to `buf` as one length-prefixed record.
    ///
    /// Layout: `[u32 category len][category][u32 payload len][payload]`,
    /// both lengths big-endian.
    pub fn encode_record(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&(self.category.len() as u32).to_be_bytes());
        buf.extend_from_slice(self.category.as_bytes());
        buf.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.payload);
    }

    /// Decodes one record from the front of `buf`.
    ///
    /// Returns the message and the number of bytes consumed, or `None` when
    /// `buf` holds no complete record (truncated tail or invalid category).
    pub fn decode_record(buf: &[u8]) -> Option<(Message, usize)> {
        let (cat, after_cat) = take_prefixed(buf)?;
        let (payload, after_payload) = take_prefixed(after_cat)?;
        let category = String::from_utf8(cat.to_vec()).ok()?;
        let consumed = buf.len() - after_payload.len();
        Some((
            Message {
                category,
                payload: payload.to_vec(),
            },
            consumed,
        ))
    }
}

fn take_prefixed(buf: &[u8]) -> Option<(&[u8], &[u8])> {
    let len_bytes: [u8; 4] = buf.get(..4)?.try_into().ok()?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    let body = buf.get(4..4 + len)?;
    Some((body, &buf[4 + len..]))
}

/// Encodes a whole batch as consecutive records.
pub fn encode_batch(batch: &[Message], buf: &mut Vec<u8>) {
    for message in batch {
        message.encode_record(buf);
    }
}

/// Decodes consecutive records until the buffer is exhausted or corrupt.
///
/// Returns the decoded messages and the number of bytes consumed; a consumed
/// count shorter than the input means a truncated or damaged tail, which the
/// caller should treat as lost and log.
pub fn decode_batch(mut buf: &[u8]) -> (Batch, usize) {
    let total = buf.len();
    let mut batch = Batch::new();
    while let Some((message, used)) = Message::decode_record(buf) {
        batch.push(message);
        buf = &buf[used..];
    }
    (batch, total - buf.len())
}
