//! Frame layout: two concatenated self-describing DAG-CBOR values
//!
//! The header names the frame kind; the body layout depends on it. Only
//! commit frames carry record changes.

use std::io::Cursor;

use cid::Cid;
use coopnet_common::{Error, Result};
use serde::Deserialize;

/// Operation code for a well-formed frame
pub const OP_FRAME: i64 = 1;

/// Operation code signalling an error frame
pub const OP_ERROR: i64 = -1;

/// Message type tag for commit frames
pub const TYPE_COMMIT: &str = "#commit";

/// Frame header
#[derive(Debug, Clone, Deserialize)]
pub struct FrameHeader {
    /// Operation code, `1` for data frames, `-1` for error frames
    pub op: i64,

    /// Message type tag; absent on error frames
    #[serde(default)]
    pub t: Option<String>,
}

impl FrameHeader {
    /// Whether the body should be decoded as a commit
    pub fn is_commit(&self) -> bool {
        self.op == OP_FRAME && self.t.as_deref() == Some(TYPE_COMMIT)
    }
}

/// Commit frame body
#[derive(Debug, Clone, Deserialize)]
pub struct CommitBody {
    /// Sequence number, monotonically increasing per source
    pub seq: i64,

    /// Identifier of the repository author
    pub repo: String,

    /// Per-record operations in original order
    pub ops: Vec<RepoOp>,

    /// Content-addressed block container with the record payloads
    #[serde(with = "serde_bytes")]
    pub blocks: Vec<u8>,

    /// Commit timestamp
    pub time: String,
}

/// One record operation within a commit
#[derive(Debug, Clone, Deserialize)]
pub struct RepoOp {
    /// `create`, `update` or `delete`
    pub action: String,

    /// `<collection>/<rkey>` path of the record
    pub path: String,

    /// Content hash reference, absent for deletes
    #[serde(default)]
    pub cid: Option<Cid>,
}

/// Split a frame into its header and the raw body bytes
pub fn split_frame(bytes: &[u8]) -> Result<(FrameHeader, &[u8])> {
    let mut cursor = Cursor::new(bytes);

    let header: FrameHeader = serde_ipld_dagcbor::from_reader(&mut cursor)
        .map_err(|e| Error::deserialization(format!("Malformed frame header: {}", e)))?;

    let body_start = cursor.position() as usize;
    Ok((header, &bytes[body_start..]))
}

/// Decode the body of a commit frame
pub fn decode_commit(body: &[u8]) -> Result<CommitBody> {
    serde_ipld_dagcbor::from_slice(body)
        .map_err(|e| Error::deserialization(format!("Malformed commit body: {}", e)))
}
