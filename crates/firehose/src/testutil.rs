//! Frame and container fixtures shared across decoder tests

use cid::Cid;
use multihash_codetable::{Code, MultihashDigest};
use serde::Serialize;

use crate::car::write_varint;

const DAG_CBOR_CODEC: u64 = 0x71;

/// Hash a block the way the container addresses it
pub(crate) fn block_cid(data: &[u8]) -> Cid {
    Cid::new_v1(DAG_CBOR_CODEC, Code::Sha2_256.digest(data))
}

/// Build a CAR v1 container around the given blocks
pub(crate) fn build_container(blocks: &[Vec<u8>]) -> (Vec<Cid>, Vec<u8>) {
    let cids: Vec<Cid> = blocks.iter().map(|b| block_cid(b)).collect();

    let header = serde_ipld_dagcbor::to_vec(&serde_json::json!({
        "version": 1,
        "roots": [],
    }))
    .unwrap();

    let mut out = Vec::new();
    write_varint(&mut out, header.len() as u64);
    out.extend_from_slice(&header);

    for (cid, data) in cids.iter().zip(blocks) {
        let cid_bytes = cid.to_bytes();
        write_varint(&mut out, (cid_bytes.len() + data.len()) as u64);
        out.extend_from_slice(&cid_bytes);
        out.extend_from_slice(data);
    }

    (cids, out)
}

#[derive(Serialize)]
struct RawHeader {
    op: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    t: Option<String>,
}

#[derive(Serialize)]
struct RawCommit {
    seq: i64,
    repo: String,
    ops: Vec<RawOp>,
    #[serde(with = "serde_bytes")]
    blocks: Vec<u8>,
    time: String,
}

#[derive(Serialize)]
pub(crate) struct RawOp {
    pub action: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<Cid>,
}

/// Concatenate a header and an arbitrary body into one frame
pub(crate) fn build_frame<B: Serialize>(op: i64, t: Option<&str>, body: &B) -> Vec<u8> {
    let mut frame = serde_ipld_dagcbor::to_vec(&RawHeader {
        op,
        t: t.map(str::to_string),
    })
    .unwrap();
    frame.extend_from_slice(&serde_ipld_dagcbor::to_vec(body).unwrap());
    frame
}

/// Build a commit frame from ops and container bytes
pub(crate) fn build_commit_frame(
    seq: i64,
    repo: &str,
    ops: Vec<RawOp>,
    container: Vec<u8>,
) -> Vec<u8> {
    build_frame(
        1,
        Some("#commit"),
        &RawCommit {
            seq,
            repo: repo.to_string(),
            ops,
            blocks: container,
            time: "2026-08-07T12:00:00Z".to_string(),
        },
    )
}
