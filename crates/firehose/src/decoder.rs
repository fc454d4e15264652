//! Frame decoding into change events

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use coopnet_common::Result;
use tracing::{debug, warn};

use crate::car;
use crate::event::{location_uri, ChangeAction, ChangeEvent};
use crate::frame::{decode_commit, split_frame, CommitBody};

/// Decode a frame into change events without resolving record payloads
///
/// Error frames and non-commit message types yield an empty event list;
/// only a malformed top-level frame is an error.
pub fn decode_frame(bytes: &[u8]) -> Result<Vec<ChangeEvent>> {
    let (header, body) = split_frame(bytes)?;

    if !header.is_commit() {
        debug!(op = header.op, t = ?header.t, "Skipping non-commit frame");
        return Ok(Vec::new());
    }

    let commit = decode_commit(body)?;
    Ok(events_from_commit(&commit))
}

/// Decode a frame and attach record payloads from the block container
///
/// Every block is decoded on a best-effort basis: blocks that are not
/// records (structural nodes) are skipped, never surfaced as errors.
pub fn decode_frame_with_records(bytes: &[u8]) -> Result<Vec<ChangeEvent>> {
    let (header, body) = split_frame(bytes)?;

    if !header.is_commit() {
        debug!(op = header.op, t = ?header.t, "Skipping non-commit frame");
        return Ok(Vec::new());
    }

    let commit = decode_commit(body)?;
    let mut events = events_from_commit(&commit);

    let records = match car::parse(&commit.blocks) {
        Ok(blocks) => {
            let mut records: HashMap<String, serde_json::Value> = HashMap::new();
            for block in blocks {
                if let Some(record) = decode_record(&block.data) {
                    records.insert(block.cid.to_string(), record);
                }
            }
            records
        }
        Err(e) => {
            warn!(seq = commit.seq, error = %e, "Unreadable block container, events carry no records");
            HashMap::new()
        }
    };

    for event in &mut events {
        if event.action == ChangeAction::Delete {
            continue;
        }
        if let Some(hash) = &event.content_hash {
            event.record = records.get(hash).cloned();
        }
    }

    Ok(events)
}

/// Map commit operations onto events, preserving op order
fn events_from_commit(commit: &CommitBody) -> Vec<ChangeEvent> {
    let time = parse_time(&commit.time);

    commit
        .ops
        .iter()
        .filter_map(|op| {
            let action = match ChangeAction::parse(&op.action) {
                Some(action) => action,
                None => {
                    warn!(seq = commit.seq, action = %op.action, "Skipping unknown op action");
                    return None;
                }
            };

            Some(ChangeEvent {
                seq: commit.seq,
                author: commit.repo.clone(),
                action,
                location: location_uri(&commit.repo, &op.path),
                content_hash: op.cid.map(|c| c.to_string()),
                record: None,
                time,
            })
        })
        .collect()
}

/// A block is a record if it decodes to a JSON-compatible map carrying
/// a `$type` field; anything else is a structural node
fn decode_record(data: &[u8]) -> Option<serde_json::Value> {
    let value: serde_json::Value = serde_ipld_dagcbor::from_slice(data).ok()?;
    if value.get("$type").map(|t| t.is_string()) == Some(true) {
        Some(value)
    } else {
        None
    }
}

fn parse_time(time: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(time)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{block_cid, build_commit_frame, build_container, build_frame, RawOp};
    use serde_json::json;

    fn membership_record() -> Vec<u8> {
        serde_ipld_dagcbor::to_vec(&json!({
            "$type": "coop.membership.request",
            "member": "did:plc:member1",
            "coop": "did:web:coop.example",
            "createdAt": "2026-08-07T11:00:00Z",
        }))
        .unwrap()
    }

    #[test]
    fn test_non_commit_frame_yields_no_events() {
        let frame = build_frame(1, Some("#identity"), &json!({"did": "did:plc:abc"}));
        assert!(decode_frame(&frame).unwrap().is_empty());
    }

    #[test]
    fn test_error_frame_yields_no_events() {
        let frame = build_frame(-1, None, &json!({"error": "FutureCursor"}));
        assert!(decode_frame(&frame).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_frame_is_an_error() {
        assert!(decode_frame(&[0x00, 0xff, 0x13]).is_err());
    }

    #[test]
    fn test_commit_frame_basic_decode() {
        let record = membership_record();
        let (cids, container) = build_container(&[record]);

        let frame = build_commit_frame(
            42,
            "did:plc:member1",
            vec![
                RawOp {
                    action: "create".to_string(),
                    path: "coop.membership.request/rkey1".to_string(),
                    cid: Some(cids[0]),
                },
                RawOp {
                    action: "delete".to_string(),
                    path: "coop.profile/self".to_string(),
                    cid: None,
                },
            ],
            container,
        );

        let events = decode_frame(&frame).unwrap();
        assert_eq!(events.len(), 2);

        assert_eq!(events[0].seq, 42);
        assert_eq!(events[0].author, "did:plc:member1");
        assert_eq!(events[0].action, ChangeAction::Create);
        assert_eq!(
            events[0].location,
            "coop://did:plc:member1/coop.membership.request/rkey1"
        );
        assert_eq!(events[0].content_hash.as_deref(), Some(cids[0].to_string().as_str()));
        assert!(events[0].record.is_none());

        assert_eq!(events[1].action, ChangeAction::Delete);
        assert!(events[1].content_hash.is_none());
    }

    #[test]
    fn test_extended_decode_attaches_records_by_hash() {
        let record = membership_record();
        let (cids, container) = build_container(&[record]);

        let frame = build_commit_frame(
            7,
            "did:plc:member1",
            vec![RawOp {
                action: "create".to_string(),
                path: "coop.membership.request/rkey1".to_string(),
                cid: Some(cids[0]),
            }],
            container,
        );

        let events = decode_frame_with_records(&frame).unwrap();
        assert_eq!(events.len(), 1);

        let record = events[0].record.as_ref().unwrap();
        assert_eq!(record["$type"], "coop.membership.request");
        assert_eq!(record["member"], "did:plc:member1");
    }

    #[test]
    fn test_undecodable_blocks_are_skipped_not_fatal() {
        let record = membership_record();
        // A structural node: valid DAG-CBOR but not a record
        let structural = serde_ipld_dagcbor::to_vec(&json!({"e": [], "l": null})).unwrap();
        // Not even valid DAG-CBOR
        let garbage = vec![0xff, 0xfe, 0xfd];

        let record_cid = block_cid(&record);
        let (_, container) = build_container(&[record.clone(), structural, garbage]);

        let frame = build_commit_frame(
            9,
            "did:plc:member1",
            vec![RawOp {
                action: "create".to_string(),
                path: "coop.membership.request/rkey1".to_string(),
                cid: Some(record_cid),
            }],
            container,
        );

        let events = decode_frame_with_records(&frame).unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].record.is_some());
    }

    #[test]
    fn test_missing_block_leaves_record_unset() {
        let record = membership_record();
        let record_cid = block_cid(&record);
        // Container does not carry the referenced block
        let (_, container) = build_container(&[]);

        let frame = build_commit_frame(
            10,
            "did:plc:member1",
            vec![RawOp {
                action: "create".to_string(),
                path: "coop.membership.request/rkey1".to_string(),
                cid: Some(record_cid),
            }],
            container,
        );

        let events = decode_frame_with_records(&frame).unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].record.is_none());
    }
}
