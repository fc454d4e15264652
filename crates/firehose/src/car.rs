//! Content-addressed block container (CAR v1) reader
//!
//! Layout: a varint-prefixed DAG-CBOR header followed by varint-prefixed
//! entries of `CID || block bytes`. Only enough of the format is
//! implemented to walk the blocks shipped alongside a commit frame.

use std::io::Cursor;

use cid::Cid;
use coopnet_common::{Error, Result};
use serde::Deserialize;

/// Container header
#[derive(Debug, Deserialize)]
struct CarHeader {
    version: u64,
    #[allow(dead_code)]
    #[serde(default)]
    roots: Vec<Cid>,
}

/// A block and the hash it is addressed by
#[derive(Debug, Clone)]
pub struct Block {
    pub cid: Cid,
    pub data: Vec<u8>,
}

/// Parse a container into its blocks, in stored order
pub fn parse(bytes: &[u8]) -> Result<Vec<Block>> {
    let mut cursor = Cursor::new(bytes);

    let header_len = read_varint(&mut cursor)?
        .ok_or_else(|| Error::deserialization("Block container is empty"))?;
    let header_bytes = take(&mut cursor, header_len as usize)?;
    let header: CarHeader = serde_ipld_dagcbor::from_slice(&header_bytes)
        .map_err(|e| Error::deserialization(format!("Malformed container header: {}", e)))?;
    if header.version != 1 {
        return Err(Error::deserialization(format!(
            "Unsupported container version: {}",
            header.version
        )));
    }

    let mut blocks = Vec::new();
    while let Some(entry_len) = read_varint(&mut cursor)? {
        let entry = take(&mut cursor, entry_len as usize)?;

        let mut entry_cursor = Cursor::new(entry.as_slice());
        let cid = Cid::read_bytes(&mut entry_cursor)
            .map_err(|e| Error::deserialization(format!("Malformed block CID: {}", e)))?;
        let data = entry[entry_cursor.position() as usize..].to_vec();

        blocks.push(Block { cid, data });
    }

    Ok(blocks)
}

/// Read an unsigned LEB128 varint; `None` at clean end of input
fn read_varint(cursor: &mut Cursor<&[u8]>) -> Result<Option<u64>> {
    let mut value: u64 = 0;
    let mut shift = 0u32;

    loop {
        let pos = cursor.position() as usize;
        let bytes = *cursor.get_ref();
        if pos >= bytes.len() {
            if shift == 0 {
                return Ok(None);
            }
            return Err(Error::deserialization("Truncated varint"));
        }

        let byte = bytes[pos];
        cursor.set_position(pos as u64 + 1);

        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(Some(value));
        }
        shift += 7;
        if shift >= 64 {
            return Err(Error::deserialization("Varint overflow"));
        }
    }
}

fn take(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>> {
    let pos = cursor.position() as usize;
    let bytes = *cursor.get_ref();
    if pos + len > bytes.len() {
        return Err(Error::deserialization("Truncated block container"));
    }
    cursor.set_position((pos + len) as u64);
    Ok(bytes[pos..pos + len].to_vec())
}

/// Encode varint-prefixed container bytes; used by tests and fixtures
pub fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::build_container;

    #[test]
    fn test_parse_roundtrip() {
        let block_a = serde_ipld_dagcbor::to_vec(&serde_json::json!({"a": 1})).unwrap();
        let block_b = serde_ipld_dagcbor::to_vec(&serde_json::json!({"b": 2})).unwrap();
        let (cids, container) = build_container(&[block_a.clone(), block_b.clone()]);

        let blocks = parse(&container).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].cid, cids[0]);
        assert_eq!(blocks[0].data, block_a);
        assert_eq!(blocks[1].cid, cids[1]);
        assert_eq!(blocks[1].data, block_b);
    }

    #[test]
    fn test_empty_container_has_no_blocks() {
        let (_, container) = build_container(&[]);
        assert!(parse(&container).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_container_is_an_error() {
        let block = serde_ipld_dagcbor::to_vec(&serde_json::json!({"a": 1})).unwrap();
        let (_, container) = build_container(&[block]);
        assert!(parse(&container[..container.len() - 4]).is_err());
    }

    #[test]
    fn test_varint_roundtrip() {
        for value in [0u64, 1, 127, 128, 300, 1 << 20] {
            let mut buf = Vec::new();
            write_varint(&mut buf, value);
            let mut cursor = Cursor::new(buf.as_slice());
            assert_eq!(read_varint(&mut cursor).unwrap(), Some(value));
        }
    }
}
