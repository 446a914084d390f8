//! Archived record format.
//!
//! # Layout
//! ```text
//! magic:   "TVRC"            4 bytes
//! version: u8                currently 1
//! flags:   u8                bit 0 = body is gzip-compressed
//! body:    bincode(ArchivedRecord), optionally gzipped
//! ```
//!
//! The payload travels as JSON text inside the envelope since bincode cannot
//! describe self-describing values.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::error::StoreError;
use crate::types::Record;

const MAGIC: &[u8; 4] = b"TVRC";
const VERSION: u8 = 1;
const FLAG_GZIP: u8 = 0b0000_0001;
const HEADER_LEN: usize = 6;

#[derive(Debug, Serialize, Deserialize)]
struct ArchivedRecord {
    partition_key: String,
    id: String,
    timestamp_ms: u64,
    payload_json: String,
}

/// Encode a record for the cold tier.
pub fn encode_record(record: &Record, compress: bool) -> Result<Vec<u8>, StoreError> {
    let envelope = ArchivedRecord {
        partition_key: record.partition_key.clone(),
        id: record.id.clone(),
        timestamp_ms: record.timestamp_ms,
        payload_json: serde_json::to_string(&record.payload)
            .map_err(|e| StoreError::Codec(format!("serialize payload: {}", e)))?,
    };
    let body = bincode::serialize(&envelope)
        .map_err(|e| StoreError::Codec(format!("serialize envelope: {}", e)))?;

    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(MAGIC);
    out.push(VERSION);

    if compress {
        out.push(FLAG_GZIP);
        let mut encoder = GzEncoder::new(out, Compression::default());
        encoder.write_all(&body)?;
        Ok(encoder.finish()?)
    } else {
        out.push(0);
        out.extend_from_slice(&body);
        Ok(out)
    }
}

/// Decode bytes produced by [`encode_record`].
pub fn decode_record(bytes: &[u8]) -> Result<Record, StoreError> {
    if bytes.len() < HEADER_LEN {
        return Err(StoreError::Codec(format!("blob too short: {} bytes", bytes.len())));
    }
    if &bytes[..4] != MAGIC {
        return Err(StoreError::Codec("invalid magic".to_string()));
    }
    if bytes[4] != VERSION {
        return Err(StoreError::Codec(format!("unsupported version: {}", bytes[4])));
    }

    let flags = bytes[5];
    let raw = &bytes[HEADER_LEN..];
    let envelope: ArchivedRecord = if flags & FLAG_GZIP != 0 {
        let mut body = Vec::new();
        GzDecoder::new(raw)
            .read_to_end(&mut body)
            .map_err(|e| StoreError::Codec(format!("decompress: {}", e)))?;
        bincode::deserialize(&body)
    } else {
        bincode::deserialize(raw)
    }
    .map_err(|e| StoreError::Codec(format!("deserialize envelope: {}", e)))?;

    let payload = serde_json::from_str(&envelope.payload_json)
        .map_err(|e| StoreError::Codec(format!("deserialize payload: {}", e)))?;

    Ok(Record {
        id: envelope.id,
        partition_key: envelope.partition_key,
        timestamp_ms: envelope.timestamp_ms,
        payload,
    })
}
