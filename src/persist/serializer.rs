//! Entry Serializer
//!
//! Pluggable encoding of stored responses on disk.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};
use crate::persist::StoredResponse;

/// Version written into every persisted entry by [`JsonEntrySerializer`].
pub const FORMAT_VERSION: u32 = 1;

pub trait EntrySerializer: Send + Sync {
    fn write_to(&self, entry: &StoredResponse, writer: &mut dyn Write) -> Result<()>;

    fn read_from(&self, reader: &mut dyn Read) -> Result<StoredResponse>;
}

/// JSON envelope `{"format_version": 1, "response": {...}}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEntrySerializer;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    format_version: u32,
    response: &'a StoredResponse,
}

#[derive(Deserialize)]
struct Envelope {
    format_version: u32,
    response: serde_json::Value,
}

impl EntrySerializer for JsonEntrySerializer {
    fn write_to(&self, entry: &StoredResponse, writer: &mut dyn Write) -> Result<()> {
        let envelope = EnvelopeRef {
            format_version: FORMAT_VERSION,
            response: entry,
        };
        serde_json::to_writer(writer, &envelope)?;
        Ok(())
    }

    fn read_from(&self, reader: &mut dyn Read) -> Result<StoredResponse> {
        let envelope: Envelope = serde_json::from_reader(reader)?;
        if envelope.format_version != FORMAT_VERSION {
            return Err(CacheError::UnsupportedFormat {
                found: envelope.format_version,
                expected: FORMAT_VERSION,
            });
        }
        Ok(serde_json::from_value(envelope.response)?)
    }
}
