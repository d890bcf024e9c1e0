//! Sparse and full update payloads.

use attr_buffer::WireReader;
use attr_tree::{decode_tagged, Attribute, DecodeContext};
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// One changed path. `payload` is a tagged value with no key; `None` means
/// the path no longer exists.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaEntry {
    pub path: String,
    pub payload: Option<Vec<u8>>,
}

impl DeltaEntry {
    /// Decode the payload, if any.
    pub fn value(&self, ctx: &DecodeContext<'_>) -> SyncResult<Option<Attribute>> {
        self.payload
            .as_deref()
            .map(|bytes| decode_payload(&self.path, bytes, ctx))
            .transpose()
    }
}

/// The dirty paths of a tree and their current values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirtyDelta {
    pub entries: Vec<DeltaEntry>,
}

impl DirtyDelta {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.path.as_str())
    }

    /// Total payload bytes.
    pub fn payload_len(&self) -> usize {
        self.entries
            .iter()
            .filter_map(|e| e.payload.as_ref())
            .map(Vec::len)
            .sum()
    }
}

/// What a receiver needs to catch up with the sender.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncUpdate {
    /// Nothing changed.
    None,
    Partial(DirtyDelta),
    /// An encoded snapshot of the whole tree.
    Full(Vec<u8>),
}

impl SyncUpdate {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

pub(crate) fn decode_payload(
    path: &str,
    bytes: &[u8],
    ctx: &DecodeContext<'_>,
) -> SyncResult<Attribute> {
    if bytes.is_empty() {
        return Err(SyncError::EmptyPayload(path.to_owned()));
    }
    Ok(decode_tagged(&mut WireReader::new(bytes), ctx)?)
}

#[cfg(test)]
mod tests {
    use attr_tree::{encode_tagged, TypeRegistry};

    use super::*;

    #[test]
    fn entry_decodes_its_payload() {
        let registry = TypeRegistry::with_builtins();
        let ctx = DecodeContext::new(&registry);
        let mut payload = Vec::new();
        encode_tagged(&Attribute::Int(15), &mut payload).unwrap();

        let entry = DeltaEntry {
            path: "hp".into(),
            payload: Some(payload),
        };
        assert_eq!(entry.value(&ctx).unwrap(), Some(Attribute::Int(15)));

        let removed = DeltaEntry {
            path: "hp".into(),
            payload: None,
        };
        assert_eq!(removed.value(&ctx).unwrap(), None);
    }

    #[test]
    fn empty_payload_is_rejected() {
        let registry = TypeRegistry::with_builtins();
        let ctx = DecodeContext::new(&registry);
        let entry = DeltaEntry {
            path: "hp".into(),
            payload: Some(Vec::new()),
        };
        assert_eq!(
            entry.value(&ctx).unwrap_err(),
            SyncError::EmptyPayload("hp".into())
        );
    }
}
