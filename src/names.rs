//! The timezone name table.
//!
//! Every zone identifier found in the boundary data, deduplicated and packed
//! the way the generated C++ stores it: one blob of `NUL`-terminated strings
//! plus a byte offset per identifier. The offset doubles as the identifier's
//! enum value, so lookups on the consuming side are a single indexed read.

use std::collections::BTreeSet;

/// Sorted zone identifiers with their byte offsets into the packed blob.
///
/// Offsets are plain `usize` here; the 16-bit range of the emitted
/// enumeration is enforced where the enumeration is rendered, not during
/// construction.
pub struct NameTable {
    ids: Vec<String>,
    offsets: Vec<usize>,
    blob_len: usize,
}

impl NameTable {
    /// Packs a set of identifiers. Offsets accumulate the identifier length
    /// plus one for the embedded terminator. Returns `None` for an empty
    /// set, which has no valid sentinel.
    pub fn new(ids: BTreeSet<String>) -> Option<Self> {
        if ids.is_empty() {
            return None;
        }

        let ids = Vec::from_iter(ids);
        let mut offsets = Vec::with_capacity(ids.len());
        let mut next = 0;
        for id in &ids {
            offsets.push(next);
            next += id.len() + 1;
        }

        Some(Self {
            ids,
            offsets,
            blob_len: next,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Iterates identifiers with their offsets, in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.ids
            .iter()
            .map(String::as_str)
            .zip(self.offsets.iter().copied())
    }

    /// Finds the offset of an identifier.
    pub fn offset_of(&self, id: &str) -> Option<usize> {
        let index = self.ids.binary_search_by(|entry| entry.as_str().cmp(id)).ok()?;
        Some(self.offsets[index])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.offset_of(id).is_some()
    }

    /// The offset of the blob's final terminator. Consumers use it as the
    /// "no zone" value; dereferencing it yields an empty string.
    pub fn sentinel_offset(&self) -> usize {
        self.blob_len - 1
    }
}

/// Mangles a zone identifier into the C++ enumerator spelling.
pub fn enum_name(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            '/' | '-' => '_',
            c => c,
        })
        .collect()
}
