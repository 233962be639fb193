//! Directory entries: name -> inode number records packed into a
//! directory's own data blocks, generalizing the teacher's single flat
//! root directory into an arbitrarily nested tree.

use super::constants::{DIR_ENTRY_SIZE, NAME_LEN};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DirEntry {
    pub inode: u64,
    pub name: String,
}

impl DirEntry {
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        assert!(
            self.name.len() <= NAME_LEN,
            "path component {:?} exceeds {NAME_LEN} bytes",
            self.name
        );
        let mut out = Vec::with_capacity(DIR_ENTRY_SIZE);
        out.extend_from_slice(&self.inode.to_le_bytes());
        let mut name_padded = self.name.clone().into_bytes();
        name_padded.resize(NAME_LEN, 0);
        out.extend_from_slice(&name_padded);
        out
    }

    #[must_use]
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        let inode = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        if inode == 0 {
            return None;
        }
        let name_bytes = &buf[8..8 + NAME_LEN];
        let end = name_bytes.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        let name = String::from_utf8_lossy(&name_bytes[..end]).into_owned();
        Some(Self { inode, name })
    }
}

/// `encode_entries` packs a directory's live entries into one contiguous
/// byte buffer, ready to be split into block-sized chunks by the caller.
#[must_use]
pub fn encode_entries(entries: &[DirEntry]) -> Vec<u8> {
    entries.iter().flat_map(DirEntry::to_bytes).collect()
}

/// `decode_entries` is the inverse of [`encode_entries`], skipping any
/// all-zero (deleted) slots.
#[must_use]
pub fn decode_entries(buf: &[u8]) -> Vec<DirEntry> {
    buf.chunks_exact(DIR_ENTRY_SIZE)
        .filter_map(DirEntry::from_bytes)
        .collect()
}

/// `is_valid_name` rejects path components that would break tree invariants:
/// empty, too long, containing `/`, or the special `.`/`..` segments.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= NAME_LEN
        && name != "."
        && name != ".."
        && !name.contains('/')
}

#[cfg(test)]
mod dir_tests;
