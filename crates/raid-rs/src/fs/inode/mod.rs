//! Fixed-size inode records, encoded the way the teacher's `fs::metadata`
//! encodes its flat `Entry` table: explicit byte offsets, little-endian
//! integers, no external serialization crate.

use super::constants::{DIRECT_POINTERS, INODE_RECORD_SIZE, NAME_LEN};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InodeKind {
    Free,
    File,
    Directory,
    Symlink,
}

impl InodeKind {
    const fn to_tag(self) -> u8 {
        match self {
            Self::Free => 0,
            Self::File => 1,
            Self::Directory => 2,
            Self::Symlink => 3,
        }
    }

    fn from_tag(tag: u8) -> anyhow::Result<Self> {
        Ok(match tag {
            0 => Self::Free,
            1 => Self::File,
            2 => Self::Directory,
            3 => Self::Symlink,
            other => anyhow::bail!("unknown inode kind tag {other}"),
        })
    }
}

/// `Inode` is one filesystem object: a file, directory, or symlink.
///
/// `blocks` holds up to [`DIRECT_POINTERS`] logical block numbers; `size` is
/// the byte length actually in use. `inline` carries a short symlink target
/// (or is unused for files/directories).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Inode {
    pub kind: InodeKind,
    pub size: u64,
    pub link_count: u32,
    pub blocks: Vec<u64>,
    pub inline: Vec<u8>,
}

impl Inode {
    #[must_use]
    pub fn free() -> Self {
        Self {
            kind: InodeKind::Free,
            size: 0,
            link_count: 0,
            blocks: Vec::new(),
            inline: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_free(&self) -> bool {
        self.kind == InodeKind::Free
    }

    /// `to_bytes` encodes this inode into a fixed-width record.
    ///
    /// # Panics
    /// Panics if `blocks` has more than [`DIRECT_POINTERS`] entries or
    /// `inline` is longer than [`NAME_LEN`] bytes -- both are caller-side
    /// invariants enforced before this is ever called.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        assert!(self.blocks.len() <= DIRECT_POINTERS, "too many direct blocks");
        assert!(self.inline.len() <= NAME_LEN, "inline payload too long");

        let mut out = Vec::with_capacity(INODE_RECORD_SIZE);
        out.push(self.kind.to_tag());
        out.extend_from_slice(&[0u8; 3]);
        out.extend_from_slice(&self.size.to_le_bytes());
        out.extend_from_slice(&self.link_count.to_le_bytes());
        out.extend_from_slice(&[0u8; 4]);

        for i in 0..DIRECT_POINTERS {
            let ptr = self.blocks.get(i).copied().unwrap_or(0);
            out.extend_from_slice(&ptr.to_le_bytes());
        }

        out.extend_from_slice(&(self.inline.len() as u16).to_le_bytes());
        let mut inline_padded = self.inline.clone();
        inline_padded.resize(NAME_LEN, 0);
        out.extend_from_slice(&inline_padded);

        debug_assert_eq!(out.len(), INODE_RECORD_SIZE);
        out
    }

    /// `from_bytes` decodes a record previously produced by [`Self::to_bytes`].
    ///
    /// # Errors
    /// Returns an error if `buf` is too short, the kind tag is unrecognized,
    /// or the inline-length field exceeds [`NAME_LEN`].
    pub fn from_bytes(buf: &[u8]) -> anyhow::Result<Self> {
        anyhow::ensure!(
            buf.len() >= INODE_RECORD_SIZE,
            "inode record truncated: need {INODE_RECORD_SIZE} bytes, got {}",
            buf.len()
        );

        let kind = InodeKind::from_tag(buf[0])?;
        let size = u64::from_le_bytes(buf[4..12].try_into().unwrap());
        let link_count = u32::from_le_bytes(buf[12..16].try_into().unwrap());

        let mut blocks = Vec::with_capacity(DIRECT_POINTERS);
        let mut offset = 20;
        for _ in 0..DIRECT_POINTERS {
            let ptr = u64::from_le_bytes(buf[offset..offset + 8].try_into().unwrap());
            blocks.push(ptr);
            offset += 8;
        }
        // Trim trailing zero pointers; block 0 (the superblock) is never a
        // valid data pointer, so `0` unambiguously means "unused slot".
        while matches!(blocks.last(), Some(0)) {
            blocks.pop();
        }

        let inline_len = u16::from_le_bytes(buf[offset..offset + 2].try_into().unwrap()) as usize;
        offset += 2;
        anyhow::ensure!(inline_len <= NAME_LEN, "corrupt inode: inline length {inline_len} exceeds {NAME_LEN}");
        let inline = buf[offset..offset + inline_len].to_vec();

        Ok(Self {
            kind,
            size,
            link_count,
            blocks,
            inline,
        })
    }
}
