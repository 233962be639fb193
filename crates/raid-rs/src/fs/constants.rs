//! On-disk layout constants for the thin inode filesystem (C5).
//!
//! Generalizes the teacher's flat `raidfs` layout (`MAGIC`, `VERSION`,
//! fixed `ENTRY_SIZE` records addressed by a single `Header.next_free`)
//! into a proper inode table plus a free bitmap plus directory trees, while
//! keeping the same "magic + version, fixed-size records" texture.

/// Identifies a valid superblock; guards against mounting a blank or
/// unrelated device.
pub const MAGIC: [u8; 8] = *b"RAIDFS2\0";
pub const VERSION: u32 = 1;

/// Logical block holding the superblock.
pub const SUPERBLOCK_BLOCK: u64 = 0;

/// Inode number of the filesystem root directory; inode 0 is never used so
/// that "no inode" can be represented as `0` in fixed-width fields.
pub const ROOT_INODE: u64 = 1;

/// Maximum path component length, matching the teacher's `NAME_LEN`.
pub const NAME_LEN: usize = 16;

/// Direct block pointers carried inline in every inode; there are no
/// indirect blocks, matching the "minimal but real" scope in the design
/// notes -- files larger than `DIRECT_POINTERS * block_size` are out of scope.
pub const DIRECT_POINTERS: usize = 8;

/// Fixed on-disk size of one inode record, independent of `block_size`:
/// kind(1) + reserved(3) + size(8) + link_count(4) + reserved(4) +
/// DIRECT_POINTERS * 8 + inline_len(2) + inline data up to `NAME_LEN`
/// bytes (reused for short symlink targets). Sized to fit at least one
/// record in a 128-byte block, the default `BLOCK_SIZE`.
pub const INODE_RECORD_SIZE: usize = 1 + 3 + 8 + 4 + 4 + DIRECT_POINTERS * 8 + 2 + NAME_LEN;

/// One directory-entry record: inode number(8) + name, fixed width.
pub const DIR_ENTRY_SIZE: usize = 8 + NAME_LEN;
