//! Dump file codec: serializes a device's geometry and every logical block
//! to a flat file, and validates geometry on load.
//!
//! Format: a newline-terminated ASCII header naming the filesystem geometry
//! constants (`BS_<bs>_NB_<nb>_IS_<is>_MI_<mi>_MF_<mf>_IDS_<ids>`), followed
//! by `total_num_blocks * block_size` raw bytes, one block after another in
//! logical order. Loading re-derives parity by replaying every block through
//! `put` rather than trusting the stored parity verbatim, so a dump produced
//! on one geometry can never silently masquerade as another.


use std::fs;
use std::path::Path;

use crate::config::ClientConfig;
use crate::error::RaidError;
use crate::fs::compute_geometry;

fn header_for(config: &ClientConfig) -> anyhow::Result<String> {
    let geometry = compute_geometry(config.block_size, config.total_num_blocks)?;
    Ok(format!(
        "BS_{}_NB_{}_IS_{}_MI_{}_MF_{}_IDS_{}\n",
        config.block_size,
        config.total_num_blocks,
        geometry.inode_size,
        geometry.max_inodes,
        geometry.bitmap_blocks,
        geometry.data_start,
    ))
}

/// `write_dump` writes `blocks` (one entry per logical block, in order) to
/// `path`, prefixed by a geometry header.
///
/// # Errors
/// Returns an error if any block's length does not match `config.block_size`,
/// or if the file cannot be written.
pub fn write_dump(path: &Path, config: &ClientConfig, blocks: &[Vec<u8>]) -> anyhow::Result<()> {
    anyhow::ensure!(
        blocks.len() as u64 == config.total_num_blocks,
        "dump expects {} blocks, got {}",
        config.total_num_blocks,
        blocks.len()
    );

    let mut out = header_for(config)?.into_bytes();
    for (i, block) in blocks.iter().enumerate() {
        anyhow::ensure!(
            block.len() == config.block_size,
            "block {i} is {} bytes, expected {}",
            block.len(),
            config.block_size
        );
        out.extend_from_slice(block);
    }

    fs::write(path, out)?;
    Ok(())
}

/// `read_dump` reads a dump file, validating that its geometry header
/// matches `config` exactly, and returns the blocks in logical order.
///
/// # Errors
/// Returns [`RaidError::DumpHeaderMismatch`] if the header does not match,
/// or [`RaidError::MalformedDump`] if the file is truncated.
pub fn read_dump(path: &Path, config: &ClientConfig) -> anyhow::Result<Vec<Vec<u8>>> {
    let raw = fs::read(path)?;
    let newline = raw
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| RaidError::MalformedDump("missing header terminator".to_string()))?;

    let found_header = String::from_utf8_lossy(&raw[..=newline]).into_owned();
    let expected_header = header_for(config)?;
    if found_header != expected_header {
        return Err(RaidError::DumpHeaderMismatch {
            expected: expected_header.trim_end().to_string(),
            found: found_header.trim_end().to_string(),
        }
        .into());
    }

    let body = &raw[newline + 1..];
    let expected_len = config.total_num_blocks as usize * config.block_size;
    if body.len() != expected_len {
        return Err(RaidError::MalformedDump(format!(
            "expected {expected_len} bytes of block data, found {}",
            body.len()
        ))
        .into());
    }

    Ok(body
        .chunks_exact(config.block_size)
        .map(<[u8]>::to_vec)
        .collect())
}
