//! Block server (C1) core state, transport-agnostic.
//!
//! This module holds the in-memory block array, per-block checksums, and
//! fault-injection hooks. The `raid-server` binary wraps an instance of
//! [`BlockServerState`] behind a `tonic` gRPC service; this module itself
//! has no notion of RPC and is exercised directly by unit tests.

#[cfg(test)]
mod server_tests;

use md5::{Digest, Md5};

use crate::block::Block;

/// Outcome of a `Get` against a single physical block index.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GetOutcome {
    Block(Vec<u8>),
    /// The stored checksum no longer matches the stored bytes (or this index
    /// was injected as corrupt); carries the index for the sentinel message.
    Corrupted(u64),
}

/// `BlockServerState` owns one physical server's block array: the blocks, a
/// checksum per block recomputed on every `Put`, a request counter, and an
/// optional injected-corrupt index plus sleep-every-Nth-request hook.
pub struct BlockServerState {
    block_size: usize,
    blocks: Vec<Vec<u8>>,
    checksums: Vec<[u8; 16]>,
    request_count: u64,
    /// Every `delayat`-th request should sleep (actual sleeping is the
    /// transport layer's job; this just reports when to do it).
    delayat: Option<u64>,
    /// A single physical index that always reports as corrupted, regardless
    /// of its actual checksum -- fault injection for tests.
    corrupted_index: Option<u64>,
}

impl BlockServerState {
    /// `new` allocates `total_num_blocks` zeroed blocks of `block_size` bytes.
    #[must_use]
    pub fn new(total_num_blocks: u64, block_size: usize) -> Self {
        let n = usize::try_from(total_num_blocks).expect("total_num_blocks exceeds usize");
        let blocks = vec![vec![0u8; block_size]; n];
        let checksums = blocks.iter().map(|b| checksum(b)).collect();
        Self {
            block_size,
            blocks,
            checksums,
            request_count: 0,
            delayat: None,
            corrupted_index: None,
        }
    }

    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    #[must_use]
    pub fn total_num_blocks(&self) -> u64 {
        self.blocks.len() as u64
    }

    /// `set_delayat` configures the "sleep every Nth request" hook.
    pub fn set_delayat(&mut self, n: Option<u64>) {
        self.delayat = n;
    }

    /// `set_corrupted_index` marks a physical index as always-corrupted.
    pub fn set_corrupted_index(&mut self, index: Option<u64>) {
        self.corrupted_index = index;
    }

    /// `should_sleep` reports whether the caller should apply the
    /// `delayat` sleep hook for the request just counted. Bumps the request
    /// counter as a side effect, matching the spec's "every request" framing.
    pub fn should_sleep(&mut self) -> bool {
        self.request_count += 1;
        match self.delayat {
            Some(n) if n > 0 => self.request_count.is_multiple_of(n),
            _ => false,
        }
    }

    /// `get` returns the block at physical index `s`, or a corrupted-block
    /// outcome if `s` is the injected-corrupt index or its checksum no
    /// longer matches its contents.
    ///
    /// # Errors
    /// Returns an error if `s` is out of range.
    pub fn get(&self, s: u64) -> anyhow::Result<GetOutcome> {
        let idx = self.check_range(s)?;

        if self.corrupted_index == Some(s) {
            return Ok(GetOutcome::Corrupted(s));
        }

        let block = &self.blocks[idx];
        if checksum(block) != self.checksums[idx] {
            return Ok(GetOutcome::Corrupted(s));
        }

        Ok(GetOutcome::Block(block.clone()))
    }

    /// `put` stores `data` at physical index `s` and recomputes its checksum.
    ///
    /// # Errors
    /// Returns an error if `s` is out of range or `data` is not exactly
    /// `block_size` bytes.
    pub fn put(&mut self, s: u64, data: &[u8]) -> anyhow::Result<()> {
        let idx = self.check_range(s)?;
        anyhow::ensure!(
            data.len() == self.block_size,
            "put to block {s}: expected {} bytes, got {}",
            self.block_size,
            data.len()
        );

        self.blocks[idx].copy_from_slice(data);
        self.checksums[idx] = checksum(&self.blocks[idx]);
        Ok(())
    }

    /// `rsm` (read-and-set-memory) returns the current block at `s` and
    /// resets it to the all-`0x01` pattern. Legacy; retained for wire
    /// compatibility only -- no client code path in this repository calls it.
    ///
    /// # Errors
    /// Returns an error if `s` is out of range.
    pub fn rsm(&mut self, s: u64) -> anyhow::Result<Vec<u8>> {
        let idx = self.check_range(s)?;
        let previous = self.blocks[idx].clone();
        self.blocks[idx] = vec![0x01u8; self.block_size];
        self.checksums[idx] = checksum(&self.blocks[idx]);
        Ok(previous)
    }

    /// `get_block_as_block` is a convenience wrapper returning a [`Block`]
    /// rather than raw bytes, used by in-process test harnesses that
    /// exercise the client against this state directly (no RPC).
    ///
    /// # Errors
    /// Returns an error if `s` is out of range.
    pub fn get_block(&self, s: u64) -> anyhow::Result<Result<Block, u64>> {
        Ok(match self.get(s)? {
            GetOutcome::Block(bytes) => Ok(Block::from_vec(bytes)),
            GetOutcome::Corrupted(idx) => Err(idx),
        })
    }

    fn check_range(&self, s: u64) -> anyhow::Result<usize> {
        let idx = usize::try_from(s).map_err(|_| anyhow::anyhow!("block index {s} overflows usize"))?;
        anyhow::ensure!(
            idx < self.blocks.len(),
            "block index {s} out of range (0..{})",
            self.blocks.len()
        );
        Ok(idx)
    }
}

fn checksum(data: &[u8]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(data);
    hasher.finalize().into()
}
