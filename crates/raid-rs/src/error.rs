//! Explicit failure values for the block layer, replacing exception-style
//! control flow: callers pattern-match on `RaidError` instead of catching.

use thiserror::Error;

/// RaidError enumerates every way a block-layer operation can fail, per the
/// error taxonomy in the design: each variant is a *behavioral* kind, not a
/// wrapper around a transport type.
#[derive(Debug, Error)]
pub enum RaidError {
    /// A logical block number fell outside `[0, TOTAL_NUM_BLOCKS)`.
    #[error("block {block} out of range (0..{total})")]
    OutOfRange { block: u64, total: u64 },

    /// Two servers in the same stripe are unavailable (dead or corrupted) at
    /// once; outside the single-fault model, so the operation is refused
    /// rather than guessed at.
    #[error("stripe {stripe} has two simultaneous failures (servers {a} and {b}); cannot recover")]
    DoubleFault { stripe: u64, a: usize, b: usize },

    /// Both the data and parity server for this block are already marked
    /// failed; the write cannot be represented without data loss.
    #[error("block {block}: both data server {data_server} and parity server {parity_server} are failed")]
    BothServersFailed {
        block: u64,
        data_server: usize,
        parity_server: usize,
    },

    /// `repair` could not rebuild a stripe because a surviving peer was
    /// itself unavailable or corrupted during reconstruction.
    #[error("repair of server {server} failed at stripe {stripe}: peer {peer} unavailable")]
    RepairFailed {
        server: usize,
        stripe: u64,
        peer: usize,
    },

    /// A dump file's geometry header does not match the live device.
    #[error("dump header mismatch: expected {expected}, found {found}")]
    DumpHeaderMismatch { expected: String, found: String },

    /// A dump file was truncated or otherwise malformed.
    #[error("dump file malformed: {0}")]
    MalformedDump(String),

    /// Transport-level failure talking to a specific server (connection
    /// refused, RPC timeout, or any other network error).
    #[error("server {server} unreachable: {source}")]
    ServerUnreachable {
        server: usize,
        #[source]
        source: anyhow::Error,
    },
}

/// Result alias used throughout the block layer.
pub type Result<T> = std::result::Result<T, RaidError>;
