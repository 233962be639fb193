//! The client-facing façade (C4): `get`/`put`, the single-client
//! acquire/release handshake, and persistence to/from a dump file.
//!
//! This is the thin layer `raid-cli`'s REPL and the filesystem module call
//! into; it owns nothing the [`RaidClient`](crate::client::RaidClient)
//! doesn't already own, but gives the rest of the crate a single lock point
//! and a stable save/restore boundary.

#[cfg(test)]
mod facade_tests;

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::client::{RaidClient, ServerProxy};
use crate::dump;
use crate::error::Result;

/// `Facade` wraps a [`RaidClient`] behind a single uncontended lock. The
/// system is single-client by design (§4.4), so this mutex never actually
/// sees contention; it exists to give `acquire`/`release` real semantics
/// instead of being pure no-ops, and as the seam a multi-client deployment
/// would widen.
pub struct Facade<P: ServerProxy> {
    client: Arc<Mutex<RaidClient<P>>>,
    /// Holds the guard taken by `acquire` until the matching `release`.
    /// `std::sync::Mutex` here is fine: it only ever guards an `Option`
    /// swap, never an `.await` point.
    session: std::sync::Mutex<Option<OwnedMutexGuard<RaidClient<P>>>>,
}

impl<P: ServerProxy> Facade<P> {
    #[must_use]
    pub fn new(client: RaidClient<P>) -> Self {
        Self {
            client: Arc::new(Mutex::new(client)),
            session: std::sync::Mutex::new(None),
        }
    }

    /// `acquire` takes the session lock and holds it until `release`. A
    /// single-client deployment never contends on it; the call exists so the
    /// interactive session has an explicit handshake to log and to widen
    /// later into real multi-client arbitration.
    pub async fn acquire(&self) {
        let guard = Arc::clone(&self.client).lock_owned().await;
        *self.session.lock().unwrap() = Some(guard);
    }

    /// `release` is the inverse of `acquire`: it drops the held guard,
    /// letting subsequent `get`/`put` calls take the lock themselves again.
    pub fn release(&self) {
        self.session.lock().unwrap().take();
    }

    /// `get` reads logical block `b`.
    ///
    /// # Errors
    /// Propagates [`crate::error::RaidError`] from the underlying client.
    pub async fn get(&self, b: u64) -> Result<Vec<u8>> {
        let mut client = self.client.lock().await;
        client.get(b).await.map(crate::block::Block::into_bytes)
    }

    /// `put` writes `data` to logical block `b`.
    ///
    /// # Errors
    /// Propagates [`crate::error::RaidError`] from the underlying client.
    pub async fn put(&self, b: u64, data: &[u8]) -> Result<()> {
        let mut client = self.client.lock().await;
        client.put(b, data).await
    }

    /// `repair` rebuilds a failed server.
    ///
    /// # Errors
    /// Propagates [`crate::error::RaidError`] from the underlying client.
    pub async fn repair(&self, server: usize) -> Result<()> {
        let mut client = self.client.lock().await;
        client.repair(server).await
    }

    /// `verify_all` checks every stripe's parity for consistency.
    pub async fn verify_all(&self) -> bool {
        let client = self.client.lock().await;
        client.verify_all().await
    }

    /// `failed_servers` lists servers currently marked failed.
    pub async fn failed_servers(&self) -> Vec<usize> {
        let client = self.client.lock().await;
        client.failed_servers()
    }

    /// `dump_to_disk` serializes the live device's geometry and contents to
    /// `path`, reading every block through the façade's own `get`.
    ///
    /// # Errors
    /// Returns an error if any block read fails, or if writing `path` fails.
    pub async fn dump_to_disk(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let mut client = self.client.lock().await;
        let config = client.config().clone();
        let mut blocks = Vec::with_capacity(config.total_num_blocks as usize);
        for b in 0..config.total_num_blocks {
            blocks.push(client.get(b).await?.into_bytes());
        }
        dump::write_dump(path, &config, &blocks)
    }
}

impl Facade<crate::client::local::LocalProxy> {
    /// `load_from_dump` restores a loopback-tested device from a dump file
    /// previously produced by [`Self::dump_to_disk`], replaying every block
    /// through `put` so parity and checksums are regenerated rather than
    /// trusted from the file.
    ///
    /// # Errors
    /// Returns an error if the dump's geometry does not match this façade's
    /// live configuration, or if the file is malformed.
    pub async fn load_from_dump(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let config = { self.client.lock().await.config().clone() };
        let blocks = dump::read_dump(path, &config)?;
        for (b, data) in blocks.into_iter().enumerate() {
            self.put(b as u64, &data).await?;
        }
        Ok(())
    }
}
