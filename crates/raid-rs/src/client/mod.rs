//! RAID-5 client (C3): the heart of the system. Orchestrates reads,
//! parity-maintaining writes, degraded-mode operation, failed-server
//! tracking, consistency verification, and repair.
//!
//! Generic over [`ServerProxy`] rather than boxed trait objects: every real
//! server proxy in this repository is the same concrete gRPC type
//! (`raid-cli`'s `RpcServerProxy`), and tests substitute an in-process fake
//! of the same concrete type. This keeps the hot path free of dynamic
//! dispatch, the same way the stripe-layout code this crate grew out of
//! stays monomorphic over its layout type.

#[cfg(test)]
mod client_tests;
pub mod local;

use std::collections::HashSet;
use std::future::Future;

use crate::block::Block;
use crate::config::ClientConfig;
use crate::error::{RaidError, Result};
use crate::mapping::{self, Mapping};
use crate::metrics::{self, IoOpType, RaidOp, ServerEvent};
use crate::server::GetOutcome;
use tracing::{info, warn};

/// ServerProxy abstracts one RPC connection to a single block server.
/// Implementors translate transport-level failures into `Err`, and
/// server-detected corruption into `Ok(GetOutcome::Corrupted(_))` -- the two
/// are different failure kinds to the client (§7 of the design) and must
/// not be conflated.
pub trait ServerProxy: Send + Sync {
    /// `get` fetches the block at physical index `s`.
    ///
    /// # Errors
    /// Returns an error for transport failures (connection refused, RPC
    /// timeout). Corruption is *not* an error; it is `Ok(GetOutcome::Corrupted(_))`.
    fn get(&self, s: u64) -> impl Future<Output = anyhow::Result<GetOutcome>> + Send;

    /// `put` stores `data` (already padded to `BLOCK_SIZE`) at physical index `s`.
    ///
    /// # Errors
    /// Returns an error for transport failures.
    fn put(&self, s: u64, data: &[u8]) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// RaidClient is the stateful orchestrator described in §4.3: it owns the
/// proxy table and the fail-fast `failed_servers` memoization.
pub struct RaidClient<P: ServerProxy> {
    servers: Vec<P>,
    config: ClientConfig,
    failed_servers: HashSet<usize>,
}

impl<P: ServerProxy> RaidClient<P> {
    /// `new` builds a client from one proxy per server, in server-index order.
    ///
    /// # Panics
    /// Panics if `servers.len() != config.no_of_servers`.
    #[must_use]
    pub fn new(servers: Vec<P>, config: ClientConfig) -> Self {
        assert_eq!(
            servers.len(),
            config.no_of_servers,
            "proxy count must match NO_OF_SERVERS"
        );
        Self {
            servers,
            config,
            failed_servers: HashSet::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn failed_servers(&self) -> Vec<usize> {
        let mut v: Vec<usize> = self.failed_servers.iter().copied().collect();
        v.sort_unstable();
        v
    }

    fn mapping(&self, b: u64) -> Mapping {
        mapping::mapping(b, self.config.no_of_servers)
    }

    fn check_range(&self, b: u64) -> Result<()> {
        if b >= self.config.total_num_blocks {
            return Err(RaidError::OutOfRange {
                block: b,
                total: self.config.total_num_blocks,
            });
        }
        Ok(())
    }

    fn mark_failed(&mut self, server: usize) {
        if self.failed_servers.insert(server) {
            warn!(server, "server transitioned into failed_servers");
            metrics::record_server_event(ServerEvent::Disconnected { server });
        }
    }

    /// §4.3.1 `Get(B) -> bytes | failure`.
    ///
    /// # Errors
    /// Returns [`RaidError::OutOfRange`] or [`RaidError::DoubleFault`] per
    /// the spec's error taxonomy.
    pub async fn get(&mut self, b: u64) -> Result<Block> {
        self.check_range(b)?;
        let start = metrics::is_enabled().then(std::time::Instant::now);
        let m = self.mapping(b);

        let result = self.get_inner(b, &m).await;

        if let Some(start) = start {
            metrics::record_raid_op(RaidOp {
                op: IoOpType::Read,
                block: b,
                bytes: self.config.block_size as u64,
                latency_seconds: start.elapsed().as_secs_f64(),
                degraded: !self.failed_servers.is_empty(),
                error: result.is_err(),
            });
        }
        result
    }

    async fn get_inner(&mut self, b: u64, m: &Mapping) -> Result<Block> {
        if !self.failed_servers.contains(&m.data_server) {
            match self.servers[m.data_server].get(m.stripe_index).await {
                Ok(GetOutcome::Block(bytes)) => return Ok(Block::from_vec(bytes)),
                Ok(GetOutcome::Corrupted(_)) => {
                    println!("CORRUPTED_BLOCK {b}");
                    warn!(server = m.data_server, block = b, "corrupted block detected");
                    metrics::record_server_event(ServerEvent::CorruptedBlock {
                        server: m.data_server,
                        block: b,
                    });
                }
                Err(_) => {
                    self.mark_failed(m.data_server);
                    println!("SERVER_DISCONNECTED GET {b}");
                }
            }
        } else {
            println!("SERVER_DISCONNECTED GET {b}");
        }

        self.reconstruct(b, m).await
    }

    /// Reconstruction path: read parity plus every other peer, XOR them
    /// together. Any second failure in the same stripe is a hard error.
    async fn reconstruct(&mut self, b: u64, m: &Mapping) -> Result<Block> {
        let parity_bytes = match self.servers[m.parity_server].get(m.stripe_index).await {
            Ok(GetOutcome::Block(bytes)) => bytes,
            Ok(GetOutcome::Corrupted(_)) => {
                return Err(RaidError::DoubleFault {
                    stripe: m.stripe_index,
                    a: m.data_server,
                    b: m.parity_server,
                });
            }
            Err(_) => {
                self.mark_failed(m.parity_server);
                return Err(RaidError::DoubleFault {
                    stripe: m.stripe_index,
                    a: m.data_server,
                    b: m.parity_server,
                });
            }
        };

        let mut recovered = Block::from_vec(parity_bytes);

        for i in 0..self.config.no_of_servers {
            if i == m.data_server || i == m.parity_server {
                continue;
            }
            match self.servers[i].get(m.stripe_index).await {
                Ok(GetOutcome::Block(bytes)) => recovered.xor_in_place(&Block::from_vec(bytes)),
                Ok(GetOutcome::Corrupted(_)) => {
                    return Err(RaidError::DoubleFault {
                        stripe: m.stripe_index,
                        a: m.data_server,
                        b: i,
                    });
                }
                Err(_) => {
                    self.mark_failed(i);
                    return Err(RaidError::DoubleFault {
                        stripe: m.stripe_index,
                        a: m.data_server,
                        b: i,
                    });
                }
            }
        }

        let _ = b;
        Ok(recovered)
    }

    /// §4.3.2 `Put(B, data) -> ok | failure`.
    ///
    /// # Errors
    /// Returns [`RaidError::OutOfRange`] or [`RaidError::BothServersFailed`].
    pub async fn put(&mut self, b: u64, data: &[u8]) -> Result<()> {
        self.check_range(b)?;
        let start = metrics::is_enabled().then(std::time::Instant::now);
        let m = self.mapping(b);
        let padded = Block::from_padded(data, self.config.block_size);

        let result = self.put_inner(b, &m, &padded).await;

        if let Some(start) = start {
            metrics::record_raid_op(RaidOp {
                op: IoOpType::Write,
                block: b,
                bytes: data.len() as u64,
                latency_seconds: start.elapsed().as_secs_f64(),
                degraded: !self.failed_servers.is_empty(),
                error: result.is_err(),
            });
        }
        result
    }

    async fn put_inner(&mut self, b: u64, m: &Mapping, data: &Block) -> Result<()> {
        let d_failed = self.failed_servers.contains(&m.data_server);
        let p_failed = self.failed_servers.contains(&m.parity_server);

        if d_failed && p_failed {
            return Err(RaidError::BothServersFailed {
                block: b,
                data_server: m.data_server,
                parity_server: m.parity_server,
            });
        }

        if d_failed {
            println!("SERVER_DISCONNECTED PUT {b}");
            return self.put_degraded_data_down(b, m, data).await;
        }
        if p_failed {
            println!("SERVER_DISCONNECTED PUT {b}");
            return self.put_degraded_parity_down(m, data).await;
        }

        // Case A: both servers believed healthy; full read-modify-write.
        let old_parity = self.read_or_zero(m.parity_server, m.stripe_index).await;
        let old_parity = match old_parity {
            Ok(block) => block,
            Err(()) => {
                self.mark_failed(m.parity_server);
                println!("SERVER_DISCONNECTED PUT {b}");
                return self.put_degraded_parity_down(m, data).await;
            }
        };

        let old_data = self.read_or_zero(m.data_server, m.stripe_index).await;
        let old_data = match old_data {
            Ok(block) => block,
            Err(()) => {
                self.mark_failed(m.data_server);
                println!("SERVER_DISCONNECTED PUT {b}");
                return self.put_degraded_data_down(b, m, data).await;
            }
        };

        if self.servers[m.data_server]
            .put(m.stripe_index, data.as_bytes())
            .await
            .is_err()
        {
            self.mark_failed(m.data_server);
            println!("SERVER_DISCONNECTED PUT {b}");
            return self.put_degraded_data_down(b, m, data).await;
        }

        let mut new_parity = old_parity;
        new_parity.xor_in_place(&old_data);
        new_parity.xor_in_place(data);

        if self.servers[m.parity_server]
            .put(m.stripe_index, new_parity.as_bytes())
            .await
            .is_err()
        {
            // Data write already landed: report success per §4.3.2 and let
            // `repair`/`verify_consistency` rebuild the stale parity later.
            self.mark_failed(m.parity_server);
        }

        Ok(())
    }

    /// Case B: data server down, parity available. Recompute parity from
    /// scratch against every other data server.
    async fn put_degraded_data_down(&mut self, b: u64, m: &Mapping, data: &Block) -> Result<()> {
        let mut new_parity = data.clone();
        for i in 0..self.config.no_of_servers {
            if i == m.data_server || i == m.parity_server {
                continue;
            }
            match self.servers[i].get(m.stripe_index).await {
                Ok(GetOutcome::Block(bytes)) => new_parity.xor_in_place(&Block::from_vec(bytes)),
                Ok(GetOutcome::Corrupted(_)) | Err(_) => {
                    return Err(RaidError::DoubleFault {
                        stripe: m.stripe_index,
                        a: m.data_server,
                        b: i,
                    });
                }
            }
        }

        let _ = b;
        self.servers[m.parity_server]
            .put(m.stripe_index, new_parity.as_bytes())
            .await
            .map_err(|e| RaidError::ServerUnreachable {
                server: m.parity_server,
                source: e,
            })
    }

    /// Case C: parity server down, data available. Parity is knowingly left
    /// stale; `repair` restores it later.
    async fn put_degraded_parity_down(&mut self, m: &Mapping, data: &Block) -> Result<()> {
        self.servers[m.data_server]
            .put(m.stripe_index, data.as_bytes())
            .await
            .map_err(|e| RaidError::ServerUnreachable {
                server: m.data_server,
                source: e,
            })
    }

    /// Reads `server[i].get(stripe)`, treating corruption or transport
    /// failure the same way: "nothing to preserve" is not always correct
    /// (only true for Case A's old-value staging, per §4.3.2 step 1-2), so
    /// this is only used there. Returns `Err(())` on transport failure so
    /// the caller can downgrade to a degraded path; corruption is treated as
    /// zero in place, matching "treat as zero -- there is nothing to preserve".
    async fn read_or_zero(&self, server: usize, stripe: u64) -> std::result::Result<Block, ()> {
        match self.servers[server].get(stripe).await {
            Ok(GetOutcome::Block(bytes)) => Ok(Block::from_vec(bytes)),
            Ok(GetOutcome::Corrupted(_)) => Ok(Block::zero(self.config.block_size)),
            Err(_) => Err(()),
        }
    }

    /// §4.3.3 `verify_consistency(B)`: true iff this block's stripe's parity
    /// equals the XOR of all its data blocks.
    ///
    /// # Errors
    /// Returns [`RaidError::OutOfRange`] for an invalid `b`.
    pub async fn verify_consistency(&self, b: u64) -> Result<bool> {
        self.check_range(b)?;
        let m = self.mapping(b);
        Ok(self.verify_stripe(m.stripe_index, m.parity_server).await)
    }

    /// Whole-device variant of [`Self::verify_consistency`]: checks every
    /// unique `(stripe, parity_server)` pair once.
    #[must_use]
    pub async fn verify_all(&self) -> bool {
        let d = self.config.no_of_servers - 1;
        let stripes = self.config.total_num_blocks.div_ceil(d as u64);
        for s in 0..stripes {
            let p = mapping::parity_server_for_stripe(s, self.config.no_of_servers);
            if !self.verify_stripe(s, p).await {
                return false;
            }
        }
        true
    }

    async fn verify_stripe(&self, stripe: u64, parity_server: usize) -> bool {
        let mut computed = Block::zero(self.config.block_size);
        for i in mapping::data_servers_for_stripe(parity_server, self.config.no_of_servers) {
            match self.servers[i].get(stripe).await {
                Ok(GetOutcome::Block(bytes)) => computed.xor_in_place(&Block::from_vec(bytes)),
                Ok(GetOutcome::Corrupted(_)) | Err(_) => {}
            }
        }

        let parity = match self.servers[parity_server].get(stripe).await {
            Ok(GetOutcome::Block(bytes)) => Block::from_vec(bytes),
            Ok(GetOutcome::Corrupted(_)) | Err(_) => Block::zero(self.config.block_size),
        };

        computed == parity
    }

    /// §4.3.4 `repair(failed_server_id)`: offline rebuild of one server from
    /// its surviving peers, stripe by stripe. On success the server is
    /// removed from `failed_servers`.
    ///
    /// # Errors
    /// Returns [`RaidError::RepairFailed`] at the first stripe whose
    /// reconstruction requires an unavailable/corrupted peer; `failed_servers`
    /// still contains `server` in that case.
    pub async fn repair(&mut self, server: usize) -> Result<()> {
        assert!(server < self.config.no_of_servers, "server index out of range");

        let d = self.config.no_of_servers - 1;
        let stripes = self.config.total_num_blocks.div_ceil(d as u64);
        info!(server, stripes, "starting repair");

        for s in 0..stripes {
            let parity_server = mapping::parity_server_for_stripe(s, self.config.no_of_servers);
            let rebuilt = self.rebuild_stripe_member(s, server, parity_server).await;
            let rebuilt = match rebuilt {
                Ok(block) => block,
                Err(peer) => {
                    warn!(server, stripe = s, peer, "repair could not reconstruct stripe");
                    return Err(RaidError::RepairFailed {
                        server,
                        stripe: s,
                        peer,
                    });
                }
            };

            self.servers[server]
                .put(s, rebuilt.as_bytes())
                .await
                .map_err(|e| RaidError::ServerUnreachable { server, source: e })?;
        }

        if self.failed_servers.remove(&server) {
            info!(server, "repair completed, server rejoins the stripe group");
            metrics::record_server_event(ServerEvent::Repaired { server });
        }
        Ok(())
    }

    /// Rebuilds what `target`'s block at `stripe` should be, by XORing every
    /// other server in the stripe. Returns `Err(peer_index)` naming the first
    /// unavailable/corrupted peer encountered.
    async fn rebuild_stripe_member(
        &self,
        stripe: u64,
        target: usize,
        parity_server: usize,
    ) -> std::result::Result<Block, usize> {
        let mut acc = Block::zero(self.config.block_size);
        for i in 0..self.config.no_of_servers {
            if i == target {
                continue;
            }
            match self.servers[i].get(stripe).await {
                Ok(GetOutcome::Block(bytes)) => acc.xor_in_place(&Block::from_vec(bytes)),
                Ok(GetOutcome::Corrupted(_)) | Err(_) => return Err(i),
            }
        }
        let _ = parity_server;
        Ok(acc)
    }
}
