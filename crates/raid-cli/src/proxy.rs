//! `RpcServerProxy`: the gRPC-backed [`raid_rs::client::ServerProxy`] used by
//! every real deployment. Connects lazily, matching the teacher's
//! `uds::connect_uds` "build a channel once, reuse it" pattern, but over a
//! plain TCP `tonic::transport::Endpoint` rather than a Unix socket.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use raid_proto::block::block_server_client::BlockServerClient;
use raid_proto::block::get_response::Outcome;
use raid_proto::block::{GetRequest, PutRequest};
use raid_rs::client::ServerProxy;
use raid_rs::server::GetOutcome;
use tokio::sync::Mutex;
use tonic::transport::{Channel, Endpoint};

/// `RpcServerProxy` owns a lazily-established `tonic` channel to one block
/// server. A connection failure (refused, timed out) surfaces as an `Err`
/// from `get`/`put`, which the client layer treats as that server failing.
///
/// Also carries a client-side "forced down" switch, independent of the real
/// connection: the interactive shell's `fail`/`unfail` commands flip this
/// without touching the process on the other end, so degraded-mode behavior
/// can be exercised against real servers without actually killing them.
pub struct RpcServerProxy {
    endpoint: Endpoint,
    channel: Mutex<Option<Channel>>,
    forced_down: Arc<AtomicBool>,
}

impl RpcServerProxy {
    /// `new` builds a proxy for `addr` (e.g. `"127.0.0.1:9000"`), applying
    /// `connect_timeout`/`rpc_timeout` to the underlying endpoint.
    ///
    /// # Errors
    /// Returns an error if `addr` cannot be parsed as a URI.
    pub fn new(addr: &str, connect_timeout: Duration, rpc_timeout: Duration) -> anyhow::Result<Self> {
        let endpoint = Endpoint::from_shared(format!("http://{addr}"))?
            .connect_timeout(connect_timeout)
            .timeout(rpc_timeout);
        Ok(Self {
            endpoint,
            channel: Mutex::new(None),
            forced_down: Arc::new(AtomicBool::new(false)),
        })
    }

    /// `down_handle` returns a shared switch the caller can flip to make
    /// every subsequent call to this proxy fail immediately, without
    /// touching the real connection.
    #[must_use]
    pub fn down_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.forced_down)
    }

    async fn client(&self) -> anyhow::Result<BlockServerClient<Channel>> {
        let mut guard = self.channel.lock().await;
        if guard.is_none() {
            *guard = Some(self.endpoint.connect().await?);
        }
        Ok(BlockServerClient::new(guard.clone().unwrap()))
    }

    /// Drops the cached channel so the next call re-dials, used after an RPC
    /// fails to avoid pinning a dead connection.
    async fn reset(&self) {
        *self.channel.lock().await = None;
    }
}

impl ServerProxy for RpcServerProxy {
    async fn get(&self, s: u64) -> anyhow::Result<GetOutcome> {
        if self.forced_down.load(Ordering::Relaxed) {
            anyhow::bail!("connection refused (forced down by operator)");
        }
        let mut client = self.client().await?;
        let response = client.get(GetRequest { index: s }).await;
        let response = match response {
            Ok(r) => r,
            Err(e) => {
                self.reset().await;
                anyhow::bail!("get({s}) failed: {e}");
            }
        };

        Ok(match response.into_inner().outcome {
            Some(Outcome::Block(bytes)) => GetOutcome::Block(bytes),
            Some(Outcome::CorruptedIndex(idx)) => GetOutcome::Corrupted(idx),
            None => anyhow::bail!("get({s}) returned no outcome"),
        })
    }

    async fn put(&self, s: u64, data: &[u8]) -> anyhow::Result<()> {
        if self.forced_down.load(Ordering::Relaxed) {
            anyhow::bail!("connection refused (forced down by operator)");
        }
        let mut client = self.client().await?;
        let response = client
            .put(PutRequest { index: s, data: data.to_vec() })
            .await;
        match response {
            Ok(r) if r.into_inner().ok => Ok(()),
            Ok(_) => anyhow::bail!("put({s}) rejected by server"),
            Err(e) => {
                self.reset().await;
                anyhow::bail!("put({s}) failed: {e}")
            }
        }
    }
}
