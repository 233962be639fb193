//! Tonic service implementation wrapping [`raid_rs::server::BlockServerState`].
//!
//! Translates the transport-agnostic core into gRPC: `Ok(GetOutcome::Corrupted)`
//! becomes the `corrupted_index` oneof branch, `check_range` failures become
//! `Status::out_of_range`, and a bad `Put` length becomes `Status::invalid_argument`.

use std::sync::Mutex;
use std::time::Duration;

use raid_proto::block::block_server_server::BlockServer;
use raid_proto::block::get_response::Outcome;
use raid_proto::block::{GetRequest, GetResponse, PutRequest, PutResponse, RsmRequest, RsmResponse};
use raid_rs::server::{BlockServerState, GetOutcome};
use tonic::{Request, Response, Status};
use tracing::{info, warn};

pub struct BlockServerService {
    state: Mutex<BlockServerState>,
}

impl BlockServerService {
    #[must_use]
    pub fn new(state: BlockServerState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    async fn maybe_delay(&self) {
        let sleep = self.state.lock().unwrap().should_sleep();
        if sleep {
            warn!("delayat hook fired; sleeping 1s before responding");
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }
}

impl BlockServer for BlockServerService {
    async fn get(&self, request: Request<GetRequest>) -> Result<Response<GetResponse>, Status> {
        self.maybe_delay().await;
        let index = request.into_inner().index;

        let outcome = self
            .state
            .lock()
            .unwrap()
            .get(index)
            .map_err(|e| Status::out_of_range(e.to_string()))?;

        let outcome = match outcome {
            GetOutcome::Block(bytes) => Outcome::Block(bytes),
            GetOutcome::Corrupted(idx) => {
                warn!(block = idx, "reporting corrupted block");
                Outcome::CorruptedIndex(idx)
            }
        };
        Ok(Response::new(GetResponse { outcome: Some(outcome) }))
    }

    async fn put(&self, request: Request<PutRequest>) -> Result<Response<PutResponse>, Status> {
        self.maybe_delay().await;
        let req = request.into_inner();

        self.state
            .lock()
            .unwrap()
            .put(req.index, &req.data)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        Ok(Response::new(PutResponse { ok: true }))
    }

    async fn rsm(&self, request: Request<RsmRequest>) -> Result<Response<RsmResponse>, Status> {
        let index = request.into_inner().index;
        let previous_block = self
            .state
            .lock()
            .unwrap()
            .rsm(index)
            .map_err(|e| Status::out_of_range(e.to_string()))?;
        info!(block = index, "rsm reset block to 0x01 pattern");
        Ok(Response::new(RsmResponse { previous_block }))
    }

    async fn single_get(&self, request: Request<GetRequest>) -> Result<Response<GetResponse>, Status> {
        self.get(request).await
    }

    async fn single_put(&self, request: Request<PutRequest>) -> Result<Response<PutResponse>, Status> {
        self.put(request).await
    }
}
