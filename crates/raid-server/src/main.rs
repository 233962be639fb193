use anyhow::Result;
use clap::Parser;

mod cli;
mod service;

use cli::ServerArgs;
use raid_proto::block::block_server_server::BlockServerServer;
use raid_rs::server::BlockServerState;
use service::BlockServerService;
use tonic::transport::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();
    let args = ServerArgs::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(args))
}

fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();
}

async fn run(args: ServerArgs) -> Result<()> {
    let mut state = BlockServerState::new(args.total_num_blocks, args.block_size);
    state.set_delayat(args.delayat);
    state.set_corrupted_index(args.corrupted_block);

    let addr = format!("127.0.0.1:{}", args.port).parse()?;
    info!(
        total_num_blocks = args.total_num_blocks,
        block_size = args.block_size,
        port = args.port,
        "block server listening"
    );

    Server::builder()
        .add_service(BlockServerServer::new(BlockServerService::new(state)))
        .serve_with_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
