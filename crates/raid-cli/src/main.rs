//! Entry point for `raid-cli`: the single client. Builds one `RpcServerProxy`
//! per server named in `ClientArgs`, wires them into a [`RaidClient`] and
//! [`Facade`], mounts (or formats) the inode filesystem on top, and hands
//! both to the interactive shell.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

mod cli;
mod proxy;
mod repl;

use cli::ClientArgs;
use proxy::RpcServerProxy;
use raid_rs::client::RaidClient;
use raid_rs::config::ClientConfig;
use raid_rs::facade::Facade;
use raid_rs::fs::FileSystem;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();
    let args = ClientArgs::parse();

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

async fn run(args: ClientArgs) -> Result<()> {
    let config: ClientConfig = args.into();
    let connect_timeout = Duration::from_millis(config.socket_timeout_ms);
    let rpc_timeout = Duration::from_millis(config.socket_timeout_ms);

    let mut servers = Vec::with_capacity(config.no_of_servers);
    for i in 0..config.no_of_servers {
        servers.push(RpcServerProxy::new(&config.server_addr(i), connect_timeout, rpc_timeout)?);
    }
    let down_handles = servers.iter().map(RpcServerProxy::down_handle).collect();

    info!(
        no_of_servers = config.no_of_servers,
        block_size = config.block_size,
        total_num_blocks = config.total_num_blocks,
        "raid-cli connecting to stripe group"
    );

    let client = RaidClient::new(servers, config.clone());
    let facade = Arc::new(Facade::new(client));

    let fs = match FileSystem::mount(Arc::clone(&facade), config.block_size, config.total_num_blocks).await {
        Ok(fs) => fs,
        Err(_) => {
            info!("no filesystem found on device, formatting a fresh one");
            FileSystem::format(Arc::clone(&facade), config.block_size, config.total_num_blocks).await?
        }
    };

    repl::run(facade, fs, down_handles).await
}
