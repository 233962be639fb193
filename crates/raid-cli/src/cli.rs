//! Command-line surface for `raid-cli`, mirroring the constants the teacher's
//! `MetricsArgs` reads via `clap` derive + `env`: every geometry and
//! networking constant the client needs is settable by flag or environment
//! variable, so a shell script can drive many clients without repeating
//! `--block-size` everywhere.

use clap::Parser;
use raid_rs::config::ClientConfig;

#[derive(Parser, Clone, Debug)]
#[command(name = "raid-cli", about = "Interactive client for a RAID-5 stripe group")]
pub struct ClientArgs {
    /// Size, in bytes, of every logical and physical block.
    #[arg(long = "block-size", env = "BLOCK_SIZE", default_value_t = 128)]
    pub block_size: usize,

    /// Size of the logical address space, `[0, total_num_blocks)`.
    #[arg(long = "total-num-blocks", env = "TOTAL_NUM_BLOCKS", default_value_t = 1024)]
    pub total_num_blocks: u64,

    /// Number of servers in the stripe group.
    #[arg(long = "no-of-servers", env = "NO_OF_SERVERS", default_value_t = 4)]
    pub no_of_servers: usize,

    /// Server `i` listens on `start_port + i`.
    #[arg(long = "start-port", env = "STARTPORT", default_value_t = 9000)]
    pub start_port: u16,

    /// Host/IP all servers are reachable at.
    #[arg(long = "server-address", env = "SERVER_ADDRESS", default_value = "127.0.0.1")]
    pub server_address: String,

    /// RPC timeout applied to every server call, in milliseconds.
    #[arg(long = "socket-timeout", env = "SOCKET_TIMEOUT", default_value_t = 5000)]
    pub socket_timeout_ms: u64,

    /// Identifier for this client session (diagnostic only).
    #[arg(long = "cid", env = "CID", default_value_t = 1)]
    pub cid: u32,

    /// Upper bound on simultaneous clients the deployment is sized for.
    #[arg(long = "max-clients", env = "MAX_CLIENTS", default_value_t = 1)]
    pub max_clients: u32,
}

impl From<ClientArgs> for ClientConfig {
    fn from(args: ClientArgs) -> Self {
        Self {
            block_size: args.block_size,
            total_num_blocks: args.total_num_blocks,
            no_of_servers: args.no_of_servers,
            start_port: args.start_port,
            server_address: args.server_address,
            socket_timeout_ms: args.socket_timeout_ms,
            cid: args.cid,
            max_clients: args.max_clients,
        }
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        ClientArgs::command().debug_assert();
    }

    #[test]
    fn defaults_match_client_config_default() {
        let args = ClientArgs::parse_from(["raid-cli"]);
        let config: ClientConfig = args.into();
        let default = ClientConfig::default();
        assert_eq!(config.block_size, default.block_size);
        assert_eq!(config.total_num_blocks, default.total_num_blocks);
        assert_eq!(config.no_of_servers, default.no_of_servers);
    }

    #[test]
    fn overrides_are_applied() {
        let args = ClientArgs::parse_from(["raid-cli", "--no-of-servers", "6", "--start-port", "9100"]);
        assert_eq!(args.no_of_servers, 6);
        assert_eq!(args.start_port, 9100);
    }
}
