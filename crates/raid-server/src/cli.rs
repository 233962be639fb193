//! Command-line surface for the `raid-server` binary, per the external
//! interfaces section: `--nb --bs --port [--delayat] [--cblk]`.

use clap::Parser;

/// `ServerArgs` configures one physical block-server process.
#[derive(Parser, Clone, Debug)]
#[command(name = "raid-server", about = "One physical member of a RAID-5 stripe group")]
pub struct ServerArgs {
    /// Total number of physical blocks this server holds.
    #[arg(long = "nb", env = "RAID_SERVER_NB")]
    pub total_num_blocks: u64,

    /// Size, in bytes, of every block.
    #[arg(long = "bs", env = "RAID_SERVER_BS")]
    pub block_size: usize,

    /// TCP port to listen on (bound to `127.0.0.1`).
    #[arg(long = "port", env = "RAID_SERVER_PORT")]
    pub port: u16,

    /// If set, sleep one second every Nth request (fault-injection hook for
    /// exercising client-side timeout handling).
    #[arg(long = "delayat", env = "RAID_SERVER_DELAYAT")]
    pub delayat: Option<u64>,

    /// If set, this physical block index always reports as corrupted
    /// (fault-injection hook for exercising client-side reconstruction).
    #[arg(long = "cblk", env = "RAID_SERVER_CBLK")]
    pub corrupted_block: Option<u64>,
}

#[cfg(test)]
mod cli_tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        ServerArgs::command().debug_assert();
    }

    #[test]
    fn parses_required_and_optional_flags() {
        let args = ServerArgs::parse_from([
            "raid-server",
            "--nb",
            "1024",
            "--bs",
            "128",
            "--port",
            "9000",
            "--delayat",
            "50",
        ]);
        assert_eq!(args.total_num_blocks, 1024);
        assert_eq!(args.block_size, 128);
        assert_eq!(args.port, 9000);
        assert_eq!(args.delayat, Some(50));
        assert_eq!(args.corrupted_block, None);
    }
}
