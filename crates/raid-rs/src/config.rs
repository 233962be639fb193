//! Client and server configuration constants, read at startup.
//!
//! These are plain data structs rather than `clap::Args` themselves so that
//! `raid-rs` does not have to depend on `clap`; the CLI binaries (`raid-cli`,
//! `raid-server`) derive their own argument structs and convert into these.

/// `ClientConfig` bundles the constants a RAID-5 client needs to talk to its
/// stripe group, mirroring the spec's §6 "Client configuration" list.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Size, in bytes, of every logical and physical block.
    pub block_size: usize,
    /// Size of the logical address space, `[0, total_num_blocks)`.
    pub total_num_blocks: u64,
    /// Number of servers in the stripe group (`N`).
    pub no_of_servers: usize,
    /// Server `i` listens on `start_port + i`.
    pub start_port: u16,
    /// Host/IP all servers are reachable at (they differ only by port).
    pub server_address: String,
    /// RPC timeout applied to every server call.
    pub socket_timeout_ms: u64,
    /// Identifier for this client session (diagnostic only; the system is
    /// single-client, so this does not gate behavior).
    pub cid: u32,
    /// Upper bound on simultaneous clients the deployment is sized for
    /// (diagnostic only, carried over from the source configuration surface).
    pub max_clients: u32,
}

impl ClientConfig {
    /// `server_addr` returns the `host:port` string for server index `i`.
    ///
    /// # Panics
    /// Panics if `i >= no_of_servers`.
    #[must_use]
    pub fn server_addr(&self, i: usize) -> String {
        assert!(i < self.no_of_servers, "server index {i} out of range");
        let port = self.start_port as u32 + i as u32;
        format!("{}:{port}", self.server_address)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            block_size: 128,
            total_num_blocks: 1024,
            no_of_servers: 4,
            start_port: 9000,
            server_address: "127.0.0.1".to_string(),
            socket_timeout_ms: 5000,
            cid: 1,
            max_clients: 1,
        }
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn server_addr_adds_index_to_start_port() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.server_addr(0), "127.0.0.1:9000");
        assert_eq!(cfg.server_addr(3), "127.0.0.1:9003");
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn server_addr_rejects_out_of_range_index() {
        let cfg = ClientConfig::default();
        let _ = cfg.server_addr(cfg.no_of_servers);
    }
}
