//! Stripe mapping (C2): a pure, stateless function from a logical block
//! number to the physical (data-server, stripe-index, parity-server) triple.
//!
//! Kept as a free function rather than a method on the RAID-5 client: it has
//! no state and is called from `Get`, `Put`, `repair`, and the consistency
//! verifier alike, and is unit-tested in isolation from all of them.

#[cfg(test)]
mod mapping_tests;

/// Mapping is the physical placement of one logical block within its stripe.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Mapping {
    /// Index, in `[0..n)`, of the server holding this block's data.
    pub data_server: usize,
    /// Physical block index on every server in the stripe.
    pub stripe_index: u64,
    /// Index, in `[0..n)`, of the server holding this stripe's parity.
    pub parity_server: usize,
}

/// `mapping` computes the physical placement of logical block `b` within a
/// stripe group of `n` servers.
///
/// # Panics
/// Panics if `n < 2` (a stripe needs at least one data server and one parity
/// server to mean anything).
#[must_use]
pub fn mapping(b: u64, n: usize) -> Mapping {
    assert!(n >= 2, "stripe group needs at least 2 servers, got {n}");
    let d = (n - 1) as u64;

    let stripe_index = b / d;
    let data_offset = (b % d) as usize;
    let parity_server = (stripe_index % n as u64) as usize;
    let data_server = data_server_at_offset(data_offset, parity_server, n);

    Mapping {
        data_server,
        stripe_index,
        parity_server,
    }
}

/// `parity_server_for_stripe` returns the parity-holding server for a given
/// physical stripe index, independent of any particular logical block.
#[must_use]
pub fn parity_server_for_stripe(stripe_index: u64, n: usize) -> usize {
    assert!(n >= 2, "stripe group needs at least 2 servers, got {n}");
    (stripe_index % n as u64) as usize
}

/// `data_servers_for_stripe` returns the ordered sequence of data-server
/// indices for a stripe whose parity lives on `parity_server`.
#[must_use]
pub fn data_servers_for_stripe(parity_server: usize, n: usize) -> Vec<usize> {
    (0..n).filter(|&i| i != parity_server).collect()
}

fn data_server_at_offset(data_offset: usize, parity_server: usize, n: usize) -> usize {
    data_servers_for_stripe(parity_server, n)[data_offset]
}

/// `logical_block` is the inverse of `mapping`: given a stripe's parity
/// server, a data-server index within that stripe, and the stripe index,
/// recover the logical block number. Used by tests to assert the mapping is
/// a genuine bijection.
#[must_use]
pub fn logical_block(data_server: usize, stripe_index: u64, parity_server: usize, n: usize) -> u64 {
    let d = (n - 1) as u64;
    let data_offset = data_servers_for_stripe(parity_server, n)
        .iter()
        .position(|&s| s == data_server)
        .expect("data_server must not equal parity_server");
    stripe_index * d + data_offset as u64
}
