use super::*;
use std::collections::HashSet;

#[test]
fn scenario_from_spec_n4() {
    // N=4, D=3, BLOCK_SIZE=128 walkthrough from the spec.
    let m0 = mapping(0, 4);
    assert_eq!(m0, Mapping { data_server: 1, stripe_index: 0, parity_server: 0 });

    let m3 = mapping(3, 4);
    assert_eq!(m3, Mapping { data_server: 0, stripe_index: 1, parity_server: 1 });

    let m7 = mapping(7, 4);
    assert_eq!(m7, Mapping { data_server: 2, stripe_index: 2, parity_server: 2 });
}

#[test]
fn data_server_never_equals_parity_server() {
    for n in 3..8 {
        for b in 0..200u64 {
            let m = mapping(b, n);
            assert_ne!(m.data_server, m.parity_server, "n={n} b={b}");
            assert!(m.data_server < n);
            assert!(m.parity_server < n);
        }
    }
}

#[test]
fn parity_rotates_by_stripe_index_modulo_n() {
    for n in 3..8 {
        for stripe in 0..20u64 {
            assert_eq!(parity_server_for_stripe(stripe, n), (stripe % n as u64) as usize);
        }
    }
}

#[test]
fn mapping_is_a_bijection_onto_non_parity_positions_per_stripe() {
    for n in 3..7usize {
        let d = n - 1;
        // Enough logical blocks to fully populate several stripes.
        let total_blocks = d as u64 * 5;

        for stripe in 0..5u64 {
            let parity = parity_server_for_stripe(stripe, n);
            let mut seen = HashSet::new();
            for b in 0..total_blocks {
                let m = mapping(b, n);
                if m.stripe_index != stripe {
                    continue;
                }
                assert!(seen.insert(m.data_server), "duplicate data server in stripe");
            }
            let expected: HashSet<usize> = (0..n).filter(|&i| i != parity).collect();
            assert_eq!(seen, expected);
        }
    }
}

#[test]
fn logical_block_inverts_mapping() {
    for n in 3..7usize {
        for b in 0..100u64 {
            let m = mapping(b, n);
            let recovered = logical_block(m.data_server, m.stripe_index, m.parity_server, n);
            assert_eq!(recovered, b);
        }
    }
}

#[test]
#[should_panic(expected = "at least 2 servers")]
fn mapping_rejects_degenerate_server_counts() {
    let _ = mapping(0, 1);
}
