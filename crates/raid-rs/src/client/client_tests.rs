use super::local::LocalProxy;
use super::*;
use crate::server::BlockServerState;

const N: usize = 4;
const BS: usize = 8;
const TOTAL: u64 = 12;

fn fresh_client() -> RaidClient<LocalProxy> {
    let servers: Vec<LocalProxy> = (0..N)
        .map(|_| LocalProxy::new(BlockServerState::new(TOTAL / (N as u64 - 1) + 1, BS)))
        .collect();
    let config = ClientConfig {
        block_size: BS,
        total_num_blocks: TOTAL,
        no_of_servers: N,
        ..ClientConfig::default()
    };
    RaidClient::new(servers, config)
}

fn proxy(client: &RaidClient<LocalProxy>, i: usize) -> &LocalProxy {
    &client.servers[i]
}

#[tokio::test]
async fn put_then_get_round_trips_when_healthy() {
    let mut client = fresh_client();
    client.put(0, b"12345678").await.unwrap();
    let block = client.get(0).await.unwrap();
    assert_eq!(block.as_bytes(), b"12345678");
}

#[tokio::test]
async fn put_maintains_parity_readable_by_reconstruction() {
    let mut client = fresh_client();
    for b in 0..3u64 {
        let byte = b as u8 + 1;
        client.put(b, &[byte; BS]).await.unwrap();
    }

    let m = client.mapping(0);
    proxy(&client, m.data_server).set_down(true);
    client.failed_servers.insert(m.data_server);

    let recovered = client.get(0).await.unwrap();
    assert_eq!(recovered.as_bytes(), &[1u8; BS]);
}

#[tokio::test]
async fn get_marks_server_failed_on_first_disconnect() {
    let mut client = fresh_client();
    client.put(0, &[9u8; BS]).await.unwrap();
    client.put(1, &[8u8; BS]).await.unwrap();

    let m = client.mapping(0);
    proxy(&client, m.data_server).set_down(true);

    let recovered = client.get(0).await.unwrap();
    assert_eq!(recovered.as_bytes(), &[9u8; BS]);
    assert!(client.failed_servers().contains(&m.data_server));
}

#[tokio::test]
async fn double_fault_in_same_stripe_is_an_error() {
    let mut client = fresh_client();
    client.put(0, &[1u8; BS]).await.unwrap();

    let m = client.mapping(0);
    proxy(&client, m.data_server).set_down(true);
    proxy(&client, m.parity_server).set_down(true);
    client.failed_servers.insert(m.data_server);

    let err = client.get(0).await.unwrap_err();
    assert!(matches!(err, RaidError::DoubleFault { .. }));
}

#[tokio::test]
async fn put_case_b_recomputes_parity_when_data_server_down() {
    let mut client = fresh_client();
    client.put(0, &[1u8; BS]).await.unwrap();

    let m0 = client.mapping(0);
    proxy(&client, m0.data_server).set_down(true);
    client.failed_servers.insert(m0.data_server);

    client.put(1, &[2u8; BS]).await.unwrap();

    // Parity must now equal the XOR of every surviving (non-down) data block
    // in block 1's stripe, computed independently here.
    let m1 = client.mapping(1);
    let mut expected = Block::zero(BS);
    expected.xor_in_place(&Block::from_vec(vec![2u8; BS]));
    for i in 0..N {
        if i == m1.data_server || i == m1.parity_server || i == m0.data_server {
            continue;
        }
        if let GetOutcome::Block(bytes) = proxy(&client, i).get(m1.stripe_index).await.unwrap() {
            expected.xor_in_place(&Block::from_vec(bytes));
        }
    }

    let parity = match proxy(&client, m1.parity_server)
        .get(m1.stripe_index)
        .await
        .unwrap()
    {
        GetOutcome::Block(bytes) => Block::from_vec(bytes),
        GetOutcome::Corrupted(_) => panic!("parity should not be corrupted"),
    };
    assert_eq!(parity, expected);
}

#[tokio::test]
async fn put_case_c_writes_data_only_when_parity_server_down() {
    let mut client = fresh_client();
    client.put(0, &[1u8; BS]).await.unwrap();

    let m = client.mapping(0);
    proxy(&client, m.parity_server).set_down(true);
    client.failed_servers.insert(m.parity_server);

    client.put(0, &[7u8; BS]).await.unwrap();
    let block = client.get(0).await.unwrap();
    assert_eq!(block.as_bytes(), &[7u8; BS]);
}

#[tokio::test]
async fn put_fails_when_both_servers_in_stripe_are_failed() {
    let mut client = fresh_client();
    let m = client.mapping(0);
    client.failed_servers.insert(m.data_server);
    client.failed_servers.insert(m.parity_server);

    let err = client.put(0, &[1u8; BS]).await.unwrap_err();
    assert!(matches!(err, RaidError::BothServersFailed { .. }));
}

#[tokio::test]
async fn verify_consistency_detects_tampered_parity() {
    let mut client = fresh_client();
    client.put(0, &[1u8; BS]).await.unwrap();
    assert!(client.verify_consistency(0).await.unwrap());

    let m = client.mapping(0);
    proxy(&client, m.parity_server)
        .with_state(|s| s.put(m.stripe_index, &[0xffu8; BS]).unwrap());

    assert!(!client.verify_consistency(0).await.unwrap());
}

#[tokio::test]
async fn repair_rebuilds_a_failed_server_from_its_peers() {
    let mut client = fresh_client();
    for b in 0..3u64 {
        client.put(b, &[b as u8 + 1; BS]).await.unwrap();
    }

    let m = client.mapping(0);
    let before = match proxy(&client, m.data_server)
        .get(m.stripe_index)
        .await
        .unwrap()
    {
        GetOutcome::Block(bytes) => bytes,
        GetOutcome::Corrupted(_) => panic!("unexpected corruption"),
    };

    proxy(&client, m.data_server).with_state(|s| {
        s.put(m.stripe_index, &[0u8; BS]).unwrap();
    });
    client.failed_servers.insert(m.data_server);

    client.repair(m.data_server).await.unwrap();
    assert!(!client.failed_servers().contains(&m.data_server));

    let after = match proxy(&client, m.data_server)
        .get(m.stripe_index)
        .await
        .unwrap()
    {
        GetOutcome::Block(bytes) => bytes,
        GetOutcome::Corrupted(_) => panic!("unexpected corruption"),
    };
    assert_eq!(after, before);
}

#[tokio::test]
async fn get_reconstructs_around_a_corrupted_data_block() {
    let mut client = fresh_client();
    client.put(0, &[1u8; BS]).await.unwrap();
    client.put(1, &[2u8; BS]).await.unwrap();

    let m = client.mapping(0);
    proxy(&client, m.data_server).with_state(|s| s.set_corrupted_index(Some(m.stripe_index)));

    let recovered = client.get(0).await.unwrap();
    assert_eq!(recovered.as_bytes(), &[1u8; BS]);
}

#[tokio::test]
async fn repair_twice_is_equivalent_to_repair_once() {
    let mut client = fresh_client();
    for b in 0..3u64 {
        client.put(b, &[b as u8 + 1; BS]).await.unwrap();
    }

    let m = client.mapping(0);
    proxy(&client, m.data_server).with_state(|s| {
        s.put(m.stripe_index, &[0u8; BS]).unwrap();
    });
    client.failed_servers.insert(m.data_server);

    client.repair(m.data_server).await.unwrap();
    let after_first = match proxy(&client, m.data_server).get(m.stripe_index).await.unwrap() {
        GetOutcome::Block(bytes) => bytes,
        GetOutcome::Corrupted(_) => panic!("unexpected corruption"),
    };

    client.repair(m.data_server).await.unwrap();
    let after_second = match proxy(&client, m.data_server).get(m.stripe_index).await.unwrap() {
        GetOutcome::Block(bytes) => bytes,
        GetOutcome::Corrupted(_) => panic!("unexpected corruption"),
    };

    assert_eq!(after_first, after_second);
    assert!(!client.failed_servers().contains(&m.data_server));
}

#[tokio::test]
async fn out_of_range_block_is_rejected_before_touching_the_network() {
    let mut client = fresh_client();
    let err = client.get(TOTAL).await.unwrap_err();
    assert!(matches!(err, RaidError::OutOfRange { .. }));
    let err = client.put(TOTAL, &[0u8; BS]).await.unwrap_err();
    assert!(matches!(err, RaidError::OutOfRange { .. }));
}
