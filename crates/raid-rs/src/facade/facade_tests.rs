use super::*;
use crate::client::local::LocalProxy;
use crate::server::BlockServerState;

const N: usize = 4;
// Large enough to host a single inode record, since `dump_to_disk` now
// names the filesystem geometry computed over this device shape.
const BS: usize = 128;
const TOTAL: u64 = 12;

fn fresh_facade() -> Facade<LocalProxy> {
    let servers: Vec<LocalProxy> = (0..N)
        .map(|_| LocalProxy::new(BlockServerState::new(TOTAL / (N as u64 - 1) + 1, BS)))
        .collect();
    let config = ClientConfig {
        block_size: BS,
        total_num_blocks: TOTAL,
        no_of_servers: N,
        ..ClientConfig::default()
    };
    Facade::new(RaidClient::new(servers, config))
}

#[tokio::test]
async fn acquire_and_release_do_not_deadlock_a_single_client() {
    let facade = fresh_facade();
    facade.acquire().await;
    facade.release();
    facade.put(0, &[1u8; BS]).await.unwrap();
    assert_eq!(facade.get(0).await.unwrap(), vec![1u8; BS]);
}

#[tokio::test]
async fn dump_and_reload_round_trips_every_block() {
    let facade = fresh_facade();
    for b in 0..TOTAL {
        facade.put(b, &[b as u8; BS]).await.unwrap();
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("device.dump");
    facade.dump_to_disk(&path).await.unwrap();

    let restored = fresh_facade();
    restored.load_from_dump(&path).await.unwrap();
    for b in 0..TOTAL {
        assert_eq!(restored.get(b).await.unwrap(), vec![b as u8; BS]);
    }
}

#[tokio::test]
async fn verify_all_is_true_for_a_freshly_written_device() {
    let facade = fresh_facade();
    for b in 0..TOTAL {
        facade.put(b, &[7u8; BS]).await.unwrap();
    }
    assert!(facade.verify_all().await);
}
