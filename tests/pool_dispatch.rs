//! Fan-out/fan-in dispatch across a pool of live servers

mod common;

use common::{spawn_server, test_server_config};
use drover_core::client::{ClientError, HandleId, PoolConfig, PoolError, ServerPool};
use drover_core::config::ClientConfig;
use drover_core::protocol::{ObjectId, ObjectSpec};
use serde_json::json;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

async fn spawn_farm(count: usize) -> Vec<SocketAddr> {
    let mut addrs = Vec::with_capacity(count);
    for _ in 0..count {
        let (addr, _server) = spawn_server(test_server_config()).await;
        addrs.push(addr);
    }
    addrs
}

/// Reserve three of five servers, fan an async call out to each, and collect
/// every result exactly once via wait_for_result
#[tokio::test]
async fn test_fan_out_fan_in_returns_each_handle_once() {
    let addrs = spawn_farm(5).await;
    let mut pool = ServerPool::connect(&addrs, &ClientConfig::default(), PoolConfig::default())
        .await
        .unwrap();

    assert_eq!(pool.available_count(), 5);
    let reservation = pool.reserve(3).unwrap();
    assert_eq!(pool.available_count(), 2);

    for id in &reservation {
        pool.handle_mut(*id)
            .unwrap()
            .new_object_async(&ObjectSpec::new("echo"))
            .await
            .unwrap();
    }

    let mut finished: HashSet<HandleId> = HashSet::new();
    for _ in 0..reservation.len() {
        let ready = pool
            .wait_for_result(Some(Duration::from_secs(5)))
            .await
            .unwrap();
        let object_id: ObjectId = pool.handle_mut(ready).unwrap().get_results().await.unwrap();
        assert_eq!(object_id, ObjectId(1));
        assert!(finished.insert(ready), "handle {ready:?} returned twice");
    }

    assert_eq!(
        finished,
        reservation.iter().copied().collect::<HashSet<_>>()
    );

    pool.release(&reservation);
    assert_eq!(pool.available_count(), 5);
    assert_eq!(pool.reserved_count(), 0);
}

/// Issuing a second asynchronous call before consuming the first fails fast
#[tokio::test]
async fn test_second_outstanding_call_is_a_desync_error() {
    let addrs = spawn_farm(1).await;
    let mut pool = ServerPool::connect(&addrs, &ClientConfig::default(), PoolConfig::default())
        .await
        .unwrap();

    let reservation = pool.reserve(1).unwrap();
    let handle = pool.handle_mut(reservation[0]).unwrap();

    handle.new_object_async(&ObjectSpec::new("counter")).await.unwrap();

    // contract violation: the first result has not been consumed
    match handle.call_method(ObjectId(1), "value", vec![]).await {
        Err(ClientError::Desync { .. }) => {}
        other => panic!("Expected desync error, got {other:?}"),
    }

    // the pending result is still intact and consumable
    let object_id: ObjectId = handle.get_results().await.unwrap();
    assert_eq!(object_id, ObjectId(1));

    // nothing pending anymore: get_results is now a contract violation too
    match handle.get_raw_results().await {
        Err(ClientError::Desync { .. }) => {}
        other => panic!("Expected desync error, got {other:?}"),
    }
}

/// wait_for_result times out when no reserved handle has anything pending
#[tokio::test]
async fn test_wait_for_result_timeout() {
    let addrs = spawn_farm(2).await;
    let mut pool = ServerPool::connect(&addrs, &ClientConfig::default(), PoolConfig::default())
        .await
        .unwrap();

    let _reservation = pool.reserve(2).unwrap();

    match pool.wait_for_result(Some(Duration::from_millis(50))).await {
        Err(PoolError::WaitTimeout) => {}
        other => panic!("Expected wait timeout, got {other:?}"),
    }
}

/// Waiting with nothing reserved is a caller error, not a hang
#[tokio::test]
async fn test_wait_for_result_requires_a_reservation() {
    let addrs = spawn_farm(1).await;
    let mut pool = ServerPool::connect(&addrs, &ClientConfig::default(), PoolConfig::default())
        .await
        .unwrap();

    match pool.wait_for_result(None).await {
        Err(PoolError::NoReservedHandles) => {}
        other => panic!("Expected NoReservedHandles, got {other:?}"),
    }
}

/// An already-arrived response is picked up without waiting out the timeout
#[tokio::test]
async fn test_buffered_result_is_immediate() {
    let addrs = spawn_farm(3).await;
    let mut pool = ServerPool::connect(&addrs, &ClientConfig::default(), PoolConfig::default())
        .await
        .unwrap();

    let reservation = pool.reserve(3).unwrap();
    let busy = reservation[1];

    pool.handle_mut(busy)
        .unwrap()
        .new_object_async(&ObjectSpec::new("running_stats"))
        .await
        .unwrap();

    // give the server time to answer so the response is sitting in the socket
    tokio::time::sleep(Duration::from_millis(100)).await;

    let ready = pool
        .wait_for_result(Some(Duration::from_secs(5)))
        .await
        .unwrap();
    assert_eq!(ready, busy);

    let _: ObjectId = pool.handle_mut(ready).unwrap().get_results().await.unwrap();
}

/// Results pipelined across several servers decode to per-server values
#[tokio::test]
async fn test_pipelined_computation_across_the_pool() {
    let addrs = spawn_farm(4).await;
    let mut pool = ServerPool::connect(&addrs, &ClientConfig::default(), PoolConfig::default())
        .await
        .unwrap();

    let reservation = pool.reserve(4).unwrap();

    // one counter per server, each started at a distinct value
    for (offset, id) in reservation.iter().enumerate() {
        let spec = ObjectSpec::new("counter").with_option("start", (offset as i64) * 10);
        let object_id = pool.handle_mut(*id).unwrap().new_object(&spec).await.unwrap();
        assert_eq!(object_id, ObjectId(1));
    }

    // fan out one increment per server
    for id in &reservation {
        pool.handle_mut(*id)
            .unwrap()
            .call_method(ObjectId(1), "increment", vec![json!(1)])
            .await
            .unwrap();
    }

    // fan in: every server answers its own start value + 1
    let mut values: Vec<i64> = Vec::new();
    for _ in 0..reservation.len() {
        let ready = pool
            .wait_for_result(Some(Duration::from_secs(5)))
            .await
            .unwrap();
        values.push(pool.handle_mut(ready).unwrap().get_results().await.unwrap());
    }

    values.sort_unstable();
    assert_eq!(values, vec![1, 11, 21, 31]);
}
