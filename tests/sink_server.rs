//! End-to-end tests against a sink on a loopback socket.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

mod common;

use common::{config, read_until_closed, start_sink, wait_until, ReadOutcome};

#[tokio::test]
async fn discards_input_and_never_replies() {
    let sink = start_sink(config(60_000, 20, 100)).await;
    let mut client = TcpStream::connect(sink.addr).await.unwrap();

    let chunk = vec![0xabu8; 8192];
    for _ in 0..32 {
        client.write_all(&chunk).await.unwrap();
    }
    client.write_all(b"GET / HTTP/1.1\r\nHost: sink\r\n\r\n").await.unwrap();

    let outcome = read_until_closed(&mut client, Duration::from_millis(400)).await;
    assert_eq!(outcome, ReadOutcome::Open { received: 0 });

    sink.shutdown.trigger();
    sink.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn closes_connection_after_lifetime() {
    let sink = start_sink(config(300, 20, 100)).await;
    let mut client = TcpStream::connect(sink.addr).await.unwrap();
    let start = Instant::now();
    client.write_all(b"hello").await.unwrap();

    let outcome = read_until_closed(&mut client, Duration::from_secs(5)).await;
    assert_eq!(outcome, ReadOutcome::Closed { received: 0 });
    assert!(start.elapsed() >= Duration::from_millis(250), "closed too early: {:?}", start.elapsed());

    assert!(wait_until(Duration::from_secs(1), || sink.hooks.released.load(Ordering::SeqCst) == 1).await);
    sink.shutdown.trigger();
    sink.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn activity_does_not_extend_lifetime() {
    let sink = start_sink(config(400, 20, 100)).await;
    let client = TcpStream::connect(sink.addr).await.unwrap();
    let (mut reader, mut writer) = client.into_split();
    let start = Instant::now();

    let chatter = tokio::spawn(async move {
        while writer.write_all(b"still here").await.is_ok() {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    });

    let outcome = read_until_closed(&mut reader, Duration::from_secs(5)).await;
    assert!(matches!(outcome, ReadOutcome::Closed { received: 0 }));
    assert!(start.elapsed() < Duration::from_secs(3), "lifetime was extended: {:?}", start.elapsed());

    chatter.abort();
    sink.shutdown.trigger();
    sink.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn peer_close_is_released_before_deadline() {
    let sink = start_sink(config(60_000, 20, 100)).await;

    let mut client = TcpStream::connect(sink.addr).await.unwrap();
    assert!(wait_until(Duration::from_secs(2), || sink.hooks.accepted.load(Ordering::SeqCst) == 1).await);
    client.write_all(b"bye").await.unwrap();
    drop(client);

    assert!(
        wait_until(Duration::from_secs(2), || sink.hooks.released.load(Ordering::SeqCst) == 1).await,
        "peer-closed connection was not released"
    );

    sink.shutdown.trigger();
    sink.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn connections_over_capacity_are_dropped() {
    let sink = start_sink(config(60_000, 20, 1)).await;

    let mut first = TcpStream::connect(sink.addr).await.unwrap();
    assert!(wait_until(Duration::from_secs(2), || sink.hooks.accepted.load(Ordering::SeqCst) == 1).await);

    let mut second = TcpStream::connect(sink.addr).await.unwrap();
    let outcome = read_until_closed(&mut second, Duration::from_secs(2)).await;
    assert_eq!(outcome, ReadOutcome::Closed { received: 0 });
    assert_eq!(sink.hooks.accepted.load(Ordering::SeqCst), 1);

    let outcome = read_until_closed(&mut first, Duration::from_millis(200)).await;
    assert_eq!(outcome, ReadOutcome::Open { received: 0 });

    sink.shutdown.trigger();
    sink.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_stops_loop_and_drops_connections() {
    let sink = start_sink(config(60_000, 20, 100)).await;
    let mut client = TcpStream::connect(sink.addr).await.unwrap();
    assert!(wait_until(Duration::from_secs(2), || sink.hooks.accepted.load(Ordering::SeqCst) == 1).await);

    sink.shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(2), sink.handle).await;
    assert!(matches!(result, Ok(Ok(Ok(())))));

    let outcome = read_until_closed(&mut client, Duration::from_secs(2)).await;
    assert_eq!(outcome, ReadOutcome::Closed { received: 0 });
}
