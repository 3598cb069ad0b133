//! End-to-end delivery against a local TCP collector.

use std::{
    io::{BufRead, BufReader},
    net::TcpListener,
    sync::mpsc::{self, Receiver},
    thread,
    time::{Duration, Instant},
};

use logship::{
    Backend, Dispatcher, Level, ShipperConfig, ShippingClient, logship_data,
    shipper::{BackoffPolicy, ConnectionState},
};
use std::sync::Arc;

const WAIT: Duration = Duration::from_secs(5);

/// Accept connections on `listener` and forward every received line.
fn serve(listener: TcpListener) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { return };
            let tx = tx.clone();
            thread::spawn(move || {
                for line in BufReader::new(stream).lines() {
                    let Ok(line) = line else { return };
                    if tx.send(line).is_err() {
                        return;
                    }
                }
            });
        }
    });
    rx
}

fn collector() -> (u16, Receiver<String>) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind collector");
    let port = listener.local_addr().expect("collector address").port();
    (port, serve(listener))
}

fn fast_backoff() -> BackoffPolicy {
    BackoffPolicy {
        base: Duration::from_millis(20),
        cap: Duration::from_millis(200),
    }
}

fn receive(rx: &Receiver<String>, count: usize) -> Vec<String> {
    (0..count)
        .map(|_| rx.recv_timeout(WAIT).expect("line delivered"))
        .collect()
}

#[test]
fn delivers_records_in_enqueue_order() {
    let (port, rx) = collector();
    let client = ShippingClient::new(ShipperConfig::new("token").with_endpoint("127.0.0.1", port))
        .expect("collector reachable");
    assert_eq!(client.connection_state(), ConnectionState::Connected);

    for n in 0..200 {
        client.enqueue_line(&format!("line {n}")).expect("queue open");
    }
    assert!(client.start());
    assert!(client.flush(WAIT));

    let expected: Vec<_> = (0..200).map(|n| format!("token line {n}")).collect();
    assert_eq!(receive(&rx, 200), expected);
}

#[test]
fn concurrent_producers_keep_per_thread_order() {
    let (port, rx) = collector();
    let client = Arc::new(
        ShippingClient::new(
            ShipperConfig::new("t")
                .with_endpoint("127.0.0.1", port)
                .with_capacity(std::num::NonZeroUsize::new(8).expect("non-zero")),
        )
        .expect("collector reachable"),
    );
    client.start();

    let producers: Vec<_> = (0..4)
        .map(|id| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                for n in 0..50 {
                    client
                        .enqueue_line(&format!("{id}:{n}"))
                        .expect("queue open");
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().expect("producer thread");
    }
    assert!(client.flush(WAIT));

    let lines = receive(&rx, 200);
    for id in 0..4 {
        let seen: Vec<u32> = lines
            .iter()
            .filter_map(|l| l.strip_prefix(&format!("t {id}:")))
            .map(|n| n.parse().expect("sequence number"))
            .collect();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());
    }
}

#[test]
fn recovers_once_collector_becomes_reachable() {
    let port = TcpListener::bind(("127.0.0.1", 0))
        .and_then(|l| l.local_addr())
        .expect("reserve port")
        .port();
    let config = ShipperConfig::new("token")
        .with_endpoint("127.0.0.1", port)
        .with_backoff(fast_backoff());

    let err = ShippingClient::new(config).expect_err("nothing listens yet");
    let client = err.into_client();
    client.enqueue_line("buffered while offline").expect("queue open");
    client.start();

    thread::sleep(Duration::from_millis(100));
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);

    let listener = TcpListener::bind(("127.0.0.1", port)).expect("rebind reserved port");
    let rx = serve(listener);

    let deadline = Instant::now() + WAIT;
    while client.pending() > 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(client.pending(), 0);
    assert_eq!(receive(&rx, 1), ["token buffered while offline"]);
}

#[test]
fn shutdown_drains_before_stopping() {
    let (port, rx) = collector();
    let client = ShippingClient::new(ShipperConfig::new("token").with_endpoint("127.0.0.1", port))
        .expect("collector reachable");
    client.start();
    for n in 0..20 {
        client.enqueue_line(&format!("{n}")).expect("queue open");
    }
    assert!(client.shutdown(WAIT));
    assert!(!client.is_running());
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    assert_eq!(receive(&rx, 20).last().map(String::as_str), Some("token 19"));
}

#[test]
fn dispatcher_ships_structured_records() {
    let (port, rx) = collector();
    let client = ShippingClient::new(ShipperConfig::new("abc").with_endpoint("127.0.0.1", port))
        .expect("collector reachable");
    client.start();
    let client: Arc<dyn Backend> = Arc::new(client);
    let log = Dispatcher::new(Arc::clone(&client));

    logship_data!(log, Level::Warn, "test this method", "another" => "value");
    assert!(log.flush());

    let line = rx.recv_timeout(WAIT).expect("record delivered");
    assert!(line.starts_with(r#"abc type="warn" file="tests/shipping_tests.rs" method="shipping_tests""#));
    assert!(line.ends_with(r#"message="test this method" another="value""#));
}
