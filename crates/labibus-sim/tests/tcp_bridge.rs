//! Master and node talking over the TCP UART bridge.

use std::net::SocketAddr;
use std::time::Duration;

use labibus_codec::RequestKind;
use labibus_master::{encode_request, Reply};
use labibus_sim::{load_config_from_str, BusClient, SimError, SimNode, UartBridge};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

const REPLY_WAIT: Duration = Duration::from_secs(2);
const SILENCE_WAIT: Duration = Duration::from_millis(200);

const NODE: &str = "\
name: bridge
devices:
  - id: 9
    poll_interval: 10
    description: Temperature room 2
    unit: degree C
  - id: 10
    poll_interval: 30
    description: Pressure
    unit: hPa
    value: 1013.25
";

async fn start() -> (SimNode, SocketAddr) {
    let config = load_config_from_str(NODE).unwrap();
    let node = SimNode::from_config(&config).unwrap();
    let bridge = UartBridge::bind("127.0.0.1:0", node.link()).await.unwrap();
    let addr = bridge.local_addr().unwrap();
    tokio::spawn(bridge.run());
    (node, addr)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_discover_over_tcp() {
    let (_node, addr) = start().await;
    let mut client = BusClient::connect(addr).await.unwrap();
    let reply = client.discover(9, REPLY_WAIT).await.unwrap();
    match reply {
        Some(Reply::Discovery(d)) => {
            assert_eq!(d.device_id, 9);
            assert_eq!(d.poll_interval, 10);
            assert_eq!(d.description, "Temperature room 2");
            assert_eq!(d.unit, "degree C");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_poll_over_tcp() {
    let (node, addr) = start().await;
    let mut client = BusClient::connect(addr).await.unwrap();

    // Nothing set yet for device 9.
    assert!(client.poll(9, SILENCE_WAIT).await.unwrap().is_none());

    node.slave().set_value(9, 23.5);
    match client.poll(9, REPLY_WAIT).await.unwrap() {
        Some(Reply::Poll(p)) => {
            assert_eq!(p.text, "23.500000");
            assert_eq!(p.value, 23.5);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(client.poll(9, SILENCE_WAIT).await.unwrap().is_none());

    match client.poll(10, REPLY_WAIT).await.unwrap() {
        Some(Reply::Poll(p)) => assert_eq!(p.text, "1013.250000"),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_device_over_tcp() {
    let (_node, addr) = start().await;
    let mut client = BusClient::connect(addr).await.unwrap();
    assert!(client.discover(0x7f, SILENCE_WAIT).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_corrupted_request_over_tcp() {
    let (_node, addr) = start().await;
    let mut raw = TcpStream::connect(addr).await.unwrap();
    let mut frame = encode_request(9, RequestKind::Discover);
    frame[6] = if frame[6] == b'f' { b'e' } else { b'f' };
    raw.write_all(&frame).await.unwrap();
    drop(raw);

    // A fresh client still gets answers after the bad frame.
    let mut client = BusClient::connect(addr).await.unwrap();
    assert!(client.discover(9, REPLY_WAIT).await.unwrap().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stopped_node_closes_connection() {
    let (node, addr) = start().await;
    let mut client = BusClient::connect(addr).await.unwrap();
    assert!(client.discover(9, REPLY_WAIT).await.unwrap().is_some());

    node.shutdown().unwrap();
    let result = client.discover(9, REPLY_WAIT).await;
    assert!(matches!(result, Err(SimError::Io(_))));
}
