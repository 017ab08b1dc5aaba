use futures_util::{SinkExt, StreamExt};
use sensor_relay::config::RelayConfig;
use sensor_relay::dashboard::ChartId;
use sensor_relay::domain::CONNECTION_ESTABLISHED;
use sensor_relay::server::{self, AppState, ACK};
use sensor_relay::{client, Relay};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_relay() -> (SocketAddr, Relay) {
    let listener = server::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let mut config = RelayConfig::default();
    config.server.static_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("public");

    let relay = Relay::new();
    let state = AppState::new(relay.clone(), &config);
    tokio::spawn(server::serve(listener, state, std::future::pending()));
    (addr, relay)
}

async fn connect(addr: SocketAddr, path: &str) -> Ws {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{}{}", addr, path))
        .await
        .expect("websocket connect");
    ws
}

async fn next_text(ws: &mut Ws) -> String {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("frame within timeout")
            .expect("stream open")
            .expect("frame ok");
        if let Message::Text(text) = msg {
            return text;
        }
    }
}

async fn post(addr: SocketAddr, body: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{}/receive-data", addr))
        .header("content-type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .expect("post")
}

async fn wait_for_clients(relay: &Relay, n: usize) {
    for _ in 0..200 {
        if relay.connected() == n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {} clients, have {}", n, relay.connected());
}

#[tokio::test]
async fn reading_arrives_unmodified_after_notice() {
    let (addr, _relay) = start_relay().await;
    let mut ws = connect(addr, "/").await;

    let notice: serde_json::Value = serde_json::from_str(&next_text(&mut ws).await).unwrap();
    assert_eq!(notice, serde_json::json!({ "message": CONNECTION_ESTABLISHED }));

    let body = r#"{"accelerometer":{"ax":1,"ay":2,"az":3}}"#;
    let resp = post(addr, body).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), ACK);

    assert_eq!(next_text(&mut ws).await, body);
}

#[tokio::test]
async fn every_open_client_gets_one_identical_copy() {
    let (addr, relay) = start_relay().await;
    let mut clients = Vec::new();
    for path in ["/", "/ws", "/"] {
        let mut ws = connect(addr, path).await;
        next_text(&mut ws).await;
        clients.push(ws);
    }
    wait_for_clients(&relay, 3).await;

    let body = r#"{"metallicPresence":0.42,"ultrasonic":{"distance":2.5}}"#;
    assert_eq!(post(addr, body).await.status(), 200);
    let second = r#"{"magnetometer":{"mx":1,"my":2,"mz":3}}"#;
    assert_eq!(post(addr, second).await.status(), 200);

    for ws in clients.iter_mut() {
        assert_eq!(next_text(ws).await, body);
        assert_eq!(next_text(ws).await, second);
    }

    let status: serde_json::Value = reqwest::get(format!("http://{}/api/status", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["connected_clients"], 3);
    assert_eq!(status["broadcasts"], 2);
}

#[tokio::test]
async fn closed_client_leaves_the_set_and_others_still_receive() {
    let (addr, relay) = start_relay().await;
    let mut stays = connect(addr, "/").await;
    let mut leaves = connect(addr, "/").await;
    next_text(&mut stays).await;
    next_text(&mut leaves).await;
    wait_for_clients(&relay, 2).await;

    leaves.send(Message::Close(None)).await.unwrap();
    drop(leaves);
    wait_for_clients(&relay, 1).await;

    let body = r#"{"ultrasonic":{"distance":1.2}}"#;
    assert_eq!(post(addr, body).await.status(), 200);
    assert_eq!(next_text(&mut stays).await, body);
}

#[tokio::test]
async fn ack_without_any_client() {
    let (addr, relay) = start_relay().await;
    let resp = post(addr, r#"{"ultrasonic":{"distance":3}}"#).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), ACK);
    assert_eq!(relay.broadcasts(), 1);
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let (addr, relay) = start_relay().await;
    let resp = post(addr, "{not json").await;
    assert!(resp.status().is_client_error());
    assert_eq!(relay.broadcasts(), 0);
}

#[tokio::test]
async fn dashboard_files_and_layout_are_served() {
    let (addr, _relay) = start_relay().await;

    let index = reqwest::get(format!("http://{}/", addr)).await.unwrap();
    assert_eq!(index.status(), 200);
    assert!(index.text().await.unwrap().contains("uvSensorChart"));

    let script = reqwest::get(format!("http://{}/script.js", addr)).await.unwrap();
    assert_eq!(script.status(), 200);

    let layout: serde_json::Value = reqwest::get(format!("http://{}/api/charts", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(layout["charts"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn terminal_dashboard_charts_what_the_relay_sends() {
    let (addr, relay) = start_relay().await;

    let mut config = RelayConfig::default().dashboard;
    config.origin = format!("http://{}", addr);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let session = tokio::spawn(async move {
        client::run(&config, async {
            let _ = stop_rx.await;
        })
        .await
    });

    wait_for_clients(&relay, 1).await;
    post(addr, r#"{"ultrasonic":{"distance":2.5}}"#).await;
    post(addr, r#"{"accelerometer":{"ax":0.1,"ay":0.2,"az":9.8}}"#).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    stop_tx.send(()).unwrap();

    let dashboard = session.await.unwrap().expect("session ok");
    assert_eq!(dashboard.chart(ChartId::Ultrasonic).series[0].points[0].y, Some(2.5));
    assert_eq!(dashboard.chart(ChartId::Accelerometer).len(), 1);
    assert!(dashboard.chart(ChartId::MetallicPresence).is_empty());
    assert!(dashboard.alert().message().unwrap().contains("2.50 meters"));
}
