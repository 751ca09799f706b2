//! End-to-end tests over a real `WebSocket`.
//!
//! Each test binds the router to an ephemeral port and talks to it with a
//! `tokio-tungstenite` client.

#![allow(clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use kitty_core::KittyConfig;
use kitty_core::actions::handlers::MSG_SOMEONE_ELSE_PETTING;
use kitty_server::{AppState, build_router};
use kitty_types::{PetEvent, PetState, ServerMessage};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

async fn spawn_server(config: &KittyConfig) -> (SocketAddr, Arc<AppState>) {
    let state = Arc::new(AppState::new(config).unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = build_router(Arc::clone(&state));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (addr, state)
}

async fn connect(addr: SocketAddr, path: &str) -> Client {
    let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}{path}"))
        .await
        .unwrap();
    client
}

/// Next text frame, parsed. `None` once the server closes.
async fn next_frame(client: &mut Client) -> Option<ServerMessage> {
    loop {
        let msg = tokio::time::timeout(WAIT, client.next()).await.unwrap()?;
        match msg {
            Ok(Message::Text(text)) => return Some(serde_json::from_str(text.as_str()).unwrap()),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

async fn send_action(client: &mut Client, action: &str, username: &str) {
    let frame = serde_json::json!({ "action": action, "username": username }).to_string();
    client.send(Message::text(frame)).await.unwrap();
}

#[tokio::test]
async fn join_gets_state_init_then_live_changes() {
    let (addr, _state) = spawn_server(&KittyConfig::default()).await;

    let mut alice = connect(addr, "/kitty-game-server").await;
    assert_eq!(
        next_frame(&mut alice).await,
        Some(ServerMessage::StateInit {
            state: PetState::Vibing,
            events: vec![],
        })
    );

    let mut bob = connect(addr, "/kitty-game-server/").await;
    let _init = next_frame(&mut bob).await;

    send_action(&mut alice, "PET", "alice").await;
    let expected = Some(ServerMessage::StateChange {
        state: PetState::BeingPet,
        username: "alice".to_owned(),
    });
    assert_eq!(next_frame(&mut alice).await, expected);
    assert_eq!(next_frame(&mut bob).await, expected);

    send_action(&mut bob, "PET", "bob").await;
    let rejection = Some(ServerMessage::Message {
        message: MSG_SOMEONE_ELSE_PETTING.to_owned(),
    });
    assert_eq!(next_frame(&mut alice).await, rejection);
    assert_eq!(next_frame(&mut bob).await, rejection);

    let mut carol = connect(addr, "/kitty-game-server").await;
    assert_eq!(
        next_frame(&mut carol).await,
        Some(ServerMessage::StateInit {
            state: PetState::BeingPet,
            events: vec![PetEvent::new(PetState::BeingPet, "alice")],
        })
    );
}

#[tokio::test]
async fn bad_frames_are_dropped_and_connection_survives() {
    let (addr, state) = spawn_server(&KittyConfig::default()).await;
    let mut client = connect(addr, "/kitty-game-server").await;
    let _init = next_frame(&mut client).await;

    client.send(Message::text("{not json")).await.unwrap();
    send_action(&mut client, "FEED", "zed").await;
    send_action(&mut client, "PET", "").await;
    client.send(Message::binary(vec![1_u8, 2, 3])).await.unwrap();

    send_action(&mut client, "PUT_TO_SLEEP", "zed").await;
    assert_eq!(
        next_frame(&mut client).await,
        Some(ServerMessage::StateChange {
            state: PetState::Sleeping,
            username: "zed".to_owned(),
        })
    );
    assert_eq!(state.machine.last_five_events().len(), 1);
}

#[tokio::test]
async fn silent_client_is_closed_after_missed_ping() {
    let mut config = KittyConfig::default();
    config.liveness.ping_interval_secs = 1;
    let (addr, state) = spawn_server(&config).await;

    let mut client = connect(addr, "/kitty-game-server").await;
    let _init = next_frame(&mut client).await;
    assert_eq!(state.connection_count(), 1);

    assert_eq!(next_frame(&mut client).await, Some(ServerMessage::Ping));
    assert_eq!(next_frame(&mut client).await, None);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(state.connection_count(), 0);
}

#[tokio::test]
async fn pong_keeps_the_connection_alive() {
    let mut config = KittyConfig::default();
    config.liveness.ping_interval_secs = 1;
    let (addr, _state) = spawn_server(&config).await;

    let mut client = connect(addr, "/kitty-game-server").await;
    let _init = next_frame(&mut client).await;

    for _ in 0..3 {
        assert_eq!(next_frame(&mut client).await, Some(ServerMessage::Ping));
        send_action(&mut client, "PONG", "alice").await;
    }
}
