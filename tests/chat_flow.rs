use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parlor::{
    config::Config,
    routes,
    sessions::MemorySessionStore,
    state::AppState,
    store::{ChatStore, MemoryStore},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

// Shared test context: a real server on an ephemeral port with in-memory stores
struct TestContext {
    client: reqwest::Client,
    base_url: String,
    ws_url: String,
    store: Arc<MemoryStore>,
}

impl TestContext {
    async fn start() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::with_stores(
            Config::default(),
            store.clone(),
            Arc::new(MemorySessionStore::new()),
        );
        let app = routes::build_router(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            client: Self::new_client(),
            base_url: format!("http://{}", addr),
            ws_url: format!("ws://{}/ws", addr),
            store,
        }
    }

    fn new_client() -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .unwrap()
    }

    async fn post(&self, client: &reqwest::Client, path: &str, body: Value) -> reqwest::Response {
        client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get(&self, client: &reqwest::Client, path: &str) -> reqwest::Response {
        client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap()
    }

    async fn connect(&self) -> Socket {
        let (socket, _) = connect_async(self.ws_url.as_str()).await.unwrap();
        socket
    }
}

async fn send_event(ws: &mut Socket, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data }).to_string();
    ws.send(Message::Text(frame.into())).await.unwrap();
}

async fn next_event(ws: &mut Socket) -> Value {
    loop {
        let frame = tokio::time::timeout(FRAME_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket closed")
            .expect("socket error");

        match frame {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}

/// Waits for the server to close the socket and returns the close code.
async fn expect_close(ws: &mut Socket) -> u16 {
    loop {
        let frame = tokio::time::timeout(FRAME_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for close");

        match frame {
            Some(Ok(Message::Close(Some(close)))) => return u16::from(close.code),
            Some(Ok(Message::Text(_) | Message::Ping(_) | Message::Pong(_))) => continue,
            other => panic!("expected a close frame, got {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_full_chat_scenario() {
        let context = TestContext::start().await;

        // Step 1: Register alice
        let reg_response = context
            .post(
                &context.client,
                "/register",
                json!({ "username": "alice", "password": "password1" }),
            )
            .await;
        assert_eq!(reg_response.status().as_u16(), 200, "Registration failed");
        let reg_body: Value = reg_response.json().await.unwrap();
        assert_eq!(reg_body["username"], "alice");
        assert_eq!(reg_body["userId"], 1);

        // Step 2: Wrong password from another browser
        let stranger = TestContext::new_client();
        let bad_login = context
            .post(
                &stranger,
                "/login",
                json!({ "username": "alice", "password": "wrong" }),
            )
            .await;
        assert_eq!(bad_login.status().as_u16(), 401);

        // Step 3: The registering browser holds a session
        let check: Value = context
            .get(&context.client, "/check-auth")
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(check["authenticated"], true);
        assert_eq!(check["username"], "alice");
        assert_eq!(check["userId"], 1);

        // Step 4: Tab A may not send before the handshake
        let mut tab_a = context.connect().await;
        send_event(&mut tab_a, "send_message", json!({ "message": "too early" })).await;
        let rejected = next_event(&mut tab_a).await;
        assert_eq!(rejected["event"], "error");
        assert_eq!(rejected["data"]["message"], "Not authenticated");

        send_event(
            &mut tab_a,
            "authenticate",
            json!({ "userId": 1, "username": "alice" }),
        )
        .await;
        let ack = next_event(&mut tab_a).await;
        assert_eq!(ack["event"], "authenticated");
        assert_eq!(ack["data"]["success"], true);

        // Step 5: An unauthenticated observer still receives broadcasts
        let mut observer = context.connect().await;
        // a reply proves the server has attached the observer
        send_event(&mut observer, "send_message", json!({ "message": "lurking" })).await;
        assert_eq!(next_event(&mut observer).await["event"], "error");

        send_event(&mut tab_a, "send_message", json!({ "message": "hi" })).await;
        for socket in [&mut tab_a, &mut observer] {
            let event = next_event(socket).await;
            assert_eq!(event["event"], "new_message");
            assert_eq!(event["data"]["username"], "alice");
            assert_eq!(event["data"]["message"], "hi");
            assert!(event["data"]["created_at"].is_string());
        }

        // Step 6: The message was persisted, and "too early" was not
        let history: Value = context
            .get(&context.client, "/messages")
            .await
            .json()
            .await
            .unwrap();
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["username"], "alice");
        assert_eq!(history[0]["message"], "hi");

        // Step 7: Tab B takes over, tab A is forcibly closed
        let mut tab_b = context.connect().await;
        send_event(
            &mut tab_b,
            "authenticate",
            json!({ "userId": 1, "username": "alice" }),
        )
        .await;
        assert_eq!(next_event(&mut tab_b).await["event"], "authenticated");
        assert_eq!(expect_close(&mut tab_a).await, 4000);

        // Step 8: Tab B can send and the observer still hears it
        send_event(&mut tab_b, "send_message", json!({ "message": "moved tabs" })).await;
        assert_eq!(next_event(&mut tab_b).await["data"]["message"], "moved tabs");
        assert_eq!(next_event(&mut observer).await["data"]["message"], "moved tabs");

        let health: Value = context
            .get(&context.client, "/health")
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(health["authenticated"], 1);
        assert_eq!(health["connections"], 2);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected() {
        let context = TestContext::start().await;
        let credentials = json!({ "username": "alice", "password": "password1" });

        let first = context.post(&context.client, "/register", credentials.clone()).await;
        assert_eq!(first.status().as_u16(), 200);

        let second = context
            .post(&TestContext::new_client(), "/register", credentials)
            .await;
        assert_eq!(second.status().as_u16(), 400);
        let body: Value = second.json().await.unwrap();
        assert_eq!(body["error"], "Username already exists");
    }

    #[tokio::test]
    async fn test_login_failure_does_not_reveal_which_field() {
        let context = TestContext::start().await;
        context
            .post(
                &context.client,
                "/register",
                json!({ "username": "alice", "password": "password1" }),
            )
            .await;

        let wrong_password = context
            .post(
                &TestContext::new_client(),
                "/login",
                json!({ "username": "alice", "password": "password2" }),
            )
            .await;
        let unknown_user = context
            .post(
                &TestContext::new_client(),
                "/login",
                json!({ "username": "mallory", "password": "password1" }),
            )
            .await;

        assert_eq!(wrong_password.status().as_u16(), 401);
        assert_eq!(unknown_user.status().as_u16(), 401);
        let a: Value = wrong_password.json().await.unwrap();
        let b: Value = unknown_user.json().await.unwrap();
        assert_eq!(a, b);

        let missing = context
            .post(&TestContext::new_client(), "/login", json!({ "username": "alice" }))
            .await;
        assert_eq!(missing.status().as_u16(), 400);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let context = TestContext::start().await;

        // No session yet
        assert_eq!(context.get(&context.client, "/messages").await.status().as_u16(), 401);

        context
            .post(
                &context.client,
                "/register",
                json!({ "username": "alice", "password": "password1" }),
            )
            .await;

        // A fresh login from a second browser gets its own session
        let other = TestContext::new_client();
        let login = context
            .post(
                &other,
                "/login",
                json!({ "username": "alice", "password": "password1" }),
            )
            .await;
        assert_eq!(login.status().as_u16(), 200);
        let body: Value = login.json().await.unwrap();
        assert_eq!(body, json!({ "username": "alice", "userId": 1 }));
        assert_eq!(context.get(&other, "/messages").await.status().as_u16(), 200);

        // Logging out destroys only that browser's session
        let logout = context.post(&context.client, "/logout", json!({})).await;
        assert_eq!(logout.status().as_u16(), 200);
        let body: Value = logout.json().await.unwrap();
        assert_eq!(body["success"], true);

        let check: Value = context
            .get(&context.client, "/check-auth")
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(check, json!({ "authenticated": false }));
        assert_eq!(context.get(&context.client, "/messages").await.status().as_u16(), 401);
        assert_eq!(context.get(&other, "/messages").await.status().as_u16(), 200);
    }

    #[tokio::test]
    async fn test_history_is_capped_and_ascending() {
        let context = TestContext::start().await;
        context
            .post(
                &context.client,
                "/register",
                json!({ "username": "alice", "password": "password1" }),
            )
            .await;

        for i in 0..105 {
            context
                .store
                .append_message(1, "alice", &format!("message {}", i))
                .await
                .unwrap();
        }

        let history: Value = context
            .get(&context.client, "/messages")
            .await
            .json()
            .await
            .unwrap();
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 100);
        assert_eq!(history[0]["message"], "message 5");
        assert_eq!(history[99]["message"], "message 104");

        let timestamps: Vec<&str> = history
            .iter()
            .map(|m| m["created_at"].as_str().unwrap())
            .collect();
        let parsed: Vec<chrono::DateTime<chrono::Utc>> = timestamps
            .iter()
            .map(|t| t.parse().unwrap())
            .collect();
        assert!(parsed.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_stale_disconnect_keeps_newer_connection() {
        let context = TestContext::start().await;
        let auth = json!({ "userId": 7, "username": "bob" });

        let mut first = context.connect().await;
        send_event(&mut first, "authenticate", auth.clone()).await;
        assert_eq!(next_event(&mut first).await["event"], "authenticated");

        let mut second = context.connect().await;
        send_event(&mut second, "authenticate", auth).await;
        assert_eq!(next_event(&mut second).await["event"], "authenticated");
        assert_eq!(expect_close(&mut first).await, 4000);
        drop(first);

        // give the server a moment to process the first socket's teardown
        tokio::time::sleep(Duration::from_millis(100)).await;

        let health: Value = context
            .get(&context.client, "/health")
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(health["authenticated"], 1);
        assert_eq!(health["connections"], 1);

        // still the bound connection, so it may send
        send_event(&mut second, "send_message", json!({ "message": "still me" })).await;
        let event = next_event(&mut second).await;
        assert_eq!(event["event"], "new_message");
        assert_eq!(event["data"]["username"], "bob");
    }
}
