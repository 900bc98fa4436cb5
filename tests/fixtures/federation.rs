//! Federation fixture: real relay nodes on ephemeral ports plus SDK clients.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use wisp_client::{Client, Event};
use wisp_crypto::{Identity, PublicKey};
use wisp_relay::{RelayConfig, RelayNode};

/// How long fixtures poll for expected state before giving up.
pub const WAIT: Duration = Duration::from_secs(5);

/// One running relay node.
pub struct Relay {
    pub node: Arc<RelayNode>,
    pub url: String,
}

/// Start a relay with the given config on an ephemeral loopback port.
pub async fn spawn_relay(config: RelayConfig) -> Relay {
    let node = RelayNode::new(RelayConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        ..config
    });
    let addr = node.clone().start().await.expect("relay failed to start");
    Relay {
        node,
        url: format!("ws://127.0.0.1:{}", addr.port()),
    }
}

/// Start a relay with default config.
pub async fn spawn_default_relay() -> Relay {
    spawn_relay(RelayConfig::ephemeral()).await
}

/// A connected, authenticated client.
pub struct TestClient {
    pub client: Client,
    pub events: UnboundedReceiver<Event>,
    pub key: PublicKey,
}

/// Connect a fresh identity to `url` and wait for authentication.
pub async fn connect_client(url: &str) -> TestClient {
    let identity = Identity::generate();
    let key = *identity.public_key();
    let (client, mut events) = Client::connect(url, identity)
        .await
        .expect("client failed to connect");

    tokio::time::timeout(WAIT, async {
        while let Some(event) = events.recv().await {
            if matches!(event, Event::Authenticated { .. }) {
                return;
            }
        }
        panic!("event channel ended before authentication");
    })
    .await
    .expect("authentication timed out");

    TestClient {
        client,
        events,
        key,
    }
}

impl TestClient {
    /// Wait for the next `Event::Message`.
    pub async fn next_message(&mut self) -> (PublicKey, Vec<u8>, bool) {
        tokio::time::timeout(WAIT, async {
            while let Some(event) = self.events.recv().await {
                if let Event::Message {
                    sender,
                    content,
                    signed,
                } = event
                {
                    return (sender, content, signed);
                }
            }
            panic!("event channel ended while waiting for a message");
        })
        .await
        .expect("no message arrived in time")
    }

    /// Assert that no message arrives within `window`.
    pub async fn expect_silence(&mut self, window: Duration) {
        let result = tokio::time::timeout(window, async {
            while let Some(event) = self.events.recv().await {
                if matches!(event, Event::Message { .. }) {
                    return;
                }
            }
            // channel ended: silence as well
            std::future::pending::<()>().await;
        })
        .await;
        assert!(result.is_err(), "unexpected message during silence window");
    }
}

/// Poll until `relay` has an open session to a peer with `key`.
pub async fn wait_for_peer_session(relay: &Relay, key: &PublicKey) {
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        {
            let dirs = relay.node.directories().read().await;
            if dirs.peers().open_session(key).is_some() {
                return;
            }
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "peer session never appeared"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Poll until `relay` has at least one open peer session.
pub async fn wait_for_any_peer(relay: &Relay) {
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        {
            let dirs = relay.node.directories().read().await;
            if !dirs.peers().open_sessions().is_empty() {
                return;
            }
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "no peer session appeared"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
