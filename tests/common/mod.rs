//! Shared utilities for integration testing.

use std::path::PathBuf;

use tokio::net::TcpListener;

use transhub::config::HubConfig;
use transhub::http::HttpServer;
use transhub::lifecycle::Shutdown;
use transhub::store::{Repository, StoreConnection};

pub const ADMIN_PASSWORD: &str = "admin-secret-key";

/// A hub instance listening on an ephemeral port, with direct store access
/// for seeding and assertions.
pub struct TestHub {
    pub base: String,
    pub store: Repository,
    pub repo_root: PathBuf,
    // Dropping the coordinator stops the spawned server.
    #[allow(dead_code)]
    pub shutdown: Shutdown,
    _tmp: tempfile::TempDir,
}

/// Start a hub on 127.0.0.1:0 backed by a temp directory.
pub async fn spawn_hub() -> TestHub {
    let tmp = tempfile::tempdir().unwrap();
    let repo_root = tmp.path().join("repos");

    let mut config = HubConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.storage.database_path = tmp.path().join("hub.db").display().to_string();
    config.storage.repo_root = repo_root.display().to_string();

    let store = Repository::new(StoreConnection::open(&config.storage.database_path).unwrap());
    store.ensure_user("admin", ADMIN_PASSWORD, true).await.unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config, store.clone());
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestHub {
        base: format!("http://{}", addr),
        store,
        repo_root,
        shutdown,
        _tmp: tmp,
    }
}

/// Client that does not follow redirects, so Location headers are visible.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

/// Log in over HTTP and return the session token.
pub async fn login(client: &reqwest::Client, base: &str, username: &str, password: &str) -> String {
    let res = client
        .post(format!("{}/login", base))
        .form(&[("username", username), ("password", password)])
        .send()
        .await
        .expect("Hub unreachable");
    assert_eq!(res.status(), 200, "login failed");
    let body: serde_json::Value = res.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

/// Drain the user's notification queue and return the message bodies.
#[allow(dead_code)]
pub async fn drain_messages(client: &reqwest::Client, base: &str, token: &str) -> Vec<String> {
    let res = client
        .get(format!("{}/messages", base))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: serde_json::Value = res.json().await.unwrap();
    body.as_array()
        .unwrap()
        .iter()
        .map(|m| m["body"].as_str().unwrap().to_string())
        .collect()
}
