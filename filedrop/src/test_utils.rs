//! Helpers shared by the handler and client tests.

use crate::config::Config;
use axum_test::TestServer;
use std::path::Path;

pub fn create_test_config(storage_dir: &Path) -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..Default::default()
    };
    config.storage.path = storage_dir.to_path_buf();
    config
}

pub async fn create_test_app(storage_dir: &Path) -> TestServer {
    create_test_app_with_config(create_test_config(storage_dir)).await
}

pub async fn create_test_app_with_config(config: Config) -> TestServer {
    crate::Application::new(config)
        .await
        .expect("Failed to create application")
        .into_test_server()
}

/// Bind an ephemeral port and run the real server on it, for tests that go through HTTP.
/// The server stops when the returned sender is dropped.
pub async fn spawn_test_server(config: Config) -> (url::Url, tokio::sync::oneshot::Sender<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("listener has an address");
    let app = crate::Application::new(config).await.expect("Failed to create application");
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        app.serve_on(listener, async {
            let _ = rx.await;
        })
        .await
        .expect("test server failed");
    });

    let url = format!("http://{addr}").parse().expect("valid server url");
    (url, tx)
}
