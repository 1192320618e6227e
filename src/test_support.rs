use axum::Router;
use tokio::net::TcpListener;

/// Serve `build(base_url)` on an ephemeral local port and return its base URL.
pub async fn serve_mock<F>(build: F) -> String
where
    F: FnOnce(String) -> Router,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let base = format!("http://{}", listener.local_addr().expect("mock address"));
    let router = build(base.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock server");
    });
    base
}
