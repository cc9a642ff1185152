use tracing_subscriber::EnvFilter;
use trailforge::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(
        addr = %config.bind_addr,
        data = %config.data_path.display(),
        turn_seconds = config.turn_time.as_secs(),
        "starting trail server"
    );

    let server = TrailServer::builder().config(config).build().await?;
    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn test_serves_with_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let server = TrailServer::builder()
            .bind("127.0.0.1:0")
            .data_path(dir.path())
            .build()
            .await
            .unwrap();
        let addr = server.local_addr().unwrap().to_string();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(server.run_until(async {
            let _ = rx.await;
        }));

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/?name=Ada"))
            .await
            .unwrap();
        let first = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let welcome: serde_json::Value = serde_json::from_slice(&first.into_data()).unwrap();
        assert_eq!(welcome["type"], "welcome");
        assert_eq!(welcome["name"], "Ada");

        let _ = tx.send(());
        handle.await.unwrap().unwrap();
    }
}
