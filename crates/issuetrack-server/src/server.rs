//! Server startup.

use crate::config::ServerConfig;
use crate::error::Result;
use crate::router::router;
use issuetrack::service::IssueService;
use issuetrack::storage::{create_storage, StorageBackend};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Open the configured storage and wrap it in a service.
///
/// # Errors
///
/// Returns an error if the configuration names no valid backend or the
/// JSONL file exists but cannot be read.
pub async fn build_service(config: &ServerConfig) -> Result<IssueService> {
    let backend = config.storage_backend()?;
    match &backend {
        StorageBackend::InMemory => {
            warn!("Using in-memory storage; issues are lost when the server stops");
        }
        StorageBackend::Jsonl(path) => info!(path = %path.display(), "Using JSONL storage"),
    }

    let storage = create_storage(backend).await?;
    Ok(IssueService::new(storage))
}

/// Serve `service` on `listener` until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve(listener: TcpListener, service: IssueService) -> Result<()> {
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Build the service, bind the configured address and serve.
///
/// # Errors
///
/// Returns an error if storage cannot be opened, the address cannot be
/// bound, or serving fails.
pub async fn run(config: &ServerConfig) -> Result<()> {
    let service = build_service(config).await?;

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!(address = %listener.local_addr()?, "Listening");

    serve(listener, service).await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down"),
        Err(e) => warn!(error = %e, "Failed to listen for shutdown signal"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StorageConfig, BACKEND_JSONL};
    use crate::error::Error;
    use issuetrack::storage::IssueStorage;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_build_service_in_memory() {
        let service = build_service(&ServerConfig::default()).await.unwrap();
        assert_eq!(service.storage().read().await.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_build_service_jsonl() {
        let temp_dir = TempDir::new().unwrap();
        let config = ServerConfig {
            storage: StorageConfig {
                backend: BACKEND_JSONL.to_string(),
                data_file: Some(temp_dir.path().join("issues.jsonl")),
            },
            ..ServerConfig::default()
        };

        let service = build_service(&config).await.unwrap();

        assert_eq!(service.storage().read().await.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_build_service_rejects_invalid_backend() {
        let config = ServerConfig {
            storage: StorageConfig {
                backend: "postgres".to_string(),
                data_file: None,
            },
            ..ServerConfig::default()
        };

        assert!(matches!(build_service(&config).await, Err(Error::Config(_))));
    }
}
