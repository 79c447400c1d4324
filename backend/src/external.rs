//! Boundaries for the two out-of-scope external stores (attachment blobs and
//! outbound notifications). Modeled as traits with no-op implementations the
//! same way `SwapExecutor`/`DummySwapExecutor` stand in for on-chain
//! execution: the seam exists so a real backing store can be swapped in
//! without touching the Planning Service.

use async_trait::async_trait;

#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    async fn put(&self, data: Vec<u8>, name: &str, mime: &str, work_id: &str) -> anyhow::Result<(String, u64)>;
    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
    async fn presign(&self, key: &str, ttl_secs: u64) -> anyhow::Result<String>;
}

#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    async fn send(&self, kind: &str, recipient: &str, data: serde_json::Value) -> anyhow::Result<()>;
}

pub struct NoopBlobStore;

#[async_trait]
impl BlobStore for NoopBlobStore {
    async fn put(&self, data: Vec<u8>, name: &str, _mime: &str, work_id: &str) -> anyhow::Result<(String, u64)> {
        // TODO: Replace with real object storage (S3/GCS) once attachments ship.
        let _ = work_id;
        Ok((format!("noop://{name}"), data.len() as u64))
    }

    async fn get(&self, key: &str) -> anyhow::Result<Vec<u8>> {
        anyhow::bail!("NoopBlobStore: no object backing {key}")
    }

    async fn delete(&self, _key: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn presign(&self, key: &str, _ttl_secs: u64) -> anyhow::Result<String> {
        Ok(format!("noop://{key}"))
    }
}

pub struct NoopNotificationSink;

#[async_trait]
impl NotificationSink for NoopNotificationSink {
    async fn send(&self, kind: &str, recipient: &str, _data: serde_json::Value) -> anyhow::Result<()> {
        // TODO: wire to email/push once outbound notifications are in scope.
        tracing::debug!(kind, recipient, "NoopNotificationSink: dropping notification");
        Ok(())
    }
}
