// src/services/storage_service.rs

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::{Credentials, SharedCredentialsProvider};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

use crate::{common::error::AppError, config::StorageSettings};

/// Armazenamento opaco das imagens: `put(key, bytes, mime) -> url`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, AppError>;
}

/// Chave no formato `receipts/{departamento}/{uuid}.{ext}`.
pub fn receipt_image_key(department_id: Uuid, content_type: &str) -> String {
    let ext = match content_type {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/heic" => "heic",
        "application/pdf" => "pdf",
        _ => "jpg",
    };
    format!("receipts/{}/{}.{}", department_id, Uuid::new_v4(), ext)
}

pub async fn build_object_store(settings: &StorageSettings) -> anyhow::Result<std::sync::Arc<dyn ObjectStore>> {
    match settings {
        StorageSettings::Local { root, public_base_url } => {
            tokio::fs::create_dir_all(root).await?;
            tracing::info!("📁 Imagens em disco local: {}", root.display());
            Ok(std::sync::Arc::new(LocalObjectStore::new(root.clone(), public_base_url.clone())))
        }
        StorageSettings::S3 {
            bucket,
            endpoint,
            region,
            access_key,
            secret_key,
        } => {
            let store = S3ObjectStore::new(bucket, endpoint, region, access_key, secret_key).await;
            tracing::info!("☁️ Imagens no bucket S3: {}", bucket);
            Ok(std::sync::Arc::new(store))
        }
    }
}

// =========================================================================
//  DISCO LOCAL
// =========================================================================

pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: PathBuf, public_base_url: String) -> Self {
        Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || key.is_empty() {
            return Err(AppError::ObjectStorage(format!("chave inválida: {}", key)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, AppError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::ObjectStorage(e.to_string()))?;
        }

        let size = bytes.len();
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::ObjectStorage(e.to_string()))?;

        tracing::debug!("Imagem gravada: key={}, size={} bytes, content_type={}", key, size, content_type);
        Ok(format!("{}/{}", self.public_base_url, key))
    }
}

// =========================================================================
//  S3 / R2 COMPATÍVEL
// =========================================================================

pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    endpoint: String,
}

impl S3ObjectStore {
    pub async fn new(bucket: &str, endpoint: &str, region: &str, access_key: &str, secret_key: &str) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "claimflow");
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region(Region::new(region.to_string()))
            .credentials_provider(SharedCredentialsProvider::new(credentials))
            .load()
            .await;

        Self {
            client: Client::new(&aws_config),
            bucket: bucket.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Upload falhou: key={}, bucket={}, error={:?}", key, self.bucket, e);
                AppError::ObjectStorage(e.to_string())
            })?;

        Ok(format!("{}/{}/{}", self.endpoint, self.bucket, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_store_writes_under_root_and_returns_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path().to_path_buf(), "http://localhost:3000/files/".into());

        let url = store
            .put("receipts/dept/abc.jpg", vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap();

        assert_eq!(url, "http://localhost:3000/files/receipts/dept/abc.jpg");
        let written = tokio::fs::read(dir.path().join("receipts/dept/abc.jpg")).await.unwrap();
        assert_eq!(written, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn local_store_refuses_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path().to_path_buf(), "http://x".into());
        let err = store.put("../escape.jpg", vec![0], "image/jpeg").await.unwrap_err();
        assert!(matches!(err, AppError::ObjectStorage(_)));
    }

    #[test]
    fn image_keys_are_namespaced_by_department() {
        let dept = Uuid::new_v4();
        let key = receipt_image_key(dept, "image/png");
        assert!(key.starts_with(&format!("receipts/{}/", dept)));
        assert!(key.ends_with(".png"));
    }
}
