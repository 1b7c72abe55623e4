use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

/// Where uploaded files end up. Handlers only see this seam.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}

/// Local-filesystem store rooted at MEDIA_ROOT.
#[derive(Clone)]
pub struct FsMediaStore {
    root: PathBuf,
}

impl FsMediaStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn put(&self, key: &str, body: Bytes, _content_type: &str) -> anyhow::Result<()> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create media dir {}", parent.display()))?;
        }
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write media file {}", path.display()))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let path = self.root.join(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("delete media file {}", path.display())),
        }
    }
}

pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Storage key for a new recipe image: a fresh UUID keeps uploads from
/// clobbering each other whatever the client named the file.
pub fn recipe_image_key(ext: &str) -> String {
    format!("uploads/recipe/{}.{}", Uuid::new_v4(), ext)
}

/// Public URL for a stored key, as served by the /media mount.
pub fn public_url(key: &str) -> String {
    format!("/media/{key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ext_from_mime_covers_supported_image_types() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
        assert_eq!(ext_from_mime("text/html"), None);
    }

    #[test]
    fn recipe_image_keys_are_uuid_named() {
        let key = recipe_image_key("jpg");
        let name = key.strip_prefix("uploads/recipe/").unwrap();
        let stem = name.strip_suffix(".jpg").unwrap();
        assert!(Uuid::parse_str(stem).is_ok());

        assert_ne!(recipe_image_key("png"), recipe_image_key("png"));
    }

    #[test]
    fn public_url_prefixes_the_media_mount() {
        assert_eq!(public_url("uploads/recipe/x.jpg"), "/media/uploads/recipe/x.jpg");
    }

    #[tokio::test]
    async fn fs_store_put_then_delete_roundtrip() {
        let root = std::env::temp_dir().join(format!("recipebox-test-{}", Uuid::new_v4()));
        let store = FsMediaStore::new(root.clone());

        let key = recipe_image_key("jpg");
        store
            .put(&key, Bytes::from_static(b"not really a jpeg"), "image/jpeg")
            .await
            .expect("put should succeed");
        let on_disk = tokio::fs::read(root.join(&key)).await.expect("file exists");
        assert_eq!(on_disk, b"not really a jpeg");

        store.delete(&key).await.expect("delete should succeed");
        assert!(tokio::fs::read(root.join(&key)).await.is_err());

        // Deleting a missing key is not an error.
        store.delete(&key).await.expect("second delete is a no-op");

        tokio::fs::remove_dir_all(&root).await.ok();
    }
}
