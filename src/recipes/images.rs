use anyhow::Context;
use base64ct::{Base64, Encoding};
use bytes::Bytes;
use uuid::Uuid;

use crate::storage::StorageClient;

/// Image payload taken from a `data:image/<type>;base64,<payload>` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub body: Bytes,
    pub content_type: String,
}

impl DecodedImage {
    pub fn extension(&self) -> &'static str {
        ext_from_mime(&self.content_type).unwrap_or("bin")
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

pub fn decode_data_uri(raw: &str) -> Result<DecodedImage, &'static str> {
    let rest = raw
        .trim()
        .strip_prefix("data:")
        .ok_or("Expected a data:image/...;base64 URI")?;
    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or("Expected a data:image/...;base64 URI")?;
    let content_type = mime.trim().to_ascii_lowercase();
    if ext_from_mime(&content_type).is_none() {
        return Err("Unsupported image type");
    }
    let body = Base64::decode_vec(payload.trim()).map_err(|_| "Invalid base64 payload")?;
    if body.is_empty() {
        return Err("Image is empty");
    }
    Ok(DecodedImage {
        body: Bytes::from(body),
        content_type,
    })
}

/// Uploads under `recipes/<author>/<uuid>.<ext>` and returns the key.
pub async fn upload(
    storage: &dyn StorageClient,
    author_id: Uuid,
    image: &DecodedImage,
) -> anyhow::Result<String> {
    let key = format!("recipes/{}/{}.{}", author_id, Uuid::new_v4(), image.extension());
    storage
        .put_object(&key, image.body.clone(), &image.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(key)
}

pub async fn presign(storage: &dyn StorageClient, key: &str, ttl_secs: u64) -> anyhow::Result<String> {
    storage
        .presign_get(key, ttl_secs)
        .await
        .with_context(|| format!("presign url for {}", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    // 1x1 transparent PNG
    const PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[test]
    fn decodes_png_data_uri() {
        let img = decode_data_uri(PNG).unwrap();
        assert_eq!(img.content_type, "image/png");
        assert_eq!(img.extension(), "png");
        assert_eq!(&img.body[1..4], b"PNG");
    }

    #[test]
    fn rejects_malformed_uris() {
        assert!(decode_data_uri("iVBORw0KGgo=").is_err());
        assert!(decode_data_uri("data:text/plain;base64,aGVsbG8=").is_err());
        assert!(decode_data_uri("data:image/png;base64,@@@").is_err());
        assert!(decode_data_uri("data:image/png;base64,").is_err());
    }

    #[tokio::test]
    async fn upload_and_presign() {
        let storage = MemoryStorage::default();
        let author = Uuid::new_v4();
        let key = upload(&storage, author, &decode_data_uri(PNG).unwrap())
            .await
            .unwrap();
        assert!(key.starts_with(&format!("recipes/{}/", author)));
        assert!(key.ends_with(".png"));
        assert!(storage.contains(&key));

        let url = presign(&storage, &key, 60).await.unwrap();
        assert!(url.contains(&key));
    }
}
