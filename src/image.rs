//! Cover image persistence.
//!
//! Uploaded covers arrive as base64 data-URIs inside the JSON payload. They are
//! decoded and written to `{dir}/{id}.{ext}`; the book record stores the
//! relative path `image/{id}.{ext}`, which is also the URL it is served under.
//!
//! Writes are fire-and-forget: the path is returned immediately and failures
//! are only logged.

use std::path::{Component, Path, PathBuf};

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

/// URL prefix (and stored path prefix) for uploaded images.
pub const IMAGE_URL_PREFIX: &str = "image";

/// Lenient standard-alphabet decoder: padding is optional.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Whether a field value is an embedded image (`data:image...`).
pub fn is_data_uri(value: &str) -> bool {
    value.starts_with("data:image")
}

/// File extension for a data-URI's MIME subtype.
pub fn extension_for(subtype: &str) -> &str {
    match subtype {
        "jpeg" => "jpg",
        "svg+xml" => "svg",
        "" => "jpg",
        other => other,
    }
}

/// A parsed `data:image/<subtype>;base64,<payload>` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri<'a> {
    pub subtype: &'a str,
    pub payload: &'a str,
}

impl<'a> DataUri<'a> {
    /// Split a data-URI into subtype and payload. Returns `None` for anything
    /// that is not an image data-URI.
    pub fn parse(value: &'a str) -> Option<Self> {
        if !is_data_uri(value) {
            return None;
        }
        let mime = value.split(';').next().unwrap_or_default();
        let subtype = mime.split('/').nth(1).unwrap_or_default();
        let payload = value
            .rsplit_once(";base64,")
            .map(|(_, payload)| payload)
            .unwrap_or(value);
        Some(Self { subtype, payload })
    }

    pub fn extension(&self) -> &str {
        extension_for(self.subtype)
    }

    /// Decode the base64 payload, ignoring embedded whitespace.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        let cleaned: String = self
            .payload
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        LENIENT_BASE64.decode(cleaned)
    }
}

/// Directory-backed store for cover images.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Persist a data-URI image for the given book ID and return the relative
    /// path to store in the record.
    ///
    /// The path is returned whether or not the write succeeds. Inside a tokio
    /// runtime the write is spawned and not awaited.
    pub fn save(&self, uri: &DataUri<'_>, id: &str) -> String {
        let file_name = format!("{id}.{}", uri.extension());
        let relative = format!("{IMAGE_URL_PREFIX}/{file_name}");

        let bytes = match uri.decode() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(id, error = %e, "image payload is not valid base64");
                return relative;
            }
        };

        let dir = self.dir.clone();
        let target = dir.join(&file_name);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let result = async {
                        tokio::fs::create_dir_all(&dir).await?;
                        tokio::fs::write(&target, bytes).await
                    }
                    .await;
                    if let Err(e) = result {
                        tracing::warn!(path = %target.display(), error = %e, "failed to write image");
                    }
                });
            }
            Err(_) => {
                let result = std::fs::create_dir_all(&dir).and_then(|()| std::fs::write(&target, bytes));
                if let Err(e) = result {
                    tracing::warn!(path = %target.display(), error = %e, "failed to write image");
                }
            }
        }

        relative
    }

    /// Map a request path below `/image/` onto a file in the store.
    ///
    /// Rejects anything that could escape the image directory.
    pub fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let rel = Path::new(relative);
        if relative.is_empty() || !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            return None;
        }
        Some(self.dir.join(rel))
    }

    /// Read an image by its path below `/image/`.
    pub async fn read(&self, relative: &str) -> Option<Vec<u8>> {
        let path = self.resolve(relative)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "image not readable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_URI: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[test]
    fn data_uri_detection() {
        assert!(is_data_uri(PNG_URI));
        assert!(!is_data_uri("image/notimage.jpg"));
        assert!(!is_data_uri(""));
    }

    #[test]
    fn extension_mapping() {
        assert_eq!(extension_for("jpeg"), "jpg");
        assert_eq!(extension_for("svg+xml"), "svg");
        assert_eq!(extension_for("png"), "png");
        assert_eq!(extension_for("webp"), "webp");
    }

    #[test]
    fn parse_splits_subtype_and_payload() {
        let uri = DataUri::parse("data:image/jpeg;base64,AAEC").unwrap();
        assert_eq!(uri.subtype, "jpeg");
        assert_eq!(uri.payload, "AAEC");
        assert_eq!(uri.extension(), "jpg");
        assert_eq!(uri.decode().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn decode_tolerates_missing_padding() {
        let uri = DataUri::parse("data:image/png;base64,AAE").unwrap();
        assert_eq!(uri.decode().unwrap(), vec![0, 1]);
    }

    #[test]
    fn save_without_runtime_writes_synchronously() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = ImageStore::new(dir.path().join("image"));
        let uri = DataUri::parse(PNG_URI).unwrap();

        let path = store.save(&uri, "42");
        assert_eq!(path, "image/42.png");

        let written = std::fs::read(dir.path().join("image/42.png")).unwrap();
        assert_eq!(&written[1..4], b"PNG");
    }

    #[test]
    fn save_returns_path_even_when_payload_is_garbage() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = ImageStore::new(dir.path().join("image"));
        let uri = DataUri::parse("data:image/gif;base64,%%%").unwrap();

        assert_eq!(store.save(&uri, "7"), "image/7.gif");
        assert!(!dir.path().join("image/7.gif").exists());
    }

    #[test]
    fn resolve_rejects_traversal() {
        let store = ImageStore::new("/srv/image");
        assert!(store.resolve("../db.json").is_none());
        assert!(store.resolve("/etc/passwd").is_none());
        assert!(store.resolve("").is_none());
        assert_eq!(
            store.resolve("1.png").unwrap(),
            PathBuf::from("/srv/image/1.png")
        );
    }
}
