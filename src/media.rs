use std::path::Path;

use base64::{engine::general_purpose, Engine as _};

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("file is empty")]
    Empty,
    #[error("unsupported media type '{0}', expected an image")]
    UnsupportedMime(String),
    #[error("malformed data URI")]
    InvalidDataUri,
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data).map(|kind| kind.mime_type().to_string())
}

fn normalize_image_mime(mime_type: &str) -> String {
    let lowered = mime_type.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "image/jpg" => "image/jpeg".to_string(),
        _ => lowered,
    }
}

fn is_supported_image_mime(mime_type: &str) -> bool {
    matches!(
        mime_type,
        "image/png" | "image/jpeg" | "image/webp" | "image/heic" | "image/heif"
    )
}

/// An image payload held as raw bytes plus its MIME type. The base64
/// data-URI form is only produced at the edges (display, transport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl EncodedImage {
    /// Wraps raw bytes, sniffing the MIME type and falling back to the
    /// declared one. Rejects empty or non-image payloads before anything
    /// touches the network.
    pub fn from_bytes(bytes: Vec<u8>, declared_mime: Option<&str>) -> Result<Self, MediaError> {
        if bytes.is_empty() {
            return Err(MediaError::Empty);
        }

        let mut candidates = Vec::new();
        if let Some(detected) = detect_mime_type(&bytes) {
            candidates.push(detected);
        }
        if let Some(declared) = declared_mime {
            if !declared.trim().is_empty() {
                candidates.push(declared.to_string());
            }
        }

        let Some(first) = candidates.first().cloned() else {
            return Err(MediaError::UnsupportedMime("unknown".to_string()));
        };

        for candidate in candidates {
            let normalized = normalize_image_mime(&candidate);
            if is_supported_image_mime(&normalized) {
                return Ok(EncodedImage {
                    bytes,
                    mime_type: normalized,
                });
            }
        }

        Err(MediaError::UnsupportedMime(normalize_image_mime(&first)))
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, MediaError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|source| MediaError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(bytes, None)
    }

    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    pub fn from_data_uri(uri: &str) -> Result<Self, MediaError> {
        let rest = uri.strip_prefix("data:").ok_or(MediaError::InvalidDataUri)?;
        let (header, payload) = rest.split_once(',').ok_or(MediaError::InvalidDataUri)?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or(MediaError::InvalidDataUri)?;
        if mime_type.is_empty() {
            return Err(MediaError::InvalidDataUri);
        }
        let bytes = general_purpose::STANDARD.decode(payload.trim())?;
        Self::from_bytes(bytes, Some(mime_type))
    }

    pub async fn save_to(&self, path: impl AsRef<Path>) -> Result<(), MediaError> {
        let path = path.as_ref();
        tokio::fs::write(path, &self.bytes)
            .await
            .map_err(|source| MediaError::Write {
                path: path.display().to_string(),
                source,
            })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
