//! Dataset row model, label sanitization, and image filename derivation

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Header name of the label column
pub const LABEL_COLUMN: &str = "animal";

/// Header name of the image reference column (URL or base64, depending on stage)
pub const IMAGE_COLUMN: &str = "image_url";

/// Header name of the optional row id column
pub const ID_COLUMN: &str = "id";

/// Sentinel written by the transcoder in place of an image that could not be resolved
pub const UNRESOLVED_SENTINEL: &str = "unresolved-image";

/// A `(label, url)` pair produced by an acquisition source
///
/// The preview URL and filename are source-specific extras; the collector
/// only persists the label and the primary URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Free-text species/animal name
    pub label: String,
    /// Fully-qualified image URL
    pub url: String,
    /// Lower-resolution preview URL, when the source exposes one
    pub preview_url: Option<String>,
    /// Filename suggested by the source (basename of the URL path, typically)
    pub filename: Option<String>,
}

impl Candidate {
    /// Create a candidate carrying only a label and URL
    pub fn new<L: Into<String>, U: Into<String>>(label: L, url: U) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
            preview_url: None,
            filename: None,
        }
    }
}

/// Sanitize a label for use as a directory name
///
/// Whitespace becomes `_`; any character outside `[A-Za-z0-9_\-.]` is
/// stripped. An empty result falls back to `"unknown_animal"`.
pub fn sanitize_label(label: &str) -> String {
    let sanitized: String = label
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect();

    if sanitized.is_empty() {
        "unknown_animal".to_string()
    } else {
        sanitized
    }
}

/// Derive the image filename for an accepted row
///
/// The name is a pure function of the row id (or `"image"` when absent) and
/// the base64 payload, so repeated runs over identical input produce
/// identical paths: `<id>_<first 8 hex chars of SHA-256(payload)>.jpg`.
pub fn derived_image_name(id: Option<&str>, payload: &str) -> String {
    let id_part = match id {
        Some(id) if !id.is_empty() => id,
        _ => "image",
    };

    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    format!("{}_{}.jpg", id_part, &digest[..8])
}

/// Full output path for an accepted row: `<images_dir>/<label>/<derived name>`
pub fn image_output_path(
    images_dir: &Path,
    label: &str,
    id: Option<&str>,
    payload: &str,
) -> PathBuf {
    images_dir
        .join(sanitize_label(label))
        .join(derived_image_name(id, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_label() {
        assert_eq!(sanitize_label("Lynx lynx"), "Lynx_lynx");
        assert_eq!(sanitize_label("  red fox  "), "red_fox");
        assert_eq!(sanitize_label("wolf (gray)!"), "wolf_gray");
        assert_eq!(sanitize_label("weasel-sp."), "weasel-sp.");
        assert_eq!(sanitize_label(""), "unknown_animal");
        assert_eq!(sanitize_label("???"), "unknown_animal");
    }

    #[test]
    fn test_derived_name_is_deterministic() {
        let a = derived_image_name(Some("7"), "aGVsbG8=");
        let b = derived_image_name(Some("7"), "aGVsbG8=");
        assert_eq!(a, b);
        assert!(a.starts_with("7_"));
        assert!(a.ends_with(".jpg"));
    }

    #[test]
    fn test_derived_name_varies_with_payload() {
        let a = derived_image_name(Some("7"), "aGVsbG8=");
        let b = derived_image_name(Some("7"), "d29ybGQ=");
        assert_ne!(a, b);
    }

    #[test]
    fn test_derived_name_without_id() {
        let name = derived_image_name(None, "aGVsbG8=");
        assert!(name.starts_with("image_"));

        let name = derived_image_name(Some(""), "aGVsbG8=");
        assert!(name.starts_with("image_"));
    }

    #[test]
    fn test_image_output_path() {
        let path = image_output_path(Path::new("images"), "Lynx lynx", Some("3"), "aGVsbG8=");
        let rendered = path.to_string_lossy();
        assert!(rendered.starts_with("images"));
        assert!(rendered.contains("Lynx_lynx"));
        assert!(rendered.ends_with(".jpg"));
    }
}
