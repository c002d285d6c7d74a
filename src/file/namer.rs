//! Storage name generation.

use std::path::Path;

use uuid::Uuid;

/// Extension used when neither the name nor the content type yields one.
pub const FALLBACK_EXTENSION: &str = "bin";

/// Longest extension carried over from a client-supplied name.
const MAX_EXTENSION_LENGTH: usize = 16;

/// Whether generated names carry a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingStrategy {
    /// `<uuid>.<ext>`, with the extension taken from the original name,
    /// then the content type, then [`FALLBACK_EXTENSION`].
    #[default]
    PreserveExtension,
    /// `<uuid>` only.
    Bare,
}

/// Generates collision-resistant storage names.
pub struct StorageNamer;

impl StorageNamer {
    /// A fresh UUID v4 in canonical hyphenated form.
    pub fn generate() -> String {
        Uuid::new_v4().to_string()
    }

    /// Generate a storage name for an upload.
    pub fn name_for(strategy: NamingStrategy, original_name: &str, mime_type: &str) -> String {
        let base = Self::generate();
        match strategy {
            NamingStrategy::Bare => base,
            NamingStrategy::PreserveExtension => {
                format!("{base}.{}", Self::extension_for(original_name, mime_type))
            }
        }
    }

    /// Pick the extension for a stored file.
    ///
    /// Only short ASCII alphanumeric extensions are taken from the original
    /// name; anything else falls through to the content type.
    pub fn extension_for(original_name: &str, mime_type: &str) -> String {
        let from_name = Path::new(original_name)
            .extension()
            .and_then(|s| s.to_str())
            .filter(|ext| {
                !ext.is_empty()
                    && ext.len() <= MAX_EXTENSION_LENGTH
                    && ext.chars().all(|c| c.is_ascii_alphanumeric())
            });

        if let Some(ext) = from_name {
            return ext.to_ascii_lowercase();
        }

        Self::extension_for_mime(mime_type)
            .unwrap_or(FALLBACK_EXTENSION)
            .to_string()
    }

    /// Extension registered for a MIME type.
    fn extension_for_mime(mime_type: &str) -> Option<&'static str> {
        // mime_guess lists extensions alphabetically; prefer the common ones.
        match mime_type {
            "image/jpeg" => return Some("jpg"),
            "image/svg+xml" => return Some("svg"),
            "image/tiff" => return Some("tiff"),
            "text/plain" => return Some("txt"),
            "application/octet-stream" => return None,
            _ => {}
        }

        mime_guess::get_mime_extensions_str(mime_type)
            .and_then(|exts| exts.first().copied())
    }
}
