use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Source classification derived from the folder a document lives in.
///
/// Documents placed directly in the corpus root map to `General`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Internal,
    Training,
    Draft,
    External,
    Literature,
    #[default]
    General,
}

impl DocType {
    /// Folder names that carry semantic meaning for the source type.
    pub fn from_folder(folder: &str) -> Self {
        match folder.to_ascii_lowercase().as_str() {
            "internal" => Self::Internal,
            "training" => Self::Training,
            "draft" => Self::Draft,
            "external" => Self::External,
            "literature" => Self::Literature,
            _ => Self::General,
        }
    }

    /// Human-readable label for CLI output and report front matter.
    pub fn label(self) -> &'static str {
        match self {
            Self::Internal => "Internal documentation",
            Self::Training => "Training material",
            Self::Draft => "Own draft",
            Self::External => "External sources",
            Self::Literature => "Literature",
            Self::General => "General",
        }
    }
}

/// One logical page or section of a source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// sha-256 of the source path, first 16 hex chars.
    pub doc_id: String,
    pub source_path: String,
    /// 1-based; 0 for formats without page structure.
    pub page_num: u32,
    pub text: String,
    pub doc_type: DocType,
}

/// Content-addressed segment of page text; the atomic retrievable unit.
///
/// Immutable once created: chunks are appended to a store, never mutated or
/// individually deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// sha-256 of the chunk text, first 20 hex chars. Identical text yields
    /// the identical id regardless of source document.
    pub chunk_id: String,
    pub doc_id: String,
    pub source_path: String,
    pub page_num: u32,
    /// Best-effort provenance pointer into the page text. Approximate once
    /// overlap re-seeds the chunk buffer; not an exact offset.
    pub char_offset: usize,
    pub text: String,
    pub doc_type: DocType,
}

/// Stable document identifier derived from the source path.
pub fn doc_id_for_path(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_type_from_folder_maps_known_names() {
        assert_eq!(DocType::from_folder("internal"), DocType::Internal);
        assert_eq!(DocType::from_folder("Training"), DocType::Training);
        assert_eq!(DocType::from_folder("DRAFT"), DocType::Draft);
        assert_eq!(DocType::from_folder("external"), DocType::External);
        assert_eq!(DocType::from_folder("literature"), DocType::Literature);
    }

    #[test]
    fn doc_type_from_folder_defaults_to_general() {
        assert_eq!(DocType::from_folder("docs"), DocType::General);
        assert_eq!(DocType::from_folder(""), DocType::General);
    }

    #[test]
    fn doc_id_is_stable_and_fixed_width() {
        let first = doc_id_for_path("docs/architecture.md");
        let second = doc_id_for_path("docs/architecture.md");
        assert_eq!(first, second);
        assert_eq!(first.len(), 16);
        assert_ne!(first, doc_id_for_path("docs/operations.md"));
    }
}
