//! Namespace configuration.

use crate::node::FileKind;
use serde::{Deserialize, Serialize};

/// Settings applied when a namespace is created and when files are created
/// without explicit metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
    /// Name of the root directory (shown in the prompt).
    pub root_name: String,
    /// Size recorded for files created by `touch`.
    pub default_file_size: u64,
    /// Kind recorded for files created by `touch`.
    pub default_kind: FileKind,
    /// Permission tag recorded for files created by `touch`.
    pub default_permission: u32,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            root_name: "root".to_string(),
            default_file_size: 100,
            default_kind: FileKind::Character,
            default_permission: 644,
        }
    }
}

impl NamespaceConfig {
    /// Default configuration with a custom root name.
    pub fn with_root_name(root_name: impl Into<String>) -> Self {
        Self {
            root_name: root_name.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NamespaceConfig::default();
        assert_eq!(config.root_name, "root");
        assert_eq!(config.default_file_size, 100);
        assert_eq!(config.default_kind, FileKind::Character);
        assert_eq!(config.default_permission, 644);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: NamespaceConfig =
            serde_json::from_str(r#"{"root_name": "Raiz", "default_kind": "binary"}"#).unwrap();
        assert_eq!(config.root_name, "Raiz");
        assert_eq!(config.default_kind, FileKind::Binary);
        assert_eq!(config.default_permission, 644);
    }
}
