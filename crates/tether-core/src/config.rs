//! Bridge configuration
//!
//! Read programmatically or from the `[bridge]` table of a TOML document:
//!
//! ```toml
//! [bridge]
//! search_paths = ["./", "lib/python"]
//! matrix_autoconversion = true
//! debug = false
//! ```

use serde::Deserialize;

/// Bridge configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Paths appended to the foreign module search path on first init (default: `["./"]`)
    pub search_paths: Vec<String>,
    /// Pack rectangular numeric sequences as matrices instead of cells (default: true)
    pub matrix_autoconversion: bool,
    /// Echo every translated foreign diagnostic through `tracing::error!` (default: false)
    pub debug: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            search_paths: vec!["./".to_string()],
            matrix_autoconversion: true,
            debug: false,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    bridge: BridgeConfig,
}

impl BridgeConfig {
    /// Parse the `[bridge]` table of a TOML document.
    ///
    /// A missing table or missing keys fall back to the defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        let file: ConfigFile = toml::from_str(source)?;
        Ok(file.bridge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.search_paths, vec!["./".to_string()]);
        assert!(config.matrix_autoconversion);
        assert!(!config.debug);
    }

    #[test]
    fn test_from_toml_partial_table() {
        let config = BridgeConfig::from_toml_str(
            r#"
            [bridge]
            debug = true
            "#,
        )
        .unwrap();
        assert!(config.debug);
        assert!(config.matrix_autoconversion);
        assert_eq!(config.search_paths, vec!["./".to_string()]);
    }

    #[test]
    fn test_from_toml_missing_table() {
        let config = BridgeConfig::from_toml_str("[other]\nkey = 1\n").unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_from_toml_rejects_bad_types() {
        assert!(BridgeConfig::from_toml_str("[bridge]\ndebug = \"yes\"\n").is_err());
    }
}
