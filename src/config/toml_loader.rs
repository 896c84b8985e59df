//! TOML configuration file parsing.
use anyhow::Result;
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::ConfigError;

/// Load and deserialize a TOML config file.
///
/// When `required` is `false` a missing file deserializes from empty TOML,
/// so types with `#[serde(default)]` come back with their defaults.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read (or is missing
/// while `required`), and [`ConfigError::Parse`] if it is not valid TOML
/// for `T`.
pub fn load_config<T: DeserializeOwned>(path: &Path, required: bool) -> Result<T> {
    let content = if !required && !path.exists() {
        String::new()
    } else {
        std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?
    };

    toml::from_str(&content).map_err(|e| {
        ConfigError::Parse {
            path: path.display().to_string(),
            message: e.message().to_string(),
        }
        .into()
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq, Eq)]
    #[serde(default)]
    struct Sample {
        name: String,
        items: Vec<String>,
    }

    #[test]
    fn optional_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let sample: Sample = load_config(&dir.path().join("none.toml"), false).unwrap();
        assert_eq!(sample, Sample::default());
    }

    #[test]
    fn required_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config::<Sample>(&dir.path().join("none.toml"), true).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn parses_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.toml");
        std::fs::write(&path, "name = \"x\"\nitems = [\"a\", \"b\"]\n").unwrap();
        let sample: Sample = load_config(&path, true).unwrap();
        assert_eq!(sample.name, "x");
        assert_eq!(sample.items, vec!["a", "b"]);
    }

    #[test]
    fn wrong_type_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.toml");
        std::fs::write(&path, "items = \"not a list\"\n").unwrap();
        let err = load_config::<Sample>(&path, true).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::Parse { .. })
        ));
    }
}
