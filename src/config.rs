//! Optional TOML defaults for the command-line tool.

use crate::constants::DEFAULT_CONFIG_FILE;
use crate::error::{CompressionError, Result};
use crate::options::CompressOptions;
use std::path::{Path, PathBuf};

/// Loads compression defaults from a TOML file.
///
/// Keys mirror [`CompressOptions`] fields (`max_size_mb`, `file_type`, ...);
/// unknown keys are rejected.
pub fn load_options(path: &Path) -> Result<CompressOptions> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CompressionError::Config(format!("cannot read {}: {}", path.display(), e))
    })?;
    parse_options(&text)
        .map_err(|e| CompressionError::Config(format!("{}: {}", path.display(), e)))
}

pub fn parse_options(text: &str) -> std::result::Result<CompressOptions, toml::de::Error> {
    toml::from_str(text)
}

/// Picks the config file to use: the explicit path if given (it must
/// exist), otherwise `img-squeeze.toml` in the working directory when
/// present.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) if path.is_file() => Ok(Some(path.to_path_buf())),
        Some(path) => Err(CompressionError::Config(format!(
            "config file {} not found",
            path.display()
        ))),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            Ok(default.is_file().then_some(default))
        }
    }
}

/// Loads the resolved config file, or empty options when there is none.
pub fn load_defaults(explicit: Option<&Path>) -> Result<CompressOptions> {
    match resolve_config_path(explicit)? {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            load_options(&path)
        }
        None => Ok(CompressOptions::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_options() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("squeeze.toml");
        std::fs::write(&path, "max_size_mb = 0.25\npreserve_exif = true\n").unwrap();

        let options = load_options(&path).unwrap();
        assert_eq!(options.max_size_mb, Some(0.25));
        assert_eq!(options.preserve_exif, Some(true));
        assert_eq!(options.max_iteration, None);
    }

    #[test]
    fn test_invalid_config_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        std::fs::write(&path, "max_size_mb = \"big\"").unwrap();

        assert!(matches!(load_options(&path), Err(CompressionError::Config(_))));
    }

    #[test]
    fn test_missing_explicit_config() {
        let result = resolve_config_path(Some(Path::new("/nonexistent/squeeze.toml")));
        assert!(matches!(result, Err(CompressionError::Config(_))));
    }
}
