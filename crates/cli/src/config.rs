//! Configuration management for the CLI

use anyhow::{Context, Result};
use sizing_lib::SizingConfig;
use std::path::{Path, PathBuf};

/// Command-line values that override file and environment settings
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub headroom: Option<f64>,
    pub families: Option<Vec<String>>,
    pub top: Option<usize>,
    pub region: Option<String>,
    pub timeout_secs: Option<u64>,
    pub no_pricing: bool,
}

impl Overrides {
    pub fn apply(self, config: &mut SizingConfig) {
        if let Some(headroom) = self.headroom {
            config.headroom_fraction = headroom;
        }
        if let Some(families) = self.families {
            config.allowed_families = families
                .into_iter()
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect();
        }
        if let Some(top) = self.top {
            config.top_n = top;
        }
        if let Some(region) = self.region {
            config.region = region;
        }
        if let Some(timeout) = self.timeout_secs {
            config.timeout_secs = timeout;
        }
        if self.no_pricing {
            config.pricing.authoritative_enabled = false;
            config.pricing.community_enabled = false;
        }
    }
}

/// Load the sizing configuration.
///
/// An explicit `--config` path must exist; the default path is used only
/// when present.
pub fn load(explicit: Option<&Path>, overrides: Overrides) -> Result<SizingConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|p| p.exists()),
    };

    let mut config = SizingConfig::load(path.as_deref())
        .with_context(|| match &path {
            Some(p) => format!("Failed to load config {}", p.display()),
            None => "Failed to load config from environment".to_string(),
        })?;

    overrides.apply(&mut config);
    config.validate().context("Invalid settings")?;
    Ok(config)
}

/// `~/.config/kubesize/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    let home = dirs_next::home_dir()?;
    Some(home.join(".config").join("kubesize").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_overrides_replace_values() {
        let mut config = SizingConfig::default();
        Overrides {
            headroom: Some(0.5),
            families: Some(vec!["m6".to_string(), " ".to_string(), " c7 ".to_string()]),
            top: Some(3),
            region: Some("eu-west-1".to_string()),
            timeout_secs: Some(30),
            no_pricing: true,
        }
        .apply(&mut config);

        assert_eq!(config.headroom_fraction, 0.5);
        assert_eq!(config.allowed_families, vec!["m6", "c7"]);
        assert_eq!(config.top_n, 3);
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.timeout_secs, 30);
        assert!(!config.pricing.authoritative_enabled);
        assert!(!config.pricing.community_enabled);
    }

    #[test]
    fn test_empty_overrides_keep_file_values() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "headroom_fraction = 0.35\nregion = \"us-west-2\"").unwrap();

        let config = load(Some(file.path()), Overrides::default()).unwrap();

        assert_eq!(config.headroom_fraction, 0.35);
        assert_eq!(config.region, "us-west-2");
        assert_eq!(config.top_n, 5);
    }

    #[test]
    fn test_override_corrects_invalid_file_value() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "headroom_fraction = -1.0").unwrap();

        assert!(load(Some(file.path()), Overrides::default()).is_err());

        let overrides = Overrides {
            headroom: Some(0.3),
            ..Default::default()
        };
        let config = load(Some(file.path()), overrides).unwrap();
        assert_eq!(config.headroom_fraction, 0.3);
    }

    #[test]
    fn test_negative_headroom_rejected() {
        let overrides = Overrides {
            headroom: Some(-0.1),
            ..Default::default()
        };
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        assert!(load(Some(file.path()), overrides).is_err());
    }
}
