//! Run configuration
//!
//! All environment lookups happen here, once, when the configuration is
//! built. The rest of the crate only ever sees the resolved values.

use std::env;
use std::path::PathBuf;

/// Region used when neither the CLI nor the environment names one
pub const DEFAULT_REGION: &str = "us-east-1";

/// Where downloaded archives land (`<dir>/<name>.zip`)
pub const DEFAULT_DOWNLOAD_DIR: &str = "stepfn-lambdas";

/// Where extracted trees land (`<dir>/<name>/`)
pub const DEFAULT_EXTRACT_DIR: &str = "lambda-mods";

/// Resolved configuration for one run
#[derive(Debug, Clone)]
pub struct Config {
    pub region: String,
    pub profile: String,
    pub download_dir: PathBuf,
    pub extract_dir: PathBuf,
}

impl Config {
    /// Resolve configuration from CLI overrides, then the environment,
    /// then fixed defaults.
    pub fn resolve(
        region: Option<String>,
        profile: Option<String>,
        download_dir: Option<PathBuf>,
        extract_dir: Option<PathBuf>,
    ) -> Self {
        let region = region
            .or_else(|| env::var("AWS_REGION").ok())
            .or_else(|| env::var("AWS_DEFAULT_REGION").ok())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let profile = profile
            .or_else(|| env::var("AWS_PROFILE").ok())
            .unwrap_or_else(|| "default".to_string());

        Self {
            region,
            profile,
            download_dir: download_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_DIR)),
            extract_dir: extract_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_EXTRACT_DIR)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_values_win_over_defaults() {
        let config = Config::resolve(
            Some("eu-central-1".to_string()),
            Some("dev".to_string()),
            Some(PathBuf::from("archives")),
            Some(PathBuf::from("trees")),
        );

        assert_eq!(config.region, "eu-central-1");
        assert_eq!(config.profile, "dev");
        assert_eq!(config.download_dir, PathBuf::from("archives"));
        assert_eq!(config.extract_dir, PathBuf::from("trees"));
    }

    #[test]
    fn directories_default_to_fixed_names() {
        let config = Config::resolve(Some("us-west-2".to_string()), None, None, None);

        assert_eq!(config.download_dir, PathBuf::from(DEFAULT_DOWNLOAD_DIR));
        assert_eq!(config.extract_dir, PathBuf::from(DEFAULT_EXTRACT_DIR));
        assert_ne!(config.download_dir, config.extract_dir);
    }
}
