//! Layered configuration for the edition gallery.
//!
//! Values are resolved with [`figment`], later layers overriding earlier ones:
//!
//! 1. built-in defaults ([`Config::default`]),
//! 2. a configuration file (TOML, YAML or JSON, picked by extension), either
//!    passed explicitly or `editions.toml` in the platform config directory,
//! 3. `EDITIONS_`-prefixed environment variables, with `__` separating nested
//!    keys (`EDITIONS_COVERS__TARGET_WIDTH=800`).
//!
//! ```
//! use editions_config::Config;
//!
//! let config = Config::default();
//! assert_eq!(config.store.manifest, "index.json");
//! assert_eq!(config.discovery.candidates, [9, 8, 7, 6, 5, 3]);
//! assert!(config.validate().is_ok());
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "EDITIONS_";
const CONFIG_FILENAME: &str = "editions.toml";
const DATABASE_FILENAME: &str = "covers.sqlite";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub discovery: DiscoveryConfig,
    pub covers: CoverConfig,
    pub cache: CacheConfig,
}

/// Where the edition PDFs are published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Either an `http(s)://` origin or a local directory holding the PDFs.
    pub base: String,
    /// URL path the documents are published under; part of every cover key.
    pub prefix: String,
    /// Name of the optional JSON listing of edition filenames.
    pub manifest: String,
    pub timeout_secs: u64,
}
impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base: "http://localhost:5173".to_string(),
            prefix: "/docs".to_string(),
            manifest: "index.json".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Resolved form of [`StoreConfig::base`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// Base URL of the document directory (origin joined with the prefix).
    Http(String),
    Directory(PathBuf),
}

impl StoreConfig {
    /// ```
    /// use editions_config::{StoreConfig, StoreLocation};
    ///
    /// let store = StoreConfig { base: "https://example.org/".into(), ..Default::default() };
    /// assert_eq!(store.location(), StoreLocation::Http("https://example.org/docs/".into()));
    /// ```
    pub fn location(&self) -> StoreLocation {
        let base = self.base.trim();
        if base.starts_with("http://") || base.starts_with("https://") {
            let prefix = self.prefix.trim_matches('/');
            let origin = base.trim_end_matches('/');
            match prefix.is_empty() {
                true => StoreLocation::Http(format!("{origin}/")),
                false => StoreLocation::Http(format!("{origin}/{prefix}/")),
            }
        } else {
            StoreLocation::Directory(PathBuf::from(base))
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// How editions are discovered and named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Edition numbers probed, in order, when no manifest is available.
    pub candidates: Vec<u32>,
    /// Case-insensitive regular expressions; matching filenames are never shown.
    pub exclude: Vec<String>,
    /// Publication name used in edition titles.
    pub publication: String,
}
impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            candidates: vec![9, 8, 7, 6, 5, 3],
            exclude: vec![r"edition\s*4(?:\D|$)".to_string()],
            publication: "Transylvania Insights".to_string(),
        }
    }
}

/// Cover thumbnail generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverConfig {
    pub target_width: u32,
    /// JPEG quality, 1 to 100.
    pub quality: u8,
    pub min_scale: f32,
    pub max_scale: f32,
    /// Covers whose encoded payload is this long or longer stay memory-only.
    pub admission_threshold: usize,
    /// Covers generated at the same time.
    pub concurrency: usize,
    /// Explicit PDFium shared library; searched for when unset.
    pub pdfium_library: Option<PathBuf>,
}
impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            target_width: 1200,
            quality: 85,
            min_scale: 0.12,
            max_scale: 3.0,
            admission_threshold: 2_000_000,
            concurrency: 4,
            pdfium_library: None,
        }
    }
}

/// Durable cover cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub database: Option<PathBuf>,
}
impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true, database: None }
    }
}

impl CacheConfig {
    /// Database file to use, falling back to the platform data directory.
    /// `None` when the durable cache is disabled or no home directory exists.
    pub fn database_path(&self) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }
        self.database
            .clone()
            .or_else(|| project_dirs().map(|dirs| dirs.data_dir().join(DATABASE_FILENAME)))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "editions", "editions")
}

impl Config {
    /// `editions.toml` in the platform configuration directory.
    pub fn default_file() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
    }

    /// Build the provider stack without extracting it.
    ///
    /// An explicit `file` must exist; the default file is used only when
    /// present.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        let file = match file {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::FileNotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_file().filter(|path| path.is_file()),
        };
        if let Some(path) = file {
            tracing::debug!(path = %path.display(), "Loading configuration file");
            let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
            figment = match extension.as_deref() {
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load and validate the configuration.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(file)?.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &'static str, reason: &str| ErrorKind::Invalid { field, reason: reason.to_string() };
        if self.store.base.trim().is_empty() {
            exn::bail!(invalid("store.base", "must be a URL or a directory"));
        }
        if self.discovery.candidates.is_empty() && self.store.manifest.trim().is_empty() {
            exn::bail!(invalid("discovery.candidates", "nothing to discover without a manifest or candidates"));
        }
        for pattern in &self.discovery.exclude {
            if let Err(e) = regex::Regex::new(pattern) {
                exn::bail!(invalid("discovery.exclude", &e.to_string()));
            }
        }
        if self.covers.target_width == 0 {
            exn::bail!(invalid("covers.target_width", "must be greater than zero"));
        }
        if !(1..=100).contains(&self.covers.quality) {
            exn::bail!(invalid("covers.quality", "must be between 1 and 100"));
        }
        let (min, max) = (self.covers.min_scale, self.covers.max_scale);
        if !(min.is_finite() && max.is_finite() && min > 0.0 && min <= max) {
            exn::bail!(invalid("covers.min_scale", "scales must be positive with min <= max"));
        }
        if self.covers.concurrency == 0 {
            exn::bail!(invalid("covers.concurrency", "must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    #[test]
    fn test_defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[rstest]
    #[case("http://localhost:5173", "/docs", StoreLocation::Http("http://localhost:5173/docs/".into()))]
    #[case("https://example.org/", "docs/", StoreLocation::Http("https://example.org/docs/".into()))]
    #[case("https://example.org", "/", StoreLocation::Http("https://example.org/".into()))]
    #[case("/srv/www/docs", "/docs", StoreLocation::Directory("/srv/www/docs".into()))]
    fn test_location(#[case] base: &str, #[case] prefix: &str, #[case] expected: StoreLocation) {
        let store = StoreConfig { base: base.to_string(), prefix: prefix.to_string(), ..Default::default() };
        assert_eq!(store.location(), expected);
    }

    #[test]
    fn test_database_path() {
        let disabled = CacheConfig { enabled: false, database: Some("covers.db".into()) };
        assert_eq!(disabled.database_path(), None);
        let explicit = CacheConfig { enabled: true, database: Some("covers.db".into()) };
        assert_eq!(explicit.database_path(), Some(PathBuf::from("covers.db")));
    }

    #[rstest]
    #[case::zero_width(|c: &mut Config| c.covers.target_width = 0, "covers.target_width")]
    #[case::quality(|c: &mut Config| c.covers.quality = 101, "covers.quality")]
    #[case::scales(|c: &mut Config| c.covers.min_scale = 4.0, "covers.min_scale")]
    #[case::regex(|c: &mut Config| c.discovery.exclude.push("edition(".into()), "discovery.exclude")]
    #[case::concurrency(|c: &mut Config| c.covers.concurrency = 0, "covers.concurrency")]
    #[case::nothing(|c: &mut Config| { c.discovery.candidates.clear(); c.store.manifest.clear(); }, "discovery.candidates")]
    fn test_validate_rejects(#[case] mutate: fn(&mut Config), #[case] expected: &str) {
        let mut config = Config::default();
        mutate(&mut config);
        let err = config.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid { field, .. } if *field == expected));
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let err = Config::load(Some(Path::new("/definitely/not/editions.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::FileNotFound(_)));
    }

    #[test]
    fn test_file_and_environment_layers() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "editions.toml",
                r#"
                    [store]
                    base = "https://example.org"

                    [discovery]
                    candidates = [12, 11, 10]

                    [covers]
                    target_width = 800
                "#,
            )?;
            jail.set_env("EDITIONS_COVERS__TARGET_WIDTH", "640");
            jail.set_env("EDITIONS_CACHE__ENABLED", "false");
            let config = Config::load(Some(Path::new("editions.toml"))).unwrap();
            assert_eq!(config.store.base, "https://example.org");
            assert_eq!(config.store.prefix, "/docs");
            assert_eq!(config.discovery.candidates, [12, 11, 10]);
            assert_eq!(config.covers.target_width, 640);
            assert!(!config.cache.enabled);
            Ok(())
        });
    }

    #[test]
    fn test_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editions.yaml");
        std::fs::write(&path, "discovery:\n  publication: Weekly Digest\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.discovery.publication, "Weekly Digest");
    }
}
