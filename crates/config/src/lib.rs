//! Configuration loading and validation.
//!
//! Configuration is layered with [figment], later providers overriding
//! earlier ones:
//!
//! 1. Built-in defaults ([`Config::default`]).
//! 2. A configuration file (`.toml`, `.yaml`/`.yml` or `.json`), either given
//!    explicitly or found in the platform config directory.
//! 3. Environment variables prefixed with `BIBNOTE_`, using `__` to separate
//!    nested keys (e.g. `BIBNOTE_REFERENCE__CUSTOM_CITE_TEXT=true`).
//!
//! # Example
//!
//! ```toml
//! [reference]
//! folder = "Research/References"
//! title_template = "{{ citekey }} {{ title|truncate: 60 }}"
//! link_template = "[{{ number }}]"
//!
//! [source]
//! paths = ["/home/me/library.json"]
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "BIBNOTE_";
const ENV_SEPARATOR: &str = "__";
const DEFAULT_FILE_NAME: &str = "config.toml";

pub const DEFAULT_FOLDER: &str = "References";
pub const DEFAULT_TITLE_TEMPLATE: &str = "{{ citekey }}";
pub const DEFAULT_NOTE_TEMPLATE: &str =
    "# {{ title }}\n\n- **Citekey:** {{ citekey }}\n- **Authors:** {{ author }}\n- **Issued:** {{ issued }}\n";
pub const DEFAULT_LINK_TEMPLATE: &str = "[{{ number }}]";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub reference: ReferenceConfig,
    pub source: SourceConfig,
}

/// How literature notes and citation links are produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    /// Human-readable path of the folder holding literature notes.
    pub folder: String,
    /// Template for literature note titles.
    pub title_template: String,
    /// Template for literature note bodies.
    pub note_template: String,
    /// Template for the visible text of citation links.
    pub link_template: String,
    /// When set, the link template carries its own citation markers and only
    /// the marker's inner text is regenerated on synchronization.
    pub custom_cite_text: bool,
}
impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            folder: DEFAULT_FOLDER.to_string(),
            title_template: DEFAULT_TITLE_TEMPLATE.to_string(),
            note_template: DEFAULT_NOTE_TEMPLATE.to_string(),
            link_template: DEFAULT_LINK_TEMPLATE.to_string(),
            custom_cite_text: false,
        }
    }
}

/// Where bibliographic entries come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// CSL-JSON library files, merged in order.
    pub paths: Vec<PathBuf>,
}

impl Config {
    /// Path of the configuration file in the platform config directory
    /// (e.g. `~/.config/bibnote/config.toml` on Linux).
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "bibnote").map(|dirs| dirs.config_dir().join(DEFAULT_FILE_NAME))
    }

    /// Build the layered [`Figment`] without extracting it.
    ///
    /// When `path` is `None`, the file at [`default_path`](Self::default_path)
    /// is used if it exists. An explicit `path` must exist.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        let file = match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|p| p.is_file()),
        };
        if let Some(file) = file {
            tracing::debug!(path = %file.display(), "Loading configuration file");
            let extension = file.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
            figment = match extension.as_deref() {
                Some("toml") => figment.merge(Toml::file(&file)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(&file)),
                Some("json") => figment.merge(Json::file(&file)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(file)),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split(ENV_SEPARATOR)))
    }

    /// Load and validate the configuration.
    pub fn load(path: Option<impl AsRef<Path>>) -> Result<Self> {
        let config: Self = Self::figment(path.as_ref().map(AsRef::as_ref))?
            .extract()
            .map_err(|e| exn::Exn::from(ErrorKind::Load(e.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make every later operation fail.
    pub fn validate(&self) -> Result<()> {
        let reference = &self.reference;
        if reference.folder.trim().trim_matches('/').trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("reference.folder"));
        }
        for (field, template) in [
            ("reference.title_template", &reference.title_template),
            ("reference.note_template", &reference.note_template),
            ("reference.link_template", &reference.link_template),
        ] {
            if template.trim().is_empty() {
                exn::bail!(ErrorKind::Invalid(field));
            }
        }
        Ok(())
    }
}
