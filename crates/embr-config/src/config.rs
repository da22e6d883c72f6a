//! `.embr/config` — an INI file with sections `[core]`, `[model]`,
//! `[storage]`, `[git]`, and one `[git "hooks.<name>"]` per registered hook,
//! matching the on-disk layout `spec.md` §6 fixes.

use std::path::{Path, PathBuf};

use ini::Ini;

use crate::env;
use crate::error::{ConfigError, Result};

#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub compression_level: i32,
    pub normalize: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            compression_level: embr_core::codec::DEFAULT_COMPRESSION_LEVEL,
            normalize: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModelConfig {
    pub default_provider: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    pub backend: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GitConfig {
    pub enabled: bool,
    /// `(hook name, shell command)` pairs from `[git "hooks.<name>"]`
    /// sections.
    pub hooks: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct RepoConfig {
    pub core: CoreConfig,
    pub model: ModelConfig,
    pub storage: StorageConfig,
    pub git: GitConfig,
    pub debug: bool,
    pub auth: env::AuthOverride,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            model: ModelConfig::default(),
            storage: StorageConfig::default(),
            git: GitConfig::default(),
            debug: false,
            auth: env::AuthOverride::default(),
        }
    }
}

const HOOKS_PREFIX: &str = "hooks.";

/// Load `<root>/.embr/config`, falling back to defaults if the file is
/// absent, and applying environment variable overrides last.
pub fn load(root: &Path) -> Result<RepoConfig> {
    let mut config = RepoConfig::default();
    let path = config_path(root);

    if path.exists() {
        let ini = Ini::load_from_file(&path).map_err(|e| ConfigError::Malformed {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        apply_ini(&mut config, &ini);
    } else {
        tracing::debug!(path = %path.display(), "no config file found, using defaults");
    }

    apply_env_overrides(&mut config);
    Ok(config)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(".embr").join("config")
}

fn apply_ini(config: &mut RepoConfig, ini: &Ini) {
    if let Some(core) = ini.section(Some("core")) {
        if let Some(level) = core.get("compression_level").and_then(|v| v.parse().ok()) {
            config.core.compression_level = level;
        }
        if let Some(normalize) = core.get("normalize") {
            config.core.normalize = parse_bool(normalize);
        }
    }

    if let Some(model) = ini.section(Some("model")) {
        if let Some(provider) = model.get("default_provider") {
            config.model.default_provider = Some(provider.to_string());
        }
    }

    if let Some(storage) = ini.section(Some("storage")) {
        if let Some(backend) = storage.get("backend") {
            config.storage.backend = Some(backend.to_string());
        }
    }

    if let Some(git) = ini.section(Some("git")) {
        if let Some(enabled) = git.get("enabled") {
            config.git.enabled = parse_bool(enabled);
        }
    }

    for section_name in ini.sections().flatten() {
        let Some(hook_name) = section_name
            .strip_prefix("git \"")
            .and_then(|rest| rest.strip_suffix('"'))
            .and_then(|rest| rest.strip_prefix(HOOKS_PREFIX))
        else {
            continue;
        };
        if let Some(section) = ini.section(Some(section_name)) {
            if let Some(command) = section.get("command") {
                config.git.hooks.push((hook_name.to_string(), command.to_string()));
            }
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

fn apply_env_overrides(config: &mut RepoConfig) {
    config.debug = env::debug_enabled();
    let auth = env::auth_override();
    if !auth.is_empty() {
        config.auth = auth;
    }
}
