//! Configuration loading and path resolution
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments (`--root`, `--workers`, `--group`)
//! 2. Environment variables (`PCHECK_ROOT_FOLDER`, `PCHECK_CONFIG`)
//! 3. TOML configuration file
//! 4. Compiled defaults
//!
//! A missing TOML file is not an error: the compiled defaults reproduce the
//! classic on-disk layout (`dbconfig.db`, `EMPTY.db`, `dumpfiles/<vendor>/<tech>`,
//! `output/<vendor>/<tech>`) relative to the root folder.

use crate::models::{Group, Technology, Vendor};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "PCHECK_ROOT_FOLDER";

/// Environment variable pointing at a TOML config file
pub const CONFIG_FILE_ENV: &str = "PCHECK_CONFIG";

/// Config file name looked up in the root folder and the user config dir
pub const CONFIG_FILE_NAME: &str = "pcheck.toml";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder all relative paths resolve against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_folder: Option<PathBuf>,

    /// SQLite rule store holding one table per vendor/technology group
    #[serde(default = "default_rule_store")]
    pub rule_store: PathBuf,

    /// Empty database cloned for every output artifact
    #[serde(default = "default_template")]
    pub template: PathBuf,

    /// Upper bound on concurrently processed dump files.
    /// Defaults to the available parallelism.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<usize>,

    /// File extensions recognized as dump files (without the dot)
    #[serde(default = "default_dump_extensions")]
    pub dump_extensions: Vec<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default = "default_groups")]
    pub groups: Vec<GroupConfig>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            rule_store: default_rule_store(),
            template: default_template(),
            max_workers: None,
            dump_extensions: default_dump_extensions(),
            logging: LoggingConfig::default(),
            groups: default_groups(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// One `[[groups]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub vendor: Vendor,
    pub technology: Technology,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dump_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl GroupConfig {
    pub fn group(&self) -> Group {
        Group::new(self.vendor, self.technology)
    }
}

impl From<Group> for GroupConfig {
    fn from(group: Group) -> Self {
        Self {
            vendor: group.vendor,
            technology: group.technology,
            dump_dir: None,
            output_dir: None,
        }
    }
}

fn default_rule_store() -> PathBuf {
    PathBuf::from("dbconfig.db")
}

fn default_template() -> PathBuf {
    PathBuf::from("EMPTY.db")
}

fn default_dump_extensions() -> Vec<String> {
    vec!["mdb".to_string(), "accdb".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_groups() -> Vec<GroupConfig> {
    Group::all().into_iter().map(GroupConfig::from).collect()
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Serialize a config to TOML and write it to `path`
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Create a config file for `pcheck init`.
///
/// An existing file is only replaced when `overwrite` is set.
pub fn init_config_file(path: &Path, config: &TomlConfig, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        return Err(Error::Config(format!(
            "{} already exists; pass --force to replace it",
            path.display()
        )));
    }
    write_toml_config(config, path)
}

/// Locate the config file to load, if any.
///
/// Order: explicit path, `PCHECK_CONFIG`, `<root>/pcheck.toml`, then
/// `<user config dir>/pcheck/pcheck.toml`. An explicit path is returned even
/// if it does not exist so that the caller reports it.
pub fn locate_config_file(cli_path: Option<&Path>, root_hint: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        return Some(PathBuf::from(path));
    }

    if let Some(root) = root_hint {
        let candidate = root.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            return Some(candidate);
        }
    }

    dirs::config_dir()
        .map(|d| d.join("pcheck").join(CONFIG_FILE_NAME))
        .filter(|p| p.exists())
}

/// Load the TOML config, falling back to compiled defaults when no file is found.
///
/// Also returns the file the config came from. Nothing is logged here because
/// the log level itself comes from this config.
pub fn load_or_default(
    cli_path: Option<&Path>,
    root_hint: Option<&Path>,
) -> Result<(TomlConfig, Option<PathBuf>)> {
    match locate_config_file(cli_path, root_hint) {
        Some(path) => Ok((load_toml_config(&path)?, Some(path))),
        None => Ok((TomlConfig::default(), None)),
    }
}

/// Root folder resolution: CLI argument, environment, TOML, current directory
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    PathBuf::from(".")
}

/// Command-line overrides applied on top of the TOML config
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root_folder: Option<PathBuf>,
    pub max_workers: Option<usize>,
    /// Restrict the run to these groups (empty means all configured groups)
    pub groups: Vec<Group>,
}

/// Directories for one group, resolved against the root folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPaths {
    pub group: Group,
    pub dump_dir: PathBuf,
    pub output_dir: PathBuf,
}

/// Fully resolved run settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub root_folder: PathBuf,
    pub rule_store: PathBuf,
    pub template: PathBuf,
    pub max_workers: usize,
    pub dump_extensions: Vec<String>,
    pub log_level: String,
    pub groups: Vec<GroupPaths>,
}

impl Settings {
    /// Merge overrides into the TOML config and validate the result
    pub fn resolve(config: &TomlConfig, overrides: &Overrides) -> Result<Self> {
        let root_folder = resolve_root_folder(overrides.root_folder.as_deref(), config);
        let under_root = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                root_folder.join(p)
            }
        };

        let max_workers = overrides
            .max_workers
            .or(config.max_workers)
            .unwrap_or_else(default_max_workers);
        if max_workers == 0 {
            return Err(Error::Config("max_workers must be at least 1".to_string()));
        }

        let dump_extensions: Vec<String> = config
            .dump_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        if dump_extensions.is_empty() {
            return Err(Error::Config("dump_extensions must not be empty".to_string()));
        }

        let mut seen = Vec::new();
        let mut groups = Vec::new();
        for entry in &config.groups {
            let group = entry.group();
            if seen.contains(&group) {
                return Err(Error::Config(format!("Group {} configured twice", group)));
            }
            seen.push(group);
            if !overrides.groups.is_empty() && !overrides.groups.contains(&group) {
                continue;
            }
            groups.push(GroupPaths {
                group,
                dump_dir: under_root(
                    entry.dump_dir.as_deref().unwrap_or(group.default_dump_dir().as_path()),
                ),
                output_dir: under_root(
                    entry.output_dir.as_deref().unwrap_or(group.default_output_dir().as_path()),
                ),
            });
        }

        for selected in &overrides.groups {
            if !groups.iter().any(|g| g.group == *selected) {
                return Err(Error::Config(format!(
                    "Group {} is not configured",
                    selected
                )));
            }
        }

        if groups.is_empty() {
            return Err(Error::Config("No groups configured".to_string()));
        }

        Ok(Self {
            rule_store: under_root(&config.rule_store),
            template: under_root(&config.template),
            root_folder,
            max_workers,
            dump_extensions,
            log_level: config.logging.level.clone(),
            groups,
        })
    }

    /// Extension given to output artifacts, taken from the template file
    pub fn output_extension(&self) -> String {
        self.template
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "db".to_string())
    }
}

fn default_max_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
