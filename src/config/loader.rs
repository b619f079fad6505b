use crate::config::schema::{RunConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up when no config path is given.
pub const DEFAULT_CONFIG_FILE: &str = "extract-interface.toml";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
    ListFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config from {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse config TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse config TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid config ({}): {}", path.display(), source),
                None => write!(f, "invalid config: {}", source),
            },
            ConfigError::ListFile { path, source } => {
                write!(f, "failed to read list file {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
            ConfigError::ListFile { source, .. } => Some(source),
        }
    }
}

/// Parse and validate a config. List files are not read; see
/// [`load_from_path`].
pub fn load_from_str(input: &str) -> Result<RunConfig, ConfigError> {
    let mut config: RunConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    strip_wildcards(&mut config.interface.delete_prefixes);
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

/// Load a config file and merge in the list files it references. Relative
/// list file paths and the log directory are resolved against the config
/// file's directory.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RunConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = load_from_str(&contents).map_err(|error| error.with_path(path))?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    merge_list_files(&mut config, base_dir)?;
    Ok(config)
}

/// Find `extract-interface.toml` in `project_root`, then in the current
/// directory.
pub fn discover_config(project_root: &Path) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok();
    std::iter::once(project_root.to_path_buf())
        .chain(cwd)
        .map(|dir| dir.join(DEFAULT_CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}

/// Read a newline-delimited list: entries are trimmed and blank lines
/// dropped.
pub fn read_list_file(path: &Path) -> Result<Vec<String>, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ListFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_list(&contents))
}

pub fn parse_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Wildcard prefixes may be written as `using System*`; the trailing `*`
/// is implied.
fn strip_wildcards(prefixes: &mut [String]) {
    for prefix in prefixes.iter_mut() {
        let trimmed = prefix.trim_end_matches('*').trim_end().len();
        prefix.truncate(trimmed);
    }
}

fn merge_list_files(config: &mut RunConfig, base_dir: &Path) -> Result<(), ConfigError> {
    let resolve = |p: &Path| {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            base_dir.join(p)
        }
    };

    if let Some(file) = &config.classes.ignore_file {
        let entries = read_list_file(&resolve(file))?;
        config.classes.ignore.extend(entries);
    }
    if let Some(file) = &config.classes.base_exempt_file {
        let entries = read_list_file(&resolve(file))?;
        config.classes.base_exempt.extend(entries);
    }
    if let Some(file) = &config.interface.delete_lines_file {
        let entries = read_list_file(&resolve(file))?;
        config.interface.delete_lines.extend(entries);
    }
    if let Some(file) = &config.interface.delete_prefixes_file {
        let entries = read_list_file(&resolve(file))?;
        config.interface.delete_prefixes.extend(entries);
    }
    strip_wildcards(&mut config.interface.delete_prefixes);

    if let Some(dir) = &config.log.dir {
        config.log.dir = Some(resolve(dir));
    }

    Ok(())
}
