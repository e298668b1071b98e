//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// File configuration for olyshare defaults.
///
/// Every field is optional; a value set on the command line always wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Camera base URL.
    pub cam_ip: Option<String>,
    /// Image folder on the camera.
    pub image_dir: Option<String>,
    /// Response cache directory.
    pub cache_dir: Option<PathBuf>,
    /// Disable the response cache.
    pub no_cache: Option<bool>,
    /// Destination directory.
    pub out_dir: Option<PathBuf>,
    /// Retention window in days.
    pub copy_days: Option<i64>,
    /// Worker count.
    pub import_routines: Option<usize>,
    /// Skip movie files.
    pub skip_movie: Option<bool>,
    /// Skip raw files.
    pub skip_raw: Option<bool>,
    /// Extra content types to skip, comma separated in the file.
    pub skip_types: Option<Vec<String>>,
    /// Skip files without a capture time.
    pub skip_undated: Option<bool>,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// HTTP request timeout in seconds.
    pub read_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(cam_ip) = &self.cam_ip
            && !(cam_ip.starts_with("http://") || cam_ip.starts_with("https://"))
        {
            bail!(
                "Invalid config value for `cam_ip`: '{cam_ip}'. Expected an http:// or https:// URL"
            );
        }

        if let Some(image_dir) = &self.image_dir
            && image_dir.trim_matches('/').is_empty()
        {
            bail!("Invalid config value for `image_dir`: '{image_dir}'. Expected a folder such as \"/DCIM/100OLYMP\"");
        }

        if let Some(skip_types) = &self.skip_types
            && let Some(bad) = skip_types.iter().find(|t| !t.contains('/'))
        {
            bail!("Invalid config value for `skip_types`: '{bad}'. Expected a media type such as \"video/quicktime\"");
        }

        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;

        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/olyshare/config.toml`
/// 2. `$HOME/.config/olyshare/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("olyshare")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("olyshare")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file.
///
/// An explicit path must exist; the default path is optional.
pub fn load_file_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = read_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(config),
        });
    }

    let path = resolve_default_config_path();
    let Some(path_ref) = path.as_deref() else {
        return Ok(LoadedConfig { path, config: None });
    };

    if !path_ref.exists() {
        return Ok(LoadedConfig { path, config: None });
    }

    let config = read_file_config(path_ref)?;
    Ok(LoadedConfig {
        path,
        config: Some(config),
    })
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {}", line_index + 1);

        match key {
            "cam_ip" => cfg.cam_ip = Some(parse_string_literal(value).with_context(invalid)?),
            "image_dir" => {
                cfg.image_dir = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "cache_dir" => {
                cfg.cache_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "no_cache" => cfg.no_cache = Some(parse_boolean(value).with_context(invalid)?),
            "out_dir" => {
                cfg.out_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "copy_days" => cfg.copy_days = Some(parse_integer_i64(value).with_context(invalid)?),
            "import_routines" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                let n = usize::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("import_routines out of range for usize"))?;
                cfg.import_routines = Some(n);
            }
            "skip_movie" => cfg.skip_movie = Some(parse_boolean(value).with_context(invalid)?),
            "skip_raw" => cfg.skip_raw = Some(parse_boolean(value).with_context(invalid)?),
            "skip_types" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.skip_types = Some(
                    parsed
                        .split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(ToString::to_string)
                        .collect(),
                );
            }
            "skip_undated" => {
                cfg.skip_undated = Some(parse_boolean(value).with_context(invalid)?);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            unknown => {
                bail!(
                    "Unknown configuration key: '{}' on line {}",
                    unknown,
                    line_index + 1
                );
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_i64(raw_value: &str) -> Result<i64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    Ok(token.parse::<i64>()?)
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}
