use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct ConfigFile {
    pub target: Option<String>,
    pub ports: Option<String>,
    pub services: Option<String>,
    pub wordlist: Option<String>,
    pub extensions: Option<String>,
    #[serde(alias = "threads")]
    pub concurrency: Option<usize>,
    pub timeout: Option<u64>,
    pub secure_ports: Option<String>,
    pub verify_tls: Option<bool>,
    pub user_agent: Option<String>,
    pub progress_interval_ms: Option<u64>,
    pub output: Option<String>,
    pub output_format: Option<String>,
    pub workers: Option<usize>,
    pub no_color: Option<bool>,
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
        .or_else(|| {
            let drive = env::var_os("HOMEDRIVE")?;
            let path = env::var_os("HOMEPATH")?;
            Some(PathBuf::from(drive).join(path))
        })
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(home_dir()?.join(".pathsweep").join("config.yml"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn load_config(path: &PathBuf, allow_missing: bool) -> Result<ConfigFile, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents)
            .map_err(|e| format!("failed to parse config '{}': {e}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("config file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read config '{}': {e}", path.display())),
    }
}

pub fn parse_config(contents: &str) -> Result<ConfigFile, serde_yaml::Error> {
    if contents.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml::from_str::<ConfigFile>(contents)
}

fn default_config_yaml() -> String {
    r#"# Pathsweep config
#
# Location (default):
#   ~/.pathsweep/config.yml

# Target (host name or IP address)
# target: 10.0.0.5

# Ports to sweep. When unset, web ports are taken from the service map,
# falling back to 80,443,8080,8443.
# ports: "80,443"
# services: ./services.json

# Output (optional)
# output: ./paths.json
# output_format: results

# Performance
concurrency: 10
timeout: 5
workers: 4
progress_interval_ms: 1000

# Input
# When unset, ./wordlists/common.txt is used and created on first run.
# wordlist: ./wordlists/big.txt
extensions: "php,html,txt,bak,old,backup"

# HTTP
secure_ports: "443,8443"
# Certificate checks are off in recon mode; set to true to enforce them.
verify_tls: false
# user_agent: "Mozilla/5.0"

# Output styling
no_color: false
"#
    .to_string()
}

pub fn ensure_default_config_file(path: &PathBuf) -> Result<bool, String> {
    if path.exists() {
        return Ok(false);
    }
    let parent = path
        .parent()
        .ok_or_else(|| format!("invalid config path '{}'", path.display()))?;
    std::fs::create_dir_all(parent).map_err(|e| {
        format!(
            "failed to create config directory '{}': {e}",
            parent.display()
        )
    })?;
    let contents = default_config_yaml();
    std::fs::write(path, contents)
        .map_err(|e| format!("failed to write config file '{}': {e}", path.display()))?;
    Ok(true)
}
