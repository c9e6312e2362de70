//! Load config from file and environment.

use serde::Deserialize;
use std::path::PathBuf;

/// Daemon configuration. File: ~/.config/voicelink/config.toml or
/// /etc/voicelink/config.toml. Env overrides: VOICELINK_LISTEN_PORT,
/// VOICELINK_PEER, VOICELINK_DIAL_BACKOFF_MS, VOICELINK_REDIAL_ON_DROP.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// TCP listen port (default 45680).
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    /// Peer to dial on startup, as host:port. Optional; without it the
    /// daemon only listens.
    #[serde(default)]
    pub peer: Option<String>,
    /// Delay between failed dial attempts, in milliseconds (default 3000).
    #[serde(default = "default_dial_backoff_ms")]
    pub dial_backoff_ms: u64,
    /// Resume dialing the peer after a mid-session drop (default false).
    #[serde(default)]
    pub redial_on_drop: bool,
}

fn default_listen_port() -> u16 {
    45680
}
fn default_dial_backoff_ms() -> u64 {
    3000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
            peer: None,
            dial_backoff_ms: default_dial_backoff_ms(),
            redial_on_drop: false,
        }
    }
}

/// Load config: merge default, then config file (if present), then env vars.
pub fn load() -> Config {
    let mut c = load_file().unwrap_or_default();
    if let Ok(s) = std::env::var("VOICELINK_LISTEN_PORT") {
        if let Ok(p) = s.parse::<u16>() {
            c.listen_port = p;
        }
    }
    if let Ok(s) = std::env::var("VOICELINK_PEER") {
        if !s.is_empty() {
            c.peer = Some(s);
        }
    }
    if let Ok(s) = std::env::var("VOICELINK_DIAL_BACKOFF_MS") {
        if let Ok(ms) = s.parse::<u64>() {
            c.dial_backoff_ms = ms;
        }
    }
    if let Ok(s) = std::env::var("VOICELINK_REDIAL_ON_DROP") {
        if let Ok(b) = s.parse::<bool>() {
            c.redial_on_drop = b;
        }
    }
    c
}

fn config_paths() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let mut out = Vec::new();
    if let Some(h) = home {
        out.push(h.join(".config/voicelink/config.toml"));
    }
    out.push(PathBuf::from("/etc/voicelink/config.toml"));
    out
}

fn load_file() -> Option<Config> {
    for p in config_paths() {
        if p.exists() {
            if let Ok(s) = std::fs::read_to_string(&p) {
                if let Ok(c) = toml::from_str::<Config>(&s) {
                    return Some(c);
                }
            }
            break;
        }
    }
    None
}
