use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

use crate::client::ClientConfig;

pub(crate) const DEFAULT_URL: &str = "https://agnitio.emsicloud.com/";
pub(crate) const DEFAULT_AUTH_URL: &str = "https://auth.emsicloud.com/connect/token";

pub const USER_VAR: &str = "LCAPI_USER";
pub const PASS_VAR: &str = "LCAPI_PASS";

#[derive(Debug, Default)]
struct RcConfig {
    username: Option<String>,
    password: Option<String>,
    url: Option<String>,
    auth_url: Option<String>,
    verify: Option<bool>,
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

pub(crate) fn load_config(
    username: Option<String>,
    password: Option<String>,
    url: Option<String>,
) -> Result<ClientConfig> {
    let mut username = username.or_else(|| env_nonempty(USER_VAR));
    let mut password = password.or_else(|| env_nonempty(PASS_VAR));
    let mut url = url.or_else(|| env_nonempty("LCAPI_URL"));
    let mut auth_url = env_nonempty("LCAPI_AUTH_URL");

    let rc_candidates = rc_candidates();
    let mut file_verify: Option<bool> = None;

    if username.is_none() || password.is_none() || url.is_none() || auth_url.is_none() {
        for rc_path in &rc_candidates {
            if rc_path.exists() {
                let cfg = read_rc(rc_path).with_context(|| {
                    format!("failed to read configuration file {}", rc_path.display())
                })?;
                log::debug!("loaded settings from {}", rc_path.display());

                username = username.or(cfg.username);
                password = password.or(cfg.password);
                url = url.or(cfg.url);
                auth_url = auth_url.or(cfg.auth_url);
                file_verify = cfg.verify;
                break;
            }
        }
    }

    let (username, password) = match (username, password) {
        (Some(u), Some(p)) => (u, p),
        _ => {
            if !rc_candidates.is_empty() {
                bail!(
                    "Please set {} and {} environment variables (or put `username:` and `password:` in one of: {})",
                    USER_VAR,
                    PASS_VAR,
                    rc_candidates
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            bail!(
                "Please set {} and {} environment variables",
                USER_VAR,
                PASS_VAR
            );
        }
    };

    Ok(ClientConfig {
        username,
        password,
        url: url.unwrap_or_else(|| DEFAULT_URL.to_string()),
        auth_url: auth_url.unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
        verify: file_verify.unwrap_or(true),
    })
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_rc(&text))
}

fn parse_rc(text: &str) -> RcConfig {
    let mut cfg = RcConfig::default();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // URLs contain ':' too, so only the first one separates key from value.
        let Some((k, v)) = line.split_once(':') else {
            continue;
        };
        let v = strip_quotes(v.trim());
        if v.is_empty() {
            continue;
        }
        match k.trim() {
            "username" | "user" | "client_id" => cfg.username = Some(v.to_string()),
            "password" | "pass" | "client_secret" => cfg.password = Some(v.to_string()),
            "url" => cfg.url = Some(v.to_string()),
            "auth_url" => cfg.auth_url = Some(v.to_string()),
            "verify" => cfg.verify = Some(v != "0"),
            _ => {}
        }
    }

    cfg
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // 1) LCAPI_RC (explicit)
    // 2) ./.lightcastrc
    // 3) ~/.lightcastrc
    if let Ok(p) = std::env::var("LCAPI_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".lightcastrc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".lightcastrc"));
    }
    v
}
