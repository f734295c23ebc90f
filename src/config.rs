use anyhow::{anyhow, Result};
use base64::Engine;
use rand::RngCore;
use std::env;
use std::path::{Path, PathBuf};

/// Cookie lifetime for issued sessions. Three days, matching the lifetime
/// the web client expects.
const DEFAULT_SESSION_TTL_SECS: i64 = 3 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct RefugeConfig {
    pub api_port: u16,
    pub paths: RefugePaths,
    pub session: SessionConfig,
}

impl RefugeConfig {
    pub fn from_env() -> Result<Self> {
        let paths = RefugePaths::discover()?;
        let api_port = env::var("REFUGE_API_PORT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(8080);
        let session = SessionConfig::from_env();
        Ok(Self {
            api_port,
            paths,
            session,
        })
    }

    pub fn new(api_port: u16, paths: RefugePaths, session: SessionConfig) -> Self {
        Self {
            api_port,
            paths,
            session,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Secret keying the session-token MAC. Tokens from previous runs stay
    /// valid only when this is pinned via `REFUGE_SESSION_SECRET`.
    pub secret: String,
    pub ttl_secs: i64,
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let secret = env::var("REFUGE_SESSION_SECRET")
            .ok()
            .filter(|raw| !raw.trim().is_empty())
            .unwrap_or_else(generate_secret);
        let ttl_secs = env::var("REFUGE_SESSION_TTL_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_SESSION_TTL_SECS);
        Self { secret, ttl_secs }
    }

    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs: DEFAULT_SESSION_TTL_SECS,
        }
    }
}

fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::STANDARD_NO_PAD.encode(bytes)
}

#[derive(Debug, Clone, Default)]
pub struct RefugePaths {
    pub base: PathBuf,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
}

impl RefugePaths {
    pub fn discover() -> Result<Self> {
        let exe_path = std::env::current_exe()
            .map_err(|err| anyhow!("failed to resolve current executable: {err}"))?;
        let base = exe_path
            .parent()
            .ok_or_else(|| anyhow!("executable path missing parent"))?
            .to_path_buf();
        Self::from_base_dir(base)
    }

    pub fn from_base_dir<P: AsRef<Path>>(base: P) -> Result<Self> {
        let base = base.as_ref().to_path_buf();
        let data_dir = base.join("data");
        let db_path = data_dir.join("refuge.db");
        Ok(Self {
            base,
            data_dir,
            db_path,
        })
    }
}
