use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};

/// Stores references to all the paths relevant to the indicator daemon, and abstracts access to these files and directories
#[derive(Debug, Clone)]
pub struct IndicatorPaths {
    pub log_file: PathBuf,
    pub log_dir: PathBuf,
    pub ipc_socket_file: PathBuf,
    pub config_dir: PathBuf,
}

impl IndicatorPaths {
    pub fn from_config_dir<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref();
        if config_dir.is_file() {
            bail!("Please provide the path to the config directory, not a file within it")
        }

        if !config_dir.exists() {
            bail!("Configuration directory {} does not exist", config_dir.display());
        }

        let config_dir = config_dir.canonicalize()?;

        let mut hasher = DefaultHasher::new();
        format!("{}", config_dir.display()).hash(&mut hasher);
        // the daemon id keeps the socket path short, no matter how deep the config dir is nested (man 7 unix)
        let daemon_id = format!("{:x}", hasher.finish());

        let ipc_socket_file = std::env::var("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
            .join(format!("indicator-server_{}", daemon_id));

        // 100 as the limit isn't quite 108 everywhere (i.e 104 on BSD or mac)
        if format!("{}", ipc_socket_file.display()).len() > 100 {
            log::warn!("The IPC socket file's absolute path exceeds 100 bytes, the socket may fail to create.");
        }

        let log_dir = match std::env::var("XDG_CACHE_HOME") {
            Ok(cache_home) => PathBuf::from(cache_home),
            Err(_) => home_dir()?.join(".cache"),
        }
        .join("indicator");

        if !log_dir.exists() {
            log::info!("Creating log dir");
            std::fs::create_dir_all(&log_dir).with_context(|| format!("Failed to create log dir {}", log_dir.display()))?;
        }

        Ok(IndicatorPaths {
            config_dir,
            log_file: log_dir.join(format!("indicator_{}.log", daemon_id)),
            log_dir,
            ipc_socket_file,
        })
    }

    /// Paths for the default config dir, `$XDG_CONFIG_HOME/indicator`, which is created if it doesn't exist yet.
    pub fn default() -> Result<Self> {
        let config_dir = match std::env::var("XDG_CONFIG_HOME") {
            Ok(config_home) => PathBuf::from(config_home),
            Err(_) => home_dir()?.join(".config"),
        }
        .join("indicator");

        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config dir {}", config_dir.display()))?;
        }
        Self::from_config_dir(config_dir)
    }

    pub fn get_log_file(&self) -> &Path {
        self.log_file.as_path()
    }

    pub fn get_ipc_socket_file(&self) -> &Path {
        self.ipc_socket_file.as_path()
    }

    pub fn get_config_dir(&self) -> &Path {
        self.config_dir.as_path()
    }

    pub fn get_config_file(&self) -> PathBuf {
        self.config_dir.join("indicator.json")
    }

    /// Remove the IPC socket left behind by a daemon. A socket that is already gone is fine.
    pub fn remove_ipc_socket(&self) -> Result<()> {
        match std::fs::remove_file(&self.ipc_socket_file) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => {
                Err(err).with_context(|| format!("Failed to remove IPC socket {}", self.ipc_socket_file.display()))
            }
            _ => Ok(()),
        }
    }
}

fn home_dir() -> Result<PathBuf> {
    std::env::var("HOME").map(PathBuf::from).context("Neither the XDG base directories nor HOME are set")
}

impl std::fmt::Display for IndicatorPaths {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "config-dir: {}, ipc-socket: {}, log-file: {}",
            self.config_dir.display(),
            self.ipc_socket_file.display(),
            self.log_file.display()
        )
    }
}
