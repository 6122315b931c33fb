use crate::types::OwnerId;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use ubyte::{ByteUnit, ToByteUnit};
use validator::Validate;

#[derive(Debug, Clone, Default, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[validate]
    pub executor: Executor,
}

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct Executor {
    /// Owner of sealed artifacts. Defaults to the identity of the service.
    pub privileged_uid: Option<u32>,
    pub privileged_gid: Option<u32>,

    /// Upper bound of the build log copied into `BuildResult::output`.
    pub log_limit: ByteUnit,

    #[validate]
    pub compilers: Compilers,

    #[validate]
    pub runtimes: Runtimes,
}

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct Compilers {
    #[validate(length(min = 1))]
    pub javac: String,

    #[validate(length(min = 1))]
    pub solution: String,
}

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct Runtimes {
    #[validate(length(min = 1))]
    pub java: String,

    /// Interpreter prefix, the builder's `lang` option is appended.
    #[validate(length(min = 1))]
    pub python: String,
}

impl Default for Executor {
    fn default() -> Self {
        Self {
            privileged_uid: None,
            privileged_gid: None,
            log_limit: 64.kibibytes(),
            compilers: Compilers::default(),
            runtimes: Runtimes::default(),
        }
    }
}

impl Default for Compilers {
    fn default() -> Self {
        Self {
            javac: "javac".into(),
            solution: "heng_build_solution".into(),
        }
    }
}

impl Default for Runtimes {
    fn default() -> Self {
        Self {
            java: "java".into(),
            python: "python".into(),
        }
    }
}

impl Executor {
    pub fn privileged_id(&self) -> OwnerId {
        let current = OwnerId::current();
        OwnerId {
            uid: self.privileged_uid.unwrap_or(current.uid),
            gid: self.privileged_gid.unwrap_or(current.gid),
        }
    }

    pub fn log_limit(&self) -> usize {
        self.log_limit.as_u64() as usize
    }
}

static GLOBAL_CONFIG: OnceCell<Config> = OnceCell::new();

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: path = {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Config> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn init_from_file(path: impl AsRef<Path>) -> Result<&'static Config> {
        Self::from_file(path)?.install()
    }

    pub fn install(self) -> Result<&'static Config> {
        if GLOBAL_CONFIG.set(self).is_err() {
            anyhow::bail!("global config has been installed")
        }
        Ok(Self::global())
    }

    /// Falls back to the default config when none has been installed.
    pub fn global() -> &'static Config {
        GLOBAL_CONFIG.get_or_init(Config::default)
    }
}
