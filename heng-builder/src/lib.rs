#![deny(clippy::all)]

pub mod archiver;
pub mod args;
pub mod builders;
pub mod config;
pub mod container;
pub mod error;
pub mod executable;
pub mod registry;
pub mod types;
pub mod workspace;

pub use self::builders::{Builder, BuilderPtr};
pub use self::config::Config;
pub use self::error::{Error, Result};
pub use self::executable::{Executable, ExecutablePtr};
pub use self::registry::Registry;
pub use self::types::{BuildResult, BuildStatus, Name, OwnerId, ResourceLimits, Source};

use tracing::info;

/// Installs `config` and the builtin registry as globals.
///
/// Must be called once, before the first build and before any call to
/// [`Config::global`], which otherwise installs the default config.
/// Fails if either global has been installed already.
pub fn init(config: Config) -> anyhow::Result<()> {
    config.install()?;

    let registry = Registry::with_builtins().install_global()?;
    info!(builders = ?registry.names(), "registry is installed");

    Ok(())
}
