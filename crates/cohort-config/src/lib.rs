//! Layered configuration for the Cohort component runtime.
//!
//! Precedence, highest first: explicit file, `~/.cohort/config.toml`,
//! embedded defaults. `COHORT_*` environment variables fill only fields no
//! file set.
//!
//! ```no_run
//! use cohort_config::Config;
//!
//! let resolved = Config::load(None)?;
//! println!("{}", resolved.config.logging.level);
//! # Ok::<(), cohort_config::ConfigError>(())
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod env;
mod error;
mod loader;
mod merge;
mod show;
mod types;
mod validate;

use std::path::Path;

pub use env::{ENV_PREFIX, apply_env_fallbacks, collect_env_vars};
pub use error::{ConfigError, ConfigResult};
pub use loader::{load_file, load_with_env};
pub use merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
pub use show::{ResolvedConfig, ShowFormat};
pub use types::{Config, LoggingSection, RegistrySection};
pub use validate::validate;

impl Config {
    /// Load the layered configuration, with an optional explicit file on top.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any file is malformed or the merged
    /// configuration fails validation.
    pub fn load(explicit: Option<&Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit, None)
    }

    /// Like [`Config::load`] but reads user config from `cohort_home`
    /// (the `.cohort` directory itself) instead of `~/.cohort`.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_with_home(
        explicit: Option<&Path>,
        cohort_home: &Path,
    ) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit, Some(cohort_home))
    }
}
