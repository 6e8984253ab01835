pub mod serve;
pub mod status;

use aura_config::{AppConfig, ConfigError};
use std::path::Path;

/// Load configuration from the given file, or the default search path.
pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(p) => AppConfig::load_from(Path::new(p)),
        None => AppConfig::load(),
    }
}
