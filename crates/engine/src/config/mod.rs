//! Runtime configuration for the parser, converter, dispatcher and plugin host.
//! This module handles parsing and validation of the
//! ~/.config/parley/config.json configuration file.

mod io;
mod model;
mod validation;

pub use io::{CONFIG_PATH_ENV, default_config_path, load_config, load_config_from_path, save_config_to_path};
pub use model::{ConverterConfig, DispatcherConfig, ParleyConfig, PluginsConfig};
pub use validation::{ValidationError, validate_config};
