//! Configuration file parsing for Flutter Bridge
//!
//! Supports:
//! - `.fbridge/config.toml` - Project settings
//! - `.fbridge/state.toml` - Project selection state
//! - User-global `config.toml` / `state.toml`

pub mod settings;
pub mod types;

pub use settings::{
    global_config_path, global_state_path, init_config_dir, load_settings, project_config_path,
    project_state_path, read_toml_or_default, save_settings, write_toml_atomic, FBRIDGE_DIR,
};
pub use types::*;
