//! CLI command implementations, one module per area.

pub mod environment;
pub mod modules;
pub mod session;
pub mod wm;

use std::path::{Path, PathBuf};

use quartz_session::config::{default_profile_path, ModuleStore};

/// Open the descriptor store at the explicit path or the default location.
pub(crate) async fn open_store(config: Option<&Path>) -> anyhow::Result<ModuleStore> {
    let path: PathBuf = config
        .map(Path::to_path_buf)
        .unwrap_or_else(default_profile_path);
    Ok(ModuleStore::load(path).await?)
}
