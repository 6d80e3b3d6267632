pub mod completion;
pub mod license;
pub mod run;
pub mod serve;
pub mod settings;
pub mod simulate;
pub mod status;

pub use license::LicenseAction;
pub use run::RunArgs;
pub use settings::SettingsAction;

use anyhow::Result;
use autooff_core::settings::{JsonFileStore, Store};
use std::path::PathBuf;
use std::sync::Arc;

/// The JSON file store at `path`, or at `~/.autooff/storage.json`
pub fn open_store(path: Option<PathBuf>) -> Result<Arc<dyn Store>> {
    let path = match path {
        Some(path) => path,
        None => JsonFileStore::default_path()?,
    };
    tracing::debug!("Using storage file: {}", path.display());
    Ok(Arc::new(JsonFileStore::new(path)))
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}
