pub mod backend;
pub mod error;
mod models;

pub use crate::backend::DataSource;
pub use crate::models::LiteratureEntry;
use crate::backend::FileSource;
use crate::error::Result;
use bibnote_config::SourceConfig;
use std::sync::Arc;

pub type SourceHandle = Arc<dyn DataSource + Send + Sync>;

/// Open the data source described by `config`.
///
/// CSL-JSON library files are the only source that can be configured; live
/// services implement [`DataSource`] themselves and are handed over directly.
pub async fn from_config(config: &SourceConfig) -> Result<SourceHandle> {
    let source = FileSource::from_config(config).await?;
    tracing::info!(source = %source.name(), entries = source.len(), "Opened data source");
    Ok(Arc::new(source))
}
