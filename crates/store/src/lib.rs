pub mod backend;
pub mod error;
mod models;
pub mod path;

pub use crate::backend::NoteStore;
pub use crate::models::{Block, BlockId, Folder, FolderId, NoteId, NoteInfo};
pub use crate::path::{resolve as resolve_folder, validate as validate_folder};
use std::sync::Arc;

pub type StoreHandle = Arc<dyn NoteStore + Send + Sync>;
