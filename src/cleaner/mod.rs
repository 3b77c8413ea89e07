pub mod engine;
pub mod trash;

pub use engine::{clean, CategoryTally, CleanReport, ItemFailure};
pub use trash::{CleanError, SystemTrash, Trash};
