pub mod cancel;
pub mod config;
pub mod errors;
pub mod exec;
pub mod format;
pub mod safety;

pub use cancel::{CancelToken, Cancelled};
pub use errors::{ExecError, ScanError};
pub use exec::{CommandRunner, FnRunner, SystemRunner};
