pub mod barlist;
pub mod spacelens;

pub use barlist::bar_list_lines;
pub use spacelens::{run_spacelens, Effect, Key, SpaceLensState};
