//! Formatting helpers for terminal output.
//!
//! - **Text**: Unicode-aware width, truncation, and one-line sanitizing of
//!   remote text
//! - **Time**: relative publish times ("3 hours ago")

mod text;
mod time;

pub use text::{display_width, single_line, truncate_to_width};
pub use time::relative_time;
