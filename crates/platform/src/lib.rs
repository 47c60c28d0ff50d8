//! Setting the desktop background.
//!
//! [`WallpaperSetter`] detects the desktop once and delegates to a
//! [`PlatformAdapter`] for it. Adapters for tool-driven desktops never run
//! processes themselves; they go through a [`Shell`], which keeps them
//! testable on any host.

mod adapter;
pub mod detect;
pub mod error;
pub mod fill;
mod setter;
pub mod shell;

pub use crate::adapter::PlatformAdapter;
pub use crate::detect::Desktop;
pub use crate::fill::FillMode;
pub use crate::setter::WallpaperSetter;
pub use crate::shell::{Shell, SystemShell};
