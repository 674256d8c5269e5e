//! ActFlow IO - Show persistence
//!
//! Reads and writes show files: the acts, scene library and fixture patch of
//! a show, stored as RON or JSON with a format version.

pub mod error;
pub mod show;
pub mod show_format;

pub use error::{IoError, Result};
pub use show::{load_show, save_show, Show};
pub use show_format::{ShowFile, ShowFormat, MAX_SHOW_FILE_SIZE, SHOW_FILE_VERSION};
