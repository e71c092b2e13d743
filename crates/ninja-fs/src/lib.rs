//! Filesystem primitives for config-ninja
//!
//! Provides the atomic write-then-rename used by every destination file,
//! tolerant reads that treat a missing file as "never written", and the
//! canonical content checksum used as a change cursor.

pub mod checksum;
pub mod error;
pub mod io;

pub use checksum::compute_checksum;
pub use error::{Error, Result};
pub use io::{read_optional, write_atomic};
