//! Result type for the Coopnet federation substrate

use crate::error::Error;

/// Result type for the Coopnet federation substrate
pub type Result<T> = std::result::Result<T, Error>;
