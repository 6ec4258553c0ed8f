//! Error type shared by buckets and the map.

use thiserror::Error;

/// Why a map or bucket operation failed.
///
/// "Not found" is not an error: lookups report it as [`Position::End`] and
/// removals as a count of zero.
///
/// [`Position::End`]: crate::Position::End
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Error)]
pub enum Error {
    #[error("an entry with an equal key already exists")]
    DuplicateKey,
    #[error("key rejected by the map's ops")]
    InvalidKey,
    #[error("value rejected by the map's ops")]
    InvalidValue,
    #[error("copying a key or value into the map failed")]
    CopyFailed,
    #[error("position is the end or rend sentinel")]
    Sentinel,
    #[error("handle refers to an entry that has been erased")]
    StaleHandle,
    #[error("entry is not linked into an occupied slot of this map")]
    Detached,
    #[error("slot directory allocation failed")]
    AllocFailed,
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
