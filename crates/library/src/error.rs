//! Error type for library-model operations.

use lc_common::TickTime;
use thiserror::Error;

use crate::asset::AssetKind;

#[derive(Debug, Error)]
pub enum LibraryError {
    /// Something other than a rough cut was asked to own child assets.
    #[error("{kind} assets cannot own child assets")]
    ChildrenOnLeafAsset { kind: AssetKind },

    /// A sub-clip range ends before it starts.
    #[error("sub-clip range is inverted: in {in_point}, out {out_point}")]
    InvalidSubClipRange {
        in_point: TickTime,
        out_point: TickTime,
    },

    /// An operation was asked to derive from the wrong kind of asset.
    #[error("expected a {expected} asset, found {found}")]
    WrongAssetKind {
        expected: &'static str,
        found: AssetKind,
    },
}

pub type LibraryResult<T> = Result<T, LibraryError>;
