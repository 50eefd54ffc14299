use crate::{Result, SnowflakeId};
use std::sync::Arc;

/// A minimal interface for minting Snowflake IDs.
///
/// [`Issuer`] is generic over this trait so that retry and batch policies can
/// be layered on top of any generator, including test doubles.
///
/// [`Issuer`]: crate::Issuer
pub trait Mint {
    /// Attempts to mint a single ID.
    ///
    /// `tag` is opaque caller metadata (e.g. a client identifier) used for
    /// observability only. It must never influence the minted value.
    ///
    /// # Errors
    ///
    /// Returns an error if no ID can be minted right now. Implementations
    /// must never hand out a placeholder value instead.
    fn try_mint(&self, tag: Option<&str>) -> Result<SnowflakeId>;
}

impl<G: Mint + ?Sized> Mint for &G {
    fn try_mint(&self, tag: Option<&str>) -> Result<SnowflakeId> {
        (**self).try_mint(tag)
    }
}

impl<G: Mint + ?Sized> Mint for Arc<G> {
    fn try_mint(&self, tag: Option<&str>) -> Result<SnowflakeId> {
        (**self).try_mint(tag)
    }
}
