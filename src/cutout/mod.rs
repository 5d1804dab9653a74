//! Person cutouts: alpha-matted photos and the providers that produce them.
pub(crate) mod matte;
pub(crate) mod provider;
