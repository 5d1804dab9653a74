//! Title cards: font resolution, text fitting, card planning and painting.
pub(crate) mod fit;
pub(crate) mod fonts;
pub(crate) mod generator;
pub(crate) mod paint;
pub(crate) mod plan;
