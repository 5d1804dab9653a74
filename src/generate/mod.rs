//! Image-to-video generation: provider contract, start-frame payloads, polling.
pub(crate) mod payload;
pub(crate) mod poll;
pub(crate) mod provider;
pub(crate) mod runway;
