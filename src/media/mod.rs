//! ffmpeg boundary: structured filter graphs, command building and process execution.
pub(crate) mod command;
pub(crate) mod graph;
pub(crate) mod runner;
