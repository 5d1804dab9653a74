//! Request sequencing, per-user exclusion and on-disk artifact housekeeping.
pub(crate) mod locks;
pub(crate) mod orchestrator;
pub(crate) mod workspace;
