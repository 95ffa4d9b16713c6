//! CLI command implementations

pub(crate) mod common;
pub(crate) mod mark;
pub(crate) mod ping;
pub(crate) mod status;
pub(crate) mod up;
