//! Runtime module — daemon lifecycle: boot, serve.

pub mod boot;
pub mod serve;
