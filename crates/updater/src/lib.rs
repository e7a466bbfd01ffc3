// Domain-driven module structure for the compose updater.

// Core infrastructure
pub mod docker;
pub mod client;
pub mod compose;
pub mod conf;

// Domain modules
pub mod restart;
pub mod watch;
pub mod runtime;
