//! Docker module — bollard client and the domain calls the watcher needs.

pub mod client;
pub mod container;
pub mod event;
pub mod inventory;
pub mod login;
