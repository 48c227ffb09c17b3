//! Pure domain logic for the forgeup bootstrap manager.
//!
//! This crate contains no I/O: configuration resolution, the service
//! spec data model, the bootstrap state machine types, the config
//! template renderer, and the directory layout computation. The async
//! machinery that drives all of this lives in `forgeup-bootstrap`.

pub mod config;
pub mod error;
pub mod layout;
pub mod render;
pub mod spec;
pub mod state;
