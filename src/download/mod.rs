//! Download collaborator - manifests and the external file-download client

pub mod client;
pub mod manifest;

pub use client::*;
pub use manifest::*;
