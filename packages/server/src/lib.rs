// Restaurant Site Generator - Server Core
//
// HTTP and CLI triggers for the site content pipeline. All pipeline stages
// live in the site-pipeline crate; this crate only wires configuration,
// logging and transport around `Pipeline::generate`.

pub mod config;
pub mod server;

pub use config::*;
