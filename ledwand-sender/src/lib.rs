//! # ledwand-sender: LED wall frame sender
//!
//! Service that pulls greyscale frames from a configured source, dithers
//! them to 1 bit per pixel and streams them to the display wall over UDP
//! at a fixed frame rate.
//!
//! ## Modes
//!
//! - **Live**: send to the configured display address.
//! - **Dry run**: decode every packet into `trace` logs instead (`--dry-run`).

pub mod config;
pub mod dry_run;
pub mod service;
