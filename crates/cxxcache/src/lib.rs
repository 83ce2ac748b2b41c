//! # cxxcache
//!
//! The CLI/composition-root crate: wires concrete infrastructure adapters
//! into application services behind domain port trait objects, and exposes
//! `serve`/`index`/`invalidate` subcommands.
#![allow(missing_docs)]

pub mod cli;
pub mod composition;
pub mod logging_init;
pub mod run;

pub use cli::{Cli, Commands};
pub use run::run;
