//! Unit-level tests for the bin crate's own code (CLI parsing, composition
//! wiring against a tempdir-backed SQLite database).

mod cli_parsing;
mod composition_smoke;
