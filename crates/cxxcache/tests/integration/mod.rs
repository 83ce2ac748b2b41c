//! End-to-end tests that spawn the actual `cxxcache` binary.

mod cli_smoke;
