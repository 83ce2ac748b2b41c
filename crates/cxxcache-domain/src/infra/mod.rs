//! Infra-facing half of the logging facade: registration point only.
//!
//! Nothing here depends on `tracing` or any other concrete backend — that
//! lives in `cxxcache-infrastructure`, which calls [`logging::set_log_fn`]
//! once at startup.

pub mod logging;
