//! Logging macros forwarding to the domain log facade.

mod logging;
