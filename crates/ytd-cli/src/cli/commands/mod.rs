//! CLI command handlers.

mod check_proxy;
mod fetch;

pub use check_proxy::run_check_proxy;
pub use fetch::run_fetch;
