//! robots.txt compliance.
//!
//! [`parser`] turns a robots.txt body into per-agent decisions and
//! [`RobotsResolver`] fetches, selects and caches the one that applies.

pub mod parser;
pub mod resolver;

pub use parser::parse;
pub use resolver::{RobotsResolver, SERVER_ERROR_MAX_AGE, TIMEOUT_MAX_AGE};
