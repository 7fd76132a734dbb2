pub use crate::errors::{ConformError, Result};

pub mod check;
pub mod cli;
pub mod config;
pub mod errors;
pub mod governor;
pub mod process;
pub mod report;
pub mod selector;
pub mod session;
pub mod spec;
pub mod stages;
pub mod tally;
