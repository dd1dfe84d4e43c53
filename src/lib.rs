//! Audit one owner's GitHub repositories from the terminal and archive or
//! unarchive them in bulk.

pub mod bulk;
pub mod classify;
pub mod config;
pub mod export;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod refresh;
pub mod remote;
pub mod store;
pub mod tui;
mod tui_shell;

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
