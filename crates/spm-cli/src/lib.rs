//! Command-line front end of the SPM data browser.

pub mod cli;
pub mod commands;
pub mod logging;
mod table;
