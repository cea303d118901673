//! CLI commands

pub mod inspect;
pub mod run;
