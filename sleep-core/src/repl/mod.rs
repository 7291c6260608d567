//! Operator console shared by host front-ends.
//!
//! Lines are lexed and parsed in [`grammar`] against the table in
//! [`catalog`], executed by [`commands::CommandExecutor`], and `status` output
//! is rendered by [`status::StatusFormatter`].

pub mod catalog;
pub mod commands;
pub mod grammar;
pub mod status;
