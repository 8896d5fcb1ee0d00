//! Command handlers

pub mod bookmarks;
pub mod config;
pub mod favicon;
pub mod settings;
pub mod watch;
