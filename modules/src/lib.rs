//! Marvin IRC Bot Modules
//!
//! This crate provides the modules shipped with the bot.

pub mod help;
pub mod url;

pub use self::help::HelpModule;
pub use self::url::UrlModule;
