//! cloudmap: declarative mapping of user parameters onto cloud provider
//! requests, with the polling checker and image resolver commands rely on.

pub mod checker;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod mapping;
pub mod output;
pub mod provider;
pub mod resolver;
pub mod retry;
pub mod traits;
