// Core modules implementing the host boundary: text, records, host access, game state, config, errors.
pub mod chat;
pub mod config;
pub mod error;
pub mod game;
pub mod host;
pub mod record;
pub mod text;
