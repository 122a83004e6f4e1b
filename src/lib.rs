//! lastweek: weekly status snippets, keyed by ISO week, with a web UI and a
//! JSON API.

pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod fill_db;
pub mod handlers;
pub mod macros;
pub mod models;
pub mod pages;
pub mod server;
pub mod sessions;
pub mod tokens;
pub mod utils;
pub mod week;

pub use config::Config;
pub use server::{app, State};
