//! Database entities for lastweek.
//!
//! Laid out the way `sea-orm-cli generate entity` would, plus [`schema`] for
//! bootstrapping the tables on a fresh database.

pub mod prelude;

pub mod schema;
pub mod snippet;
pub mod tag;
pub mod tagged_snippet;
pub mod user;
