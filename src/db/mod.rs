//! SQLite translation databases, split across logical submodules.

mod connection;
mod verses;

pub use connection::{create_translation_db, open_translation_db};
pub use verses::{
    fetch_display_name, fetch_verses, install_translation, write_translation, STAGING_SUFFIX,
};
