//! Scripture data access layer: canonical book index, immutable per-translation
//! verse stores, range queries, a registry that loads translations once and
//! shares them, and the bridge gateway that is the only thing an untrusted
//! presentation surface may call.
pub mod bridge;
pub mod canon;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod query;
pub mod registry;
pub mod source;
pub mod store;

/// The boundary surface handed to the presentation layer.
pub use bridge::{BridgeError, BridgeRequest, BridgeResponse, ErrorKind, Gateway, ScriptureRequest};

/// Error taxonomy shared by every layer below the bridge.
pub use error::ScriptureError;

/// Verse coordinates, verses, and translation identity.
pub use models::{TranslationInfo, Verse, VerseRecord, VerseRef};

/// Range queries over a loaded store.
pub use query::{execute, QueryRange, RangeResult};

/// Loading and sharing of translations.
pub use registry::TranslationRegistry;
pub use source::{DirectorySource, MemorySource, TranslationSource};
pub use store::TranslationStore;
