//! Audio marketplace ingestion.
//!
//! Upload flow:
//! 1. The client posts a listing with an audio file
//! 2. The validator accepts or rejects by extension and size
//! 3. Metadata is extracted (degrading to fallback values on parse failure)
//! 4. Asset bytes are persisted to media storage
//! 5. Asset, metadata, and product records are committed in one transaction
//!
//! Metadata for assets stored without it is computed lazily on first read.

mod file_store;
mod manager;
mod models;
mod schema;
mod store;

pub use file_store::MediaStore;
pub use manager::{IngestionError, IngestionManager};
pub use models::{AudioAsset, Product, ProductDraft};
pub use schema::{MARKET_SCHEMA_SQL, MARKET_SCHEMA_VERSION};
pub use store::{MarketStore, SqliteMarketStore};
