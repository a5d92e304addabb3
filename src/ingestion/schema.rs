//! SQLite schema for marketplace storage.

pub const MARKET_SCHEMA_VERSION: i32 = 1;

/// Applied idempotently on every open.
///
/// `audio_metadata` is keyed by asset id: one metadata row per asset, and
/// the primary key is what makes the lazy-flow get-or-create race benign.
pub const MARKET_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS audio_assets (
    id TEXT PRIMARY KEY,
    original_filename TEXT NOT NULL,
    file_size_bytes INTEGER NOT NULL,
    format TEXT NOT NULL,
    storage_path TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS audio_metadata (
    asset_id TEXT PRIMARY KEY REFERENCES audio_assets(id) ON DELETE CASCADE,
    duration_secs REAL NOT NULL,
    sample_rate INTEGER NOT NULL,
    bit_rate_kbps INTEGER,
    channels INTEGER,
    file_format TEXT NOT NULL,
    file_size_bytes INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS products (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    price_cents INTEGER NOT NULL,
    seller_id TEXT NOT NULL,
    audio_asset_id TEXT REFERENCES audio_assets(id),
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_products_seller ON products(seller_id);
"#;
