//! SQLite store for marketplace data.
//!
//! Products, audio assets, and audio metadata. The eager upload flow writes
//! all three in one transaction; the lazy flow attaches metadata to an
//! existing asset with get-or-create semantics.

use super::models::{AudioAsset, Product};
use super::schema::{MARKET_SCHEMA_SQL, MARKET_SCHEMA_VERSION};
use crate::audio::{AudioFormat, AudioMetadata};
use anyhow::{bail, Context, Result};
use rusqlite::{params, types::Type, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Trait for marketplace storage operations.
pub trait MarketStore: Send + Sync {
    /// Create an asset, its metadata, and the owning product atomically.
    /// Either all three rows exist afterwards or none do.
    fn create_product_with_audio(
        &self,
        product: &Product,
        asset: &AudioAsset,
        metadata: &AudioMetadata,
    ) -> Result<()>;

    /// Create a product row on its own (e.g. a listing without audio).
    fn create_product(&self, product: &Product) -> Result<()>;

    /// Create an asset row on its own.
    fn create_asset(&self, asset: &AudioAsset) -> Result<()>;

    /// Get a product by ID.
    fn get_product(&self, id: &str) -> Result<Option<Product>>;

    /// Get an asset by ID.
    fn get_asset(&self, id: &str) -> Result<Option<AudioAsset>>;

    /// Get the metadata attached to an asset, if any.
    fn get_metadata(&self, asset_id: &str) -> Result<Option<AudioMetadata>>;

    /// Attach metadata to an asset unless a row already exists, and return
    /// whatever ends up stored. A concurrent creator losing the race gets
    /// the winner's row back instead of a constraint error.
    fn insert_metadata_if_absent(
        &self,
        asset_id: &str,
        metadata: &AudioMetadata,
    ) -> Result<AudioMetadata>;
}

/// SQLite implementation of MarketStore.
#[derive(Debug)]
pub struct SqliteMarketStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMarketStore {
    /// Open or create a marketplace database.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open market database: {:?}", path))?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create the schema on a fresh database and stamp its version; refuse a
    /// database stamped with a version this build does not understand.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        match version {
            0 => {
                conn.execute_batch(MARKET_SCHEMA_SQL)?;
                conn.execute(
                    &format!("PRAGMA user_version = {}", MARKET_SCHEMA_VERSION),
                    [],
                )?;
            }
            v if v == MARKET_SCHEMA_VERSION => {}
            v => bail!(
                "Market database has schema version {}, expected {}",
                v,
                MARKET_SCHEMA_VERSION
            ),
        }
        Ok(())
    }

    fn row_to_product(row: &rusqlite::Row) -> rusqlite::Result<Product> {
        Ok(Product {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            price_cents: row.get("price_cents")?,
            seller_id: row.get("seller_id")?,
            audio_asset_id: row.get("audio_asset_id")?,
            is_active: row.get::<_, i32>("is_active")? != 0,
            created_at: row.get("created_at")?,
        })
    }

    fn row_to_asset(row: &rusqlite::Row) -> rusqlite::Result<AudioAsset> {
        let format_str: String = row.get("format")?;
        let format = AudioFormat::parse(&format_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                Type::Text,
                format!("unknown audio format: {}", format_str).into(),
            )
        })?;
        Ok(AudioAsset {
            id: row.get("id")?,
            original_filename: row.get("original_filename")?,
            file_size_bytes: row.get::<_, i64>("file_size_bytes")? as u64,
            format,
            storage_path: row.get("storage_path")?,
            created_at: row.get("created_at")?,
        })
    }

    fn row_to_metadata(row: &rusqlite::Row) -> rusqlite::Result<AudioMetadata> {
        Ok(AudioMetadata {
            duration_secs: row.get("duration_secs")?,
            sample_rate: row.get::<_, i64>("sample_rate")? as u32,
            bit_rate_kbps: row.get::<_, Option<i64>>("bit_rate_kbps")?.map(|v| v as u32),
            channels: row.get::<_, Option<i64>>("channels")?.map(|v| v as u16),
            file_format: row.get("file_format")?,
            file_size_bytes: row.get::<_, i64>("file_size_bytes")? as u64,
        })
    }

    fn insert_product(conn: &Connection, product: &Product) -> rusqlite::Result<()> {
        conn.execute(
            r#"
            INSERT INTO products (
                id, title, description, price_cents, seller_id,
                audio_asset_id, is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                product.id,
                product.title,
                product.description,
                product.price_cents,
                product.seller_id,
                product.audio_asset_id,
                product.is_active as i32,
                product.created_at,
            ],
        )?;
        Ok(())
    }

    fn insert_asset(conn: &Connection, asset: &AudioAsset) -> rusqlite::Result<()> {
        conn.execute(
            r#"
            INSERT INTO audio_assets (
                id, original_filename, file_size_bytes, format, storage_path, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                asset.id,
                asset.original_filename,
                asset.file_size_bytes as i64,
                asset.format.as_str(),
                asset.storage_path,
                asset.created_at,
            ],
        )?;
        Ok(())
    }

    fn insert_metadata(
        conn: &Connection,
        asset_id: &str,
        metadata: &AudioMetadata,
    ) -> rusqlite::Result<()> {
        conn.execute(
            r#"
            INSERT INTO audio_metadata (
                asset_id, duration_secs, sample_rate, bit_rate_kbps,
                channels, file_format, file_size_bytes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(asset_id) DO NOTHING
            "#,
            params![
                asset_id,
                metadata.duration_secs,
                metadata.sample_rate as i64,
                metadata.bit_rate_kbps.map(|v| v as i64),
                metadata.channels.map(|v| v as i64),
                metadata.file_format,
                metadata.file_size_bytes as i64,
                chrono::Utc::now().timestamp_millis(),
            ],
        )?;
        Ok(())
    }
}

impl MarketStore for SqliteMarketStore {
    fn create_product_with_audio(
        &self,
        product: &Product,
        asset: &AudioAsset,
        metadata: &AudioMetadata,
    ) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        Self::insert_asset(&tx, asset)?;
        Self::insert_metadata(&tx, &asset.id, metadata)?;
        Self::insert_product(&tx, product)?;

        tx.commit()?;
        Ok(())
    }

    fn create_product(&self, product: &Product) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        Self::insert_product(&conn, product)?;
        Ok(())
    }

    fn create_asset(&self, asset: &AudioAsset) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        Self::insert_asset(&conn, asset)?;
        Ok(())
    }

    fn get_product(&self, id: &str) -> Result<Option<Product>> {
        let conn = self.conn.lock().unwrap();
        let result = conn
            .query_row(
                "SELECT * FROM products WHERE id = ?1",
                params![id],
                Self::row_to_product,
            )
            .optional()?;
        Ok(result)
    }

    fn get_asset(&self, id: &str) -> Result<Option<AudioAsset>> {
        let conn = self.conn.lock().unwrap();
        let result = conn
            .query_row(
                "SELECT * FROM audio_assets WHERE id = ?1",
                params![id],
                Self::row_to_asset,
            )
            .optional()?;
        Ok(result)
    }

    fn get_metadata(&self, asset_id: &str) -> Result<Option<AudioMetadata>> {
        let conn = self.conn.lock().unwrap();
        let result = conn
            .query_row(
                "SELECT * FROM audio_metadata WHERE asset_id = ?1",
                params![asset_id],
                Self::row_to_metadata,
            )
            .optional()?;
        Ok(result)
    }

    fn insert_metadata_if_absent(
        &self,
        asset_id: &str,
        metadata: &AudioMetadata,
    ) -> Result<AudioMetadata> {
        let conn = self.conn.lock().unwrap();
        Self::insert_metadata(&conn, asset_id, metadata)?;

        let stored = conn.query_row(
            "SELECT * FROM audio_metadata WHERE asset_id = ?1",
            params![asset_id],
            Self::row_to_metadata,
        )?;
        Ok(stored)
    }
}
