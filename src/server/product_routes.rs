//! Product HTTP routes.
//!
//! Provides endpoints for:
//! - Creating a product listing with an audio upload (multipart)
//! - Fetching a product
//! - Fetching a product's audio metadata, computed lazily when missing

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::state::{GuardedIngestionManager, ServerState};
use crate::audio::AudioMetadata;
use crate::ingestion::{IngestionError, Product, ProductDraft};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedProductResponse {
    pub product: Product,
    pub audio_metadata: AudioMetadata,
}

fn error_response(err: IngestionError) -> Response {
    match err {
        // Validation rejections carry the precise client-visible reason.
        IngestionError::Rejected(_) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )
            .into_response(),
        IngestionError::ProductNotFound(_) | IngestionError::AssetNotFound(_) => {
            StatusCode::NOT_FOUND.into_response()
        }
        IngestionError::Internal(_) | IngestionError::Io(_) => {
            warn!("Ingestion failure: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Internal server error".to_string(),
                }),
            )
                .into_response()
        }
    }
}

// =============================================================================
// Routes
// =============================================================================

/// POST /product - Create a product from a multipart listing + audio upload.
async fn create_product(
    State(manager): State<GuardedIngestionManager>,
    mut multipart: Multipart,
) -> Response {
    let mut draft = ProductDraft::default();
    let mut seller: Option<String> = None;
    let mut filename: Option<String> = None;
    let mut data: Option<Vec<u8>> = None;

    // Process multipart fields
    while let Ok(Some(field)) = multipart.next_field().await {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "audio_file" => {
                filename = field.file_name().map(|s| s.to_string());
                match field.bytes().await {
                    Ok(bytes) => data = Some(bytes.to_vec()),
                    Err(e) => {
                        warn!("Failed to read file data: {}", e);
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(ErrorResponse {
                                error: "Failed to read file".to_string(),
                            }),
                        )
                            .into_response();
                    }
                }
            }
            "title" => {
                if let Ok(bytes) = field.bytes().await {
                    draft.title = String::from_utf8_lossy(&bytes).to_string();
                }
            }
            "description" => {
                if let Ok(bytes) = field.bytes().await {
                    draft.description = String::from_utf8_lossy(&bytes).to_string();
                }
            }
            "price_cents" => {
                if let Ok(bytes) = field.bytes().await {
                    if let Ok(price) = String::from_utf8_lossy(&bytes).parse() {
                        draft.price_cents = price;
                    }
                }
            }
            "seller" => {
                if let Ok(bytes) = field.bytes().await {
                    let value = String::from_utf8_lossy(&bytes).to_string();
                    if !value.is_empty() {
                        seller = Some(value);
                    }
                }
            }
            _ => {}
        }
    }

    let filename = match filename {
        Some(f) if !f.is_empty() => f,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "No audio file provided".to_string(),
                }),
            )
                .into_response();
        }
    };

    let data = match data {
        Some(d) if !d.is_empty() => d,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "No file data provided".to_string(),
                }),
            )
                .into_response();
        }
    };

    let seller = match seller {
        Some(s) => s,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "No seller provided".to_string(),
                }),
            )
                .into_response();
        }
    };

    if draft.title.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "No title provided".to_string(),
            }),
        )
            .into_response();
    }

    debug!(
        "Seller {} uploading {} ({} bytes)",
        seller,
        filename,
        data.len()
    );

    match manager
        .create_product_with_upload(&seller, draft, &filename, data)
        .await
    {
        Ok((product, audio_metadata)) => {
            info!("Created product {} for seller {}", product.id, seller);
            (
                StatusCode::CREATED,
                Json(CreatedProductResponse {
                    product,
                    audio_metadata,
                }),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

/// GET /product/:id - Fetch a product.
async fn get_product(
    State(manager): State<GuardedIngestionManager>,
    Path(id): Path<String>,
) -> Response {
    match manager.get_product(&id) {
        Ok(Some(product)) => Json(product).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /product/:id/audio-metadata - Fetch metadata, extracting lazily on
/// first request. 404 when the product is missing or has no audio asset.
async fn get_product_audio_metadata(
    State(manager): State<GuardedIngestionManager>,
    Path(id): Path<String>,
) -> Response {
    match manager.product_audio_metadata(&id).await {
        Ok(metadata) => Json(metadata).into_response(),
        Err(e) => error_response(e),
    }
}

// =============================================================================
// Router Construction
// =============================================================================

/// Build the product routes.
///
/// - POST /product - Create a listing with an audio upload
/// - GET /product/:id - Fetch a product
/// - GET /product/:id/audio-metadata - Fetch (lazily computed) metadata
pub fn product_routes() -> Router<ServerState> {
    // Body limit with headroom over the policy limit; the 50 MiB acceptance
    // cap is enforced by the validator.
    let upload_route = Router::new()
        .route("/product", post(create_product))
        .layer(DefaultBodyLimit::max(64 * 1024 * 1024));

    Router::new()
        .merge(upload_route)
        .route("/product/{id}", get(get_product))
        .route(
            "/product/{id}/audio-metadata",
            get(get_product_audio_metadata),
        )
}
