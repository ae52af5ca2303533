//! BazarXpress storefront core - cart pricing and variant matrix service

use anyhow::Result;
use axum::{extract::{Path, State}, http::StatusCode, routing::{get, post, put}, Json, Router};
use bazarxpress_core::{
    calculate_totals, config::load_app_config, AppConfig, CartLineItem, CartProduct, CartTotals, FileCartStorage,
    PersistentCart, ProductVariantsDraft, Sku, StorageError, StorefrontError, VariantMatrix,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use validator::Validate;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// One lock per session, serializing read-modify-write cycles on that session's cart file.
    cart_locks: Arc<std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self { Self { config: Arc::new(config), cart_locks: Arc::default() } }

    /// Returns the lock for `session`, dropping entries nobody else holds.
    fn session_lock(&self, session: &str) -> Arc<Mutex<()>> {
        let mut locks = self.cart_locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(session.to_string()).or_default().clone()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_app_config()?;
    let default_filter = config.log_level.clone();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let bind_addr = config.bind_addr;
    tracing::info!(data_dir = %config.data_dir.display(), max_variant_combinations = config.max_variant_combinations, "configuration loaded");
    let app = router(AppState::new(config));

    tracing::info!("BazarXpress core listening on {}", bind_addr);
    axum::serve(tokio::net::TcpListener::bind(bind_addr).await?, app).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "bazarxpress-core"})) }))
        .route("/api/v1/cart/:session", get(get_cart).post(add_to_cart).delete(clear_cart))
        .route("/api/v1/cart/:session/items/:id", put(update_quantity).delete(remove_item))
        .route("/api/v1/cart/totals", post(cart_totals))
        .route("/api/v1/variants/regenerate", post(regenerate_variants))
        .route("/api/v1/variants/bulk", post(bulk_update_variants))
        .route("/api/v1/variants/sku", post(generate_sku))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

type ApiError = (StatusCode, String);

fn reject(e: StorefrontError) -> ApiError {
    let status = match &e {
        StorefrontError::Variant(_) | StorefrontError::Pricing(_) => StatusCode::UNPROCESSABLE_ENTITY,
        StorefrontError::Storage(StorageError::InvalidSession(_)) => StatusCode::BAD_REQUEST,
        StorefrontError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() { tracing::error!(error = %e, "request failed"); }
    (status, e.to_string())
}

#[derive(Debug, Serialize)]
pub struct CartView { pub items: Vec<CartLineItem>, pub totals: CartTotals, pub item_count: u64 }

/// Opens the session cart, applies `op`, persists and renders it.
async fn with_cart<F>(s: &AppState, session: String, op: F) -> Result<CartView, ApiError>
where
    F: FnOnce(&mut PersistentCart<FileCartStorage>) -> Result<(), StorageError> + Send + 'static,
{
    let lock = s.session_lock(&session);
    let _guard = lock.lock().await;
    let root = s.config.data_dir.clone();
    let policy = s.config.pricing.clone();
    tokio::task::spawn_blocking(move || -> bazarxpress_core::Result<CartView> {
        let mut cart = PersistentCart::open(FileCartStorage::for_session(&root, &session)?)?;
        op(&mut cart)?;
        for event in cart.take_events() { tracing::info!(session = %session, ?event, "cart event"); }
        Ok(CartView { items: cart.items().to_vec(), totals: cart.totals(&policy)?, item_count: cart.cart().item_count() })
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    .map_err(reject)
}

async fn get_cart(State(s): State<AppState>, Path(session): Path<String>) -> Result<Json<CartView>, ApiError> {
    with_cart(&s, session, |_| Ok(())).await.map(Json)
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddToCartRequest {
    #[validate(length(min = 1))] pub id: String,
    #[validate(length(min = 1))] pub name: String,
    pub price: Decimal,
    #[serde(default)] pub image: String,
    #[serde(default)] pub category: String,
    pub brand: Option<String>,
    pub weight: Option<String>,
}

impl From<AddToCartRequest> for CartProduct {
    fn from(r: AddToCartRequest) -> Self {
        CartProduct { id: r.id, name: r.name, price: r.price, image: r.image, category: r.category, brand: r.brand, weight: r.weight }
    }
}

async fn add_to_cart(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<AddToCartRequest>) -> Result<(StatusCode, Json<CartView>), ApiError> {
    r.validate().map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let product = CartProduct::from(r);
    let view = with_cart(&s, session, move |c| c.add_to_cart(product)).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn clear_cart(State(s): State<AppState>, Path(session): Path<String>) -> Result<StatusCode, ApiError> {
    with_cart(&s, session, |c| c.clear_cart()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)] pub struct UpdateQuantityRequest { pub quantity: i64 }

async fn update_quantity(State(s): State<AppState>, Path((session, id)): Path<(String, String)>, Json(r): Json<UpdateQuantityRequest>) -> Result<Json<CartView>, ApiError> {
    with_cart(&s, session, move |c| c.update_quantity(&id, r.quantity)).await.map(Json)
}

async fn remove_item(State(s): State<AppState>, Path((session, id)): Path<(String, String)>) -> Result<Json<CartView>, ApiError> {
    with_cart(&s, session, move |c| c.remove_from_cart(&id)).await.map(Json)
}

async fn cart_totals(State(s): State<AppState>, Json(items): Json<Vec<CartLineItem>>) -> Result<Json<CartTotals>, ApiError> {
    calculate_totals(&items, &s.config.pricing).map(Json).map_err(|e| reject(e.into()))
}

fn load_matrix(s: &AppState, draft: ProductVariantsDraft) -> Result<VariantMatrix, ApiError> {
    let mut matrix = VariantMatrix::from_draft(draft, s.config.max_variant_combinations).map_err(|e| reject(e.into()))?;
    for event in matrix.take_events() { tracing::debug!(?event, "variant event"); }
    Ok(matrix)
}

async fn regenerate_variants(State(s): State<AppState>, Json(draft): Json<ProductVariantsDraft>) -> Result<Json<ProductVariantsDraft>, ApiError> {
    let matrix = load_matrix(&s, draft)?;
    tracing::info!(rows = matrix.rows().len(), "variant matrix regenerated");
    Ok(Json(matrix.to_draft()))
}

#[derive(Debug, Deserialize)]
pub struct BulkVariantRequest { pub draft: ProductVariantsDraft, pub price: Option<Decimal>, pub stock: Option<u32> }

async fn bulk_update_variants(State(s): State<AppState>, Json(r): Json<BulkVariantRequest>) -> Result<Json<ProductVariantsDraft>, ApiError> {
    let mut matrix = load_matrix(&s, r.draft)?;
    if let Some(price) = r.price { matrix.set_all_prices(Some(price)); }
    if let Some(stock) = r.stock { matrix.set_all_stock(Some(stock)); }
    Ok(Json(matrix.to_draft()))
}

#[derive(Debug, Deserialize)] pub struct SkuRequest { pub combination: Vec<String> }
#[derive(Debug, Serialize)] pub struct SkuResponse { pub sku: Sku }

async fn generate_sku(Json(r): Json<SkuRequest>) -> Json<SkuResponse> {
    Json(SkuResponse { sku: Sku::generate(&r.combination) })
}
