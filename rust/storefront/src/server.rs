use crate::{
    config::AppConfig,
    customs::{NewCustomOrderRequest, StatusUpdate},
    db,
    error::{Result, ServiceError},
    models::{CustomOrder, Product, ProductId, ProductInput},
    query::{self, FilterParams, TranslateResponse},
    search::ProductPage,
    state::AppState,
    store::PgStore,
};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Header carrying the authenticated caller's user id, set by the upstream auth gateway.
pub const USER_ID_HEADER: &str = "x-user-id";
pub const API_KEY_HEADER: &str = "x-api-key";

pub struct Server {
    config: Arc<AppConfig>,
    state: AppState,
}

impl Server {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let pool = db::connect_pool(&config).await?;
        let store = Arc::new(PgStore::new(pool));
        let config = Arc::new(config);
        let state = AppState::new(Arc::clone(&config), store.clone(), store);

        Ok(Self { config, state })
    }

    pub fn from_state(state: AppState) -> Self {
        Self {
            config: Arc::clone(&state.config),
            state,
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/healthz", get(Self::health))
            .route(
                "/api/products",
                get(Self::search_products).post(Self::create_product),
            )
            .route("/api/products/translate", post(Self::translate))
            .route(
                "/api/products/:id",
                get(Self::get_product)
                    .put(Self::update_product)
                    .delete(Self::delete_product),
            )
            .route(
                "/api/customs",
                get(Self::list_customs).post(Self::create_custom),
            )
            .route("/api/customs/:id/status", patch(Self::update_custom_status))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.listen_addr;
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "storefront listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    async fn health() -> Json<serde_json::Value> {
        Json(json!({ "status": "ok" }))
    }

    async fn search_products(
        State(state): State<AppState>,
        headers: HeaderMap,
        Query(pairs): Query<Vec<(String, String)>>,
    ) -> Result<Json<ProductPage>> {
        enforce_api_key(&headers, &state.config)?;
        let params = FilterParams::from_query_pairs(pairs)?;
        let page = state.search.search(&params).await?;
        Ok(Json(page))
    }

    async fn translate(
        State(state): State<AppState>,
        headers: HeaderMap,
        Json(params): Json<FilterParams>,
    ) -> Result<Json<TranslateResponse>> {
        enforce_api_key(&headers, &state.config)?;
        Ok(Json(query::translate(&params)))
    }

    async fn get_product(
        State(state): State<AppState>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Result<Json<Product>> {
        enforce_api_key(&headers, &state.config)?;
        let product = state.catalog.product(ProductId(id)).await?;
        Ok(Json(product))
    }

    async fn create_product(
        State(state): State<AppState>,
        headers: HeaderMap,
        Json(input): Json<ProductInput>,
    ) -> Result<(StatusCode, Json<Product>)> {
        enforce_api_key(&headers, &state.config)?;
        let user_id = caller_id(&headers)?;
        let product = state.catalog.create(user_id, input).await?;
        Ok((StatusCode::CREATED, Json(product)))
    }

    async fn update_product(
        State(state): State<AppState>,
        headers: HeaderMap,
        Path(id): Path<i64>,
        Json(input): Json<ProductInput>,
    ) -> Result<Json<Product>> {
        enforce_api_key(&headers, &state.config)?;
        let product = state.catalog.update(ProductId(id), input).await?;
        Ok(Json(product))
    }

    async fn delete_product(
        State(state): State<AppState>,
        headers: HeaderMap,
        Path(id): Path<i64>,
    ) -> Result<Json<Product>> {
        enforce_api_key(&headers, &state.config)?;
        let user_id = caller_id(&headers)?;
        let product = state.catalog.delete(ProductId(id), user_id).await?;
        Ok(Json(product))
    }

    async fn create_custom(
        State(state): State<AppState>,
        headers: HeaderMap,
        Json(request): Json<NewCustomOrderRequest>,
    ) -> Result<Json<CustomOrder>> {
        enforce_api_key(&headers, &state.config)?;
        let user_id = caller_id(&headers)?;
        let order = state.customs.create(user_id, request).await?;
        Ok(Json(order))
    }

    async fn list_customs(
        State(state): State<AppState>,
        headers: HeaderMap,
    ) -> Result<Json<Vec<CustomOrder>>> {
        enforce_api_key(&headers, &state.config)?;
        let user_id = caller_id(&headers)?;
        let orders = state.customs.list_for_user(user_id).await?;
        Ok(Json(orders))
    }

    async fn update_custom_status(
        State(state): State<AppState>,
        headers: HeaderMap,
        Path(id): Path<i64>,
        Json(update): Json<StatusUpdate>,
    ) -> Result<Json<CustomOrder>> {
        enforce_api_key(&headers, &state.config)?;
        let order = state.customs.update_status(id, &update.status).await?;
        Ok(Json(order))
    }
}

fn enforce_api_key(headers: &HeaderMap, config: &AppConfig) -> Result<()> {
    if let Some(expected) = &config.api_key {
        let provided = headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());

        if provided != Some(expected.as_str()) {
            return Err(ServiceError::Auth);
        }
    }

    Ok(())
}

fn caller_id(headers: &HeaderMap) -> Result<i64> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok())
        .ok_or(ServiceError::Auth)
}
