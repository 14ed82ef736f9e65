//! HTTP surface of the storefront catalog.

use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequestParts, Path, Query, State,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use validator::Validate;

use crate::domain::value_objects::{ProductId, UserId};
use crate::storefront::{FilterCriteria, FilterParams, ProductDetail, StorefrontListing};
use crate::{CatalogError, CatalogService};

/// Header carrying the authenticated caller, set by the gateway in front of this service.
pub const VIEWER_HEADER: &str = "x-viewer-id";

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(json!({"status": "healthy", "service": "opensase-storefront"})) }))
        .route("/api/v1/products/list", get(list_storefront))
        .route("/api/v1/products/item/:id", get(get_storefront_item))
        .route("/api/v1/products/list/brand/:slug", get(list_brand_storefront))
        .route("/api/v1/products/list/search/:name", get(search_products))
        .route("/api/v1/category/list", get(list_categories))
        .route("/api/v1/brand/list", get(list_brands))
        .route("/api/v1/review/:id", get(list_product_reviews))
        .route("/api/v1/wishlist", get(list_wishlist).post(set_wishlist).delete(clear_wishlist))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The caller's identity when known. A missing or malformed header means anonymous.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewer(pub Option<UserId>);

#[async_trait]
impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let viewer = parts
            .headers
            .get(VIEWER_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<UserId>().ok());
        Ok(Self(viewer))
    }
}

impl Viewer {
    fn required(self) -> Result<UserId, ApiError> {
        self.0.ok_or(ApiError { status: StatusCode::UNAUTHORIZED, message: "Authentication required.".into() })
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        let status = match &err {
            CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
            CatalogError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CatalogError::UpstreamUnavailable(_) => {
                tracing::error!(error = %err, "catalog store unavailable");
                StatusCode::SERVICE_UNAVAILABLE
            }
        };
        Self { status, message: err.to_string() }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: rejection.body_text() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({"success": false, "message": self.message}))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Filter parameters never reject a listing request: a query string that cannot be
/// decoded at all lists with the defaults.
async fn list_storefront(
    State(s): State<AppState>,
    viewer: Viewer,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<Json<StorefrontListing>> {
    let params: FilterParams = match query {
        Ok(Query(pairs)) => pairs.into_iter().collect(),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "undecodable listing query, using defaults");
            FilterParams::default()
        }
    };
    let criteria = FilterCriteria::from_params(&params);
    Ok(Json(s.catalog.list_storefront(&criteria, viewer.0).await?))
}

async fn get_storefront_item(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<ProductDetail>> {
    let id: ProductId = id.parse().map_err(|_| CatalogError::NotFound("product"))?;
    Ok(Json(s.catalog.get_storefront_item(&id).await?))
}

async fn list_brand_storefront(
    State(s): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
) -> ApiResult<Json<StorefrontListing>> {
    Ok(Json(s.catalog.list_brand_storefront(&slug, viewer.0).await?))
}

#[derive(Debug, Validate)]
struct SearchTerm {
    #[validate(length(min = 1, max = 100))]
    name: String,
}

async fn search_products(State(s): State<AppState>, Path(name): Path<String>) -> ApiResult<impl IntoResponse> {
    let term = SearchTerm { name: name.trim().to_string() };
    term.validate().map_err(|e| CatalogError::InvalidRequest(e.to_string()))?;
    let hits = s.catalog.search_products(&term.name).await?;
    let count = hits.len();
    Ok(Json(json!({"results": hits, "count": count})))
}

async fn list_categories(State(s): State<AppState>) -> ApiResult<impl IntoResponse> {
    let categories = s.catalog.list_categories().await?;
    let count = categories.len();
    Ok(Json(json!({"results": categories, "count": count})))
}

async fn list_brands(State(s): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(json!({"brands": s.catalog.list_brands().await?})))
}

async fn list_product_reviews(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<impl IntoResponse> {
    let reviews = match id.parse::<ProductId>() {
        Ok(id) => s.catalog.list_product_reviews(&id).await?,
        Err(_) => Vec::new(),
    };
    let count = reviews.len();
    Ok(Json(json!({"results": reviews, "count": count})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WishlistRequest {
    product: ProductId,
    is_liked: bool,
}

async fn set_wishlist(
    State(s): State<AppState>,
    viewer: Viewer,
    payload: Result<Json<WishlistRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let viewer = viewer.required()?;
    let Json(req) = payload?;
    let entry = s.catalog.set_wishlist(viewer, req.product, req.is_liked).await?;
    Ok(Json(json!({"success": true, "wishlist": entry})))
}

async fn list_wishlist(State(s): State<AppState>, viewer: Viewer) -> ApiResult<Json<StorefrontListing>> {
    let viewer = viewer.required()?;
    Ok(Json(s.catalog.list_wishlist(viewer).await?))
}

async fn clear_wishlist(State(s): State<AppState>, viewer: Viewer) -> ApiResult<impl IntoResponse> {
    let viewer = viewer.required()?;
    let removed = s.catalog.clear_wishlist(viewer).await?;
    Ok(Json(json!({"success": true, "removed": removed})))
}
