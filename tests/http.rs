use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;

use opensase_storefront::domain::aggregates::{Brand, Category, Product, Review};
use opensase_storefront::domain::value_objects::{ProductId, Slug, UserId};
use opensase_storefront::http::{router, AppState, VIEWER_HEADER};
use opensase_storefront::repository::InMemoryCatalogStore;
use opensase_storefront::CatalogService;

async fn app() -> (Router, Product) {
    let (router, lamp, _) = app_with_store().await;
    (router, lamp)
}

async fn app_with_store() -> (Router, Product, Arc<InMemoryCatalogStore>) {
    let store = Arc::new(InMemoryCatalogStore::new());
    let brand = Brand::create("Acme", Slug::new("acme").unwrap());
    store.insert_brand(brand.clone()).await;
    let lamp = Product::create("SKU-1", "Desk Lamp", Decimal::new(25, 0)).with_brand(brand.id);
    store.insert_product(lamp.clone()).await;
    store
        .insert_product(Product::create("SKU-2", "Chair", Decimal::new(80, 0)).with_brand(brand.id))
        .await;
    (router(AppState { catalog: CatalogService::new(store.clone()) }), lamp, store)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_reports_service() {
    let (app, _) = app().await;
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn listing_parses_query_string() {
    let (app, lamp) = app().await;
    let (status, body) = send(&app, get("/api/v1/products/list?max=50&sortBy=cheapest&category=nope")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["category"], Value::Null);
    let row = &body["results"][0];
    assert_eq!(row["id"], lamp.id.to_string());
    assert_eq!(row["brand"]["name"], "Acme");
    assert_eq!(row["isDiscounted"], false);
    assert!(row.get("isLiked").is_none());
}

#[tokio::test]
async fn unknown_sort_and_garbage_numbers_still_list() {
    let (app, _) = app().await;
    let (status, body) = send(&app, get("/api/v1/products/list?sortBy=random&min=-3&page=abc")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn repeated_query_keys_keep_the_last_value() {
    let (app, lamp) = app().await;
    let (status, body) = send(&app, get("/api/v1/products/list?max=10&max=50&sortBy=cheapest&sortBy=cheapest")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["id"], lamp.id.to_string());
}

#[tokio::test]
async fn item_detail_and_not_found() {
    let (app, lamp) = app().await;
    let (status, body) = send(&app, get(&format!("/api/v1/products/item/{}", lamp.id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Desk Lamp");
    assert_eq!(body["category"], Value::Null);

    for id in [ProductId::new().to_string(), "not-an-id".to_string()] {
        let (status, body) = send(&app, get(&format!("/api/v1/products/item/{id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn brand_and_search_routes() {
    let (app, lamp) = app().await;
    let (status, body) = send(&app, get("/api/v1/products/list/brand/acme")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (status, _) = send(&app, get("/api/v1/products/list/brand/unknown")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, get("/api/v1/products/list/search/lamp")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"results": [{"id": lamp.id.to_string(), "name": "Desk Lamp", "price": 25.0}], "count": 1}));
}

#[tokio::test]
async fn wishlist_requires_viewer() {
    let (app, _) = app().await;
    let (status, body) = send(&app, get("/api/v1/wishlist")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let malformed = Request::get("/api/v1/wishlist").header(VIEWER_HEADER, "nobody").body(Body::empty()).unwrap();
    let (status, _) = send(&app, malformed).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_wishlist_body_is_a_json_400() {
    let (app, _) = app().await;
    let viewer = UserId::new().to_string();
    for body in ["{not json", r#"{"product": "nope", "isLiked": true}"#, r#"{"isLiked": true}"#] {
        let request = Request::post("/api/v1/wishlist")
            .header(VIEWER_HEADER, &viewer)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let (status, json) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(json["success"], false);
        assert!(json["message"].as_str().is_some_and(|m| !m.is_empty()));
    }

    let no_content_type = Request::post("/api/v1/wishlist").header(VIEWER_HEADER, &viewer).body(Body::from("{}")).unwrap();
    let (status, json) = send(&app, no_content_type).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn category_brand_and_review_lists() {
    let (app, lamp, store) = app_with_store().await;
    store.insert_category(Category::create("Lighting", Slug::new("lighting").unwrap()).with_products([lamp.id])).await;
    store.insert_review(Review::create(lamp.id, 5).approve()).await;
    store.insert_review(Review::create(lamp.id, 1)).await;

    let (status, body) = send(&app, get("/api/v1/category/list")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["slug"], "lighting");

    let (status, body) = send(&app, get("/api/v1/brand/list")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["brands"][0]["slug"], "acme");
    assert_eq!(body["brands"][0]["isActive"], true);

    let (status, body) = send(&app, get(&format!("/api/v1/review/{}", lamp.id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["rating"], 5);
    assert_eq!(body["results"][0]["status"], "APPROVED");

    for id in [ProductId::new().to_string(), "not-an-id".to_string()] {
        let (status, body) = send(&app, get(&format!("/api/v1/review/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"results": [], "count": 0}));
    }
}

#[tokio::test]
async fn wishlist_round_trip_over_http() {
    let (app, lamp) = app().await;
    let viewer = UserId::new().to_string();

    let like = Request::post("/api/v1/wishlist")
        .header(VIEWER_HEADER, &viewer)
        .header("content-type", "application/json")
        .body(Body::from(json!({"product": lamp.id, "isLiked": true}).to_string()))
        .unwrap();
    let (status, body) = send(&app, like).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["wishlist"]["isLiked"], true);

    let listing = Request::get("/api/v1/products/list").header(VIEWER_HEADER, &viewer).body(Body::empty()).unwrap();
    let (_, body) = send(&app, listing).await;
    let liked: Vec<&Value> = body["results"].as_array().unwrap().iter().filter(|r| r["isLiked"] == true).collect();
    assert_eq!(liked.len(), 1);

    let wishlist = Request::get("/api/v1/wishlist").header(VIEWER_HEADER, &viewer).body(Body::empty()).unwrap();
    let (status, body) = send(&app, wishlist).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let clear = Request::delete("/api/v1/wishlist").header(VIEWER_HEADER, &viewer).body(Body::empty()).unwrap();
    let (status, body) = send(&app, clear).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 1);
}
