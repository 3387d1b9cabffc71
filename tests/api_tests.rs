use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use subsidy_recommender::api::{create_router, AppState, BackgroundTasks};
use subsidy_recommender::config::Config;
use subsidy_recommender::db::MemoryStore;
use subsidy_recommender::models::{Actor, BusinessContext, CatalogItem, Category};

struct Fixture {
    server: TestServer,
    store: Arc<MemoryStore>,
    background: BackgroundTasks,
    actor: Actor,
    item: CatalogItem,
}

async fn create_test_server() -> Fixture {
    let store = Arc::new(MemoryStore::new());

    let actor = Actor::new(
        None,
        BusinessContext::new(Some("경기도".to_string()), Some("성남시".to_string())),
    );
    let item = CatalogItem::new(Category::Grant, "소상공인 지원금", Utc::now() - Duration::days(1));
    store.insert_actor(actor.clone()).await;
    store.insert_item(item.clone()).await;

    let (state, background) = AppState::in_memory(store.clone(), &Config::default());
    let server = TestServer::new(create_router(state)).unwrap();

    Fixture {
        server,
        store,
        background,
        actor,
        item,
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = create_test_server().await;
    let response = fixture.server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_recommendations_for_unknown_actor() {
    let fixture = create_test_server().await;

    let response = fixture
        .server
        .get(&format!("/api/v1/actors/{}/recommendations", Uuid::new_v4()))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("actor"));
}

#[tokio::test]
async fn test_recommendations_for_known_actor() {
    let fixture = create_test_server().await;

    let response = fixture
        .server
        .get(&format!("/api/v1/actors/{}/recommendations", fixture.actor.id))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["actor_id"], fixture.actor.id.to_string());
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["item_id"], fixture.item.id.to_string());
    assert_eq!(items[0]["category"], "grant");
    assert_eq!(items[0]["provenance"], "RANKED");
}

#[tokio::test]
async fn test_record_interaction_accepted() {
    let fixture = create_test_server().await;

    let response = fixture
        .server
        .post("/api/v1/interactions")
        .json(&json!({
            "actor_id": fixture.actor.id,
            "item_id": fixture.item.id,
            "kind": "SCROLL",
            "duration_seconds": 90,
            "scroll_depth": 80
        }))
        .await;

    response.assert_status(StatusCode::ACCEPTED);

    fixture.background.shutdown().await;
    assert_eq!(fixture.store.score_count().await, 1);
}

#[tokio::test]
async fn test_record_interaction_unknown_item() {
    let fixture = create_test_server().await;

    let response = fixture
        .server
        .post("/api/v1/interactions")
        .json(&json!({
            "actor_id": fixture.actor.id,
            "item_id": Uuid::new_v4(),
            "kind": "VIEW"
        }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_record_interaction_unknown_actor() {
    let fixture = create_test_server().await;

    let response = fixture
        .server
        .post("/api/v1/interactions")
        .json(&json!({
            "actor_id": Uuid::new_v4(),
            "item_id": fixture.item.id,
            "kind": "VIEW"
        }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_record_interaction_invalid_metadata() {
    let fixture = create_test_server().await;

    let (actor_id, item_id) = (fixture.actor.id, fixture.item.id);

    for body in [
        json!({ "actor_id": actor_id, "item_id": item_id, "kind": "SCROLL", "scroll_depth": 150 }),
        json!({ "actor_id": actor_id, "item_id": item_id, "kind": "RATING", "rating": 0 }),
        json!({ "actor_id": actor_id, "item_id": item_id, "kind": "RATING" }),
        json!({ "actor_id": actor_id, "item_id": item_id, "kind": "VIEW", "duration_seconds": -5 }),
        json!({ "actor_id": actor_id, "item_id": item_id, "kind": "LIKE" }),
    ] {
        let response = fixture.server.post("/api/v1/interactions").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_interaction_refreshes_cached_recommendations() {
    let fixture = create_test_server().await;
    let path = format!("/api/v1/actors/{}/recommendations", fixture.actor.id);

    let first: Value = fixture.server.get(&path).await.json();
    assert_eq!(first["items"].as_array().unwrap().len(), 1);

    // A newer item is invisible while the cached list is fresh
    let newer = CatalogItem::new(Category::Loan, "청년 창업 대출", Utc::now());
    fixture.store.insert_item(newer.clone()).await;
    let cached: Value = fixture.server.get(&path).await.json();
    assert_eq!(cached["items"], first["items"]);

    fixture
        .server
        .post("/api/v1/interactions")
        .json(&json!({
            "actor_id": fixture.actor.id,
            "item_id": fixture.item.id,
            "kind": "CLICK"
        }))
        .await
        .assert_status(StatusCode::ACCEPTED);

    let fresh: Value = fixture.server.get(&path).await.json();
    let ids: Vec<&str> = fresh["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|item| item["item_id"].as_str())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&newer.id.to_string().as_str()));
}
