//! End-to-end tests against a real listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};
use taskd_core::{Item, ItemDraft, ItemId, ItemResult, RequestContext};
use taskd_server::{Coordinator, DrainReport, Server, ServerConfig, ShutdownSignal};
use taskd_service::ItemService;
use taskd_store::{ItemStore, MemoryStore};
use tokio::task::JoinHandle;

struct TestServer {
    addr: SocketAddr,
    coordinator: Coordinator,
    shutdown: ShutdownSignal,
    handle: JoinHandle<DrainReport>,
    client: reqwest::Client,
}

impl TestServer {
    async fn start(store: Arc<dyn ItemStore>, shutdown_timeout: Duration) -> Self {
        let config = ServerConfig::builder()
            .http_addr("127.0.0.1:0")
            .shutdown_timeout(shutdown_timeout)
            .service_name("taskd-e2e")
            .build();
        let bound = Server::new(config, ItemService::new(store))
            .bind()
            .await
            .expect("bind should succeed");

        let addr = bound.local_addr();
        let coordinator = bound.coordinator();
        let shutdown = ShutdownSignal::new();
        let handle = tokio::spawn({
            let shutdown = shutdown.clone();
            async move { bound.serve(shutdown).await.expect("serve should succeed") }
        });

        Self {
            addr,
            coordinator,
            shutdown,
            handle,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn stop(self) -> DrainReport {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server should stop")
            .expect("server task should not panic")
    }
}

/// Delegates to a [`MemoryStore`] but sleeps inside `list`.
struct SlowListStore {
    inner: MemoryStore,
    delay: Duration,
}

impl ItemStore for SlowListStore {
    fn list(&self, ctx: &RequestContext) -> ItemResult<Vec<Item>> {
        std::thread::sleep(self.delay);
        self.inner.list(ctx)
    }

    fn get(&self, ctx: &RequestContext, id: ItemId) -> ItemResult<Item> {
        self.inner.get(ctx, id)
    }

    fn create(&self, ctx: &RequestContext, draft: ItemDraft) -> ItemResult<Item> {
        self.inner.create(ctx, draft)
    }

    fn update(
        &self,
        ctx: &RequestContext,
        id: ItemId,
        mutate: &mut dyn FnMut(&mut Item),
    ) -> ItemResult<Item> {
        self.inner.update(ctx, id, mutate)
    }

    fn delete(&self, ctx: &RequestContext, id: ItemId) -> ItemResult<()> {
        self.inner.delete(ctx, id)
    }
}

#[tokio::test]
async fn test_item_lifecycle() {
    let server = TestServer::start(Arc::new(MemoryStore::new()), Duration::from_secs(1)).await;

    let response = server
        .client
        .post(server.url("/todos"))
        .json(&json!({"title": "Learn Go", "description": "Read docs"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Item = response.json().await.unwrap();
    assert_eq!(created.id, ItemId::new(1));
    assert_eq!(created.title, "Learn Go");
    assert_eq!(created.description, "Read docs");
    assert!(!created.completed);

    let response = server.client.get(server.url("/todos/1")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched: Item = response.json().await.unwrap();
    assert_eq!(fetched, created);

    tokio::time::sleep(Duration::from_millis(5)).await;

    let response = server
        .client
        .patch(server.url("/todos/1"))
        .json(&json!({"completed": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Item = response.json().await.unwrap();
    assert_eq!(updated.title, "Learn Go");
    assert!(updated.completed);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);

    let response = server.client.delete(server.url("/todos/1")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.bytes().await.unwrap().is_empty());

    let response = server.client.get(server.url("/todos/1")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"error": "todo not found"}));

    assert!(server.stop().await.is_clean());
}

#[tokio::test]
async fn test_empty_title_is_rejected_without_consuming_an_identity() {
    let server = TestServer::start(Arc::new(MemoryStore::new()), Duration::from_secs(1)).await;

    let response = server
        .client
        .post(server.url("/todos"))
        .json(&json!({"title": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "validation failed");
    assert!(body["details"]["title"].is_array());

    let list: Vec<Item> = server
        .client
        .get(server.url("/todos"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(list.is_empty());

    let created: Item = server
        .client
        .post(server.url("/todos"))
        .json(&json!({"title": "First real item"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created.id, ItemId::new(1));

    server.stop().await;
}

#[tokio::test]
async fn test_sparse_update_keeps_omitted_fields() {
    let server = TestServer::start(Arc::new(MemoryStore::new()), Duration::from_secs(1)).await;

    server
        .client
        .post(server.url("/todos"))
        .json(&json!({"title": "Original", "description": "keep me"}))
        .send()
        .await
        .unwrap();

    let updated: Item = server
        .client
        .put(server.url("/todos/1"))
        .json(&json!({"title": "Renamed", "completed": null}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated.title, "Renamed");
    assert_eq!(updated.description, "keep me");
    assert!(!updated.completed);

    let response = server
        .client
        .patch(server.url("/todos/1"))
        .json(&json!({"title": "no"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    server.stop().await;
}

#[tokio::test]
async fn test_routing_errors() {
    let server = TestServer::start(Arc::new(MemoryStore::new()), Duration::from_secs(1)).await;

    let response = server.client.get(server.url("/unknown")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.json::<Value>().await.unwrap(),
        json!({"error": "route not found"})
    );

    let response = server.client.post(server.url("/todos/1")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let response = server.client.get(server.url("/todos/abc")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["details"]["id"].is_array());

    server.stop().await;
}

#[tokio::test]
async fn test_probes() {
    let server = TestServer::start(Arc::new(MemoryStore::new()), Duration::from_secs(1)).await;

    let health: Value = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["service"], "taskd-e2e");

    let response = server.client.get(server.url("/ready")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ready: Value = response.json().await.unwrap();
    assert_eq!(ready["ready"], true);
    assert_eq!(ready["state"], "accepting");

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_in_flight_request_finishes_during_drain() {
    let store = Arc::new(SlowListStore {
        inner: MemoryStore::new(),
        delay: Duration::from_millis(200),
    });
    let server = TestServer::start(store, Duration::from_secs(2)).await;

    let pending = tokio::spawn({
        let client = server.client.clone();
        let url = server.url("/todos");
        async move { client.get(url).send().await }
    });

    // let the request get admitted before shutting down
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(server.coordinator.in_flight(), 1);

    let coordinator = server.coordinator.clone();
    let report = server.stop().await;
    assert!(report.is_clean());
    assert!(!coordinator.is_accepting());

    let response = pending.await.unwrap().expect("in-flight request should complete");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_drain_timeout_abandons_stuck_request() {
    let server = TestServer::start(Arc::new(MemoryStore::new()), Duration::from_millis(50)).await;

    let guard = server.coordinator.admit().expect("server is accepting");
    let token = guard.token();

    let report = server.stop().await;
    assert_eq!(report.abandoned, 1);
    assert!(token.is_cancelled());
    drop(guard);
}
