//! HTTP API tests against an in-memory store with fake fetcher and provider.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use shukan::models::{NovelDetails, NovelStatus, TranslatedChapter};
use shukan::{
    AppState, FetchError, KeyedLock, PageFetcher, PipelineDeps, ProviderError, SourceRegistry,
    SqliteStore, TranslationPipeline, TranslationProvider, build_router,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const ORIGIN: &str = "http://localhost:8080";
const BOOK: &str = "https://www.69shuba.com/book/36573.htm";
const CH1: &str = "https://www.69shuba.com/txt/36573/1001";
const CH2: &str = "https://www.69shuba.com/txt/36573/1002";

struct StaticFetcher {
    pages: HashMap<String, String>,
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

struct EchoProvider;

#[async_trait]
impl TranslationProvider for EchoProvider {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn translate_novel_details(&self, _raw: &str) -> Result<NovelDetails, ProviderError> {
        Ok(NovelDetails {
            title_original: "大奉打更人".to_string(),
            title_translated: "Nightwatcher".to_string(),
            summary_translated: "<p>A constable.</p>".to_string(),
            author_translated: "Mai Bao".to_string(),
            genres: vec!["Mystery".to_string()],
            number_of_chapters: 20,
            status: NovelStatus::Completed,
        })
    }

    async fn translate_novel_chapter(
        &self,
        known_genres: &[String],
        raw: &str,
    ) -> Result<TranslatedChapter, ProviderError> {
        if raw.contains("refuse") {
            return Err(ProviderError::Refused("I'm sorry".to_string()));
        }
        let new_genres = ["Mystery", "Fantasy"]
            .iter()
            .map(|g| g.to_string())
            .filter(|g| !known_genres.contains(g))
            .collect();
        Ok(TranslatedChapter {
            title_translated: "Chapter".to_string(),
            title_original: "章".to_string(),
            content_translated: "<p>Xu Qian woke up.</p>".to_string(),
            new_genres,
        })
    }
}

/// Serves a fresh app on an ephemeral port and returns its base URL.
async fn spawn_app() -> String {
    let mut pages = HashMap::new();
    pages.insert(BOOK.to_string(), "<html>book</html>".to_string());
    pages.insert(
        CH1.to_string(),
        format!(r#"<div class="page1"><a href="{}">下一章</a></div>"#, CH2),
    );

    let pipeline = TranslationPipeline::new(
        PipelineDeps {
            store: Arc::new(SqliteStore::open_in_memory().unwrap()),
            sources: Arc::new(SourceRegistry::new()),
            fetcher: Arc::new(StaticFetcher { pages }),
            provider: Arc::new(EchoProvider),
            locks: Arc::new(KeyedLock::default()),
        },
        Duration::from_millis(10),
    );
    let app = build_router(AppState::new(Arc::new(pipeline), vec![ORIGIN.to_string()]));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn send(base: &str, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = reqwest::Client::new().request(method, format!("{}{}", base, path));
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request.send().await.unwrap();
    let status = response.status();
    let bytes = response.bytes().await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn extract(app: &str) -> Value {
    let (status, novel) = send(
        app,
        Method::POST,
        "/novels/translate",
        Some(json!({ "url": BOOK, "source": "69shuba" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    novel
}

#[tokio::test]
async fn test_health_stats_and_sources() {
    let app = spawn_app().await;

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (_, stats) = send(&app, Method::GET, "/stats/novels", None).await;
    assert_eq!(stats, json!({ "novel_count": 0, "chapter_count": 0 }));

    let (_, sources) = send(&app, Method::GET, "/sources", None).await;
    let tags: Vec<&str> = sources
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert_eq!(tags, vec!["69shuba", "69yue", "shuhaige", "twkan", "doupo", "syosetu"]);
}

#[tokio::test]
async fn test_full_reading_flow() {
    let app = spawn_app().await;

    let novel = extract(&app).await;
    assert_eq!(novel["id"], "36573");
    assert_eq!(novel["title"], "Nightwatcher");
    assert_eq!(novel["status"], "Completed");

    let (status, first) = send(
        &app,
        Method::POST,
        "/novels/translate/first_chapter",
        Some(json!({ "novel_id": "36573", "chapter_url": CH1, "html_content": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["number"], 1);
    assert_eq!(first["next_chapter_url"], CH2);
    assert_eq!(first["word_count"], 4);

    let (_, stored) = send(&app, Method::GET, "/novels/36573", None).await;
    assert_eq!(stored["genres"], json!(["Mystery", "Fantasy"]));

    let (status, second) = send(
        &app,
        Method::POST,
        "/novels/translate/chapter",
        Some(json!({ "novel_id": "36573", "html_content": "<p>no links</p>" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["number"], 2);
    assert_eq!(second["url"], CH2);
    assert!(second.get("next_chapter_url").is_none());

    let (status, err) = send(
        &app,
        Method::POST,
        "/novels/translate/chapter",
        Some(json!({ "novel_id": "36573" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(err["error"].is_string());

    let (_, chapters) = send(&app, Method::GET, "/novels/36573/chapters", None).await;
    let chapters = chapters.as_array().unwrap();
    assert_eq!(chapters.len(), 2);
    assert!(chapters[0].get("content").is_none());

    let (status, read) = send(&app, Method::GET, "/novels/36573/chapters/num/2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["content"], "<p>Xu Qian woke up.</p>");

    let (_, stored) = send(&app, Method::GET, "/novels/36573", None).await;
    assert_eq!(stored["last_read_chapter_number"], 2);

    let (_, recent) = send(&app, Method::GET, "/novels?recently_read=5", None).await;
    assert_eq!(recent.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_extract_twice_returns_same_novel() {
    let app = spawn_app().await;
    let first = extract(&app).await;
    let second = extract(&app).await;
    assert_eq!(first["id"], second["id"]);
    assert_eq!(first["date_added"], second["date_added"]);

    let (_, stats) = send(&app, Method::GET, "/stats/novels", None).await;
    assert_eq!(stats["novel_count"], 1);
}

#[tokio::test]
async fn test_error_statuses() {
    let app = spawn_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/novels/translate",
        Some(json!({ "url": "", "source": "69shuba" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "url is required");

    let (status, _) = send(
        &app,
        Method::POST,
        "/novels/translate",
        Some(json!({ "url": BOOK, "source": "unknown-site" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/novels/translate/first_chapter",
        Some(json!({ "novel_id": "missing", "chapter_url": CH1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        "/novels/translate",
        Some(json!({ "url": "https://www.69shuba.com/book/999.htm", "source": "69shuba" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    extract(&app).await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/novels/translate/first_chapter",
        Some(json!({ "novel_id": "36573", "chapter_url": CH1, "html_content": "please refuse" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("refused"));
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = spawn_app().await;
    let response = reqwest::Client::new()
        .post(format!("{}/novels/refresh", app))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_search_and_list_filters() {
    let app = spawn_app().await;
    extract(&app).await;

    let (status, _) = send(&app, Method::GET, "/search/novels/ni", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, found) = send(&app, Method::GET, "/search/novels/night", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);

    let (_, chinese) = send(&app, Method::GET, "/novels?language=chinese", None).await;
    assert_eq!(chinese.as_array().unwrap().len(), 1);
    let (_, japanese) = send(&app, Method::GET, "/novels?language=japanese", None).await;
    assert!(japanese.as_array().unwrap().is_empty());
    let (_, by_genre) = send(&app, Method::GET, "/novels?genre=Mystery", None).await;
    assert_eq!(by_genre.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::GET, "/novels?recently_updated=101", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_and_delete() {
    let app = spawn_app().await;
    extract(&app).await;

    let (status, novel) = send(
        &app,
        Method::POST,
        "/novels/refresh",
        Some(json!({ "novel_id": "36573", "html_content": "<html>book</html>" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(novel["chapters_count"], 20);
    assert_eq!(novel["last_read_timestamp"], novel["last_updated"]);

    let (status, body) = send(&app, Method::DELETE, "/novels/36573", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&app, Method::GET, "/novels/36573", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::DELETE, "/novels/36573", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_and_security_headers() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .request(Method::OPTIONS, format!("{}/novels/translate", app))
        .header("origin", ORIGIN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()["access-control-allow-origin"], ORIGIN);

    let response = client
        .get(format!("{}/health", app))
        .header("origin", "http://evil.example")
        .send()
        .await
        .unwrap();
    assert!(response.headers().get("access-control-allow-origin").is_none());
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");
}
