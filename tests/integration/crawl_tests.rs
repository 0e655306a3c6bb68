//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end over the HTTP fetcher.

use locus::config::validate_fresh_destination;
use locus::crawler::{build_http_client, CrawlEngine, EngineSettings, FetchError, HttpFetcher};
use locus::output::CrawlStatistics;
use locus::state::{CrawlOptions, CrawlState, DoneReason};
use locus::storage::{CheckpointStore, JsonPageStore};
use locus::{ConfigError, LocusError, PageFetcher, Session};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><head><title>t</title></head><body>{}</body></html>", body),
        "text/html",
    )
}

fn create_test_settings() -> EngineSettings {
    EngineSettings {
        navigation_timeout: Duration::from_secs(2),
        load_timeout: Duration::from_secs(2),
        grace_timeout: Duration::from_secs(1),
        ..EngineSettings::default()
    }
}

fn create_test_fetcher() -> Arc<HttpFetcher> {
    Arc::new(HttpFetcher::new(build_http_client().unwrap(), false))
}

async fn mount_get(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn requests_to(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == route)
        .count()
}

fn stored_urls(dir: &Path) -> Vec<(String, String)> {
    JsonPageStore::new(dir)
        .records()
        .unwrap()
        .into_iter()
        .map(|(_, record)| (record.locale, record.url))
        .collect()
}

/// Mounts a small site: a home page linking to two pages, one duplicate of
/// the first, a missing page, an off-site link and a PDF
async fn mount_site(server: &MockServer) {
    let base = server.uri();
    let port = url::Url::parse(&base).unwrap().port().unwrap();

    let home_links = format!(
        r#"<a href="{base}/a">A</a>
           <a href="{base}/b">B</a>
           <a href="/dup">Dup</a>
           <a href="http://localhost:{port}/offsite">Elsewhere</a>
           <a href="{base}/report.pdf">Report</a>"#
    );

    // Spanish variants are mounted first so they win for matching requests
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("accept-language", "es"))
        .respond_with(html(&format!("<p>Inicio</p>{}", home_links)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .and(header("accept-language", "es"))
        .respond_with(html("<p>Pagina A</p>"))
        .mount(server)
        .await;

    mount_get(server, "/", html(&format!("<p>Home</p>{}", home_links))).await;
    mount_get(server, "/a", html("<p>Page A</p>")).await;
    mount_get(
        server,
        "/b",
        html(&format!(r#"<p>Page B</p><a href="{base}/missing">Gone</a>"#)),
    )
    .await;
    mount_get(server, "/dup", html("<p>Page A</p>")).await;
}

#[tokio::test]
async fn test_full_crawl_across_locales() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    let state = CrawlState::fresh(
        vec![format!("{}/", base)],
        vec!["en".to_string(), "es".to_string()],
        dir.path().to_path_buf(),
        CrawlOptions::default(),
    )
    .unwrap();

    let mut engine = CrawlEngine::new(state, create_test_fetcher(), create_test_settings());
    let reason = engine.run().await.unwrap();

    assert_eq!(reason, DoneReason::Completed);

    let stored = stored_urls(dir.path());
    let english: Vec<_> = stored.iter().filter(|(l, _)| l == "en").collect();
    let spanish: Vec<_> = stored.iter().filter(|(l, _)| l == "es").collect();

    // Home, B and one of A / Dup; the other has the same text
    assert_eq!(english.len(), 3);
    // Only the pages whose Spanish text differs
    assert_eq!(spanish.len(), 2);
    assert!(spanish.iter().any(|(_, u)| *u == format!("{}/", base)));
    assert!(spanish.iter().any(|(_, u)| *u == format!("{}/a", base)));

    assert!(stored.iter().all(|(_, u)| u.starts_with(&base)));
    assert!(stored.iter().all(|(_, u)| !u.ends_with(".pdf")));
    assert_eq!(requests_to(&server, "/report.pdf").await, 0);

    let state = engine.state();
    assert_eq!(state.stored_count, 5);
    let port = url::Url::parse(&base).unwrap().port().unwrap();
    assert!(state
        .frontier
        .is_visited("en", &format!("http://localhost:{}/offsite", port)));
    assert!(state.frontier.is_visited("en", &format!("{}/missing", base)));
    assert!(state.frontier.is_visited("es", &format!("{}/missing", base)));

    // Clean completion exports and removes the checkpoint
    assert!(!CheckpointStore::in_dir(dir.path()).exists());
    assert!(dir.path().join("html/index.html").exists());
}

#[tokio::test]
async fn test_limit_then_resume() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/",
        html(r#"<p>Home</p><a href="/a">A</a><a href="/b">B</a>"#),
    )
    .await;
    mount_get(&server, "/a", html("<p>Page A</p>")).await;
    mount_get(&server, "/b", html("<p>Page B</p>")).await;
    let dir = TempDir::new().unwrap();

    let options = CrawlOptions {
        max_pages: 2,
        batch_size: 1,
        ..CrawlOptions::default()
    };
    let state = CrawlState::fresh(
        vec![format!("{}/", server.uri())],
        vec!["en".to_string()],
        dir.path().to_path_buf(),
        options,
    )
    .unwrap();

    let mut engine = CrawlEngine::new(state, create_test_fetcher(), create_test_settings());
    assert_eq!(engine.run().await.unwrap(), DoneReason::LimitReached);
    assert_eq!(stored_urls(dir.path()).len(), 2);
    assert!(CheckpointStore::in_dir(dir.path()).exists());

    // Resuming with the checkpointed limit stops again without fetching
    let resumed = CrawlState::resume(dir.path()).unwrap();
    assert_eq!(resumed.stored_count, 2);
    assert_eq!(resumed.frontier.pending_len("en"), 1);

    let mut engine = CrawlEngine::new(resumed, create_test_fetcher(), create_test_settings());
    assert_eq!(engine.run().await.unwrap(), DoneReason::LimitReached);
    assert_eq!(engine.state().stored_count, 2);
    assert_eq!(stored_urls(dir.path()).len(), 2);
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 2);

    let resumed = CrawlState::resume_with_limit(dir.path(), Some(0)).unwrap();
    let mut engine = CrawlEngine::new(resumed, create_test_fetcher(), create_test_settings());
    assert_eq!(engine.run().await.unwrap(), DoneReason::Completed);

    let indices: Vec<u64> = JsonPageStore::new(dir.path())
        .records()
        .unwrap()
        .into_iter()
        .map(|(index, _)| index)
        .collect();
    assert_eq!(indices, vec![1, 2, 3]);

    // Nothing fetched before the interruption is fetched again
    assert_eq!(requests_to(&server, "/").await, 1);
    assert_eq!(requests_to(&server, "/a").await, 1);
    assert_eq!(requests_to(&server, "/b").await, 1);
    assert!(!CheckpointStore::in_dir(dir.path()).exists());
}

#[tokio::test]
async fn test_download_mode_does_not_follow_links() {
    let server = MockServer::start().await;
    mount_get(&server, "/a", html(r#"<p>Same</p><a href="/c">C</a>"#)).await;
    mount_get(&server, "/b", html(r#"<p>Same</p><a href="/c">C</a>"#)).await;
    mount_get(&server, "/c", html("<p>C</p>")).await;
    let dir = TempDir::new().unwrap();

    let base = server.uri();
    let state = CrawlState::download(
        vec![
            format!("{}/a", base),
            format!("{}/b", base),
            format!("{}/missing", base),
        ],
        dir.path().to_path_buf(),
        0,
    )
    .unwrap();

    let mut engine = CrawlEngine::new(state, create_test_fetcher(), create_test_settings());
    assert_eq!(engine.run().await.unwrap(), DoneReason::Completed);

    // Identical text is still stored twice: download mode skips the duplicate check
    let stored = stored_urls(dir.path());
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|(locale, _)| locale == "en"));
    assert_eq!(requests_to(&server, "/c").await, 0);

    let stats = CrawlStatistics::from_state(engine.state());
    assert_eq!(stats.stored_pages, 2);
    assert_eq!(stats.locales[0].stored, 2);
}

#[tokio::test]
async fn test_new_crawl_refuses_used_directory() {
    let server = MockServer::start().await;
    mount_get(&server, "/", html(r#"<p>Home</p><a href="/a">A</a>"#)).await;
    mount_get(&server, "/a", html("<p>Page A</p>")).await;
    let dir = TempDir::new().unwrap();
    let base = server.uri();

    let state = CrawlState::fresh(
        vec![format!("{}/", base)],
        vec!["en".to_string()],
        dir.path().to_path_buf(),
        CrawlOptions::default(),
    )
    .unwrap();
    let mut engine = CrawlEngine::new(state, create_test_fetcher(), create_test_settings());
    assert_eq!(engine.run().await.unwrap(), DoneReason::Completed);
    let before = stored_urls(dir.path());
    assert_eq!(before.len(), 2);

    assert!(matches!(
        validate_fresh_destination(dir.path()),
        Err(ConfigError::DestinationInUse(_))
    ));

    let again = CrawlState::download(vec![format!("{}/a", base)], dir.path().to_path_buf(), 0)
        .unwrap();
    let mut engine = CrawlEngine::new(again, create_test_fetcher(), create_test_settings());
    assert!(matches!(
        engine.run().await,
        Err(LocusError::Config(ConfigError::DestinationInUse(_)))
    ));

    assert_eq!(stored_urls(dir.path()), before);
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 2);
}

#[tokio::test]
async fn test_http_session_loads_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .and(header("accept-language", "fr"))
        .respond_with(html("<p>Bonjour</p>"))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(build_http_client().unwrap(), false);
    let mut session = fetcher.open("fr").await.unwrap();
    let timeout = Duration::from_secs(2);

    session
        .navigate(&format!("{}/old", server.uri()), timeout)
        .await
        .unwrap();
    session.await_load(timeout).await.unwrap();

    assert_eq!(
        session.current_url(),
        Some(format!("{}/new", server.uri()))
    );
    assert_eq!(session.visible_text("body").await.unwrap(), "Bonjour");
    assert!(session.content().await.unwrap().contains("<p>Bonjour</p>"));
    session.close().await;
}

#[tokio::test]
async fn test_http_session_rejects_errors_and_non_html() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/data.json",
        ResponseTemplate::new(200).set_body_raw("{}", "application/json"),
    )
    .await;
    mount_get(&server, "/broken", ResponseTemplate::new(500)).await;

    let fetcher = HttpFetcher::new(build_http_client().unwrap(), true);
    let mut session = fetcher.open("en").await.unwrap();
    let timeout = Duration::from_secs(2);

    for route in ["/missing", "/broken", "/data.json"] {
        let result = session
            .navigate(&format!("{}{}", server.uri(), route), timeout)
            .await;
        assert!(
            matches!(result, Err(FetchError::Navigation(_))),
            "{} should fail navigation",
            route
        );
    }
}
