//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use lrn_crawler::config::{CrawlOptions, FetchOptions};
use lrn_crawler::crawler::Orchestrator;
use lrn_crawler::state::SkipReason;
use lrn_crawler::storage::{CrawlStorage, META_FILE};
use lrn_crawler::CrawlError;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates fast test options for a seed URL writing into `out`
fn create_test_options(seed: &str, out: &Path) -> CrawlOptions {
    let mut options = CrawlOptions::new(seed).expect("valid seed URL");
    options.rate = 100.0;
    options.output_dir = Some(out.to_path_buf());
    options.fetch.timeout = Duration::from_secs(5);
    options.fetch.max_retries = 0;
    options.fetch.backoff_base = Duration::from_millis(1);
    options.fetch.max_jitter = Duration::ZERO;
    options
}

fn markdown(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/markdown")
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

fn read_meta(out: &Path) -> serde_json::Value {
    let text = std::fs::read_to_string(out.join(META_FILE)).expect("metadata written");
    serde_json::from_str(&text).expect("metadata is JSON")
}

/// Serves an llms.txt with two pages and one off-origin entry
async fn docs_site() -> MockServer {
    let server = MockServer::start().await;

    mount(
        &server,
        "/llms.txt",
        ResponseTemplate::new(200).set_body_string(
            "# Example\n> Example docs\n\n## Guide\n- Intro: /docs/intro\n- [Setup](/docs/setup.md): install\n- Elsewhere: https://elsewhere.invalid/x\n",
        ),
    )
    .await;
    mount(
        &server,
        "/docs/intro",
        html("<html><head><title>Intro</title></head><body><h1>Intro</h1><p>Hello there.</p></body></html>"),
    )
    .await;
    mount(&server, "/docs/setup.md", markdown("# Setup\n\nRun the installer.\n")).await;

    server
}

#[tokio::test]
async fn test_llms_txt_end_to_end() {
    let server = docs_site().await;
    let out = TempDir::new().unwrap();
    let seed = format!("{}/llms.txt", server.uri());

    let mut orchestrator = Orchestrator::new(create_test_options(&seed, out.path())).unwrap();
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.saved.len(), 2);
    assert_eq!(summary.skipped_count(SkipReason::OffOrigin), 1);
    assert!(summary.failed.is_empty());

    let intro = std::fs::read_to_string(out.path().join("docs/intro.md")).unwrap();
    assert!(intro.contains("Hello there."));
    let setup = std::fs::read_to_string(out.path().join("docs/setup.md")).unwrap();
    assert_eq!(setup, "# Setup\n\nRun the installer.\n");

    let meta = read_meta(out.path());
    assert_eq!(meta["source"], "llms-txt");
    assert_eq!(meta["origin"], server.uri());
    assert_eq!(meta["pageCount"], 2);

    let pages = meta["pages"].as_array().unwrap();
    let intro_meta = pages
        .iter()
        .find(|p| p["file"] == "docs/intro.md")
        .expect("intro entry");
    assert_eq!(intro_meta["title"], "Intro");
    assert_eq!(intro_meta["status"], 200);
    assert_eq!(intro_meta["contentHash"].as_str().unwrap().len(), 16);
}

#[tokio::test]
async fn test_incremental_run_skips_unchanged() {
    let server = docs_site().await;
    let out = TempDir::new().unwrap();
    let seed = format!("{}/llms.txt", server.uri());

    let first = Orchestrator::new(create_test_options(&seed, out.path()))
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(first.saved.len(), 2);

    // Unchanged pages are not rewritten
    let setup_path = out.path().join("docs/setup.md");
    std::fs::write(&setup_path, "sentinel").unwrap();

    let second = Orchestrator::new(create_test_options(&seed, out.path()))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(second.saved.len(), 0);
    assert_eq!(second.skipped_count(SkipReason::Unchanged), 2);
    assert_eq!(std::fs::read_to_string(&setup_path).unwrap(), "sentinel");

    // Carried-forward entries keep the next run incremental
    let meta = read_meta(out.path());
    assert_eq!(meta["pageCount"], 2);
    assert_eq!(CrawlStorage::open(out.path()).previous_count(), 2);
}

#[tokio::test]
async fn test_changed_page_is_saved_again() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let seed = format!("{}/llms.txt", server.uri());

    mount(&server, "/llms.txt", markdown("- /page\n")).await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(markdown("# Version 1\n"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount(&server, "/page", markdown("# Version 2\n")).await;

    let first = Orchestrator::new(create_test_options(&seed, out.path()))
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(first.saved.len(), 1);

    let second = Orchestrator::new(create_test_options(&seed, out.path()))
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(second.saved.len(), 1);

    let page = std::fs::read_to_string(out.path().join("page.md")).unwrap();
    assert_eq!(page, "# Version 2\n");
}

#[tokio::test]
async fn test_cross_origin_redirect_skipped() {
    let server = MockServer::start().await;
    let other = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let seed = format!("{}/llms.txt", server.uri());

    mount(&server, "/llms.txt", markdown("- /moved\n- /stays\n")).await;
    mount(
        &server,
        "/moved",
        ResponseTemplate::new(301).insert_header("Location", format!("{}/landing", other.uri()).as_str()),
    )
    .await;
    mount(&server, "/stays", markdown("# Stays\n")).await;
    mount(&other, "/landing", markdown("# Elsewhere\n")).await;

    let summary = Orchestrator::new(create_test_options(&seed, out.path()))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.saved.len(), 1);
    assert_eq!(summary.skipped_count(SkipReason::CrossOriginRedirect), 1);
    assert!(!out.path().join("moved.md").exists());
    assert!(!out.path().join("landing.md").exists());
}

#[tokio::test]
async fn test_robots_disallow_is_honored() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let seed = format!("{}/llms.txt", server.uri());

    mount(
        &server,
        "/robots.txt",
        ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
    )
    .await;
    mount(&server, "/llms.txt", markdown("- /public\n- /private/secret\n")).await;
    mount(&server, "/public", markdown("# Public\n")).await;
    Mock::given(method("GET"))
        .and(path("/private/secret"))
        .respond_with(markdown("# Secret\n"))
        .expect(0)
        .mount(&server)
        .await;

    let summary = Orchestrator::new(create_test_options(&seed, out.path()))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.saved.len(), 1);
    assert_eq!(summary.skipped_count(SkipReason::Robots), 1);
}

#[tokio::test]
async fn test_robots_fetched_once_per_origin() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let seed = format!("{}/llms.txt", server.uri());

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /\n"))
        .expect(1)
        .mount(&server)
        .await;
    mount(&server, "/llms.txt", markdown("- /a\n- /b\n- /c\n")).await;
    for route in ["/a", "/b", "/c"] {
        mount(&server, route, markdown("# Page\n")).await;
    }

    let summary = Orchestrator::new(create_test_options(&seed, out.path()))
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(summary.saved.len(), 3);
}

#[tokio::test]
async fn test_transient_failure_retry_bound() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let seed = format!("{}/llms.txt", server.uri());

    mount(&server, "/llms.txt", markdown("- /flaky\n- /ok\n")).await;
    mount(&server, "/ok", markdown("# Ok\n")).await;
    // One attempt plus three re-queues
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let summary = Orchestrator::new(create_test_options(&seed, out.path()))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.saved.len(), 1);
    assert_eq!(summary.failed.len(), 1);
    assert!(summary.failed[0].1.contains("503"));

    let meta = read_meta(out.path());
    let flaky = meta["pages"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["url"].as_str().unwrap().ends_with("/flaky"))
        .expect("failure recorded")
        .clone();
    assert_eq!(flaky["status"], 503);
    assert!(flaky.get("file").is_none());
}

#[tokio::test]
async fn test_retry_bound_with_default_fetch_budget() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let seed = format!("{}/llms.txt", server.uri());

    mount(&server, "/llms.txt", markdown("- /busy\n")).await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let mut options = create_test_options(&seed, out.path());
    options.fetch.max_retries = FetchOptions::default().max_retries;

    let summary = Orchestrator::new(options).unwrap().run().await.unwrap();

    assert!(summary.saved.is_empty());
    assert_eq!(summary.failed.len(), 1);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let seed = format!("{}/llms.txt", server.uri());

    mount(&server, "/llms.txt", markdown("- /gone\n")).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let summary = Orchestrator::new(create_test_options(&seed, out.path()))
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(summary.failed.len(), 1);
}

#[tokio::test]
async fn test_sitemap_index_with_failing_child() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let base = server.uri();
    let seed = format!("{}/sitemap_index.xml", base);

    mount(
        &server,
        "/sitemap_index.xml",
        ResponseTemplate::new(200).set_body_raw(
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>{base}/sitemap-docs.xml</loc></sitemap>
  <sitemap><loc>{base}/sitemap-missing.xml</loc></sitemap>
</sitemapindex>"#
            ),
            "application/xml",
        ),
    )
    .await;
    mount(
        &server,
        "/sitemap-docs.xml",
        ResponseTemplate::new(200).set_body_raw(
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{base}/docs/a</loc></url>
  <url><loc>{base}/docs/b</loc></url>
</urlset>"#
            ),
            "application/xml",
        ),
    )
    .await;
    mount(&server, "/docs/a", markdown("# A\n")).await;
    mount(&server, "/docs/b", markdown("# B\n")).await;

    let summary = Orchestrator::new(create_test_options(&seed, out.path()))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.saved.len(), 2);
    assert!(summary.failed.is_empty());
    assert_eq!(read_meta(out.path())["source"], "sitemap");
}

#[tokio::test]
async fn test_llms_full_saves_manifest_itself() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let seed = format!("{}/llms-full.txt", server.uri());

    mount(
        &server,
        "/llms-full.txt",
        ResponseTemplate::new(200).set_body_string("# Everything\n\nAll the docs.\n"),
    )
    .await;

    let summary = Orchestrator::new(create_test_options(&seed, out.path()))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(summary.saved.len(), 1);
    assert!(out.path().join("llms-full.md").exists());
    assert_eq!(read_meta(out.path())["source"], "llms-full");
}

#[tokio::test]
async fn test_include_exclude_filters_manifest() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let seed = format!("{}/llms.txt", server.uri());

    mount(
        &server,
        "/llms.txt",
        markdown("- /docs/keep\n- /docs/old/drop\n- /blog/post\n"),
    )
    .await;
    mount(&server, "/docs/keep", markdown("# Keep\n")).await;

    let mut options = create_test_options(&seed, out.path());
    options.include = vec!["/docs/**".to_string()];
    options.exclude = vec!["/docs/old/**".to_string()];

    let summary = Orchestrator::new(options).unwrap().run().await.unwrap();
    assert_eq!(summary.saved.len(), 1);
    assert_eq!(summary.skipped_count(SkipReason::Filtered), 2);
}

#[tokio::test]
async fn test_depth_follows_same_origin_links() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let seed = format!("{}/llms.txt", server.uri());

    mount(&server, "/llms.txt", markdown("- /start\n")).await;
    mount(
        &server,
        "/start",
        markdown("# Start\n\nSee [next](/next) and [elsewhere](https://elsewhere.invalid/).\n"),
    )
    .await;
    mount(&server, "/next", markdown("# Next\n\nThen [deeper](/deeper).\n")).await;
    Mock::given(method("GET"))
        .and(path("/deeper"))
        .respond_with(markdown("# Deeper\n"))
        .expect(0)
        .mount(&server)
        .await;

    let mut options = create_test_options(&seed, out.path());
    options.depth = 1;

    let summary = Orchestrator::new(options).unwrap().run().await.unwrap();
    assert_eq!(summary.saved.len(), 2);
    assert!(out.path().join("next.md").exists());
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let server = docs_site().await;
    let out = TempDir::new().unwrap();
    let target = out.path().join("never");
    let seed = format!("{}/llms.txt", server.uri());

    let mut orchestrator = Orchestrator::new(create_test_options(&seed, &target)).unwrap();
    let report = orchestrator.dry_run().await.unwrap();

    assert_eq!(report.urls.len(), 2);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.discovered.is_empty());
    assert!(!target.exists());
}

#[tokio::test]
async fn test_max_duration_stops_dequeuing() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let seed = format!("{}/llms.txt", server.uri());

    mount(&server, "/llms.txt", markdown("- /a\n- /b\n- /c\n")).await;
    for route in ["/a", "/b", "/c"] {
        mount(&server, route, markdown("# Page\n")).await;
    }

    let mut options = create_test_options(&seed, out.path());
    options.rate = 1.0;
    options.max_duration = Some(Duration::from_millis(500));

    let summary = Orchestrator::new(options).unwrap().run().await.unwrap();

    assert!(summary.stopped_early);
    assert!(summary.saved.len() < 3);
    assert!(out.path().join(META_FILE).exists());
}

#[tokio::test]
async fn test_manifest_failure_is_fatal() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let seed = format!("{}/llms.txt", server.uri());

    let result = Orchestrator::new(create_test_options(&seed, out.path()))
        .unwrap()
        .run()
        .await;

    assert!(matches!(result, Err(CrawlError::Manifest { .. })));
}

#[test]
fn test_unsupported_manifest_rejected_before_network() {
    let out = TempDir::new().unwrap();
    let options = create_test_options("https://docs.x.test/index.html", out.path());

    assert!(matches!(
        Orchestrator::new(options),
        Err(CrawlError::UnsupportedManifest { .. })
    ));
}

#[test]
fn test_invalid_rate_rejected() {
    let out = TempDir::new().unwrap();
    let mut options = create_test_options("https://docs.x.test/llms.txt", out.path());
    options.rate = 0.0;

    assert!(matches!(Orchestrator::new(options), Err(CrawlError::Config(_))));
}
