//! Integration tests for manifest resolution

use lrn_crawler::config::FetchOptions;
use lrn_crawler::crawler::Fetcher;
use lrn_crawler::manifest::{ManifestResolver, ManifestType};
use lrn_crawler::CrawlError;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_fetcher() -> Fetcher {
    Fetcher::new(FetchOptions {
        timeout: Duration::from_secs(5),
        max_retries: 0,
        backoff_base: Duration::from_millis(1),
        max_jitter: Duration::ZERO,
        ..FetchOptions::default()
    })
    .unwrap()
}

async fn mount_xml(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/xml"))
        .mount(server)
        .await;
}

fn urlset(locs: &[String]) -> String {
    let entries: String = locs
        .iter()
        .map(|loc| format!("  <url><loc>{}</loc></url>\n", loc))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}</urlset>",
        entries
    )
}

fn sitemap_index(locs: &[String]) -> String {
    let entries: String = locs
        .iter()
        .map(|loc| format!("  <sitemap><loc>{}</loc></sitemap>\n", loc))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<sitemapindex xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}</sitemapindex>",
        entries
    )
}

#[tokio::test]
async fn test_llms_txt_resolves_against_origin() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/llms.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "# Project\n\n## Docs\n- [Intro](/intro): start here\n- API: /api/reference\n\n## Optional\n- https://other.test/blog\n",
        ))
        .mount(&server)
        .await;

    let manifest = Url::parse(&format!("{}/docs/llms.txt", server.uri())).unwrap();
    let fetcher = create_test_fetcher();
    let urls = ManifestResolver::new(&fetcher)
        .resolve(ManifestType::LlmsTxt, &manifest)
        .await
        .unwrap();

    let urls: Vec<String> = urls.iter().map(Url::to_string).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/intro", server.uri()),
            format!("{}/api/reference", server.uri()),
            "https://other.test/blog".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_llms_full_is_not_fetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let manifest = Url::parse(&format!("{}/llms-full.txt", server.uri())).unwrap();
    let fetcher = create_test_fetcher();
    let urls = ManifestResolver::new(&fetcher)
        .resolve(ManifestType::LlmsFull, &manifest)
        .await
        .unwrap();

    assert_eq!(urls, vec![manifest]);
}

#[tokio::test]
async fn test_sitemap_urlset() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_xml(
        &server,
        "/sitemap.xml",
        urlset(&[format!("{}/a", base), format!("{}/b/", base)]),
    )
    .await;

    let manifest = Url::parse(&format!("{}/sitemap.xml", base)).unwrap();
    let fetcher = create_test_fetcher();
    let urls = ManifestResolver::new(&fetcher)
        .resolve(ManifestType::Sitemap, &manifest)
        .await
        .unwrap();

    assert_eq!(urls.len(), 2);
    assert_eq!(urls[0].path(), "/a");
}

#[tokio::test]
async fn test_sitemap_index_skips_failing_child() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_xml(
        &server,
        "/sitemap.xml",
        sitemap_index(&[
            format!("{}/sitemap-1.xml", base),
            format!("{}/sitemap-gone.xml", base),
            format!("{}/sitemap-2.xml", base),
        ]),
    )
    .await;
    mount_xml(&server, "/sitemap-1.xml", urlset(&[format!("{}/one", base)])).await;
    mount_xml(&server, "/sitemap-2.xml", urlset(&[format!("{}/two", base)])).await;

    let manifest = Url::parse(&format!("{}/sitemap.xml", base)).unwrap();
    let fetcher = create_test_fetcher();
    let urls = ManifestResolver::new(&fetcher)
        .resolve(ManifestType::Sitemap, &manifest)
        .await
        .unwrap();

    let paths: Vec<&str> = urls.iter().map(Url::path).collect();
    assert_eq!(paths, vec!["/one", "/two"]);
}

#[tokio::test]
async fn test_nested_sitemap_index_depth_limit() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_xml(&server, "/sitemap.xml", sitemap_index(&[format!("{}/level1.xml", base)])).await;
    mount_xml(&server, "/level1.xml", sitemap_index(&[format!("{}/level2.xml", base)])).await;
    mount_xml(
        &server,
        "/level2.xml",
        sitemap_index(&[format!("{}/level3.xml", base)]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/level3.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(urlset(&[format!("{}/deep", base)]), "application/xml"))
        .expect(0)
        .mount(&server)
        .await;

    let manifest = Url::parse(&format!("{}/sitemap.xml", base)).unwrap();
    let fetcher = create_test_fetcher();
    let urls = ManifestResolver::new(&fetcher)
        .resolve(ManifestType::Sitemap, &manifest)
        .await
        .unwrap();

    assert!(urls.is_empty());
}

#[tokio::test]
async fn test_missing_manifest_is_error() {
    let server = MockServer::start().await;
    let manifest = Url::parse(&format!("{}/llms.txt", server.uri())).unwrap();
    let fetcher = create_test_fetcher();

    let result = ManifestResolver::new(&fetcher)
        .resolve(ManifestType::LlmsTxt, &manifest)
        .await;

    assert!(matches!(result, Err(CrawlError::Manifest { .. })));
}

#[tokio::test]
async fn test_malformed_sitemap_is_error() {
    let server = MockServer::start().await;
    mount_xml(&server, "/sitemap.xml", "<html>not a sitemap</html>".to_string()).await;

    let manifest = Url::parse(&format!("{}/sitemap.xml", server.uri())).unwrap();
    let fetcher = create_test_fetcher();
    let result = ManifestResolver::new(&fetcher)
        .resolve(ManifestType::Sitemap, &manifest)
        .await;

    assert!(matches!(result, Err(CrawlError::Manifest { .. })));
}

#[test]
fn test_detection_from_url() {
    let detect = |s: &str| ManifestType::detect(&Url::parse(s).unwrap());

    assert_eq!(detect("https://x.test/llms-full.txt").unwrap(), ManifestType::LlmsFull);
    assert_eq!(detect("https://x.test/docs/llms.txt").unwrap(), ManifestType::LlmsTxt);
    assert_eq!(detect("https://x.test/sitemap_index.xml").unwrap(), ManifestType::Sitemap);
    assert!(matches!(
        detect("https://x.test/readme.md"),
        Err(CrawlError::UnsupportedManifest { .. })
    ));
}
