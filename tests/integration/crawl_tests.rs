//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small shop (root page with a category
//! sidebar, paginated listings, product detail pages) and run the full crawl
//! cycle end-to-end.

use catalog_harvest::config::{Config, SelectorConfig};
use catalog_harvest::crawler::{
    Coordinator, CrawlEvent, FetchError, PageFetcher, PagerOptions, ProductListPager,
    SiteSelectors,
};
use catalog_harvest::model::CrawlResult;
use catalog_harvest::output::ResultStore;
use catalog_harvest::{HarvestError, RunPhase};
use futures::StreamExt;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock shop
fn create_test_config(base_url: &str, output_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.site.root_url = format!("{}/shop/", base_url);
    config.crawler.page_delay = 0;
    config.crawler.request_timeout = 5;
    config.crawler.connect_timeout = 2;
    config.output.directory = output_dir.path().display().to_string();
    config
}

fn root_page(categories: &[(&str, &str)]) -> String {
    let items: String = categories
        .iter()
        .map(|(name, href)| {
            format!(
                r#"<li class="cat-item"><a href="{}">{}</a> <span class="count">(3)</span></li>"#,
                href, name
            )
        })
        .collect();

    format!(
        r#"<html><body>
        <aside class="widget widget_product_categories"><ul>{}</ul></aside>
        <main>Welcome</main>
        </body></html>"#,
        items
    )
}

fn listing_page(products: &[(&str, &str)], next: Option<&str>) -> String {
    let blocks: String = products
        .iter()
        .map(|(name, href)| {
            format!(
                r#"<div class="product-block">
                    <a class="product-image" href="{}" title="{}"><img src="/thumb.jpg"></a>
                   </div>"#,
                href, name
            )
        })
        .collect();

    let next = next
        .map(|href| format!(r#"<nav><a class="next page-numbers" href="{}">→</a></nav>"#, href))
        .unwrap_or_default();

    format!("<html><body>{}{}</body></html>", blocks, next)
}

fn detail_page(gallery_src: Option<&str>, description: Option<&str>) -> String {
    let gallery = gallery_src
        .map(|src| {
            format!(
                r#"<figure class="woocommerce-product-gallery__wrapper"><img src="{}"></figure>"#,
                src
            )
        })
        .unwrap_or_else(|| r#"<img src="/logo.png">"#.to_string());

    let description = description
        .map(|text| {
            format!(
                r#"<div class="woocommerce-product-details__short-description"><p>{}</p></div>"#,
                text
            )
        })
        .unwrap_or_default();

    format!("<html><body>{}{}</body></html>", gallery, description)
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_html_once(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

fn drain(events: &mut mpsc::UnboundedReceiver<CrawlEvent>) -> Vec<CrawlEvent> {
    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    received
}

fn product_urls(result: &CrawlResult) -> Vec<String> {
    result
        .categories
        .iter()
        .flat_map(|c| c.products.iter().map(|p| p.url.clone()))
        .collect()
}

/// Mounts a shop with "Fans" (two pages, two products) and
/// "Door Gaskets" (one page, one product whose detail page is missing)
async fn mount_two_category_shop(server: &MockServer) {
    mount_html(
        server,
        "/shop/",
        root_page(&[("Fans", "/c/fans/"), ("Door Gaskets", "/c/gaskets/")]),
    )
    .await;

    mount_html(
        server,
        "/c/fans/",
        listing_page(&[("Fan Motor", "/p/fan-motor/")], Some("/c/fans/page/2/")),
    )
    .await;
    mount_html(
        server,
        "/c/fans/page/2/",
        listing_page(&[("Fan Blade", "/p/fan-blade/")], None),
    )
    .await;
    mount_html(
        server,
        "/c/gaskets/",
        listing_page(&[("Door Seal", "/p/door-seal/")], None),
    )
    .await;

    mount_html(
        server,
        "/p/fan-motor/",
        detail_page(Some("/img/fan-motor.jpg"), Some("Quiet 12V motor")),
    )
    .await;
    mount_html(server, "/p/fan-blade/", detail_page(None, None)).await;
    // /p/door-seal/ is not mounted and answers 404
}

#[tokio::test]
async fn test_full_crawl_two_categories() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    mount_two_category_shop(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, &dir);
    let store = ResultStore::new(dir.path()).unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut coordinator = Coordinator::new(config)
        .unwrap()
        .with_store(store)
        .with_events(tx);

    let outcome = coordinator.run().await.expect("Crawl should succeed");
    assert_eq!(coordinator.phase(), RunPhase::Done);

    let result = &outcome.result;
    assert_eq!(result.total_products, 3);
    assert_eq!(
        result.total_products,
        result.categories.iter().map(|c| c.products.len()).sum::<usize>()
    );

    assert_eq!(result.categories.len(), 2);
    assert_eq!(result.categories[0].category_name, "Fans");
    assert_eq!(
        result.categories[0].category_url,
        format!("{}/c/fans/", base_url)
    );
    assert_eq!(result.categories[1].category_name, "Door Gaskets");

    assert_eq!(
        product_urls(result),
        vec![
            format!("{}/p/fan-motor/", base_url),
            format!("{}/p/fan-blade/", base_url),
            format!("{}/p/door-seal/", base_url),
        ]
    );

    let motor = &result.categories[0].products[0];
    assert_eq!(motor.name, "Fan Motor");
    assert_eq!(
        motor.image.as_deref(),
        Some(format!("{}/img/fan-motor.jpg", base_url).as_str())
    );
    assert_eq!(motor.description, "Quiet 12V motor");

    // No gallery: falls back to the first image on the page
    let blade = &result.categories[0].products[1];
    assert_eq!(
        blade.image.as_deref(),
        Some(format!("{}/logo.png", base_url).as_str())
    );
    assert_eq!(blade.description, "");

    // Detail page missing: kept with name and url only
    let seal = &result.categories[1].products[0];
    assert_eq!(seal.name, "Door Seal");
    assert_eq!(seal.image, None);
    assert_eq!(seal.description, "");

    let report = &outcome.report;
    assert_eq!(report.categories_discovered, 2);
    assert_eq!(report.categories_completed, 2);
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.products_enriched, 3);
    assert_eq!(report.products_degraded, 1);
    assert!(!report.cancelled);
    assert!(report.finished_at.is_some());

    // Files on disk
    let fans_path = dir.path().join("Fans.json");
    let gaskets_path = dir.path().join("Door_Gaskets.json");
    assert!(fans_path.exists());
    assert!(gaskets_path.exists());

    let combined: CrawlResult = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("all_products.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(&combined, result);

    // Progress events in order
    let events = drain(&mut rx);
    assert_eq!(
        events,
        vec![
            CrawlEvent::DiscoveryFinished { category_count: 2 },
            CrawlEvent::CategoryStarted {
                category_index: 1,
                category_count: 2,
                category_name: "Fans".to_string(),
            },
            CrawlEvent::CategoryFinished {
                category_index: 1,
                category_count: 2,
                category_name: "Fans".to_string(),
                products_in_category: 2,
                products_so_far: 2,
                saved_to: Some(fans_path),
            },
            CrawlEvent::CategoryStarted {
                category_index: 2,
                category_count: 2,
                category_name: "Door Gaskets".to_string(),
            },
            CrawlEvent::CategoryFinished {
                category_index: 2,
                category_count: 2,
                category_name: "Door Gaskets".to_string(),
                products_in_category: 1,
                products_so_far: 3,
                saved_to: Some(gaskets_path),
            },
            CrawlEvent::Finished { total_products: 3 },
        ]
    );
}

#[tokio::test]
async fn test_run_crawl_writes_to_configured_directory() {
    let server = MockServer::start().await;
    mount_two_category_shop(&server).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), &dir);
    config.output.directory = dir.path().join("out").display().to_string();

    let outcome = catalog_harvest::crawler::run_crawl(config).await.unwrap();

    assert_eq!(outcome.result.total_products, 3);
    assert!(dir.path().join("out/all_products.json").exists());
    assert!(dir.path().join("out/Fans.json").exists());
}

#[tokio::test]
async fn test_concurrent_enrichment_keeps_listing_order() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_html(&server, "/shop/", root_page(&[("Fans", "/c/fans/")])).await;

    let products: Vec<(String, String)> = (1..=5)
        .map(|i| (format!("Part {}", i), format!("/p/part-{}/", i)))
        .collect();
    let listed: Vec<(&str, &str)> = products
        .iter()
        .map(|(name, href)| (name.as_str(), href.as_str()))
        .collect();
    mount_html(&server, "/c/fans/", listing_page(&listed, None)).await;

    // Earlier products answer slower, so completion order is reversed
    for (i, (_, href)) in products.iter().enumerate() {
        let delay = Duration::from_millis(50 * (5 - i as u64));
        Mock::given(method("GET"))
            .and(path(href.as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(detail_page(None, Some(format!("part {}", i + 1).as_str())))
                    .set_delay(delay),
            )
            .mount(&server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, &dir);
    config.crawler.enrich_concurrency = 4;
    config.crawler.max_concurrent_requests = 4;

    let mut coordinator = Coordinator::new(config).unwrap();
    let outcome = coordinator.run().await.unwrap();

    let category = &outcome.result.categories[0];
    let names: Vec<&str> = category.products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Part 1", "Part 2", "Part 3", "Part 4", "Part 5"]);

    let descriptions: Vec<&str> = category
        .products
        .iter()
        .map(|p| p.description.as_str())
        .collect();
    assert_eq!(
        descriptions,
        vec!["part 1", "part 2", "part 3", "part 4", "part 5"]
    );
}

#[tokio::test]
async fn test_root_without_category_widget() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/shop/",
        "<html><body><p>Under maintenance</p></body></html>".to_string(),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    let store = ResultStore::new(dir.path()).unwrap();

    let mut coordinator = Coordinator::new(config).unwrap().with_store(store);
    let outcome = coordinator.run().await.unwrap();

    assert_eq!(coordinator.phase(), RunPhase::Done);
    assert_eq!(outcome.result.total_products, 0);
    assert!(outcome.result.categories.is_empty());

    let combined = std::fs::read_to_string(dir.path().join("all_products.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&combined).unwrap();
    assert_eq!(value["total_products"], 0);
    assert_eq!(value["categories"], serde_json::json!([]));
}

#[tokio::test]
async fn test_root_failure_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/shop/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    let store = ResultStore::new(dir.path()).unwrap();

    let mut coordinator = Coordinator::new(config).unwrap().with_store(store);
    let result = coordinator.run().await;

    match result {
        Err(HarvestError::Fetch(FetchError::Status { status, .. })) => assert_eq!(status, 500),
        other => panic!("Expected a fatal status error, got {:?}", other.map(|o| o.result)),
    }
    assert_eq!(coordinator.phase(), RunPhase::Failed);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_cyclic_next_link_terminates() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_html(&server, "/shop/", root_page(&[("Fans", "/c/fans/")])).await;
    mount_html_once(
        &server,
        "/c/fans/",
        listing_page(&[("Fan Motor", "/p/fan-motor/")], Some("/c/fans/page/2/")),
    )
    .await;
    // Points back at the first page, with a fragment to disguise it
    mount_html_once(
        &server,
        "/c/fans/page/2/",
        listing_page(&[("Fan Blade", "/p/fan-blade/")], Some("/c/fans#top")),
    )
    .await;
    mount_html(&server, "/p/fan-motor/", detail_page(None, None)).await;
    mount_html(&server, "/p/fan-blade/", detail_page(None, None)).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, &dir);

    let mut coordinator = Coordinator::new(config).unwrap();
    let outcome = coordinator.run().await.unwrap();

    assert_eq!(outcome.result.total_products, 2);
    assert_eq!(outcome.report.cycles_detected, 1);
    assert_eq!(outcome.report.pages_fetched, 2);
}

#[tokio::test]
async fn test_page_limit_stops_pagination() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_html(&server, "/shop/", root_page(&[("Fans", "/c/fans/")])).await;
    mount_html_once(
        &server,
        "/c/fans/",
        listing_page(&[("Part 1", "/p/1/")], Some("/c/fans/page/2/")),
    )
    .await;
    mount_html_once(
        &server,
        "/c/fans/page/2/",
        listing_page(&[("Part 2", "/p/2/")], Some("/c/fans/page/3/")),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/c/fans/page/3/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[], None)))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, &dir);
    config.crawler.max_pages_per_category = 2;

    let mut coordinator = Coordinator::new(config).unwrap();
    let outcome = coordinator.run().await.unwrap();

    assert_eq!(outcome.result.total_products, 2);
    assert_eq!(outcome.report.page_limits_hit, 1);
    assert_eq!(outcome.report.categories_completed, 1);
}

#[tokio::test]
async fn test_failed_listing_page_keeps_earlier_products() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_html(
        &server,
        "/shop/",
        root_page(&[("Fans", "/c/fans/"), ("Lamps", "/c/lamps/")]),
    )
    .await;
    mount_html(
        &server,
        "/c/fans/",
        listing_page(&[("Fan Motor", "/p/fan-motor/")], Some("/c/fans/page/2/")),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/c/fans/page/2/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_html(
        &server,
        "/c/lamps/",
        listing_page(&[("Bulb", "/p/bulb/")], None),
    )
    .await;
    mount_html(&server, "/p/fan-motor/", detail_page(None, None)).await;
    mount_html(&server, "/p/bulb/", detail_page(None, None)).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, &dir);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut coordinator = Coordinator::new(config).unwrap().with_events(tx);
    let outcome = coordinator.run().await.unwrap();

    assert_eq!(outcome.result.categories[0].products.len(), 1);
    assert_eq!(outcome.result.categories[1].products.len(), 1);
    assert_eq!(outcome.result.total_products, 2);
    assert_eq!(outcome.report.pages_failed, 1);

    let skipped: Vec<CrawlEvent> = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, CrawlEvent::PageSkipped { .. }))
        .collect();
    assert_eq!(skipped.len(), 1);
    if let CrawlEvent::PageSkipped {
        category_name, url, ..
    } = &skipped[0]
    {
        assert_eq!(category_name, "Fans");
        assert_eq!(url, &format!("{}/c/fans/page/2/", base_url));
    }
}

#[tokio::test]
async fn test_repeated_product_is_dropped() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_html(&server, "/shop/", root_page(&[("Fans", "/c/fans/")])).await;
    mount_html(
        &server,
        "/c/fans/",
        listing_page(
            &[("Part 1", "/p/1/"), ("Part 2", "/p/2/")],
            Some("/c/fans/page/2/"),
        ),
    )
    .await;
    mount_html(
        &server,
        "/c/fans/page/2/",
        listing_page(&[("Part 2", "/p/2/"), ("Part 3", "/p/3/")], None),
    )
    .await;
    mount_html(&server, "/p/1/", detail_page(None, None)).await;
    mount_html_once(&server, "/p/2/", detail_page(None, None)).await;
    mount_html(&server, "/p/3/", detail_page(None, None)).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, &dir);

    let mut coordinator = Coordinator::new(config).unwrap();
    let outcome = coordinator.run().await.unwrap();

    let names: Vec<&str> = outcome.result.categories[0]
        .products
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(names, vec!["Part 1", "Part 2", "Part 3"]);
    assert_eq!(outcome.report.duplicates_dropped, 1);
}

#[tokio::test]
async fn test_stub_stream_spans_pages() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_html(
        &server,
        "/c/fans/",
        listing_page(
            &[("Fan Motor", "/p/fan-motor/"), ("Fan Blade", "/p/fan-blade/")],
            Some("/c/fans/page/2/"),
        ),
    )
    .await;
    mount_html(
        &server,
        "/c/fans/page/2/",
        listing_page(&[("Fan Grill", "/p/fan-grill/")], None),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, &dir);
    let fetcher = PageFetcher::new(&config).unwrap();
    let selectors = SiteSelectors::compile(&SelectorConfig::default()).unwrap();
    let start = url::Url::parse(&format!("{}/c/fans/", base_url)).unwrap();

    let options = PagerOptions {
        page_delay: Duration::ZERO,
        max_pages: 10,
    };
    let pager = ProductListPager::new(&fetcher, &selectors, start, options);
    let stubs: Vec<_> = pager.into_stub_stream().collect().await;

    let names: Vec<&str> = stubs.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Fan Motor", "Fan Blade", "Fan Grill"]);
}

#[tokio::test]
async fn test_coordinator_runs_once() {
    let server = MockServer::start().await;
    mount_html(&server, "/shop/", root_page(&[])).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);

    let mut coordinator = Coordinator::new(config).unwrap();
    coordinator.run().await.unwrap();

    let second = coordinator.run().await;
    assert!(matches!(
        second,
        Err(HarvestError::InvalidTransition {
            from: RunPhase::Done,
            to: RunPhase::Discovering,
        })
    ));
    assert_eq!(coordinator.phase(), RunPhase::Done);
}

#[tokio::test]
async fn test_cancelled_run_ends_done_with_partial_result() {
    let server = MockServer::start().await;
    mount_two_category_shop(&server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), &dir);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut coordinator = Coordinator::new(config)
        .unwrap()
        .with_cancellation(cancel);
    let outcome = coordinator.run().await.unwrap();

    assert_eq!(coordinator.phase(), RunPhase::Done);
    assert!(outcome.report.cancelled);
    assert_eq!(outcome.report.categories_discovered, 2);
    assert_eq!(outcome.result.total_products, 0);
}

#[tokio::test]
async fn test_page_delay_applies_between_listing_pages() {
    let server = MockServer::start().await;
    let base_url = server.uri();

    mount_html(
        &server,
        "/c/fans/",
        listing_page(&[("Fan Motor", "/p/fan-motor/")], Some("/c/fans/page/2/")),
    )
    .await;
    mount_html(
        &server,
        "/c/fans/page/2/",
        listing_page(&[("Fan Blade", "/p/fan-blade/")], None),
    )
    .await;
    mount_html(
        &server,
        "/c/lamps/",
        listing_page(&[("Bulb", "/p/bulb/")], None),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, &dir);
    config.crawler.page_delay = 200;

    let fetcher = PageFetcher::new(&config).unwrap();
    let selectors = SiteSelectors::compile(&config.selectors).unwrap();
    let options = PagerOptions::from_config(&config.crawler);

    // Two pages: one pause before the second
    let start = url::Url::parse(&format!("{}/c/fans/", base_url)).unwrap();
    let began = std::time::Instant::now();
    let stubs: Vec<_> = ProductListPager::new(&fetcher, &selectors, start, options)
        .into_stub_stream()
        .collect()
        .await;
    assert_eq!(stubs.len(), 2);
    assert!(began.elapsed() >= Duration::from_millis(200));

    // One page: no pause before the first fetch
    let start = url::Url::parse(&format!("{}/c/lamps/", base_url)).unwrap();
    let began = std::time::Instant::now();
    let stubs: Vec<_> = ProductListPager::new(&fetcher, &selectors, start, options)
        .into_stub_stream()
        .collect()
        .await;
    assert_eq!(stubs.len(), 1);
    assert!(began.elapsed() < Duration::from_millis(200));
}

#[tokio::test]
async fn test_cancel_mid_category_keeps_partial_category() {
    let server = MockServer::start().await;
    mount_two_category_shop(&server).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), &dir);
    // Long pause before page 2 of "Fans"; the cancel lands inside it
    config.crawler.page_delay = 3000;
    let store = ResultStore::new(dir.path()).unwrap();
    let cancel = CancellationToken::new();

    let mut coordinator = Coordinator::new(config)
        .unwrap()
        .with_store(store)
        .with_cancellation(cancel.clone());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        cancel.cancel();
    });

    let began = std::time::Instant::now();
    let outcome = coordinator.run().await.unwrap();
    assert!(began.elapsed() < Duration::from_millis(2500));

    assert_eq!(coordinator.phase(), RunPhase::Done);
    assert!(outcome.report.cancelled);
    assert_eq!(outcome.report.categories_completed, 0);

    let result = &outcome.result;
    assert_eq!(result.categories.len(), 1);
    assert_eq!(result.categories[0].category_name, "Fans");
    assert_eq!(result.categories[0].products[0].name, "Fan Motor");
    assert_eq!(result.total_products, 1);

    let combined: CrawlResult = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("all_products.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(&combined, result);
    assert!(dir.path().join("Fans.json").exists());
    assert!(!dir.path().join("Door_Gaskets.json").exists());
}
