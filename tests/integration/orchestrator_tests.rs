use product_trawl::crawler::{CrawlSettings, DomainTask, Orchestrator};
use product_trawl::renderer::{StubControl, StubPage, StubRendererFactory, StubSite};
use product_trawl::{is_product, run_all};
use std::sync::Arc;
use std::time::Duration;

fn test_settings(concurrency_limit: usize) -> CrawlSettings {
    CrawlSettings {
        concurrency_limit,
        reveal_settle_delay: Duration::ZERO,
        click_settle_delay: Duration::ZERO,
        navigation_timeout: Duration::from_secs(5),
        ..CrawlSettings::default()
    }
}

/// A small catalog: a landing page, two listings and a cross-origin link
fn catalog_site(root: &str) -> StubSite {
    let url = |path: &str| format!("{}{}", root.trim_end_matches('/'), path);

    StubSite::new()
        .page(
            root,
            StubPage::new().links([
                url("/women"),
                url("/men"),
                "https://elsewhere.test/women".to_string(),
            ]),
        )
        .page(
            &url("/women"),
            StubPage::new()
                .lazy_load([800, 1600, 1600])
                .links([url("/products/dress"), url("/men"), url("/women?sort=price")]),
        )
        .page(
            &url("/men"),
            StubPage::new()
                .control(StubControl::new(".load-more", ["Load More", "Load More", "Done"]))
                .links([url("/p/shirt"), url("/products/dress#reviews")]),
        )
}

#[tokio::test]
async fn test_three_domains_one_unreachable() {
    let factory = StubRendererFactory::new()
        .site("https://a.test/", catalog_site("https://a.test/"))
        .site("https://down.test/", StubSite::unreachable("net::ERR_NAME_NOT_RESOLVED"))
        .site("https://c.test/", catalog_site("https://c.test/"));
    let tasks = vec![
        DomainTask::new("https://a.test/"),
        DomainTask::new("https://down.test/"),
        DomainTask::new("https://c.test/")
            .with_reveal_control(".load-more", Some("Load More".to_string())),
    ];

    let run = run_all(factory, tasks, test_settings(2)).await;

    assert_eq!(run.len(), 3);

    let down = run.get("https://down.test/").unwrap();
    assert!(down.product_urls.is_empty());
    assert_eq!(down.failed_urls.len(), 1);
    assert!(down.failed_urls[0].reason.contains("ERR_NAME_NOT_RESOLVED"));

    for domain in ["https://a.test/", "https://c.test/"] {
        let result = run.get(domain).unwrap();
        assert_eq!(
            result.product_urls,
            vec![
                format!("{}products/dress", domain),
                format!("{}p/shirt", domain),
            ]
        );
        assert!(result.failed_urls.is_empty());
        assert_eq!(result.pages_visited, 3);
        assert!(result.product_urls.iter().all(|url| is_product(url)));
    }
}

#[tokio::test]
async fn test_reveal_interactions_per_domain() {
    let factory = Arc::new(
        StubRendererFactory::new().site("https://c.test/", catalog_site("https://c.test/")),
    );
    let orchestrator = Orchestrator::new(Arc::clone(&factory), test_settings(1));
    let task = DomainTask::new("https://c.test/")
        .with_reveal_control(".load-more", Some("Load More".to_string()));

    orchestrator.run_all(vec![task]).await;

    let probe = factory.probe("https://c.test/").unwrap();
    assert_eq!(probe.scrolls(), 2);
    assert_eq!(probe.clicks(), 2);
    assert_eq!(probe.closes(), 1);
    assert_eq!(
        probe.navigations(),
        vec!["https://c.test/", "https://c.test/women", "https://c.test/men"]
    );
}

#[tokio::test]
async fn test_peak_sessions_bounded_by_limit() {
    let mut factory = StubRendererFactory::new();
    let mut tasks = Vec::new();
    for i in 0..8 {
        let root = format!("https://shop{}.test/", i);
        factory = factory.site(&root, catalog_site(&root).latency(Duration::from_millis(15)));
        tasks.push(DomainTask::new(root));
    }
    let factory = Arc::new(factory);

    let run = Orchestrator::new(Arc::clone(&factory), test_settings(3))
        .run_all(tasks)
        .await;

    assert_eq!(run.len(), 8);
    assert!(factory.peak_sessions() <= 3);
    assert!(factory.peak_sessions() >= 1);
    assert_eq!(factory.sessions_opened(), 8);
    assert_eq!(factory.open_sessions(), 0);
}

#[tokio::test]
async fn test_session_open_failure_synthesized() {
    let factory = StubRendererFactory::new()
        .site("https://a.test/", catalog_site("https://a.test/"));
    let tasks = vec![
        DomainTask::new("https://unregistered.test/"),
        DomainTask::new("https://a.test/"),
    ];

    let run = run_all(factory, tasks, test_settings(2)).await;

    let names: Vec<_> = run.iter().map(|r| r.domain_name.as_str()).collect();
    assert_eq!(names, vec!["https://unregistered.test/", "https://a.test/"]);

    let failed = run.get("https://unregistered.test/").unwrap();
    assert!(failed.product_urls.is_empty());
    assert_eq!(failed.failed_urls.len(), 1);
    assert_eq!(failed.failed_urls[0].url, "https://unregistered.test/");
    assert_eq!(run.get("https://a.test/").unwrap().product_urls.len(), 2);
}
