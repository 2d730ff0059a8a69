use product_trawl::crawler::{CrawlSettings, DomainTask};
use product_trawl::renderer::HttpRendererFactory;
use product_trawl::run_all;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_settings() -> CrawlSettings {
    CrawlSettings {
        concurrency_limit: 2,
        reveal_settle_delay: Duration::ZERO,
        click_settle_delay: Duration::ZERO,
        navigation_timeout: Duration::from_secs(5),
        ..CrawlSettings::default()
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><body>{}</body></html>", body),
        "text/html; charset=utf-8",
    )
}

async fn mount_html(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let root = format!("{}/", base_url);

    mount_html(
        &mock_server,
        "/",
        r#"<a href="/catalog">Catalog</a>
           <a href="/products/shoe">Shoe</a>
           <a href="/feed.json">Feed</a>
           <a href="https://other.test/products/elsewhere">Partner</a>"#,
    )
    .await;

    mount_html(
        &mock_server,
        "/catalog",
        r#"<img loading="lazy" src="/a.jpg">
           <a href="/item/hat?ref=catalog">Hat</a>
           <a href="products/shoe#details">Shoe again</a>
           <a href="/missing">Gone</a>
           <a href="mailto:help@shop.test">Mail</a>"#,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/feed.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{}")
                .insert_header("content-type", "application/json"),
        )
        .mount(&mock_server)
        .await;

    let factory = HttpRendererFactory::new("TestBot/1.0").unwrap();
    let run = run_all(factory, vec![DomainTask::new(root.clone())], test_settings()).await;

    let result = run.get(&root).unwrap();
    assert_eq!(
        result.product_urls,
        vec![
            format!("{}/products/shoe", base_url),
            "https://other.test/products/elsewhere".to_string(),
            format!("{}/item/hat", base_url),
        ]
    );

    let failed: Vec<_> = result.failed_urls.iter().map(|f| f.url.clone()).collect();
    assert_eq!(
        failed,
        vec![format!("{}/feed.json", base_url), format!("{}/missing", base_url)]
    );
    assert!(result.failed_urls[0].reason.contains("Expected HTML"));
    assert!(result.failed_urls[1].reason.contains("404"));
    assert_eq!(result.pages_visited, 4);
}

#[tokio::test]
async fn test_load_more_without_scripting_still_harvests() {
    let mock_server = MockServer::start().await;
    let root = format!("{}/", mock_server.uri());

    mount_html(
        &mock_server,
        "/",
        r#"<a href="/p/1">One</a>
           <button class="load-more">Load More</button>"#,
    )
    .await;

    let factory = HttpRendererFactory::new("TestBot/1.0").unwrap();
    let task = DomainTask::new(root.clone())
        .with_reveal_control(".load-more", Some("Load More".to_string()));
    let run = run_all(factory, vec![task], test_settings()).await;

    let result = run.get(&root).unwrap();
    assert_eq!(result.product_urls, vec![format!("{}/p/1", mock_server.uri())]);
    assert!(result.failed_urls.is_empty());
}

#[tokio::test]
async fn test_server_error_on_root() {
    let mock_server = MockServer::start().await;
    let root = format!("{}/", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let factory = HttpRendererFactory::new("TestBot/1.0").unwrap();
    let run = run_all(factory, vec![DomainTask::new(root.clone())], test_settings()).await;

    let result = run.get(&root).unwrap();
    assert!(result.product_urls.is_empty());
    assert_eq!(result.failed_urls.len(), 1);
    assert!(result.failed_urls[0].reason.contains("503"));
}
