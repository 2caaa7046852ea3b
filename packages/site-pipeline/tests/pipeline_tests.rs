//! End-to-end runs of the pipeline against canned responses.

use std::path::Path;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use site_pipeline::extract::extract;
use site_pipeline::normalize::{normalize, parse_hours};
use site_pipeline::testing::{MockContentModel, MockFetcher, MockResponse};
use site_pipeline::{FetchError, Pipeline, PipelineConfig, PipelineError, ScrapedData, Site};
use tempfile::TempDir;
use url::Url;

const PAGE: &str = r#"<!doctype html>
<html>
<head>
  <title>Blue Door Cafe | Home</title>
  <script type="application/ld+json">
  {
    "@context": "https://schema.org",
    "@type": "Restaurant",
    "name": "Blue Door Cafe",
    "image": "https://cdn.bluedoor.example/hero.jpg",
    "logo": "https://cdn.bluedoor.example/logo.png",
    "telephone": "(612) 555-0142",
    "hasMenu": {
      "@type": "Menu",
      "hasMenuSection": [{
        "name": "Plates",
        "hasMenuItem": [
          {
            "name": "Blue Plate Special",
            "description": "Meatloaf, mashed potatoes, gravy",
            "image": "https://cdn.bluedoor.example/meatloaf.jpg",
            "offers": {"price": "14.00", "priceCurrency": "USD"}
          },
          {
            "name": "Garden Salad",
            "description": "Greens, radish, lemon vinaigrette (v)",
            "image": "https://cdn.bluedoor.example/salad.jpg"
          }
        ]
      }]
    }
  }
  </script>
</head>
<body>
  <section class="about">
    <h2>Our Story</h2>
    <img src="https://cdn.bluedoor.example/story.jpg">
    <p>Family-run since 1998, serving breakfast and lunch to the neighborhood every day of the week.</p>
  </section>
</body>
</html>"#;

const PAGE_URL: &str = "https://www.bluedoor.example/";

const IMAGES: [&str; 5] = [
    "https://cdn.bluedoor.example/hero.jpg",
    "https://cdn.bluedoor.example/logo.png",
    "https://cdn.bluedoor.example/meatloaf.jpg",
    "https://cdn.bluedoor.example/salad.jpg",
    "https://cdn.bluedoor.example/story.jpg",
];

struct Harness {
    dir: TempDir,
    config: PipelineConfig,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::new()
            .with_content_dir(dir.path().join("content"))
            .with_image_dir(dir.path().join("images"));
        Self { dir, config }
    }

    fn pipeline(&self, fetcher: MockFetcher) -> Pipeline {
        Pipeline::new(self.config.clone()).with_fetcher(Arc::new(fetcher))
    }

    fn content_dir(&self) -> &Path {
        self.config.content_dir()
    }

    fn artifact(&self, slug: &str) -> Site {
        let raw = std::fs::read_to_string(self.content_dir().join(format!("{}.json", slug))).unwrap();
        serde_json::from_str(&raw).unwrap()
    }
}

fn full_fetcher() -> MockFetcher {
    IMAGES
        .iter()
        .fold(MockFetcher::new().with_html(PAGE_URL, PAGE), |f, url| {
            f.with_bytes(*url, b"\xff\xd8\xff".to_vec())
        })
}

/// Same record with the run timestamp fixed.
fn at_epoch(mut site: Site) -> Site {
    site.last_scraped_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    site
}

#[tokio::test]
async fn test_generate_writes_artifact_and_localizes_images() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(full_fetcher());

    let out = pipeline.generate(PAGE_URL, false).await.unwrap();
    assert_eq!(out.slug, "bluedoor-example");
    assert_eq!(out.artifact_path, harness.content_dir().join("bluedoor-example.json"));

    let site = harness.artifact("bluedoor-example");
    assert_eq!(site.name, "Blue Door Cafe");
    assert_eq!(site.phone.as_deref(), Some("(612) 555-0142"));
    assert_eq!(site.hero_image.as_deref(), Some("/images/bluedoor-example/hero.jpg"));
    assert_eq!(site.logo.as_deref(), Some("/images/bluedoor-example/logo.jpg"));

    let menu = site.menu.as_ref().unwrap();
    assert_eq!(menu[0].items[0].price.as_deref(), Some("$14.00"));
    assert_eq!(
        menu[0].items[1].image.as_deref(),
        Some("/images/bluedoor-example/garden-salad.jpg")
    );

    let images = harness.dir.path().join("images").join("bluedoor-example");
    for file in ["hero.jpg", "logo.jpg", "blue-plate-special.jpg", "garden-salad.jpg", "our-story.jpg"] {
        assert!(images.join(file).exists(), "missing {}", file);
    }
}

#[tokio::test]
async fn test_one_failed_image_keeps_remote_url() {
    let harness = Harness::new();
    let fetcher = full_fetcher().with_status("https://cdn.bluedoor.example/logo.png", 500);
    let pipeline = harness.pipeline(fetcher);

    pipeline.generate(PAGE_URL, false).await.unwrap();

    let site = harness.artifact("bluedoor-example");
    assert_eq!(site.logo.as_deref(), Some("https://cdn.bluedoor.example/logo.png"));
    assert_eq!(site.hero_image.as_deref(), Some("/images/bluedoor-example/hero.jpg"));

    let menu = site.menu.unwrap();
    assert!(menu[0].items.iter().all(|i| i
        .image
        .as_deref()
        .is_some_and(|p| p.starts_with("/images/"))));
    let sections = site.sections.unwrap();
    assert_eq!(
        sections[0].image.as_deref(),
        Some("/images/bluedoor-example/our-story.jpg")
    );
}

#[tokio::test]
async fn test_non_html_response_writes_nothing() {
    let harness = Harness::new();
    let fetcher = MockFetcher::new().with_response(
        PAGE_URL,
        MockResponse::NotHtml("application/pdf".into()),
    );
    let pipeline = harness.pipeline(fetcher);

    let err = pipeline.generate(PAGE_URL, false).await.unwrap_err();
    assert!(matches!(err, PipelineError::Fetch(FetchError::NotHtml { .. })));
    assert!(!harness.content_dir().exists());
}

#[tokio::test]
async fn test_failing_responses_write_nothing() {
    let harness = Harness::new();
    let fetcher = MockFetcher::new()
        .with_status(PAGE_URL, 503)
        .with_response("https://down.example/", MockResponse::Network("connection reset".into()));
    let pipeline = harness.pipeline(fetcher);

    let err = pipeline.generate(PAGE_URL, false).await.unwrap_err();
    assert!(matches!(err, PipelineError::Fetch(FetchError::Status { status: 503, .. })));

    let err = pipeline.generate("https://down.example/", false).await.unwrap_err();
    assert!(matches!(err, PipelineError::Fetch(ref e) if e.is_network()));

    assert!(!harness.content_dir().exists());
}

#[tokio::test]
async fn test_invalid_url_is_rejected_before_fetching() {
    let harness = Harness::new();
    let fetcher = MockFetcher::new();
    let pipeline = harness.pipeline(fetcher.clone());

    let err = pipeline.generate("not a url", false).await.unwrap_err();
    assert!(err.is_client_error());
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn test_slug_stable_across_scheme_and_www() {
    let harness = Harness::new();
    let fetcher = MockFetcher::new()
        .with_html("http://www.example.com/", "<html><body><h1>Example</h1></body></html>")
        .with_html("https://example.com/", "<html><body><h1>Example</h1></body></html>");
    let pipeline = harness.pipeline(fetcher);

    let a = pipeline.generate("http://www.example.com/", false).await.unwrap();
    let b = pipeline.generate("https://example.com", false).await.unwrap();
    assert_eq!(a.slug, "example-com");
    assert_eq!(a.slug, b.slug);
    assert_eq!(a.artifact_path, b.artifact_path);
}

#[tokio::test]
async fn test_use_ai_without_credential_is_pass_through() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(full_fetcher());
    assert!(!pipeline.rewriter_enabled());

    pipeline.generate(PAGE_URL, false).await.unwrap();
    let plain = harness.artifact("bluedoor-example");

    pipeline.generate(PAGE_URL, true).await.unwrap();
    let with_ai = harness.artifact("bluedoor-example");

    assert_eq!(at_epoch(plain), at_epoch(with_ai));
}

#[tokio::test]
async fn test_malformed_model_response_falls_back() {
    let harness = Harness::new();

    harness.pipeline(full_fetcher()).generate(PAGE_URL, false).await.unwrap();
    let plain = harness.artifact("bluedoor-example");

    let model = MockContentModel::new().with_response("Sure! Here is your site: {not json");
    let pipeline = harness
        .pipeline(full_fetcher())
        .with_content_model(Arc::new(model.clone()));
    assert!(pipeline.rewriter_enabled());

    pipeline.generate(PAGE_URL, true).await.unwrap();
    let fallback = harness.artifact("bluedoor-example");

    assert_eq!(model.calls().len(), 1);
    assert_eq!(at_epoch(plain), at_epoch(fallback));
}

#[tokio::test]
async fn test_accepted_rewrite_is_persisted() {
    let harness = Harness::new();

    let model = MockContentModel::new().with_response(
        r#"```json
        {
          "slug": "something-else",
          "name": "The Blue Door Cafe",
          "tagline": null,
          "phone": "(612) 555-0142",
          "hours": null,
          "menu": [{"name": "Plates", "items": [
            {"name": "Blue Plate Special", "description": "House meatloaf with mashed potatoes and gravy", "price": "$14.00", "image": "https://cdn.bluedoor.example/meatloaf.jpg"},
            {"name": "Garden Salad", "description": "Greens, radish, lemon vinaigrette", "image": "https://cdn.bluedoor.example/salad.jpg", "dietary": ["vegetarian"]}
          ]}],
          "sections": [{"title": "Our Story", "body": "A family kitchen since 1998.", "image": "https://cdn.bluedoor.example/story.jpg"}],
          "heroImage": "https://cdn.bluedoor.example/hero.jpg",
          "logo": "https://cdn.bluedoor.example/logo.png",
          "sourceUrl": "https://elsewhere.example",
          "lastScrapedAt": "2020-01-01T00:00:00Z"
        }
        ```"#,
    );
    let pipeline = harness
        .pipeline(full_fetcher())
        .with_content_model(Arc::new(model));

    let out = pipeline.generate(PAGE_URL, true).await.unwrap();
    assert_eq!(out.slug, "bluedoor-example");

    let site = harness.artifact("bluedoor-example");
    assert_eq!(site.name, "The Blue Door Cafe");
    assert_eq!(site.source_url, PAGE_URL);
    assert_eq!(site.hero_image.as_deref(), Some("/images/bluedoor-example/hero.jpg"));
    assert_eq!(
        site.sections.unwrap()[0].body,
        "A family kitchen since 1998."
    );
}

#[tokio::test]
async fn test_rewrite_changing_facts_without_adding_any_falls_back() {
    let harness = Harness::new();

    harness.pipeline(full_fetcher()).generate(PAGE_URL, false).await.unwrap();
    let plain = harness.artifact("bluedoor-example");

    // Same shape as the input, but with a swapped hero URL and a new price.
    let base = Url::parse(PAGE_URL).unwrap();
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let mut tampered = normalize(extract(PAGE, &base).unwrap(), PAGE_URL, at).unwrap();
    tampered.hero_image = Some("https://attacker.example/other.jpg".into());
    if let Some(menu) = tampered.menu.as_mut() {
        menu[0].items[0].price = Some("$4.00".into());
    }

    let model = MockContentModel::new().with_response(serde_json::to_string(&tampered).unwrap());
    let fetcher = full_fetcher();
    let pipeline = harness
        .pipeline(fetcher.clone())
        .with_content_model(Arc::new(model.clone()));

    pipeline.generate(PAGE_URL, true).await.unwrap();
    let fallback = harness.artifact("bluedoor-example");

    assert_eq!(model.calls().len(), 1);
    assert_eq!(at_epoch(plain), at_epoch(fallback));
    assert!(!fetcher
        .calls()
        .iter()
        .any(|url| url.contains("attacker.example")));
}

#[test]
fn test_hero_dimension_edge_cases() {
    let base = Url::parse(PAGE_URL).unwrap();
    let hero = |html: &str| extract(html, &base).unwrap().hero_image;

    assert_eq!(hero(r#"<html><body><img src="/a.jpg"></body></html>"#), None);
    assert_eq!(
        hero(r#"<html><body><img src="/a.jpg" width="large" height="tall"></body></html>"#),
        None
    );
    assert_eq!(
        hero(r#"<html><body><img src="/a.jpg" width="1200"></body></html>"#),
        None
    );
    assert_eq!(
        hero(r#"<html><body>
            <img src="/normal.jpg" width="1200" height="800">
            <img src="/a.jpg" width="99999999999" height="99999999999">
          </body></html>"#)
        .as_deref(),
        Some("https://www.bluedoor.example/a.jpg")
    );
}

#[tokio::test]
async fn test_load_returns_persisted_record() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(full_fetcher());

    assert!(pipeline.load("bluedoor-example").await.unwrap().is_none());
    pipeline.generate(PAGE_URL, false).await.unwrap();

    let loaded = pipeline.load("bluedoor-example").await.unwrap().unwrap();
    assert_eq!(loaded, harness.artifact("bluedoor-example"));
}

#[test]
fn test_hours_drop_unmatched_lines() {
    let hours = parse_hours("Monday: 11am-10pm\nClosed");
    assert_eq!(hours.len(), 1);
    assert_eq!(hours[0].day, "Monday");
    assert_eq!(hours[0].open, "11am");
    assert_eq!(hours[0].close, "10pm");
}

#[test]
fn test_short_specials_section_is_not_emitted() {
    let html = r#"<html><body>
        <section><h2>Specials</h2><p>Ask your server.</p></section>
        <section><h2>Catering</h2><p>We cater weddings, office lunches and holiday parties for up to two hundred guests.</p></section>
      </body></html>"#;
    let data = extract(html, &Url::parse(PAGE_URL).unwrap()).unwrap();

    let sections = data.sections.unwrap();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].title, "Catering");
}

#[test]
fn test_normalize_is_deterministic() {
    let html = PAGE;
    let base = Url::parse(PAGE_URL).unwrap();
    let scraped: ScrapedData = extract(html, &base).unwrap();
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

    let first = serde_json::to_string_pretty(&normalize(scraped.clone(), PAGE_URL, at).unwrap()).unwrap();
    let second = serde_json::to_string_pretty(&normalize(scraped, PAGE_URL, at).unwrap()).unwrap();
    assert_eq!(first, second);
}
