//! Image localization.
//!
//! Downloads every remote image the record points at (hero, logo, menu
//! items, sections) into `<image_dir>/<slug>/` and rewrites the reference to
//! the root-relative public path. A failed download leaves that one
//! reference pointing at the remote URL.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{FetchError, ImageDownloadError};
use crate::fetcher::Fetcher;
use crate::normalize::slugify;
use crate::types::{PipelineConfig, Site};

/// Fixed file stems for the two singleton images.
pub const HERO_STEM: &str = "hero";
pub const LOGO_STEM: &str = "logo";
/// Extension for derived file names.
pub const IMAGE_EXTENSION: &str = "jpg";

/// Which field of the record an image belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Hero,
    Logo,
    MenuItem { category: usize, item: usize },
    Section(usize),
}

/// One image to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTarget {
    pub slot: ImageSlot,
    pub remote_url: String,
    pub filename: String,
}

/// Outcome counts for one localization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalizeReport {
    pub localized: usize,
    pub failed: usize,
}

pub struct ImageLocalizer {
    fetcher: Arc<dyn Fetcher>,
    image_dir: PathBuf,
    url_prefix: String,
    concurrency: usize,
    timeout: Duration,
}

impl ImageLocalizer {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: &PipelineConfig) -> Self {
        Self {
            fetcher,
            image_dir: config.image_dir.clone(),
            url_prefix: config.image_url_prefix.trim_end_matches('/').to_string(),
            concurrency: config.image_concurrency.max(1),
            timeout: config.image_timeout,
        }
    }

    /// Localize every remote image in `site`.
    pub async fn localize(&self, site: Site) -> (Site, LocalizeReport) {
        let targets = collect_targets(&site);
        if targets.is_empty() {
            return (site, LocalizeReport::default());
        }

        let dir = self.image_dir.join(&site.slug);
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            warn!(dir = %dir.display(), error = %e, "Could not create image directory, keeping remote URLs");
            let failed = targets.len();
            return (site, LocalizeReport { localized: 0, failed });
        }

        debug!(slug = %site.slug, count = targets.len(), "Downloading images");

        let results: Vec<(ImageTarget, Result<PathBuf, ImageDownloadError>)> =
            stream::iter(targets)
                .map(|target| {
                    let path = dir.join(&target.filename);
                    async move {
                        let result = self.download(&target.remote_url, path).await;
                        (target, result)
                    }
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        let mut site = site;
        let mut report = LocalizeReport::default();
        for (target, result) in results {
            match result {
                Ok(_) => {
                    let public = format!("{}/{}/{}", self.url_prefix, site.slug, target.filename);
                    set_slot(&mut site, target.slot, public);
                    report.localized += 1;
                }
                Err(e) => {
                    warn!(url = %target.remote_url, error = %e, "Image download failed, keeping remote URL");
                    report.failed += 1;
                }
            }
        }

        info!(
            slug = %site.slug,
            localized = report.localized,
            failed = report.failed,
            "Image localization complete"
        );
        (site, report)
    }

    async fn download(&self, url: &str, path: PathBuf) -> Result<PathBuf, ImageDownloadError> {
        let bytes = tokio::time::timeout(self.timeout, self.fetcher.fetch_bytes(url))
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            })??;

        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| ImageDownloadError::Io {
                path: path.clone(),
                source,
            })?;

        debug!(url = %url, path = %path.display(), bytes = bytes.len(), "Image saved");
        Ok(path)
    }
}

/// Whether a reference still points off-site.
pub fn is_remote(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// Every remote image reference in `site`, with a unique file name each.
pub fn collect_targets(site: &Site) -> Vec<ImageTarget> {
    let mut names = FileNames::default();
    let mut targets = Vec::new();

    let mut push = |slot: ImageSlot, url: &Option<String>, stem: Option<&str>| {
        if let Some(url) = url.as_deref().filter(|u| is_remote(u)) {
            targets.push(ImageTarget {
                slot,
                remote_url: url.to_string(),
                filename: names.claim(stem, url),
            });
        }
    };

    push(ImageSlot::Hero, &site.hero_image, Some(HERO_STEM));
    push(ImageSlot::Logo, &site.logo, Some(LOGO_STEM));
    for (c, category) in site.menu.iter().flatten().enumerate() {
        for (i, item) in category.items.iter().enumerate() {
            push(
                ImageSlot::MenuItem { category: c, item: i },
                &item.image,
                Some(item.name.as_str()),
            );
        }
    }
    for (s, section) in site.sections.iter().flatten().enumerate() {
        push(ImageSlot::Section(s), &section.image, Some(section.title.as_str()));
    }

    targets
}

fn set_slot(site: &mut Site, slot: ImageSlot, reference: String) {
    let field = match slot {
        ImageSlot::Hero => Some(&mut site.hero_image),
        ImageSlot::Logo => Some(&mut site.logo),
        ImageSlot::MenuItem { category, item } => site
            .menu
            .as_mut()
            .and_then(|m| m.get_mut(category))
            .and_then(|c| c.items.get_mut(item))
            .map(|i| &mut i.image),
        ImageSlot::Section(index) => site
            .sections
            .as_mut()
            .and_then(|s| s.get_mut(index))
            .map(|s| &mut s.image),
    };
    if let Some(field) = field {
        *field = Some(reference);
    }
}

/// Hands out file names, suffixing `-2`, `-3`... on collisions.
#[derive(Default)]
struct FileNames {
    used: HashSet<String>,
}

impl FileNames {
    fn claim(&mut self, stem: Option<&str>, url: &str) -> String {
        let stem = stem
            .map(slugify)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("image-{}", &url_hash(url)[..12]));

        let mut candidate = format!("{}.{}", stem, IMAGE_EXTENSION);
        let mut n = 2;
        while self.used.contains(&candidate) {
            candidate = format!("{}-{}.{}", stem, n, IMAGE_EXTENSION);
            n += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

fn url_hash(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use crate::types::{MenuCategory, MenuItem, Section, Theme};
    use chrono::Utc;

    fn site() -> Site {
        let mut pasta = MenuItem::new("Cacio e Pepe");
        pasta.image = Some("https://cdn.example.com/cacio.png".into());
        let mut pasta_dup = MenuItem::new("Cacio e Pepe");
        pasta_dup.image = Some("https://cdn.example.com/cacio-large.png".into());
        let mut local = MenuItem::new("Tiramisu");
        local.image = Some("/images/luca/tiramisu.jpg".into());

        Site {
            slug: "luca".into(),
            name: "Luca".into(),
            tagline: None,
            hero_image: Some("https://cdn.example.com/hero.webp".into()),
            logo: Some("https://cdn.example.com/logo.svg".into()),
            phone: None,
            email: None,
            address: None,
            hours: None,
            reservation_url: None,
            order_online_url: None,
            social: None,
            sections: Some(vec![Section {
                title: "Our Story".into(),
                body: "Since 1998.".into(),
                image: Some("https://cdn.example.com/story.jpg".into()),
            }]),
            reviews: None,
            menu: Some(vec![MenuCategory {
                name: "Pasta".into(),
                items: vec![pasta, pasta_dup, local],
            }]),
            images: None,
            theme: Theme::default(),
            source_url: "https://luca.example".into(),
            last_scraped_at: Utc::now(),
        }
    }

    fn config(dir: &std::path::Path) -> PipelineConfig {
        PipelineConfig::new()
            .with_image_dir(dir)
            .with_image_timeout(Duration::from_millis(200))
            .with_image_concurrency(2)
    }

    #[test]
    fn test_targets_and_file_names() {
        let targets = collect_targets(&site());
        let names: Vec<&str> = targets.iter().map(|t| t.filename.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "hero.jpg",
                "logo.jpg",
                "cacio-e-pepe.jpg",
                "cacio-e-pepe-2.jpg",
                "our-story.jpg"
            ]
        );
    }

    #[test]
    fn test_empty_stem_uses_url_hash() {
        let mut names = FileNames::default();
        let name = names.claim(Some("***"), "https://cdn.example.com/x.jpg");
        assert!(name.starts_with("image-"));
        assert_eq!(name.len(), "image-".len() + 12 + ".jpg".len());
    }

    #[tokio::test]
    async fn test_one_failure_keeps_remote_url() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MockFetcher::new()
            .with_bytes("https://cdn.example.com/hero.webp", b"hero".to_vec())
            .with_bytes("https://cdn.example.com/logo.svg", b"logo".to_vec())
            .with_bytes("https://cdn.example.com/cacio.png", b"cacio".to_vec())
            .with_bytes("https://cdn.example.com/cacio-large.png", b"large".to_vec())
            .with_status("https://cdn.example.com/story.jpg", 500);

        let localizer = ImageLocalizer::new(Arc::new(fetcher), &config(dir.path()));
        let (site, report) = localizer.localize(site()).await;

        assert_eq!(report, LocalizeReport { localized: 4, failed: 1 });
        assert_eq!(site.hero_image.as_deref(), Some("/images/luca/hero.jpg"));
        assert_eq!(site.logo.as_deref(), Some("/images/luca/logo.jpg"));

        let items = &site.menu.as_ref().unwrap()[0].items;
        assert_eq!(items[0].image.as_deref(), Some("/images/luca/cacio-e-pepe.jpg"));
        assert_eq!(items[1].image.as_deref(), Some("/images/luca/cacio-e-pepe-2.jpg"));
        assert_eq!(items[2].image.as_deref(), Some("/images/luca/tiramisu.jpg"));

        assert_eq!(
            site.sections.as_ref().unwrap()[0].image.as_deref(),
            Some("https://cdn.example.com/story.jpg")
        );
        assert_eq!(
            std::fs::read(dir.path().join("luca").join("hero.jpg")).unwrap(),
            b"hero"
        );
    }

    #[tokio::test]
    async fn test_slow_download_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MockFetcher::new()
            .with_bytes("https://cdn.example.com/hero.webp", b"hero".to_vec())
            .with_delay("https://cdn.example.com/hero.webp", Duration::from_secs(5));

        let mut input = site();
        input.logo = None;
        input.menu = None;
        input.sections = None;

        let localizer = ImageLocalizer::new(Arc::new(fetcher), &config(dir.path()));
        let (site, report) = localizer.localize(input).await;

        assert_eq!(report.failed, 1);
        assert_eq!(site.hero_image.as_deref(), Some("https://cdn.example.com/hero.webp"));
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent_for_directories() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(
            MockFetcher::new().with_bytes("https://cdn.example.com/hero.webp", b"hero".to_vec()),
        );

        let mut input = site();
        input.logo = None;
        input.menu = None;
        input.sections = None;

        let localizer = ImageLocalizer::new(fetcher, &config(dir.path()));
        let (_, first) = localizer.localize(input.clone()).await;
        let (_, second) = localizer.localize(input).await;
        assert_eq!(first.localized, 1);
        assert_eq!(second.localized, 1);
    }
}
