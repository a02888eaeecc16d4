//! Collector and use-case behaviour against a scripted page driver
//!
//! The scripted driver controls scroll positions, navigation failures and
//! context loss so the convergence and recovery paths can be exercised
//! without a browser.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use bestsellers_scraper_lib::application::ScrapeUseCase;
use bestsellers_scraper_lib::domain::RunContext;
use bestsellers_scraper_lib::infrastructure::config::{ScraperConfig, ScrollConfig, utils::best_sellers_page_url};
use bestsellers_scraper_lib::infrastructure::csv_exporter::{CsvExporter, UTF8_BOM};
use bestsellers_scraper_lib::infrastructure::driver::{
    DriverError, DriverResult, ItemHandle, PageDriver, ScrollMetrics, StaticItem,
};
use bestsellers_scraper_lib::infrastructure::page_collector::{BottomReason, PageCollector, PageOutcome, StopReason};
use bestsellers_scraper_lib::infrastructure::parsing::{ListingSelectors, RecordExtractor};
use bestsellers_scraper_lib::infrastructure::retry_manager::DelayRange;
use bestsellers_scraper_lib::infrastructure::scrape_error::ScrapeError;

const LISTING: &str = "https://shop.test/zgbs/electronics";

#[derive(Debug, Clone)]
enum ScriptedItem {
    Static(StaticItem),
    /// Every call fails as if the page navigated away underneath the item
    Destroyed,
}

impl ScriptedItem {
    fn product(href: &str, name: &str) -> Self {
        Self::Static(StaticItem::new(format!(
            r#"<div id="gridItemRoot"><a class="a-link-normal aok-block" href="{href}"></a><div class="_cDEzb_p13n-sc-css-line-clamp-3_g3dy1">{name}</div><span class="a-price"><span class="a-price-whole">10.</span><span class="a-price-fraction">50</span></span></div>"#
        )))
    }

    fn unnamed(href: &str) -> Self {
        Self::Static(StaticItem::new(format!(r#"<div id="gridItemRoot"><a href="{href}"></a></div>"#)))
    }

    fn inner(&self) -> DriverResult<&StaticItem> {
        match self {
            Self::Static(item) => Ok(item),
            Self::Destroyed => Err(DriverError::ContextDestroyed),
        }
    }
}

#[async_trait]
impl ItemHandle for ScriptedItem {
    async fn first(&self, selector: &str) -> DriverResult<Option<Self>> {
        Ok(self.inner()?.first(selector).await?.map(Self::Static))
    }

    async fn attribute(&self, name: &str) -> DriverResult<Option<String>> {
        self.inner()?.attribute(name).await
    }

    async fn text_content(&self) -> DriverResult<Option<String>> {
        self.inner()?.text_content().await
    }

    async fn inner_text(&self) -> DriverResult<String> {
        self.inner()?.inner_text().await
    }

    async fn contains_text(&self, needle: &str) -> DriverResult<bool> {
        self.inner()?.contains_text(needle).await
    }

    async fn wait_visible(&self, timeout: Duration) -> DriverResult<bool> {
        self.inner()?.wait_visible(timeout).await
    }
}

#[derive(Debug, Default)]
struct ScriptedDriver {
    pages: HashMap<String, Vec<ScriptedItem>>,
    failing_urls: HashSet<String>,
    fatal_urls: HashSet<String>,
    navigation_attempts: HashMap<String, u32>,
    /// Scroll position after each `scroll_by` call; the last entry repeats
    scroll_script: Option<Vec<i64>>,
    scroll_calls: u32,
    scroll_y: i64,
    document_height: i64,
    current: Option<String>,
    closed: bool,
}

const VIEWPORT: i64 = 800;

impl ScriptedDriver {
    fn new() -> Self {
        Self {
            document_height: 4000,
            ..Self::default()
        }
    }

    fn with_page(mut self, page: u32, items: Vec<ScriptedItem>) -> Self {
        self.pages.insert(best_sellers_page_url(LISTING, page), items);
        self
    }

    fn failing(mut self, page: u32) -> Self {
        self.failing_urls.insert(best_sellers_page_url(LISTING, page));
        self
    }

    fn fatal(mut self, page: u32) -> Self {
        self.fatal_urls.insert(best_sellers_page_url(LISTING, page));
        self
    }

    fn attempts(&self, page: u32) -> u32 {
        self.navigation_attempts
            .get(&best_sellers_page_url(LISTING, page))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl PageDriver for ScriptedDriver {
    type Item = ScriptedItem;

    async fn navigate(&mut self, url: &str, _timeout: Duration) -> DriverResult<()> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        *self.navigation_attempts.entry(url.to_string()).or_default() += 1;
        if self.fatal_urls.contains(url) {
            return Err(DriverError::Fatal { reason: "browser crashed".to_string() });
        }
        if self.failing_urls.contains(url) {
            return Err(DriverError::timeout("navigate", Duration::from_secs(60)));
        }
        self.current = Some(url.to_string());
        self.scroll_y = 0;
        Ok(())
    }

    async fn query_items(&mut self, _selector: &str) -> DriverResult<Vec<ScriptedItem>> {
        let url = self.current.as_ref().ok_or(DriverError::NoPage)?;
        Ok(self.pages.get(url).cloned().unwrap_or_default())
    }

    async fn scroll_by(&mut self, delta_y: i64) -> DriverResult<()> {
        self.scroll_calls += 1;
        self.scroll_y = match &self.scroll_script {
            Some(script) => {
                let index = (self.scroll_calls as usize - 1).min(script.len() - 1);
                script[index]
            }
            None => (self.scroll_y + delta_y).clamp(0, self.document_height - VIEWPORT),
        };
        Ok(())
    }

    async fn scroll_metrics(&mut self) -> DriverResult<ScrollMetrics> {
        Ok(ScrollMetrics {
            scroll_y: self.scroll_y,
            viewport_height: VIEWPORT,
            document_height: self.document_height,
        })
    }

    async fn wait_for_idle(&mut self, _timeout: Duration) -> DriverResult<()> {
        Err(DriverError::timeout("wait_for_idle", Duration::from_secs(5)))
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.closed = true;
        Ok(())
    }
}

fn scraper_config(max_pages: u32) -> ScraperConfig {
    ScraperConfig {
        best_sellers_url: LISTING.to_string(),
        base_url: "https://shop.test".to_string(),
        max_pages,
        max_retries: 3,
        delay_range_seconds: DelayRange::zero(),
        ..ScraperConfig::default()
    }
}

fn collector(scraper: ScraperConfig) -> PageCollector {
    let extractor = RecordExtractor::new(&scraper.base_url, ListingSelectors::default())
        .with_visibility_timeout(Duration::ZERO);
    PageCollector::new(scraper, ScrollConfig::immediate(), extractor)
}

#[tokio::test]
async fn scroll_stall_ends_three_steps_after_position_freezes() {
    let steps_before_freeze = 5;
    let mut driver = ScriptedDriver {
        document_height: 1_000_000,
        scroll_script: Some(vec![1000, 2000, 3000, 4000, 5000]),
        ..ScriptedDriver::new()
    };

    let outcome = collector(scraper_config(1)).scroll_to_bottom(&mut driver).await.unwrap();

    assert_eq!(outcome.reason, BottomReason::Stalled);
    assert_eq!(outcome.steps, steps_before_freeze + 3);
    assert_eq!(driver.scroll_calls, steps_before_freeze + 3);
}

#[tokio::test]
async fn scroll_hits_step_limit_on_endless_page() {
    let mut driver = ScriptedDriver {
        document_height: i64::MAX / 2,
        ..ScriptedDriver::new()
    };
    let scroll = ScrollConfig {
        max_steps: 7,
        ..ScrollConfig::immediate()
    };
    let scraper = scraper_config(1);
    let extractor = RecordExtractor::new(&scraper.base_url, ListingSelectors::default());
    let collector = PageCollector::new(scraper, scroll, extractor);

    let outcome = collector.scroll_to_bottom(&mut driver).await.unwrap();
    assert_eq!(outcome.reason, BottomReason::MaxSteps);
    assert_eq!(outcome.steps, 7);
}

#[tokio::test]
async fn navigation_retries_exactly_max_retries_then_skips_page() {
    let mut driver = ScriptedDriver::new()
        .failing(1)
        .with_page(2, vec![ScriptedItem::product("/dp/B2", "Second page item")]);
    let mut ctx = RunContext::new();

    let summary = collector(scraper_config(2)).collect(&mut driver, &mut ctx).await.unwrap();

    assert_eq!(driver.attempts(1), 3);
    assert_eq!(driver.attempts(2), 1);
    assert_eq!(summary.pages[0].outcome, PageOutcome::NavigationFailed);
    assert_eq!(ctx.named_count(), 1);
}

#[tokio::test]
async fn navigation_error_carries_attempt_count() {
    let mut driver = ScriptedDriver::new().failing(1);
    let err = collector(scraper_config(1))
        .navigate_with_retry(&mut driver, &best_sellers_page_url(LISTING, 1))
        .await
        .unwrap_err();

    match err {
        ScrapeError::Navigation { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn context_destroyed_stops_page_but_not_run() {
    let mut driver = ScriptedDriver::new()
        .with_page(
            1,
            vec![
                ScriptedItem::product("/dp/A", "Alpha"),
                ScriptedItem::Destroyed,
                ScriptedItem::product("/dp/B", "Beta"),
            ],
        )
        .with_page(2, vec![ScriptedItem::product("/dp/C", "Gamma")]);
    let mut ctx = RunContext::new();

    let summary = collector(scraper_config(2)).collect(&mut driver, &mut ctx).await.unwrap();

    let urls: Vec<&str> = ctx.dataset().records().iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, ["https://shop.test/dp/A", "https://shop.test/dp/C"]);
    assert_eq!(summary.pages[0].outcome, PageOutcome::ContextDestroyed);
    assert_eq!(summary.pages[0].processed, 2);
    assert_eq!(summary.pages[1].added, 1);
}

#[tokio::test]
async fn named_budget_caps_later_pages() {
    let page = |prefix: &str| -> Vec<ScriptedItem> {
        (0..3)
            .map(|i| ScriptedItem::product(&format!("/dp/{prefix}{i}"), &format!("{prefix} {i}")))
            .collect()
    };
    let mut driver = ScriptedDriver::new()
        .with_page(1, page("A"))
        .with_page(2, page("B"))
        .with_page(3, page("C"));
    let scraper = ScraperConfig {
        page_item_target: 3,
        max_named_records: 5,
        ..scraper_config(3)
    };
    let mut ctx = RunContext::new();

    let summary = collector(scraper).collect(&mut driver, &mut ctx).await.unwrap();

    assert_eq!(ctx.named_count(), 5);
    assert_eq!(summary.pages_visited(), 2);
    assert_eq!(summary.pages[1].target, 2);
    assert_eq!(summary.stop_reason, StopReason::NamedTargetReached);
}

#[tokio::test]
async fn unnamed_items_are_invalid_and_do_not_count() {
    let mut driver = ScriptedDriver::new().with_page(
        1,
        vec![ScriptedItem::unnamed("/dp/X"), ScriptedItem::product("/dp/Y", "Named")],
    );
    let mut ctx = RunContext::new();

    let summary = collector(scraper_config(1)).collect(&mut driver, &mut ctx).await.unwrap();

    assert_eq!(summary.pages[0].invalid, 1);
    assert_eq!(summary.pages[0].added, 1);
    assert!(!ctx.has_seen("https://shop.test/dp/X"));
}

#[tokio::test]
async fn fatal_error_exports_partial_results_and_closes_driver() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("ranking.csv");
    let mut driver = ScriptedDriver::new()
        .with_page(1, vec![ScriptedItem::product("/dp/A", "Alpha")])
        .fatal(2);
    let use_case = ScrapeUseCase::new(collector(scraper_config(3)), CsvExporter::new(&output));

    let err = use_case.run(&mut driver).await.unwrap_err();

    assert!(matches!(err, ScrapeError::Fatal { .. }));
    assert!(driver.closed);
    let bytes = std::fs::read(&output).unwrap();
    assert!(bytes.starts_with(UTF8_BOM));
    let text = String::from_utf8_lossy(&bytes[UTF8_BOM.len()..]).into_owned();
    assert_eq!(text.lines().count(), 2);
    assert!(text.contains("https://shop.test/dp/A"));
}
