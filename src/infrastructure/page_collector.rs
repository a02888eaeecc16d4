//! Page collection: pagination, scroll convergence and per-item extraction
//!
//! Each page moves through `Navigating -> Scrolling -> ItemsReady` and ends in
//! `NextPage`, `Done` or `Aborted`. Lazy-loaded grids only render items once
//! they have been scrolled into view, so the collector repeatedly scrolls to
//! the bottom until the item count reaches the page target or the attempts
//! run out.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::config::{AppConfig, ScraperConfig, ScrollConfig, utils::best_sellers_page_url};
use super::driver::{DriverError, PageDriver};
use super::parsing::RecordExtractor;
use super::retry_manager::{HumanDelay, RetryPolicy};
use super::scrape_error::{ScrapeError, ScrapeResult};
use crate::domain::dataset::{Acceptance, RunContext};

/// Per-page collector state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Navigating,
    Scrolling,
    ItemsReady,
    NextPage,
    Done,
    Aborted,
}

impl fmt::Display for CollectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Navigating => "Navigating",
            Self::Scrolling => "Scrolling",
            Self::ItemsReady => "ItemsReady",
            Self::NextPage => "NextPage",
            Self::Done => "Done",
            Self::Aborted => "Aborted",
        };
        f.write_str(name)
    }
}

/// Why bottom detection stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BottomReason {
    ReachedBottom,
    Stalled,
    DriverFailure,
    MaxSteps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BottomOutcome {
    /// Scroll steps taken, including the one that ended the loop
    pub steps: u32,
    pub reason: BottomReason,
}

/// How a page ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Collected,
    NavigationFailed,
    Empty,
    ContextDestroyed,
}

/// What happened on one listing page
#[derive(Debug, Clone, PartialEq)]
pub struct PageReport {
    pub page: u32,
    pub url: String,
    pub target: usize,
    pub state: CollectorState,
    pub outcome: PageOutcome,
    pub revealed: usize,
    pub processed: usize,
    pub added: usize,
    pub invalid: usize,
    pub duplicates: usize,
    pub failed: usize,
}

impl PageReport {
    fn new(page: u32, url: String, target: usize) -> Self {
        Self {
            page,
            url,
            target,
            state: CollectorState::Navigating,
            outcome: PageOutcome::Collected,
            revealed: 0,
            processed: 0,
            added: 0,
            invalid: 0,
            duplicates: 0,
            failed: 0,
        }
    }

    fn record(&mut self, acceptance: Acceptance) {
        match acceptance {
            Acceptance::Added => self.added += 1,
            Acceptance::Invalid => self.invalid += 1,
            Acceptance::Duplicate => self.duplicates += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    PageLimit,
    NamedTargetReached,
    EmptyPage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSummary {
    pub pages: Vec<PageReport>,
    pub stop_reason: StopReason,
}

impl CollectionSummary {
    pub fn pages_visited(&self) -> usize {
        self.pages.len()
    }
}

async fn settle(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

/// Fatal driver errors end the run; anything else is reported to the caller.
fn escalate(error: DriverError) -> Result<DriverError, ScrapeError> {
    if error.is_fatal() { Err(ScrapeError::from(error)) } else { Ok(error) }
}

/// Drives the page loop for one run
#[derive(Debug, Clone)]
pub struct PageCollector {
    scraper: ScraperConfig,
    scroll: ScrollConfig,
    extractor: RecordExtractor,
    delay: HumanDelay,
    retry: RetryPolicy,
}

impl PageCollector {
    pub fn new(scraper: ScraperConfig, scroll: ScrollConfig, extractor: RecordExtractor) -> Self {
        let delay = HumanDelay::new(scraper.delay_range_seconds);
        let retry = RetryPolicy::new(scraper.max_retries);
        Self {
            scraper,
            scroll,
            extractor,
            delay,
            retry,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let extractor = RecordExtractor::new(&config.scraper.base_url, config.selectors.clone());
        Self::new(config.scraper.clone(), config.scroll.clone(), extractor)
    }

    /// Item target for a page given the named records collected so far.
    ///
    /// Never exceeds the remaining named-record budget, page 1 included.
    pub fn page_target(&self, named_so_far: usize) -> usize {
        self.scraper
            .page_item_target
            .min(self.scraper.max_named_records.saturating_sub(named_so_far))
    }

    /// Walk the listing pages, feeding accepted records into `ctx`.
    ///
    /// Only fatal driver errors are returned; whatever `ctx` holds at that
    /// point stays available to the caller.
    pub async fn collect<D: PageDriver>(&self, driver: &mut D, ctx: &mut RunContext) -> ScrapeResult<CollectionSummary> {
        let mut pages = Vec::new();
        let mut stop_reason = StopReason::PageLimit;

        for page in 1..=self.scraper.max_pages {
            let target = self.page_target(ctx.named_count());
            let url = best_sellers_page_url(&self.scraper.best_sellers_url, page);
            info!("📄 [Page {}/{}] target {} items: {}", page, self.scraper.max_pages, target, url);

            let report = self.collect_page(driver, ctx, page, url, target).await?;
            let outcome = report.outcome;
            info!(
                "[Page {}] {} ({:?}): revealed {}, processed {}, added {}, invalid {}, duplicates {}, failed {}",
                report.page,
                report.state,
                report.outcome,
                report.revealed,
                report.processed,
                report.added,
                report.invalid,
                report.duplicates,
                report.failed
            );
            pages.push(report);

            if outcome == PageOutcome::Empty {
                stop_reason = StopReason::EmptyPage;
                break;
            }
            if ctx.named_count() >= self.scraper.max_named_records {
                info!("🎯 Collected {} named records, stopping pagination", ctx.named_count());
                stop_reason = StopReason::NamedTargetReached;
                break;
            }
        }

        if let Some(last) = pages.last_mut() {
            if last.state == CollectorState::NextPage {
                last.state = CollectorState::Done;
            }
        }

        Ok(CollectionSummary { pages, stop_reason })
    }

    async fn collect_page<D: PageDriver>(
        &self,
        driver: &mut D,
        ctx: &mut RunContext,
        page: u32,
        url: String,
        target: usize,
    ) -> ScrapeResult<PageReport> {
        let mut report = PageReport::new(page, url, target);

        debug!("[Page {}] {}", page, report.state);
        match self.navigate_with_retry(driver, &report.url).await {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("[Page {}] skipped: {}", page, e);
                report.outcome = PageOutcome::NavigationFailed;
                report.state = CollectorState::NextPage;
                return Ok(report);
            }
        }

        report.state = CollectorState::Scrolling;
        debug!("[Page {}] {}", page, report.state);
        let items = self.reveal_items(driver, target).await?;
        report.revealed = items.len();

        if items.is_empty() {
            warn!("[Page {}] no items revealed, ending run", page);
            report.outcome = PageOutcome::Empty;
            report.state = CollectorState::Aborted;
            return Ok(report);
        }

        report.state = CollectorState::ItemsReady;
        debug!("[Page {}] {} with {} items", page, report.state, items.len());

        for (index, item) in items.iter().take(target).enumerate() {
            self.delay.pause().await;
            report.processed += 1;

            match self.extractor.extract(item).await {
                Ok(product) => report.record(ctx.accept(product)),
                Err(e) if e.is_item_recoverable() => {
                    debug!("[Page {}] item {} skipped: {}", page, index + 1, e);
                    report.failed += 1;
                }
                Err(ScrapeError::ContextDestroyed) => {
                    warn!("[Page {}] context destroyed at item {}, leaving page", page, index + 1);
                    report.outcome = PageOutcome::ContextDestroyed;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        report.state = CollectorState::NextPage;
        Ok(report)
    }

    /// Navigate with bounded retries.
    ///
    /// Exhausted attempts yield [`ScrapeError::Navigation`]; fatal driver
    /// errors are returned immediately.
    pub async fn navigate_with_retry<D: PageDriver>(&self, driver: &mut D, url: &str) -> ScrapeResult<()> {
        let timeout = self.scraper.navigation_timeout();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match driver.navigate(url, timeout).await {
                Ok(()) => {
                    debug!("Navigated to {} on attempt {}", url, attempt);
                    return Ok(());
                }
                Err(e) => escalate(e)?,
            };

            let reason = error.to_string();
            if !self.retry.after_failure("Navigation", attempt, &reason, &self.delay).await {
                return Err(ScrapeError::Navigation {
                    url: url.to_string(),
                    attempts: attempt,
                    reason,
                });
            }
        }
    }

    /// Scroll until the item count reaches `target` or the attempts run out.
    ///
    /// Returns the handles visible after the last attempt.
    pub async fn reveal_items<D: PageDriver>(&self, driver: &mut D, target: usize) -> ScrapeResult<Vec<D::Item>> {
        let attempts = self.scroll.max_scroll_attempts.max(1);
        let mut items = Vec::new();

        for attempt in 1..=attempts {
            let outcome = self.scroll_to_bottom(driver).await?;
            debug!("Bottom detection finished after {} steps ({:?})", outcome.steps, outcome.reason);

            if let Err(e) = driver.wait_for_idle(self.scroll.idle_timeout()).await {
                let e = escalate(e)?;
                debug!("Idle wait did not complete: {}", e);
            }

            items = match driver.query_items(&self.scraper.item_selector).await {
                Ok(items) => items,
                Err(e) => {
                    let e = escalate(e)?;
                    warn!("Item query failed: {}", e);
                    Vec::new()
                }
            };
            info!("🔍 Scroll attempt {}/{}: {} of {} items visible", attempt, attempts, items.len(), target);

            if items.len() >= target {
                break;
            }
            if attempt < attempts {
                if let Err(e) = driver.scroll_by(-self.scroll.nudge_px).await {
                    let e = escalate(e)?;
                    debug!("Scroll nudge failed: {}", e);
                }
                settle(self.scroll.nudge_settle()).await;
            }
        }

        Ok(items)
    }

    /// Scroll down in fixed steps until the bottom is reached or the
    /// position stops changing.
    pub async fn scroll_to_bottom<D: PageDriver>(&self, driver: &mut D) -> ScrapeResult<BottomOutcome> {
        let scroll = &self.scroll;
        let mut last_y: Option<i64> = None;
        let mut unchanged = 0;

        for step in 1..=scroll.max_steps {
            if let Err(e) = driver.scroll_by(scroll.step_px).await {
                let e = escalate(e)?;
                debug!("Scroll step {} failed: {}", step, e);
                return Ok(BottomOutcome { steps: step, reason: BottomReason::DriverFailure });
            }
            settle(scroll.settle()).await;

            let metrics = match driver.scroll_metrics().await {
                Ok(metrics) => metrics,
                Err(e) => {
                    let e = escalate(e)?;
                    debug!("Scroll metrics unavailable at step {}: {}", step, e);
                    return Ok(BottomOutcome { steps: step, reason: BottomReason::DriverFailure });
                }
            };

            if metrics.scroll_y + metrics.viewport_height + scroll.bottom_tolerance_px >= metrics.document_height {
                return Ok(BottomOutcome { steps: step, reason: BottomReason::ReachedBottom });
            }

            if last_y == Some(metrics.scroll_y) {
                unchanged += 1;
                if unchanged >= scroll.stall_threshold {
                    return Ok(BottomOutcome { steps: step, reason: BottomReason::Stalled });
                }
            } else {
                unchanged = 0;
                last_y = Some(metrics.scroll_y);
            }
        }

        Ok(BottomOutcome { steps: scroll.max_steps, reason: BottomReason::MaxSteps })
    }
}
