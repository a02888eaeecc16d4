//! Full runs over saved listing HTML through the static page driver

use std::path::Path;
use std::time::Duration;

use bestsellers_scraper_lib::application::ScrapeUseCase;
use bestsellers_scraper_lib::domain::ItemType;
use bestsellers_scraper_lib::infrastructure::config::{ScraperConfig, ScrollConfig, utils::best_sellers_page_url};
use bestsellers_scraper_lib::infrastructure::csv_exporter::{CsvExporter, UTF8_BOM};
use bestsellers_scraper_lib::infrastructure::driver::StaticPageDriver;
use bestsellers_scraper_lib::infrastructure::page_collector::{PageCollector, StopReason};
use bestsellers_scraper_lib::infrastructure::parsing::{ListingSelectors, RecordExtractor};
use bestsellers_scraper_lib::infrastructure::retry_manager::DelayRange;

const LISTING: &str = "https://www.amazon.com/Best-Sellers-Electronics/zgbs/electronics";

fn use_case(max_pages: u32, output: &Path) -> ScrapeUseCase {
    let scraper = ScraperConfig {
        best_sellers_url: LISTING.to_string(),
        max_pages,
        delay_range_seconds: DelayRange::zero(),
        ..ScraperConfig::default()
    };
    let extractor = RecordExtractor::new(&scraper.base_url, ListingSelectors::default())
        .with_visibility_timeout(Duration::ZERO);
    let collector = PageCollector::new(scraper, ScrollConfig::immediate(), extractor);
    ScrapeUseCase::new(collector, CsvExporter::new(output))
}

fn item(href: Option<&str>, name: &str, price_html: &str) -> String {
    let link = href
        .map(|h| format!(r#"<a class="a-link-normal aok-block" href="{h}"><img alt=""></a>"#))
        .unwrap_or_default();
    format!(
        r#"<div id="gridItemRoot"><div class="zg-grid-general-faceout">{link}<div class="_cDEzb_p13n-sc-css-line-clamp-3_g3dy1">{name}</div>{price_html}</div></div>"#
    )
}

fn page(items: &[String]) -> String {
    format!(r#"<html><body><div class="p13n-gridRow">{}</div></body></html>"#, items.concat())
}

#[tokio::test]
async fn item_without_url_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("ranking.csv");
    let html = page(&[
        item(Some("/dp/B0AAA"), "Item A", r#"<span class="aok-offscreen">$19.99</span>"#),
        item(None, "Item B", r#"<span class="aok-offscreen">$5.00</span>"#),
    ]);
    let mut driver = StaticPageDriver::new().with_page(LISTING, html);

    let outcome = use_case(1, &output).run(&mut driver).await.unwrap();

    assert_eq!(outcome.records.len(), 1);
    let record = &outcome.records[0];
    assert_eq!(record.name, "Item A");
    assert_eq!(record.url, "https://www.amazon.com/dp/B0AAA");
    assert_eq!(record.price, Some(19.99));
    assert_eq!(record.item_type, ItemType::Organic);
    assert_eq!(outcome.pages[0].failed, 1);
    assert!(driver.is_closed());
}

#[tokio::test]
async fn duplicate_url_across_pages_is_kept_once() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("ranking.csv");
    let shared = item(Some("/dp/B0SHARED"), "Shared", "");
    let mut driver = StaticPageDriver::new()
        .with_page(LISTING, page(&[shared.clone(), item(Some("/dp/B0ONE"), "One", "")]))
        .with_page(best_sellers_page_url(LISTING, 2), page(&[shared]));

    let outcome = use_case(2, &output).run(&mut driver).await.unwrap();

    let shared_count = outcome
        .records
        .iter()
        .filter(|r| r.url == "https://www.amazon.com/dp/B0SHARED")
        .count();
    assert_eq!(shared_count, 1);
    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.pages[1].duplicates, 1);
}

#[tokio::test]
async fn empty_page_stops_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("ranking.csv");
    let mut driver = StaticPageDriver::new()
        .with_page(LISTING, page(&[item(Some("/dp/B1"), "First", "")]))
        .with_page(best_sellers_page_url(LISTING, 2), page(&[]))
        .with_page(best_sellers_page_url(LISTING, 3), page(&[item(Some("/dp/B3"), "Third", "")]));

    let outcome = use_case(3, &output).run(&mut driver).await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::EmptyPage);
    assert_eq!(outcome.pages.len(), 2);
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(driver.visits().len(), 2);
}

#[tokio::test]
async fn export_has_bom_header_and_formatted_values() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("ranking.csv");
    let sponsored = String::from(
        r#"<div id="gridItemRoot"><a class="a-link-normal aok-block" href="/dp/B0AD"></a><div class="_cDEzb_p13n-sc-css-line-clamp-3_g3dy1">Promoted, "quoted"</div><span class="a-price"><span class="a-price-whole">29</span></span><span class="a-icon-alt"></span><span aria-label="4.5 out of 5 stars">x</span><a href="/dp/B0AD#customerReviews">2,345</a><span>Sponsored</span></div>"#
    );
    let mut driver = StaticPageDriver::new().with_page(LISTING, page(&[sponsored]));

    let outcome = use_case(1, &output).run(&mut driver).await.unwrap();
    assert_eq!(outcome.output_path, output);

    let bytes = std::fs::read(&output).unwrap();
    assert!(bytes.starts_with(UTF8_BOM));
    let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("Name,Price,Rating,Reviews,URL,Item_Type,Timestamp"));

    let row = lines.next().unwrap();
    assert!(
        row.starts_with(r#""Promoted, ""quoted""",29.0,4.5,2345,https://www.amazon.com/dp/B0AD,Sponsored,"#),
        "unexpected row: {row}"
    );
    assert!(row.ends_with('Z'));
}

#[tokio::test]
async fn snapshot_directory_replay() {
    let snapshots = tempfile::tempdir().unwrap();
    std::fs::write(
        snapshots.path().join("page-1.html"),
        page(&[item(Some("/dp/B0SNAP"), "Snapshot item", r#"<span class="aok-offscreen">$1,299.00</span>"#)]),
    )
    .unwrap();
    let page_urls = vec![(1, LISTING.to_string()), (2, best_sellers_page_url(LISTING, 2))];
    let mut driver = StaticPageDriver::from_snapshot_dir(snapshots.path(), &page_urls).unwrap();

    let output = snapshots.path().join("out.csv");
    let outcome = use_case(2, &output).run(&mut driver).await.unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].price, Some(1299.0));
    assert_eq!(outcome.stop_reason, StopReason::PageLimit);
}
