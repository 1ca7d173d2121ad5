//! End-to-end pipeline tests using an in-memory capture source and a mock
//! OCR backend, plus one run over real files via the directory source and
//! the sidecar backend.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use image::{DynamicImage, Rgb, RgbImage};
use pagesnap::capture::{CaptureSource, CapturedPage, DirectoryCaptureSource, PageRegion};
use pagesnap::config::{LayoutMode, RunConfig};
use pagesnap::error::{BackendError, CaptureError, PagesnapError};
use pagesnap::ocr::sidecar::SidecarBackend;
use pagesnap::ocr::{CoordFrame, OcrBackend, RawFragment};
use pagesnap::PageSeparator;

fn page_image(shade: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 96, Rgb([shade, shade, shade])))
}

fn page(index: usize, shade: u8) -> CapturedPage {
    CapturedPage::new(index, page_image(shade), PageRegion::Full)
}

struct VecSource {
    pages: VecDeque<CapturedPage>,
}

impl VecSource {
    fn new(pages: Vec<CapturedPage>) -> Self {
        Self {
            pages: pages.into(),
        }
    }
}

impl CaptureSource for VecSource {
    fn next_page(&mut self) -> Result<Option<CapturedPage>, CaptureError> {
        Ok(self.pages.pop_front())
    }
}

/// Backend serving canned fragments per page index; listed pages always fail.
struct MockBackend {
    fragments: HashMap<usize, Vec<RawFragment>>,
    failing: HashSet<usize>,
}

impl MockBackend {
    fn new(fragments: HashMap<usize, Vec<RawFragment>>) -> Self {
        Self {
            fragments,
            failing: HashSet::new(),
        }
    }

    fn failing_on(mut self, page: usize) -> Self {
        self.failing.insert(page);
        self
    }
}

impl OcrBackend for MockBackend {
    fn recognize(&self, page: &CapturedPage) -> Result<Vec<RawFragment>, BackendError> {
        if self.failing.contains(&page.index) {
            return Err(BackendError::new("mock engine refused this page"));
        }
        Ok(self.fragments.get(&page.index).cloned().unwrap_or_default())
    }

    fn coord_frame(&self) -> CoordFrame {
        CoordFrame::PIXEL_TOP_LEFT
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn raw(text: &str, x: f32, y: f32, w: f32, h: f32) -> RawFragment {
    RawFragment {
        text: text.into(),
        bbox: [x, y, w, h],
        confidence: Some(0.99),
    }
}

fn fast_config() -> RunConfig {
    let mut config = RunConfig::default();
    config.max_retries = 0;
    config.retry_backoff_ms = 1;
    config
}

#[tokio::test]
async fn duplicate_final_capture_is_discarded() {
    // Page 2 repeats page 1's content: the book ended at page 1.
    let mut source = VecSource::new(vec![page(0, 10), page(1, 20), page(2, 20)]);
    let backend = Arc::new(MockBackend::new(HashMap::from([
        (0, vec![raw("first", 0.0, 0.0, 30.0, 10.0)]),
        (1, vec![raw("second", 0.0, 0.0, 30.0, 10.0)]),
    ])));

    let document = pagesnap::run(&mut source, backend, &fast_config())
        .await
        .unwrap();

    assert_eq!(document.page_count(), 2);
    assert_eq!(document.markdown, "first\n\nsecond\n");
}

#[tokio::test]
async fn empty_source_is_an_error() {
    let mut source = VecSource::new(Vec::new());
    let backend = Arc::new(MockBackend::new(HashMap::new()));

    let err = pagesnap::run(&mut source, backend, &fast_config())
        .await
        .unwrap_err();
    assert!(matches!(err, PagesnapError::NoPagesCaptured));
}

#[tokio::test]
async fn backend_failure_keeps_the_page_slot() {
    let mut source = VecSource::new(vec![page(0, 10), page(1, 20), page(2, 30)]);
    let backend = Arc::new(
        MockBackend::new(HashMap::from([
            (0, vec![raw("before", 0.0, 0.0, 30.0, 10.0)]),
            (2, vec![raw("after", 0.0, 0.0, 30.0, 10.0)]),
        ]))
        .failing_on(1),
    );

    let mut config = fast_config();
    config.page_separator = PageSeparator::Comment;
    let document = pagesnap::run(&mut source, backend, &config).await.unwrap();

    assert_eq!(document.page_count(), 3);
    assert_eq!(document.stats.failed_pages, 1);
    assert_eq!(document.stats.processed_pages, 2);

    let failed: Vec<_> = document.failed_pages().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].page_index, 1);
    assert_eq!(failed[0].fragment_count(), 0);

    // The failed page still occupies a slot between its neighbours.
    assert!(document.markdown.contains("before"));
    assert!(document.markdown.contains("<!-- page 2 -->"));
    assert!(document.markdown.contains("<!-- page 3 -->"));
    assert!(document.markdown.contains("after"));
}

#[tokio::test]
async fn artifacts_stay_page_aligned() {
    let mut source = VecSource::new(vec![page(0, 10), page(1, 20), page(2, 30), page(3, 40)]);
    let backend = Arc::new(MockBackend::new(HashMap::from([
        (0, vec![raw("a", 0.0, 0.0, 10.0, 10.0)]),
        // page 1 recognizes nothing
        (2, vec![raw("c", 0.0, 0.0, 10.0, 10.0)]),
        (3, vec![raw("d", 0.0, 0.0, 10.0, 10.0)]),
    ])));

    let document = pagesnap::run(&mut source, backend, &fast_config())
        .await
        .unwrap();

    assert_eq!(document.page_count(), 4);
    let indices: Vec<usize> = document.pages.iter().map(|p| p.page_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert!(document.pdf_bytes.starts_with(b"%PDF"));
    // The fragment-less page 1 keeps its slot under the default separator.
    assert_eq!(document.markdown, "a\n\n\n\nc\n\nd\n");
}

#[tokio::test]
async fn vertical_layout_reads_columns_right_to_left() {
    let mut source = VecSource::new(vec![page(0, 10)]);
    // Right column first in reading order, despite emission order.
    let backend = Arc::new(MockBackend::new(HashMap::from([(
        0,
        vec![
            raw("い", 10.0, 0.0, 10.0, 40.0),
            raw("あ", 40.0, 0.0, 10.0, 40.0),
        ],
    )])));

    let mut config = fast_config();
    config.layout = LayoutMode::Vertical;
    let document = pagesnap::run(&mut source, backend, &config).await.unwrap();

    assert_eq!(document.markdown, "あ\nい\n");
}

#[tokio::test]
async fn auto_detection_picks_vertical_for_tall_columns() {
    let mut source = VecSource::new(vec![page(0, 10)]);
    let backend = Arc::new(MockBackend::new(HashMap::from([(
        0,
        vec![
            raw("三", 10.0, 10.0, 8.0, 60.0),
            raw("二", 30.0, 5.0, 8.0, 60.0),
            raw("一", 50.0, 0.0, 8.0, 60.0),
        ],
    )])));

    let document = pagesnap::run(&mut source, backend, &fast_config())
        .await
        .unwrap();

    // Columns right-to-left: 一, 二, 三.
    assert_eq!(document.markdown, "一\n二\n三\n");
}

#[tokio::test]
async fn directory_source_with_sidecar_backend() {
    let dir = tempfile::tempdir().unwrap();

    let save = |name: &str, shade: u8| {
        let path = dir.path().join(name);
        page_image(shade).save(&path).unwrap();
        path
    };
    save("page_1.png", 10);
    save("page_2.png", 20);
    save("page_3.png", 20); // duplicate capture of page 2

    let sidecar = |name: &str, fragments: &[RawFragment]| {
        let json = serde_json::to_string(fragments).unwrap();
        std::fs::write(dir.path().join(name), json).unwrap();
    };
    sidecar(
        "page_1.json",
        &[
            raw("hello", 0.0, 0.0, 25.0, 10.0),
            raw("world", 30.0, 0.0, 25.0, 10.0),
        ],
    );
    sidecar("page_2.json", &[raw("again", 0.0, 0.0, 25.0, 10.0)]);

    let mut source = DirectoryCaptureSource::new(dir.path(), PageRegion::Full).unwrap();
    let backend = Arc::new(SidecarBackend::new());

    let document = pagesnap::run(&mut source, backend, &fast_config())
        .await
        .unwrap();

    assert_eq!(document.page_count(), 2);
    assert_eq!(document.markdown, "helloworld\n\nagain\n");
}

#[tokio::test]
async fn run_to_files_writes_both_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let md_path = dir.path().join("book.md");
    let pdf_path = dir.path().join("book.pdf");

    let mut source = VecSource::new(vec![page(0, 10)]);
    let backend = Arc::new(MockBackend::new(HashMap::from([(
        0,
        vec![raw("only page", 0.0, 0.0, 50.0, 10.0)],
    )])));

    pagesnap::run_to_files(&mut source, backend, &fast_config(), &md_path, &pdf_path)
        .await
        .unwrap();

    let markdown = std::fs::read_to_string(&md_path).unwrap();
    assert_eq!(markdown, "only page\n");

    let pdf = std::fs::read(&pdf_path).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}
