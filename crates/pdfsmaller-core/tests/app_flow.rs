//! End-to-end controller flows against the demo service

mod common;

use common::create_test_pdf;
use pdfsmaller_core::compress::{PROGRESS_LOADED, PROGRESS_SAVED};
use pdfsmaller_core::session::USER_KEY;
use pdfsmaller_core::{
    App, ClientConfig, CompressRoute, CompressionLevel, DemoService, IncomingFile, KeyValueStore,
    MemoryStore, Plan, Tab, PDF_MIME,
};
use std::cell::RefCell;
use std::future::ready;
use std::rc::Rc;

fn fresh() -> (App<Rc<MemoryStore>>, Rc<MemoryStore>, DemoService) {
    let store = Rc::new(MemoryStore::new());
    let app = App::new(ClientConfig::demo(), Rc::clone(&store));
    (app, store, DemoService::new(1_700_000_000_000))
}

#[tokio::test]
async fn demo_login_enables_bulk_only_for_paid_plan() {
    for (email, plan, bulk_allowed) in [
        ("demo@example.com", Plan::Free, false),
        ("pro@example.com", Plan::Pro, true),
    ] {
        let (mut app, store, demo) = fresh();
        let user = app.login(&demo, email, "password", 0.0).await.unwrap();
        assert_eq!(user.plan, plan);

        let raw = store.get(USER_KEY).unwrap().unwrap();
        assert!(raw.contains(email));

        let view = app.view(0.0);
        assert_eq!(view.bulk_toggle.enabled, bulk_allowed, "{email}");
        assert_eq!(app.set_bulk_mode(true, 0.0).is_ok(), bulk_allowed);
    }
}

#[tokio::test]
async fn logout_clears_store_and_locks_pro_controls() {
    let (mut app, store, demo) = fresh();
    app.login(&demo, "pro@example.com", "password", 0.0)
        .await
        .unwrap();
    app.set_server_processing(true, 0.0).unwrap();
    app.switch_tab(Tab::Ocr, 0.0).unwrap();

    app.logout(&demo, 10.0).unwrap();

    assert!(store.is_empty());
    let view = app.view(10.0);
    assert!(!view.header.signed_in);
    assert!(!view.server_toggle.enabled);
    assert!(!view.server_toggle.checked);
    assert_eq!(view.active_tab(), Some("compress"));
    assert!(view.tabs.iter().filter(|t| t.key == "ocr").all(|t| t.locked));
}

#[tokio::test]
async fn session_survives_reload() {
    let (mut app, store, demo) = fresh();
    app.login(&demo, "pro@example.com", "password", 0.0)
        .await
        .unwrap();
    drop(app);

    let reloaded = App::new(ClientConfig::demo(), Rc::clone(&store));
    assert!(reloaded.is_pro());
    assert_eq!(reloaded.user().unwrap().email, "pro@example.com");
}

#[tokio::test]
async fn local_compression_reports_measured_sizes() {
    let (mut app, _, demo) = fresh();
    let bytes = create_test_pdf(3);
    let original = bytes.len() as u64;
    app.select_file(IncomingFile::new("report.pdf", PDF_MIME, bytes), 0.0)
        .unwrap();

    let mut clock = 0.0;
    let result = app
        .compress(&demo, || {
            clock += 250.0;
            clock
        })
        .await
        .unwrap();

    assert_eq!(result.original_size, original);
    assert_eq!(result.compressed_size, result.payload.len() as u64);
    assert!(result.compressed_size <= original);
    assert_eq!(result.download_name, "report_compressed.pdf");
    assert_eq!(result.processing_time_ms, 250);

    let state = app.state();
    assert!(!state.is_processing);
    assert_eq!(state.progress, Some(100));
    assert_eq!(
        app.notifications().latest().unwrap().message,
        "PDF compressed successfully!"
    );
}

#[tokio::test]
async fn garbage_pdf_fails_cleanly() {
    let (mut app, _, demo) = fresh();
    app.select_file(
        IncomingFile::new("broken.pdf", PDF_MIME, b"not a pdf".to_vec()),
        0.0,
    )
    .unwrap();

    assert!(app.compress(&demo, || 0.0).await.is_err());
    assert!(!app.state().is_processing);
    assert!(app.download(Tab::Compress).is_none());
    assert_eq!(
        app.notifications().latest().unwrap().message,
        "An error occurred during compression. Please try again."
    );
}

#[tokio::test]
async fn bulk_job_goes_to_server_route() {
    let (mut app, _, demo) = fresh();
    app.login(&demo, "pro@example.com", "password", 0.0)
        .await
        .unwrap();
    app.select_files(
        vec![
            IncomingFile::new("a.pdf", PDF_MIME, create_test_pdf(1)),
            IncomingFile::new("b.pdf", PDF_MIME, create_test_pdf(2)),
        ],
        0.0,
    )
    .unwrap();

    let job = app.begin_compress(0.0).unwrap();
    assert_eq!(job.route, CompressRoute::Bulk);
    assert_eq!(job.files.len(), 2);

    // demo mode has no bulk endpoint
    let outcome = job.run(&demo, |_| {}, || ready(())).await;
    assert!(app.finish_compress(&job, outcome, 5.0).is_err());
    assert!(!app.state().is_processing);
}

#[tokio::test]
async fn local_route_yields_after_every_batch() {
    let (mut app, _, demo) = fresh();
    let level = CompressionLevel::Maximum;
    app.set_compression_level(level);
    let pages = level.profile().objects_per_tick as u32 * 2;
    app.select_file(
        IncomingFile::new("long.pdf", PDF_MIME, create_test_pdf(pages)),
        0.0,
    )
    .unwrap();

    let job = app.begin_compress(0.0).unwrap();
    assert_eq!(job.route, CompressRoute::Local);

    // Some(percent) for a progress report, None for a yield
    let events = RefCell::new(Vec::new());
    let outcome = job
        .run(
            &demo,
            |p| events.borrow_mut().push(Some(p)),
            || {
                events.borrow_mut().push(None);
                ready(())
            },
        )
        .await;
    let bytes = outcome.unwrap();
    let events = events.into_inner();

    assert_eq!(events.first(), Some(&Some(40)));
    assert_eq!(events.get(1), Some(&None));
    assert_eq!(events.last(), Some(&Some(PROGRESS_SAVED)));
    assert!(events.iter().filter(|e| e.is_none()).count() >= 3);
    for pair in events.windows(2) {
        if let [Some(p), next] = pair {
            if *p > PROGRESS_LOADED && *p < PROGRESS_SAVED {
                assert_eq!(*next, None, "batch at {}% was not followed by a yield", p);
            }
        }
    }

    let result = app.finish_compress(&job, Ok(bytes), 10.0).unwrap();
    assert!(result.compressed_size < result.original_size);
}
