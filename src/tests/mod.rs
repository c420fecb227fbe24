use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::events::{EventSink, ScanEvent};
use crate::output;
use crate::runner::{Options, Runner, ScanSession};
use crate::wordlist::WordlistSource;

const HOST: &str = "127.0.0.1";

fn options(words: &[&str]) -> Options {
    Options {
        wordlist: WordlistSource::Inline(words.iter().map(|w| w.to_string()).collect()),
        extensions: vec![String::new()],
        concurrency: 4,
        timeout: Duration::from_secs(5),
        secure_ports: BTreeSet::new(),
        progress_interval: Duration::from_millis(10),
        ..Options::default()
    }
}

async fn mount(server: &MockServer, at: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(template)
        .mount(server)
        .await;
}

/// 200 on /admin, 404 on /missing, 301 on /login, 500 on /oops.
async fn admin_login_server() -> MockServer {
    let server = MockServer::start().await;
    mount(
        &server,
        "/admin",
        ResponseTemplate::new(200).set_body_raw(b"<h1>admin</h1>".to_vec(), "text/html"),
    )
    .await;
    mount(&server, "/missing", ResponseTemplate::new(404)).await;
    mount(
        &server,
        "/login",
        ResponseTemplate::new(301).insert_header("location", "/login/"),
    )
    .await;
    mount(&server, "/oops", ResponseTemplate::new(500)).await;
    server
}

async fn collect(mut rx: mpsc::UnboundedReceiver<ScanEvent>) -> Vec<ScanEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

async fn discover_with_events(
    options: Options,
    ports: &[u16],
) -> (ScanSession, Vec<ScanEvent>) {
    let (sink, rx) = EventSink::channel();
    let runner = Runner::new(options).unwrap().with_events(sink);
    let session = runner.discover(HOST, ports).await.unwrap();
    drop(runner);
    (session, collect(rx).await)
}

fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind((HOST, 0)).unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

#[tokio::test]
async fn discovers_existing_and_redirecting_paths_only() {
    let server = admin_login_server().await;
    let port = server.address().port();
    let runner = Runner::new(options(&["admin", "missing", "login", "oops"])).unwrap();

    let session = runner.discover(HOST, &[port]).await.unwrap();
    let found = session.port_results(port).unwrap();

    let keys: Vec<&str> = found.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["admin", "login"]);

    let admin = &found["admin"];
    assert_eq!(admin.status_code, 200);
    assert_eq!(admin.content_type, "text/html");
    assert_eq!(admin.content_length, "<h1>admin</h1>".len() as u64);
    assert_eq!(admin.redirect_url, "");

    let login = &found["login"];
    assert_eq!(login.status_code, 301);
    assert_eq!(login.redirect_url, "/login/");
    assert!(login.is_redirect());
}

#[tokio::test]
async fn bare_and_php_variants_resolve_independently() {
    let server = MockServer::start().await;
    mount(&server, "/admin", ResponseTemplate::new(200)).await;
    mount(&server, "/admin.php", ResponseTemplate::new(404)).await;
    mount(
        &server,
        "/login",
        ResponseTemplate::new(301).insert_header("location", "/login/"),
    )
    .await;
    mount(&server, "/login.php", ResponseTemplate::new(500)).await;
    let port = server.address().port();

    let opts = Options {
        extensions: vec![String::new(), ".php".to_string()],
        ..options(&["admin", "login"])
    };
    let runner = Runner::new(opts).unwrap();
    let session = runner.discover(HOST, &[port]).await.unwrap();

    let json: serde_json::Value =
        serde_json::from_slice(&output::render_results_json(&session.results).unwrap()).unwrap();
    let paths = json[port.to_string()].as_object().unwrap();
    assert_eq!(paths.len(), 2);
    assert_eq!(paths["admin"]["status_code"], 200);
    assert_eq!(paths["login"]["status_code"], 301);
    assert_eq!(paths["login"]["redirect_url"], "/login/");
}

#[tokio::test]
async fn large_bodies_are_measured_in_full() {
    const SIZE: usize = 16 * 1024 * 1024;
    let server = MockServer::start().await;
    mount(
        &server,
        "/backup.bak",
        ResponseTemplate::new(200).set_body_raw(vec![0x42u8; SIZE], "application/octet-stream"),
    )
    .await;
    let port = server.address().port();

    let opts = Options {
        extensions: vec![".bak".to_string()],
        timeout: Duration::from_secs(30),
        ..options(&["backup"])
    };
    let runner = Runner::new(opts).unwrap();
    let session = runner.discover(HOST, &[port]).await.unwrap();

    let backup = &session.port_results(port).unwrap()["backup.bak"];
    assert_eq!(backup.status_code, 200);
    assert_eq!(backup.content_type, "application/octet-stream");
    assert_eq!(backup.content_length, SIZE as u64);
}

#[tokio::test]
async fn repeated_wordlist_entry_is_counted_once() {
    let server = admin_login_server().await;
    let port = server.address().port();

    let (session, events) =
        discover_with_events(options(&["admin", "admin", "missing", "admin"]), &[port]).await;

    let found = session.port_results(port).unwrap();
    assert_eq!(found.len(), 1);
    let completed = events.iter().find_map(|e| match e {
        ScanEvent::SessionCompleted { found, .. } => Some(*found),
        _ => None,
    });
    assert_eq!(completed, Some(found.len()));
}

#[tokio::test]
async fn failed_sessions_are_isolated_per_port() {
    let server = admin_login_server().await;
    let live = server.address().port();
    let dead = closed_port();

    // a host with whitespace never forms a valid base URL
    let (sink, rx) = EventSink::channel();
    let runner = Runner::new(options(&["admin"])).unwrap().with_events(sink);
    let session = runner.discover("bad host", &[dead, live]).await.unwrap();
    drop(runner);
    let events = collect(rx).await;

    assert_eq!(session.results.len(), 2);
    assert!(session.port_results(dead).unwrap().is_empty());
    assert!(session.port_results(live).unwrap().is_empty());

    let failed: Vec<u16> = events
        .iter()
        .filter(|e| matches!(e, ScanEvent::SessionFailed { .. }))
        .map(ScanEvent::port)
        .collect();
    assert_eq!(failed, vec![dead, live]);
    assert!(!events
        .iter()
        .any(|e| matches!(e, ScanEvent::SessionStarted { .. })));

    // a well-formed target on the same ports scans normally
    let session = Runner::new(options(&["admin"]))
        .unwrap()
        .discover(HOST, &[dead, live])
        .await
        .unwrap();
    assert!(session.port_results(dead).unwrap().is_empty());
    assert_eq!(session.port_results(live).unwrap().len(), 1);
}

#[tokio::test]
async fn error_statuses_are_never_recorded() {
    let server = MockServer::start().await;
    for (at, status) in [("/a", 400u16), ("/b", 401), ("/c", 403), ("/d", 503)] {
        mount(&server, at, ResponseTemplate::new(status)).await;
    }
    mount(&server, "/e", ResponseTemplate::new(204)).await;
    let port = server.address().port();

    let runner = Runner::new(options(&["a", "b", "c", "d", "e"])).unwrap();
    let session = runner.discover(HOST, &[port]).await.unwrap();
    let found = session.port_results(port).unwrap();

    assert_eq!(found.len(), 1);
    assert!(found.values().all(|r| r.status_code < 400));
    assert_eq!(found["e"].status_code, 204);
}

#[tokio::test]
async fn redirect_without_location_has_empty_redirect_url() {
    let server = MockServer::start().await;
    mount(&server, "/moved", ResponseTemplate::new(302)).await;
    let port = server.address().port();

    let runner = Runner::new(options(&["moved"])).unwrap();
    let session = runner.discover(HOST, &[port]).await.unwrap();

    let moved = &session.port_results(port).unwrap()["moved"];
    assert_eq!(moved.status_code, 302);
    assert_eq!(moved.redirect_url, "");
}

#[tokio::test]
async fn extensions_expand_every_word() {
    let server = MockServer::start().await;
    mount(&server, "/index.php", ResponseTemplate::new(200)).await;
    mount(&server, "/backup.bak", ResponseTemplate::new(200)).await;
    let port = server.address().port();

    let opts = Options {
        extensions: vec![String::new(), ".php".to_string(), ".bak".to_string()],
        ..options(&["index", "backup"])
    };
    let (session, events) = discover_with_events(opts, &[port]).await;

    let keys: Vec<&str> = session
        .port_results(port)
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys, vec!["backup.bak", "index.php"]);
    assert!(events.iter().any(|e| matches!(
        e,
        ScanEvent::SessionStarted { candidates: 6, .. }
    )));
}

#[tokio::test]
async fn repeated_runs_render_identical_json() {
    let server = admin_login_server().await;
    let port = server.address().port();
    let runner = Runner::new(options(&["oops", "login", "missing", "admin"])).unwrap();

    let first = runner.discover(HOST, &[port]).await.unwrap();
    let second = runner.discover(HOST, &[port]).await.unwrap();

    assert_eq!(
        output::render_results_json(&first.results).unwrap(),
        output::render_results_json(&second.results).unwrap()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_candidate_is_probed_exactly_once_under_concurrency() {
    let server = MockServer::start().await;
    let words: Vec<String> = (0..40).map(|i| format!("page{i}")).collect();
    for word in &words {
        Mock::given(method("GET"))
            .and(path(format!("/{word}")))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
    }
    let port = server.address().port();

    let refs: Vec<&str> = words.iter().map(String::as_str).collect();
    let opts = Options {
        concurrency: 8,
        ..options(&refs)
    };
    let (session, events) = discover_with_events(opts, &[port]).await;

    assert_eq!(session.port_results(port).unwrap().len(), words.len());
    let completed = events.iter().find_map(|e| match e {
        ScanEvent::SessionCompleted { found, .. } => Some(*found),
        _ => None,
    });
    assert_eq!(completed, Some(words.len()));

    let mut counts: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::CandidateFound { found, .. } => Some(*found),
            _ => None,
        })
        .collect();
    counts.sort_unstable();
    assert_eq!(counts, (1..=words.len()).collect::<Vec<_>>());
    server.verify().await;
}

#[tokio::test]
async fn progress_is_monotonic_and_ends_complete() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/slow",
        ResponseTemplate::new(200).set_delay(Duration::from_millis(50)),
    )
    .await;
    let port = server.address().port();

    let words: Vec<String> = (0..20).map(|i| format!("w{i}")).chain(["slow".to_string()]).collect();
    let refs: Vec<&str> = words.iter().map(String::as_str).collect();
    let (_, events) = discover_with_events(options(&refs), &[port]).await;

    let snapshots: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::Progress(s) => Some(s.clone()),
            _ => None,
        })
        .collect();
    assert!(!snapshots.is_empty());
    assert!(snapshots
        .windows(2)
        .all(|w| w[0].completed <= w[1].completed));
    assert!(snapshots.iter().all(|s| s.completed <= s.total));

    let last = snapshots.last().unwrap();
    assert_eq!(last.completed, words.len());
    assert_eq!(last.total, words.len());
    assert_eq!(last.percent, 100.0);
}

#[tokio::test]
async fn unreachable_port_is_skipped_with_empty_entry() {
    let port = closed_port();
    let (session, events) = discover_with_events(options(&["admin"]), &[port]).await;

    assert!(session.port_results(port).unwrap().is_empty());
    let skipped: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, ScanEvent::PortSkipped { .. }))
        .collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].port(), port);
    assert!(!events
        .iter()
        .any(|e| matches!(e, ScanEvent::SessionStarted { .. })));
}

#[tokio::test]
async fn missing_wordlist_reports_and_yields_empty_results() {
    let server = admin_login_server().await;
    let port = server.address().port();
    let opts = Options {
        wordlist: WordlistSource::FilePath(PathBuf::from("/nonexistent/pathsweep/words.txt")),
        ..options(&[])
    };

    let (session, events) = discover_with_events(opts, &[port]).await;

    assert!(session.port_results(port).unwrap().is_empty());
    assert!(events
        .iter()
        .any(|e| matches!(e, ScanEvent::WordlistMissing { port: p, .. } if *p == port)));
    assert!(events.iter().any(|e| e.is_warning()));
}

#[tokio::test]
async fn ports_are_scanned_in_order_one_at_a_time() {
    let first = admin_login_server().await;
    let second = admin_login_server().await;
    let dead = closed_port();
    let ports = [first.address().port(), dead, second.address().port()];

    let (session, events) =
        discover_with_events(options(&["admin", "login"]), &ports).await;

    assert_eq!(session.results.len(), 3);
    assert_eq!(session.total_found(), 4);
    assert!(session.port_results(dead).unwrap().is_empty());

    // every event of a port precedes every event of the next one
    let order: Vec<u16> = events.iter().map(ScanEvent::port).collect();
    let mut seen = Vec::new();
    for port in order {
        if seen.last() != Some(&port) {
            assert!(!seen.contains(&port), "port {port} resumed after another port");
            seen.push(port);
        }
    }
    assert_eq!(seen, ports.to_vec());
}

#[tokio::test]
async fn shutdown_keeps_completed_ports_only() {
    let fast = admin_login_server().await;
    let slow = MockServer::start().await;
    mount(
        &slow,
        "/admin",
        ResponseTemplate::new(200).set_delay(Duration::from_secs(3)),
    )
    .await;
    let fast_port = fast.address().port();
    let slow_port = slow.address().port();

    let (sink, mut rx) = EventSink::channel();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let watcher = tokio::spawn(async move {
        let mut stop_tx = Some(stop_tx);
        while let Some(event) = rx.recv().await {
            if let ScanEvent::SessionStarted { port, .. } = event {
                if port == slow_port {
                    if let Some(tx) = stop_tx.take() {
                        let _ = tx.send(());
                    }
                }
            }
        }
    });

    let runner = Runner::new(options(&["admin"])).unwrap().with_events(sink);
    let session = runner
        .discover_until(HOST, &[fast_port, slow_port], async {
            let _ = stop_rx.await;
        })
        .await
        .unwrap();
    drop(runner);
    watcher.await.unwrap();

    assert!(session.interrupted);
    assert_eq!(session.port_results(fast_port).unwrap().len(), 1);
    assert!(session.port_results(slow_port).is_none());
}

#[tokio::test]
async fn session_json_carries_target_and_ports() {
    let server = admin_login_server().await;
    let port = server.address().port();
    let runner = Runner::new(options(&["admin"])).unwrap();
    let session = runner.discover(HOST, &[port]).await.unwrap();

    let rendered = output::render(&session, output::OutputFormat::Session).unwrap();
    let parsed: ScanSession = serde_json::from_slice(&rendered).unwrap();
    assert_eq!(parsed, session);
    assert_eq!(parsed.target, HOST);
    assert_eq!(parsed.ports, vec![port]);
}
