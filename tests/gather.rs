use std::sync::Arc;
use std::time::{Duration, Instant};

use goruntime_collector::{
    collector::GoRuntime,
    config::{DEFAULT_MEASUREMENT, GoRuntimeConfig},
    fields::FIELD_KEYS,
    sink::{Accumulator, FieldValue, MemorySink},
};
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn snapshot(serial: &str) -> Value {
    let mut pauses = vec![0u64; 256];
    pauses[4] = 1_500;
    pauses[5] = 9_000;

    json!({
        "serial": serial,
        "cpuNum": 8,
        "threadNum": 14,
        "goroutineNum": 52,
        "cpuPercent": 12,
        "memPercent": 34,
        "memstats": {
            "Alloc": 1024,
            "HeapObjects": 4294967295u64,
            "NumGC": 5,
            "PauseNs": pauses,
            "PauseTotalNs": 10_500,
            "GCCPUFraction": 0.02
        }
    })
}

async fn mount_ok(server: &MockServer, route: &str, serial: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot(serial)))
        .mount(server)
        .await;
}

fn input(cfg: GoRuntimeConfig) -> Arc<GoRuntime> {
    Arc::new(GoRuntime::new(cfg).unwrap())
}

fn serials(sink: &MemorySink) -> Vec<String> {
    let mut out: Vec<String> = sink
        .measurements()
        .iter()
        .map(|m| m.tags["serial"].clone())
        .collect();
    out.sort();
    out
}

#[tokio::test]
async fn one_failing_endpoint_does_not_suppress_others() {
    let server = MockServer::start().await;
    mount_ok(&server, "/a", "node-a").await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_ok(&server, "/c", "node-c").await;

    let b_url = format!("{}/b", server.uri());
    let cfg = GoRuntimeConfig::new(vec![
        format!("{}/a", server.uri()),
        b_url.clone(),
        format!("{}/c", server.uri()),
    ]);

    let sink = Arc::new(MemorySink::new());
    let report = input(cfg).gather(sink.clone()).await.unwrap();

    assert_eq!(report.polled, 3);
    assert_eq!(report.emitted, 2);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].url, b_url);

    assert_eq!(serials(&sink), vec!["node-a", "node-c"]);

    let errors = sink.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0],
        format!(
            "[url={b_url}]: Received status code 500 (Internal Server Error), expected 200 (OK)"
        )
    );
}

#[tokio::test]
async fn emitted_record_is_flattened_snapshot() {
    let server = MockServer::start().await;
    mount_ok(&server, "/debug/vars", "node-7").await;

    let cfg = GoRuntimeConfig::new(vec![format!("{}/debug/vars", server.uri())]);
    let sink = Arc::new(MemorySink::new());
    input(cfg).gather(sink.clone()).await.unwrap();

    let measurements = sink.measurements();
    assert_eq!(measurements.len(), 1);
    let m = &measurements[0];

    assert_eq!(m.name, DEFAULT_MEASUREMENT);
    assert_eq!(m.tags.len(), 1);
    assert_eq!(m.tags["serial"], "node-7");
    assert_eq!(m.fields.len(), FIELD_KEYS.len());
    assert!(FIELD_KEYS.iter().all(|k| m.fields.contains_key(*k)));

    assert_eq!(m.fields["cpu.goroutines"], FieldValue::Int(52));
    assert_eq!(m.fields["mem.heap.objects"], FieldValue::Int(4_294_967_295));
    assert_eq!(m.fields["mem.gc.pause"], FieldValue::Int(1_500));
    assert_eq!(m.fields["mem.gc.count"], FieldValue::Int(5));
    assert_eq!(m.fields["mem.gc.cpu_fraction"], FieldValue::Float(0.02));
    assert_eq!(m.fields["mem.heap.sys"], FieldValue::Int(0));
}

#[tokio::test]
async fn configured_measurement_name_is_used() {
    let server = MockServer::start().await;
    mount_ok(&server, "/a", "a").await;

    let mut cfg = GoRuntimeConfig::new(vec![format!("{}/a", server.uri())]);
    cfg.measurement = Some("custom_m".into());

    let sink = Arc::new(MemorySink::new());
    input(cfg).gather(sink.clone()).await.unwrap();

    assert_eq!(sink.measurements()[0].name, "custom_m");
}

#[tokio::test]
async fn undecodable_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;
    mount_ok(&server, "/good", "good").await;

    let cfg = GoRuntimeConfig::new(vec![
        format!("{}/bad", server.uri()),
        format!("{}/good", server.uri()),
    ]);

    let sink = Arc::new(MemorySink::new());
    let report = input(cfg).gather(sink.clone()).await.unwrap();

    assert_eq!(report.emitted, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(sink.errors()[0].contains("/bad"));
    assert!(sink.errors()[0].contains("decode"));
    assert_eq!(serials(&sink), vec!["good"]);
}

#[tokio::test]
async fn basic_auth_header_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/secure"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot("secure")))
        .mount(&server)
        .await;

    let mut cfg = GoRuntimeConfig::new(vec![format!("{}/secure", server.uri())]);
    cfg.username = "user".into();
    cfg.password = "pass".into();

    let sink = Arc::new(MemorySink::new());
    let report = input(cfg).gather(sink.clone()).await.unwrap();

    assert!(report.errors.is_empty());
    assert_eq!(serials(&sink), vec!["secure"]);
}

#[tokio::test]
async fn configured_method_is_used() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vars"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot("posted")))
        .mount(&server)
        .await;

    let mut cfg = GoRuntimeConfig::new(vec![format!("{}/vars", server.uri())]);
    cfg.method = "POST".into();

    let sink = Arc::new(MemorySink::new());
    input(cfg).gather(sink.clone()).await.unwrap();

    assert_eq!(serials(&sink), vec!["posted"]);
}

#[tokio::test]
async fn stalled_endpoint_is_bounded_by_timeout() {
    let server = MockServer::start().await;
    mount_ok(&server, "/a", "a").await;
    mount_ok(&server, "/c", "c").await;
    Mock::given(method("GET"))
        .and(path("/stall"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(snapshot("late"))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let mut cfg = GoRuntimeConfig::new(vec![
        format!("{}/a", server.uri()),
        format!("{}/stall", server.uri()),
        format!("{}/c", server.uri()),
    ]);
    cfg.timeout = Duration::from_millis(300);

    let sink = Arc::new(MemorySink::new());
    let started = Instant::now();
    let report = input(cfg).gather(sink.clone()).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(report.emitted, 2);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].url.ends_with("/stall"));
    assert_eq!(serials(&sink), vec!["a", "c"]);
}

#[tokio::test]
async fn cycle_with_no_successes_still_completes() {
    let cfg = GoRuntimeConfig::new(vec![
        "http://127.0.0.1:1/debug/vars".into(),
        "not a url".into(),
    ]);

    let sink = Arc::new(MemorySink::new());
    let report = input(cfg).gather(sink.clone()).await.unwrap();

    assert_eq!(report.polled, 2);
    assert_eq!(report.emitted, 0);
    assert_eq!(report.errors.len(), 2);
    assert!(sink.measurements().is_empty());
    assert_eq!(sink.errors().len(), 2);
}

#[tokio::test]
async fn client_is_built_once_and_reused() {
    let server = MockServer::start().await;
    mount_ok(&server, "/a", "a").await;

    let runtime = input(GoRuntimeConfig::new(vec![format!("{}/a", server.uri())]));
    assert!(!runtime.client_initialized());

    let sink = Arc::new(MemorySink::new());
    let acc: Arc<dyn Accumulator> = sink.clone();

    runtime.gather(acc.clone()).await.unwrap();
    assert!(runtime.client_initialized());

    runtime.gather(acc).await.unwrap();
    assert_eq!(sink.measurements().len(), 2);
}

#[tokio::test]
async fn client_build_failure_fails_the_cycle_and_is_retried() {
    let mut cfg = GoRuntimeConfig::new(vec!["http://127.0.0.1:1/".into()]);
    cfg.tls.tls_ca = Some("/nonexistent/ca.pem".into());

    let runtime = input(cfg);
    let sink = Arc::new(MemorySink::new());

    assert!(runtime.gather(sink.clone()).await.is_err());
    assert!(!runtime.client_initialized());
    assert!(runtime.gather(sink).await.is_err());
}

async fn mount_delayed(server: &MockServer, route: &str, serial: &str, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(snapshot(serial))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn endpoints_are_fetched_in_parallel() {
    let server = MockServer::start().await;
    let delay = Duration::from_millis(500);
    mount_delayed(&server, "/a", "a", delay).await;
    mount_delayed(&server, "/b", "b", delay).await;
    mount_delayed(&server, "/c", "c", delay).await;

    let mut cfg = GoRuntimeConfig::new(vec![
        format!("{}/a", server.uri()),
        format!("{}/b", server.uri()),
        format!("{}/c", server.uri()),
    ]);
    cfg.timeout = Duration::from_secs(2);

    let sink = Arc::new(MemorySink::new());
    let started = Instant::now();
    let report = input(cfg).gather(sink.clone()).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(report.emitted, 3);
    assert!(report.errors.is_empty());
    assert_eq!(serials(&sink), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn zero_timeout_means_no_limit() {
    let server = MockServer::start().await;
    mount_delayed(&server, "/slow", "slow", Duration::from_millis(300)).await;

    let mut cfg = GoRuntimeConfig::new(vec![format!("{}/slow", server.uri())]);
    cfg.timeout = Duration::ZERO;

    let sink = Arc::new(MemorySink::new());
    let report = input(cfg).gather(sink.clone()).await.unwrap();

    assert!(report.errors.is_empty());
    assert_eq!(serials(&sink), vec!["slow"]);
}
