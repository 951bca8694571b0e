use axum::{
    http::{header, StatusCode},
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wordbloom_core::{AnalysisRequest, ContentFetcher, GenerationType, InputPath, TierKind};
use wordbloom_local::textstats::tokenize;
use wordbloom_local::{Analyzer, AnalyzerConfig, HttpFetcher};

async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Primary URL that always fails, and a fallback endpoint that answers `reply`.
/// Returns (page url, endpoint url, page hits, endpoint hits, last endpoint body).
async fn blocked_page_and_fallback(
    reply: serde_json::Value,
) -> (
    String,
    String,
    Arc<AtomicUsize>,
    Arc<AtomicUsize>,
    Arc<Mutex<Option<serde_json::Value>>>,
) {
    let page_hits = Arc::new(AtomicUsize::new(0));
    let api_hits = Arc::new(AtomicUsize::new(0));
    let last_body = Arc::new(Mutex::new(None));

    let ph = page_hits.clone();
    let ah = api_hits.clone();
    let lb = last_body.clone();
    let app = Router::new()
        .route(
            "/page",
            get(move || {
                ph.fetch_add(1, Ordering::SeqCst);
                async { (StatusCode::FORBIDDEN, "no cross-origin for you") }
            }),
        )
        .route(
            "/api/generate",
            post(move |Json(body): Json<serde_json::Value>| {
                ah.fetch_add(1, Ordering::SeqCst);
                *lb.lock().unwrap() = Some(body);
                let reply = reply.clone();
                async move { Json(reply) }
            }),
        );
    let addr = spawn(app).await;
    (
        format!("http://{addr}/page"),
        format!("http://{addr}/api/generate"),
        page_hits,
        api_hits,
        last_body,
    )
}

fn cfg_with_server(endpoint: &str) -> AnalyzerConfig {
    AnalyzerConfig {
        server_endpoint: Some(endpoint.to_string()),
        request_timeout_ms: 5_000,
        ..AnalyzerConfig::default()
    }
}

#[tokio::test]
async fn blocked_fetch_calls_fallback_once_and_fills_creative_locally() {
    let (page, api, page_hits, api_hits, last_body) =
        blocked_page_and_fallback(serde_json::json!({ "totalWords": 50 })).await;

    let analyzer = Analyzer::new(&cfg_with_server(&api)).unwrap();
    let input = format!("{page}\nthis second line is ignored");
    let r = analyzer
        .analyze(&AnalysisRequest::new(input, "a", GenerationType::Haiku))
        .await
        .unwrap();

    assert_eq!(page_hits.load(Ordering::SeqCst), 1);
    assert_eq!(api_hits.load(Ordering::SeqCst), 1);
    assert_eq!(r.path, InputPath::Url);
    assert_eq!(r.total_words, 50);
    assert_eq!(r.starts_with_count, 0);
    assert_eq!(r.creative_source, Some(TierKind::Local));
    assert!(!r.creative_text.unwrap_or_default().trim().is_empty());
    assert!(r.notes.iter().any(|n| n == "fetch_blocked"));

    let body = last_body.lock().unwrap().clone().unwrap();
    assert_eq!(body["url"].as_str(), Some(page.as_str()));
    assert_eq!(body["targetChar"].as_str(), Some("a"));
    assert_eq!(body["generationType"].as_str(), Some("haiku"));
    assert!(body.get("text").is_none());
}

#[tokio::test]
async fn fallback_creative_text_is_used_as_is() {
    let (page, api, _page_hits, api_hits, _) = blocked_page_and_fallback(serde_json::json!({
        "totalWords": 12,
        "startsWithCount": 4,
        "creative": "server-made riddle about r"
    }))
    .await;

    let analyzer = Analyzer::new(&cfg_with_server(&api)).unwrap();
    let r = analyzer
        .analyze(&AnalysisRequest::new(page, "r", GenerationType::Riddle))
        .await
        .unwrap();
    assert_eq!(api_hits.load(Ordering::SeqCst), 1);
    assert_eq!((r.total_words, r.starts_with_count), (12, 4));
    assert_eq!(r.creative_source, Some(TierKind::Server));
    assert_eq!(r.creative_text.as_deref(), Some("server-made riddle about r"));
}

#[tokio::test]
async fn failing_fallback_is_terminal_and_local_generator_finishes() {
    let page_hits = Arc::new(AtomicUsize::new(0));
    let api_hits = Arc::new(AtomicUsize::new(0));
    let ph = page_hits.clone();
    let ah = api_hits.clone();
    let app = Router::new()
        .route(
            "/page",
            get(move || {
                ph.fetch_add(1, Ordering::SeqCst);
                async { StatusCode::INTERNAL_SERVER_ERROR }
            }),
        )
        .route(
            "/api/generate",
            post(move || {
                ah.fetch_add(1, Ordering::SeqCst);
                async { (StatusCode::OK, "this is not json") }
            }),
        );
    let addr = spawn(app).await;

    let analyzer = Analyzer::new(&cfg_with_server(&format!("http://{addr}/api/generate"))).unwrap();
    let r = analyzer
        .analyze(&AnalysisRequest::new(
            format!("http://{addr}/page"),
            "p",
            GenerationType::Poem,
        ))
        .await
        .unwrap();
    assert_eq!(page_hits.load(Ordering::SeqCst), 1);
    assert_eq!(api_hits.load(Ordering::SeqCst), 1);
    assert_eq!((r.total_words, r.starts_with_count), (0, 0));
    assert_eq!(r.creative_source, Some(TierKind::Local));
    assert!(r.notes.iter().any(|n| n == "server_unavailable"));
}

#[tokio::test]
async fn fetched_page_is_sanitized_counted_and_sent_as_text() {
    let last_body = Arc::new(Mutex::new(None::<serde_json::Value>));
    let lb = last_body.clone();
    let app = Router::new()
        .route(
            "/page",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "text/html")],
                    "<html><head><script>var apple = 1;</script><style>a{}</style></head>\
                     <body><p>Apple ant</p><p>apricot banana</p></body></html>",
                )
            }),
        )
        .route(
            "/api/generate",
            post(move |Json(body): Json<serde_json::Value>| {
                *lb.lock().unwrap() = Some(body);
                async { Json(serde_json::json!({ "creative": "An apple poem" })) }
            }),
        );
    let addr = spawn(app).await;

    let analyzer = Analyzer::new(&cfg_with_server(&format!("http://{addr}/api/generate"))).unwrap();
    let r = analyzer
        .analyze(&AnalysisRequest::new(
            format!("http://{addr}/page"),
            "a",
            GenerationType::Poem,
        ))
        .await
        .unwrap();
    assert_eq!((r.total_words, r.starts_with_count), (4, 3));
    assert_eq!(r.creative_source, Some(TierKind::Server));
    assert_eq!(r.creative_text.as_deref(), Some("An apple poem"));

    let body = last_body.lock().unwrap().clone().unwrap();
    assert_eq!(body["text"].as_str(), Some("Apple ant apricot banana"));
    assert!(body.get("url").is_none());
}

#[tokio::test]
async fn fetched_text_is_bounded_by_max_chars() {
    let app = Router::new().route(
        "/big",
        get(|| async { "word ".repeat(10_000) }),
    );
    let addr = spawn(app).await;

    let cfg = AnalyzerConfig {
        max_text_chars: 100,
        ..AnalyzerConfig::default()
    };
    let analyzer = Analyzer::new(&cfg).unwrap();
    let r = analyzer
        .analyze(&AnalysisRequest::new(
            format!("http://{addr}/big"),
            "w",
            GenerationType::Haiku,
        ))
        .await
        .unwrap();
    // 100 chars of "word word ..." is 20 words.
    assert_eq!(r.total_words, 20);
    assert_eq!(r.starts_with_count, 20);
}

#[tokio::test]
async fn endless_body_is_cut_at_the_byte_cap() {
    let app = Router::new().route(
        "/endless",
        get(|| async {
            let chunks = futures_util::stream::repeat_with(|| {
                Ok::<_, std::io::Error>("<p>word word word word</p>\n")
            });
            axum::body::Body::from_stream(chunks)
        }),
    );
    let addr = spawn(app).await;

    let cfg = AnalyzerConfig {
        max_text_chars: 1_000_000,
        max_body_bytes: Some(4096),
        ..AnalyzerConfig::default()
    };
    let fetcher = HttpFetcher::from_config(cfg.http_client().unwrap(), &cfg);
    let text = tokio::time::timeout(
        std::time::Duration::from_secs(10),
        fetcher.fetch_text(&format!("http://{addr}/endless")),
    )
    .await
    .expect("fetch should stop reading at the cap")
    .unwrap();
    assert!(text.len() <= 4096);
    assert!(text.starts_with("word word word word"));
    assert!(tokenize(&text).len() > 100);
}

#[tokio::test]
async fn direct_model_tier_parses_json_out_of_prose() {
    let app = Router::new().route(
        "/v1beta/models/*rest",
        post(|| async {
            Json(serde_json::json!({
                "candidates": [{ "content": { "parts": [{
                    "text": "Here is your result:\n{\"totalWords\": 4, \"startsWithCount\": 3, \"creative\": \"A model haiku\"}\nThanks!"
                }]}}]
            }))
        }),
    );
    let addr = spawn(app).await;

    let cfg = AnalyzerConfig {
        model_direct_enabled: true,
        model_base_url: format!("http://{addr}"),
        model_api_key: Some("test-key".to_string()),
        ..AnalyzerConfig::default()
    };
    let analyzer = Analyzer::new(&cfg).unwrap();
    let r = analyzer
        .analyze(&AnalysisRequest::new(
            "Apple ant apricot banana",
            "a",
            GenerationType::Haiku,
        ))
        .await
        .unwrap();
    assert_eq!(r.creative_source, Some(TierKind::ModelDirect));
    assert_eq!(r.creative_text.as_deref(), Some("A model haiku"));
    assert_eq!((r.total_words, r.starts_with_count), (4, 3));
}

#[tokio::test]
async fn direct_model_prose_reply_is_used_verbatim() {
    let app = Router::new().route(
        "/v1beta/models/*rest",
        post(|| async {
            Json(serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": "Z zigzags,\nzero rules." }]}}]
            }))
        }),
    );
    let addr = spawn(app).await;

    let cfg = AnalyzerConfig {
        model_direct_enabled: true,
        model_base_url: format!("http://{addr}"),
        model_api_key: Some("test-key".to_string()),
        ..AnalyzerConfig::default()
    };
    let analyzer = Analyzer::new(&cfg).unwrap();
    let r = analyzer
        .analyze(&AnalysisRequest::new("zebra zone", "z", GenerationType::Poem))
        .await
        .unwrap();
    assert_eq!(r.creative_source, Some(TierKind::ModelDirect));
    assert_eq!(r.creative_text.as_deref(), Some("Z zigzags,\nzero rules."));
    assert_eq!((r.total_words, r.starts_with_count), (2, 2));
    assert!(r.notes.iter().any(|n| n == "model_response_unparseable"));
}
