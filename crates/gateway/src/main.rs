//! Siga o Dinheiro API Gateway
//!
//! The HTTP surface of the article store.
//! Handles:
//! - Public article reads with ETag revalidation
//! - Admin login and session-gated article mutations
//! - Login rate limiting
//! - Observability (logging, metrics, request ids)

mod cache;
mod extract;
mod handlers;
mod middleware;

use axum::{
    extract::FromRef,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use siga_common::{
    articles::{ArticleService, ArticleStore, MemoryArticleStore},
    auth::{SessionGuard, SharedSecretGuard},
    config::{AppConfig, StoreBackend},
    db::{DbPool, Repository},
    metrics::{self, LATENCY_BUCKETS, METRICS_PREFIX},
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{signal, sync::watch};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub articles: Arc<ArticleService>,
    pub guard: Arc<dyn SessionGuard>,
    pub metrics: Option<PrometheusHandle>,
}

impl FromRef<AppState> for Arc<dyn SessionGuard> {
    fn from_ref(state: &AppState) -> Self {
        state.guard.clone()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    // Initialize tracing
    init_tracing(&config);

    info!("Starting Siga o Dinheiro API Gateway v{}", siga_common::VERSION);

    // Initialize metrics
    let metrics_handle = if config.observability.metrics_enabled {
        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full(format!("{}_request_duration_seconds", METRICS_PREFIX)),
                LATENCY_BUCKETS,
            )?
            .install_recorder()?;
        metrics::register_metrics();
        Some(handle)
    } else {
        None
    };

    // Fail fast on a bad catalog or a missing admin secret
    let catalog = Arc::new(config.catalog().map_err(|e| {
        error!(error = %e, "Invalid category catalog");
        e
    })?);
    let guard: Arc<dyn SessionGuard> =
        Arc::new(SharedSecretGuard::from_config(&config.auth).map_err(|e| {
            error!(error = %e, "Admin session guard is not configured");
            e
        })?);

    let store: Arc<dyn ArticleStore> = match config.store.backend {
        StoreBackend::Postgres => {
            let db = DbPool::new(&config.database).await?;
            if config.database.run_migrations {
                db.migrate().await?;
            }
            Arc::new(Repository::new(db))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory article store, nothing will be persisted");
            Arc::new(MemoryArticleStore::new())
        }
    };
    info!(backend = store.backend(), "Article store ready");

    // Create app state
    let state = AppState {
        config: config.clone(),
        articles: Arc::new(ArticleService::new(store, catalog)),
        guard,
        metrics: metrics_handle,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let shutdown_timeout = config.shutdown_timeout();
    let drain_deadline = async move {
        if shutdown_rx.changed().await.is_ok() {
            tokio::time::sleep(shutdown_timeout).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = server.into_future() => result?,
        _ = drain_deadline => warn!("Shutdown timeout elapsed, closing open connections"),
    }

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // Login throttling, one bucket per client IP
    let rate_limit = &state.config.rate_limit;
    let mut login = Router::new().route("/login", post(handlers::auth::login));
    if rate_limit.enabled {
        let limiter =
            middleware::rate_limit::create_rate_limiter(rate_limit.requests_per_second, rate_limit.burst);
        login = login.route_layer(from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit,
        ));
    }

    let auth_routes = login.route("/session", get(handlers::auth::session));

    // API routes
    let api_routes = Router::new()
        .route(
            "/articles",
            get(handlers::articles::list_articles).post(handlers::articles::create_article),
        )
        .route(
            "/articles/{id}",
            get(handlers::articles::get_article)
                .put(handlers::articles::update_article)
                .delete(handlers::articles::delete_article),
        )
        .route("/categories", get(handlers::categories::list_categories))
        .nest("/auth", auth_routes);

    let mut app = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/api", api_routes);

    if state.metrics.is_some() {
        app = app.route("/metrics", get(handlers::health::metrics));
    }

    // Compose the app
    app.route_layer(from_fn(middleware::metrics::track_metrics))
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(ConcurrencyLimitLayer::new(
            state.config.server.max_concurrent_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        extract::ConnectInfo,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use siga_common::articles::CategoryCatalog;
    use tower::ServiceExt;

    const SECRET: &str = "segredo-de-teste";

    fn test_state(config: AppConfig) -> AppState {
        let guard = SharedSecretGuard::from_config(&config.auth).unwrap();
        let articles = ArticleService::new(
            Arc::new(MemoryArticleStore::new()),
            Arc::new(CategoryCatalog::default()),
        );

        AppState {
            config: Arc::new(config),
            articles: Arc::new(articles),
            guard: Arc::new(guard),
            metrics: None,
        }
    }

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.admin_secret = Some(SECRET.into());
        config.auth.jwt_secret = Some("jwt-test".into());
        config.rate_limit.enabled = false;
        config
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn login(app: &Router) -> String {
        let response = send(
            app,
            json_request("POST", "/api/auth/login", None, json!({ "secret": SECRET })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    fn brics_article() -> Value {
        json!({
            "title": "BRICS: A Ascensão de uma Nova Ordem",
            "summary": "Como o bloco desafia a hegemonia do dólar",
            "content": "## Introdução\n\nTexto.",
            "category": "BRICS",
            "themeId": "brics",
            "readTime": "12 min",
            "date": "2024-12-22T10:00:00Z"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(test_state(test_config()));
        let response = send(&app, get("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");

        let response = send(&app, get("/ready")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["checks"]["store"]["backend"], "memory");
    }

    #[tokio::test]
    async fn test_create_without_token_leaves_store_unchanged() {
        let state = test_state(test_config());
        let app = create_router(state.clone());

        let response = send(&app, json_request("POST", "/api/articles", None, brics_article())).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"]["code"], "UNAUTHENTICATED");

        let response = send(
            &app,
            json_request("POST", "/api/articles", Some("forged"), brics_article()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        assert_eq!(state.articles.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_wrong_secret_is_rejected() {
        let app = create_router(test_state(test_config()));
        let response = send(
            &app,
            json_request("POST", "/api/auth/login", None, json!({ "secret": "admin123" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_article_lifecycle() {
        let app = create_router(test_state(test_config()));
        let token = login(&app).await;

        let response = send(
            &app,
            json_request("POST", "/api/articles", Some(&token), brics_article()),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
        let created = body_json(response).await;
        let id = created["id"].as_str().unwrap().to_string();
        assert!(id.starts_with("article-"));
        assert_eq!(created["version"], 1);
        assert_eq!(created["themeId"], "brics");

        let response = send(&app, get(&format!("/api/articles/{}", id))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, created);

        let response = send(
            &app,
            json_request(
                "PUT",
                &format!("/api/articles/{}", id),
                Some(&token),
                json!({ "title": "Novo título", "version": 1 }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await;
        assert_eq!(updated["title"], "Novo título");
        assert_eq!(updated["version"], 2);
        assert_eq!(updated["content"], created["content"]);

        let response = send(
            &app,
            json_request(
                "PUT",
                &format!("/api/articles/{}", id),
                Some(&token),
                json!({ "title": "Outro", "version": 1 }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let delete = |token: &str| {
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/articles/{}", id))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap()
        };
        assert_eq!(send(&app, delete(&token)).await.status(), StatusCode::NO_CONTENT);
        assert_eq!(send(&app, delete(&token)).await.status(), StatusCode::NOT_FOUND);

        let response = send(&app, get(&format!("/api/articles/{}", id))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_validation_errors_name_fields() {
        let app = create_router(test_state(test_config()));
        let token = login(&app).await;

        let mut input = brics_article();
        input["title"] = json!("");
        input["themeId"] = json!("illuminati");
        let response = send(&app, json_request("POST", "/api/articles", Some(&token), input)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
        let details = body["error"]["details"].as_array().unwrap();
        assert!(details.iter().any(|v| v["field"] == "title"));

        let mut input = brics_article();
        input["author"] = json!("anon");
        let response = send(&app, json_request("POST", "/api/articles", Some(&token), input)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "INVALID_FORMAT");
    }

    #[tokio::test]
    async fn test_listing_filters_and_revalidation() {
        let app = create_router(test_state(test_config()));
        let token = login(&app).await;

        let mut rockefeller = brics_article();
        rockefeller["category"] = json!("Rockefeller");
        rockefeller["themeId"] = json!("rockefeller");
        rockefeller["date"] = json!("2024-12-23T10:00:00Z");
        for input in [brics_article(), rockefeller] {
            let response =
                send(&app, json_request("POST", "/api/articles", Some(&token), input)).await;
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = send(&app, get("/api/articles")).await;
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        let etag = response.headers()[header::ETAG].clone();
        let all = body_json(response).await;
        let themes: Vec<_> = all
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["themeId"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(themes, vec!["rockefeller", "brics"]);

        let response = send(&app, get("/api/articles?themeId=brics")).await;
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

        let response = send(&app, get("/api/articles?themeId=all")).await;
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);

        let response = send(&app, get("/api/articles?category=Rockefeller")).await;
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

        let conditional = Request::builder()
            .uri("/api/articles")
            .header(header::IF_NONE_MATCH, etag)
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, conditional).await.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_session_and_categories() {
        let app = create_router(test_state(test_config()));
        let token = login(&app).await;

        let request = Request::builder()
            .uri("/api/auth/session")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["subject"], "admin");

        let response = send(&app, get("/api/categories")).await;
        let categories = body_json(response).await;
        assert_eq!(categories.as_array().unwrap().len(), 5);
        assert_eq!(categories[0]["id"], "arquitetos-do-poder");
    }

    #[tokio::test]
    async fn test_login_is_rate_limited() {
        let mut config = test_config();
        config.rate_limit.enabled = true;
        config.rate_limit.requests_per_second = 1;
        config.rate_limit.burst = 1;
        let app = create_router(test_state(config));

        let attempt = || json_request("POST", "/api/auth/login", None, json!({ "secret": "x" }));
        assert_eq!(send(&app, attempt()).await.status(), StatusCode::UNAUTHORIZED);

        let response = send(&app, attempt()).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body_json(response).await["error"]["code"], "RATE_LIMITED");
    }

    #[tokio::test]
    async fn test_login_limit_is_per_client() {
        let mut config = test_config();
        config.rate_limit.enabled = true;
        config.rate_limit.requests_per_second = 1;
        config.rate_limit.burst = 1;
        let app = create_router(test_state(config));

        let attempt = |peer: &str, secret: &str| {
            let mut request =
                json_request("POST", "/api/auth/login", None, json!({ "secret": secret }));
            let addr: SocketAddr = peer.parse().unwrap();
            request.extensions_mut().insert(ConnectInfo(addr));
            request
        };

        let noisy = "198.51.100.9:40000";
        assert_eq!(send(&app, attempt(noisy, "x")).await.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            send(&app, attempt(noisy, "x")).await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );

        let admin = "192.0.2.10:50000";
        assert_eq!(send(&app, attempt(admin, SECRET)).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_query_and_path_are_structured() {
        let app = create_router(test_state(test_config()));

        let response = send(&app, get("/api/articles?themeId=brics&themeId=ww2")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "INVALID_FORMAT");
        assert!(body["error"]["message"].as_str().unwrap().contains("themeId"));

        let response = send(&app, get("/api/articles?themeId=brics&category=BRICS")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "INVALID_FORMAT");

        let response = send(&app, get("/api/articles/%FF")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "INVALID_FORMAT");
    }

    #[tokio::test]
    async fn test_mutations_invalidate_cached_copies() {
        let app = create_router(test_state(test_config()));
        let token = login(&app).await;

        let conditional = |uri: &str, etag: &header::HeaderValue| {
            Request::builder()
                .uri(uri)
                .header(header::IF_NONE_MATCH, etag.clone())
                .body(Body::empty())
                .unwrap()
        };

        // create
        let before_create = send(&app, get("/api/articles")).await.headers()[header::ETAG].clone();
        let response = send(
            &app,
            json_request("POST", "/api/articles", Some(&token), brics_article()),
        )
        .await;
        let id = body_json(response).await["id"].as_str().unwrap().to_string();
        let item_uri = format!("/api/articles/{}", id);

        let response = send(&app, conditional("/api/articles", &before_create)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);

        // update
        let list_etag = send(&app, get("/api/articles")).await.headers()[header::ETAG].clone();
        let item_etag = send(&app, get(&item_uri)).await.headers()[header::ETAG].clone();
        assert_eq!(
            send(&app, conditional(&item_uri, &item_etag)).await.status(),
            StatusCode::NOT_MODIFIED
        );
        let response = send(
            &app,
            json_request("PUT", &item_uri, Some(&token), json!({ "readTime": "15 min" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, conditional(&item_uri, &item_etag)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["readTime"], "15 min");
        assert_eq!(
            send(&app, conditional("/api/articles", &list_etag)).await.status(),
            StatusCode::OK
        );

        // delete
        let list_etag = send(&app, get("/api/articles")).await.headers()[header::ETAG].clone();
        let request = Request::builder()
            .method("DELETE")
            .uri(&item_uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, request).await.status(), StatusCode::NO_CONTENT);

        let response = send(&app, conditional("/api/articles", &list_etag)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_json(response).await.as_array().unwrap().is_empty());
        assert_eq!(
            send(&app, conditional(&item_uri, &item_etag)).await.status(),
            StatusCode::NOT_FOUND
        );
    }
}
