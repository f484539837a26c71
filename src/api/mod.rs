//! HTTP API - axum router, shared state and server lifecycle.
//!
//! All routes live under `/api/v1` and answer with the `{code, message, data}`
//! envelope from [`response`].

pub mod extract;
pub mod response;
mod routes;

use crate::{
    ai::ChatModel,
    config::Settings,
    core::classify::Classifier,
    errors::{Error, Result},
};
use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
};
use response::ApiError;
use sea_orm::DatabaseConnection;
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Bill classification pipeline
    pub classifier: Arc<Classifier>,
    /// Chat model; `None` when no API key is configured
    pub chat: Option<Arc<dyn ChatModel>>,
    /// Runtime settings
    pub settings: Arc<Settings>,
}

fn cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors_origins()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {origin}: {e}");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(extract::USER_HEADER),
        ])
        .max_age(Duration::from_secs(60 * 60))
}

async fn fallback() -> ApiError {
    ApiError::not_found("route not found")
}

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    let redact = state.settings.redact_internal_errors();
    let cors = cors_layer(&state.settings);

    Router::new()
        .nest("/api/v1", routes::api_routes())
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn_with_state(
            redact,
            response::redact_internal_errors,
        ))
        .layer(CatchPanicLayer::custom(response::panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Binds `settings.bind_address` and serves until Ctrl+C or SIGTERM.
pub async fn serve(state: AppState) -> Result<()> {
    let address = state.settings.bind_address.clone();
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(Error::from)?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        config::{CachePolicySetting, Environment},
        core::classify::{EvictionPolicy, FingerprintCache, OcrEngine, TextBlock, ocr},
        test_utils::*,
    };
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    struct ReceiptOcr;

    impl OcrEngine for ReceiptOcr {
        fn recognize(&self, _image: &[u8]) -> Result<Vec<TextBlock>> {
            Ok(ocr::text_blocks("Noodle House 餐厅\nTotal: 45.99"))
        }
    }

    fn test_settings(environment: Environment) -> Settings {
        Settings {
            database_url: "sqlite::memory:".to_string(),
            bind_address: "127.0.0.1:0".to_string(),
            environment,
            allowed_origins: Vec::new(),
            production_origins: Vec::new(),
            deepseek_api_key: None,
            deepseek_base_url: "http://127.0.0.1:9".to_string(),
            deepseek_model: "test".to_string(),
            tesseract_bin: "tesseract".to_string(),
            cache_capacity: 10,
            cache_ttl: None,
            cache_policy: CachePolicySetting::Lru,
            catalog_path: "config.toml".to_string(),
        }
    }

    async fn test_app(environment: Environment) -> Result<(Router, DatabaseConnection)> {
        let db = setup_test_db().await?;
        let classifier = Classifier::new(
            FingerprintCache::new(10, EvictionPolicy::Lru, None),
            Arc::new(ReceiptOcr),
            None,
        );
        let state = AppState {
            db: db.clone(),
            classifier: Arc::new(classifier),
            chat: None,
            settings: Arc::new(test_settings(environment)),
        };
        Ok((router(state), db))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_transaction_round_trip() -> Result<()> {
        let (app, _db) = test_app(Environment::Development).await?;

        let (status, created) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/transactions",
                &json!({"amount": 1299, "category": "餐饮", "type": "expense"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["code"], 0);
        assert_eq!(created["data"]["type"], "EXPENSE");
        assert_eq!(created["data"]["sideEffects"]["dailyTask"]["outcome"], "applied");

        let (status, listed) = send(&app, get("/api/v1/transactions?page=1&size=1")).await;
        assert_eq!(status, StatusCode::OK);
        let item = &listed["data"]["items"][0];
        assert_eq!(item["amount"], 1299);
        assert_eq!(item["type"], "EXPENSE");
        assert_eq!(item["category"], "餐饮");
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_transaction_is_400_envelope() -> Result<()> {
        let (app, _db) = test_app(Environment::Development).await?;

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/transactions",
                &json!({"amount": 0, "category": "餐饮"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
        assert!(body["data"].is_null());

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/transactions",
                &json!({"amount": 100, "category": "餐饮", "type": "transfer"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
        Ok(())
    }

    #[tokio::test]
    async fn test_claim_flow() -> Result<()> {
        let (app, _db) = test_app(Environment::Development).await?;
        let claim = json!({"taskCode": "ADD_TRANSACTION"});

        let (status, _) = send(&app, json_request("POST", "/api/v1/incentives/claim", &claim)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        send(
            &app,
            json_request(
                "POST",
                "/api/v1/transactions",
                &json!({"amount": 500, "category": "交通"}),
            ),
        )
        .await;

        let (status, body) =
            send(&app, json_request("POST", "/api/v1/incentives/claim", &claim)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["pointsAwarded"], 10);

        let (status, _) = send(&app, json_request("POST", "/api/v1/incentives/claim", &claim)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            json_request("POST", "/api/v1/incentives/claim", &json!({"taskCode": "NOPE"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, summary) = send(&app, get("/api/v1/incentives/summary")).await;
        assert_eq!(summary["data"]["points"], 10);
        Ok(())
    }

    #[tokio::test]
    async fn test_classify_text_uses_cache() -> Result<()> {
        let (app, _db) = test_app(Environment::Development).await?;
        let body = json!({"text": "Total: 45.99 qty 2 ref 1001"});

        let (status, first) = send(
            &app,
            json_request("POST", "/api/v1/accounting/classify-text", &body),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["data"]["amount"], 45.99);
        assert_eq!(first["data"]["cache"], false);
        assert_eq!(
            first["data"]["sideEffects"]["classifyTask"]["outcome"],
            "applied"
        );

        let (_, second) = send(
            &app,
            json_request("POST", "/api/v1/accounting/classify-text", &body),
        )
        .await;
        assert_eq!(second["data"]["cache"], true);
        // Daily task already completed today
        assert_eq!(
            second["data"]["sideEffects"]["classifyTask"]["outcome"],
            "skipped"
        );

        let (_, bypassed) = send(
            &app,
            json_request("POST", "/api/v1/accounting/classify-text?nocache=1", &body),
        )
        .await;
        assert_eq!(bypassed["data"]["cache"], false);
        Ok(())
    }

    #[tokio::test]
    async fn test_classify_multipart_upload() -> Result<()> {
        let (app, _db) = test_app(Environment::Development).await?;
        let boundary = "ledgerly-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"files\"; filename=\"bill.png\"\r\n\
             Content-Type: image/png\r\n\r\n\
             not-really-a-png\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/accounting/classify")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let (status, classified) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(classified["data"]["amount"], 45.99);
        assert_eq!(classified["data"]["categories"][0]["label"], "餐饮");
        assert_eq!(classified["data"]["ocr"][0]["text"], "Noodle House 餐厅");
        Ok(())
    }

    #[tokio::test]
    async fn test_reminder_endpoints() -> Result<()> {
        let (app, _db) = test_app(Environment::Development).await?;
        let due_at = chrono::Utc::now() - chrono::Duration::minutes(1);

        let (status, created) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/reminders",
                &json!({"type": "BILL", "config": {"title": "Rent", "dueAt": due_at}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["data"]["due"], true);
        assert_eq!(created["data"]["source"], "server");
        let id = created["data"]["id"].as_i64().unwrap();

        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/v1/reminders/{id}/snooze"))
            .body(Body::empty())
            .unwrap();
        let (status, snoozed) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snoozed["data"]["status"], "SNOOZE");
        Ok(())
    }

    #[tokio::test]
    async fn test_family_and_products() -> Result<()> {
        let (app, _db) = test_app(Environment::Development).await?;

        let (status, family) = send(
            &app,
            json_request("POST", "/api/v1/family", &json!({"name": "Home"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(family["data"]["achievement"]["outcome"], "applied");

        let (_, ledgers) = send(&app, get("/api/v1/family/ledgers")).await;
        assert_eq!(ledgers["data"].as_array().unwrap().len(), 1);

        let (_, recs) = send(&app, get("/api/v1/products/recommendations")).await;
        assert_eq!(recs["data"]["riskLevel"], 1);
        assert_eq!(recs["data"]["products"][0]["code"], "MMF");
        Ok(())
    }

    #[tokio::test]
    async fn test_chat_without_key_falls_back() -> Result<()> {
        let (app, _db) = test_app(Environment::Development).await?;
        let (status, body) = send(
            &app,
            json_request("POST", "/api/v1/ai/chat", &json!({"message": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["source"], "fallback");
        Ok(())
    }

    #[tokio::test]
    async fn test_health_and_unknown_route() -> Result<()> {
        let (app, _db) = test_app(Environment::Development).await?;

        let (status, body) = send(&app, get("/api/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["database"], true);

        let (status, body) = send(&app, get("/api/v1/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 404);
        Ok(())
    }

    #[tokio::test]
    async fn test_user_header() -> Result<()> {
        let (app, db) = test_app(Environment::Development).await?;
        let other = create_test_user(&db, "other").await?;
        create_test_expense(&db, other.id, 700, "购物").await?;

        let request = Request::builder()
            .uri("/api/v1/transactions")
            .header(extract::USER_HEADER, other.id.to_string())
            .body(Body::empty())
            .unwrap();
        let (_, theirs) = send(&app, request).await;
        assert_eq!(theirs["data"]["total"], 1);

        let (_, mine) = send(&app, get("/api/v1/transactions")).await;
        assert_eq!(mine["data"]["total"], 0);

        let request = Request::builder()
            .uri("/api/v1/transactions")
            .header(extract::USER_HEADER, "abc")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_production_redacts_internal_errors() -> Result<()> {
        let (app, db) = test_app(Environment::Production).await?;
        db.close().await?;

        let (status, body) = send(&app, get("/api/v1/incentives/summary")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], response::INTERNAL_ERROR_MESSAGE);
        Ok(())
    }
}
