use crate::{Error, Ledger, Plan, Result};
use http::header::{self, HeaderValue};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateIntentRequest {
    plan: String,
    #[serde(default)]
    customer_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmRequest {
    payment_intent_id: String,
    customer_id: String,
    plan: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateRequest {
    license_key: String,
}

/// Demo payment and license HTTP server with in-memory state
pub struct LicenseServer {
    port: u16,
    ledger: Arc<Ledger>,
}

impl LicenseServer {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ledger: Arc::new(Ledger::new()),
        }
    }

    pub fn ledger(&self) -> Arc<Ledger> {
        Arc::clone(&self.ledger)
    }

    pub async fn bind(&self) -> Result<TcpListener> {
        let addr: SocketAddr = ([127, 0, 0, 1], self.port).into();
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("License server listening on http://{}", listener.local_addr()?);
        Ok(listener)
    }

    /// Serve connections from `listener` until `shutdown` resolves
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> Result<()> {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("License server shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let (stream, peer) = accepted?;
                    tracing::debug!("Connection from {}", peer);
                    let ledger = Arc::clone(&self.ledger);
                    tokio::spawn(async move {
                        let service = service_fn(move |req| {
                            let ledger = Arc::clone(&ledger);
                            async move { Ok::<_, Infallible>(handle(&ledger, req).await) }
                        });
                        if let Err(e) = http1::Builder::new()
                            .serve_connection(TokioIo::new(stream), service)
                            .await
                        {
                            tracing::debug!("Connection from {} ended with error: {}", peer, e);
                        }
                    });
                }
            }
        }
    }

    /// Bind and serve until Ctrl+C
    pub async fn run(self) -> Result<()> {
        let listener = self.bind().await?;
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            tracing::info!("Received Ctrl+C");
        };
        self.serve(listener, shutdown).await
    }
}

async fn handle(ledger: &Ledger, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return json_response(StatusCode::BAD_REQUEST, json!({ "error": e.to_string() }));
        }
    };

    let response = route(ledger, &method, &path, &body).await;
    tracing::info!("{} {} -> {}", method, path, response.status().as_u16());
    response
}

/// Dispatch one request. Every response carries permissive CORS headers.
pub async fn route(
    ledger: &Ledger,
    method: &Method,
    path: &str,
    body: &[u8],
) -> Response<Full<Bytes>> {
    if method == Method::OPTIONS {
        return with_cors(Response::new(Full::new(Bytes::new())), StatusCode::NO_CONTENT);
    }
    if method != Method::POST {
        return not_found();
    }

    let result = match path {
        "/api/create-payment-intent" => create_payment_intent(ledger, body).await,
        "/api/confirm-payment" => confirm_payment(ledger, body).await,
        "/api/validate-license" => validate_license(ledger, body).await,
        _ => return not_found(),
    };

    match result {
        Ok(value) => json_response(StatusCode::OK, value),
        Err(e) => {
            let status = match e {
                Error::UnknownPlan(_) | Error::PaymentNotCompleted | Error::Json(_) => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            json_response(status, json!({ "error": e.to_string() }))
        }
    }
}

fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(body)?)
}

async fn create_payment_intent(ledger: &Ledger, body: &[u8]) -> Result<Value> {
    let request: CreateIntentRequest = parse(body)?;
    let plan: Plan = request.plan.parse()?;
    let intent = ledger.create_intent(plan, request.customer_id).await;
    Ok(json!({
        "clientSecret": intent.client_secret,
        "paymentIntentId": intent.id,
    }))
}

async fn confirm_payment(ledger: &Ledger, body: &[u8]) -> Result<Value> {
    let request: ConfirmRequest = parse(body)?;
    let plan: Plan = request.plan.parse()?;
    let subscription = ledger
        .confirm(&request.payment_intent_id, &request.customer_id, plan)
        .await?;
    Ok(json!({
        "success": true,
        "licenseKey": subscription.license_key,
        "plan": subscription.plan,
    }))
}

async fn validate_license(ledger: &Ledger, body: &[u8]) -> Result<Value> {
    let request: ValidateRequest = parse(body)?;
    Ok(match ledger.validate(&request.license_key).await {
        Some(subscription) => json!({
            "valid": true,
            "plan": subscription.plan,
            "expiresAt": subscription.created_at,
        }),
        None => json!({ "valid": false }),
    })
}

fn not_found() -> Response<Full<Bytes>> {
    json_response(StatusCode::NOT_FOUND, json!({ "error": "Not found" }))
}

fn json_response(status: StatusCode, value: Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(value.to_string())));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    with_cors(response, status)
}

fn with_cors(mut response: Response<Full<Bytes>>, status: StatusCode) -> Response<Full<Bytes>> {
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn post(ledger: &Ledger, path: &str, body: Value) -> (StatusCode, Value) {
        let response = route(ledger, &Method::POST, path, body.to_string().as_bytes()).await;
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_purchase_flow() {
        let ledger = Ledger::new();
        let (status, intent) = post(
            &ledger,
            "/api/create-payment-intent",
            json!({"plan": "basic", "customerId": "cus_1"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let intent_id = intent["paymentIntentId"].as_str().unwrap().to_string();
        assert!(intent["clientSecret"].as_str().unwrap().contains("_secret_"));

        let (status, confirmed) = post(
            &ledger,
            "/api/confirm-payment",
            json!({"paymentIntentId": intent_id, "customerId": "cus_1", "plan": "basic"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(confirmed["success"], true);
        assert_eq!(confirmed["plan"], "basic");
        let key = confirmed["licenseKey"].as_str().unwrap();
        assert!(key.starts_with("TEAL_PREMIUM_"));

        let (_, valid) = post(&ledger, "/api/validate-license", json!({"licenseKey": key})).await;
        assert_eq!(valid["valid"], true);
        assert_eq!(valid["plan"], "basic");
        assert!(valid["expiresAt"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_license_is_invalid() {
        let (status, body) = post(
            &Ledger::new(),
            "/api/validate-license",
            json!({"licenseKey": "nope"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"valid": false}));
    }

    #[tokio::test]
    async fn test_bad_requests() {
        let ledger = Ledger::new();
        let (status, body) =
            post(&ledger, "/api/create-payment-intent", json!({"plan": "gold"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unknown plan: gold");

        let (status, body) = post(
            &ledger,
            "/api/confirm-payment",
            json!({"paymentIntentId": "pi_x", "customerId": "c", "plan": "pro"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Payment not completed");

        let response = route(&ledger, &Method::POST, "/api/validate-license", b"{not json").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_routing_and_cors() {
        let ledger = Ledger::new();
        let response = route(&ledger, &Method::POST, "/api/webhook", b"{}").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let response = route(&ledger, &Method::GET, "/api/validate-license", b"").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = route(&ledger, &Method::OPTIONS, "/api/confirm-payment", b"").await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, OPTIONS"
        );
    }
}
