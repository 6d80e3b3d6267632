use autooff_license::LicenseServer;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

async fn request(port: u16, method: &str, path: &str, body: &str) -> (u16, String, String) {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let raw = format!(
        "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(raw.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    let (head, body) = response.split_once("\r\n\r\n").unwrap();
    let status = head.split(' ').nth(1).unwrap().parse().unwrap();
    (status, head.to_ascii_lowercase(), body.to_string())
}

#[tokio::test]
async fn test_purchase_over_http() {
    let server = LicenseServer::new(0);
    let listener = server.bind().await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (stop, stopped) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve(listener, async move {
        let _ = stopped.await;
    }));

    let (status, head, body) = request(
        port,
        "POST",
        "/api/create-payment-intent",
        &json!({"plan": "pro", "customerId": "cus_42"}).to_string(),
    )
    .await;
    assert_eq!(status, 200);
    assert!(head.contains("access-control-allow-origin: *"));
    let intent: Value = serde_json::from_str(&body).unwrap();

    let (status, _, body) = request(
        port,
        "POST",
        "/api/confirm-payment",
        &json!({
            "paymentIntentId": intent["paymentIntentId"],
            "customerId": "cus_42",
            "plan": "pro"
        })
        .to_string(),
    )
    .await;
    assert_eq!(status, 200);
    let confirmed: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(confirmed["plan"], "pro");

    let (_, _, body) = request(
        port,
        "POST",
        "/api/validate-license",
        &json!({"licenseKey": confirmed["licenseKey"]}).to_string(),
    )
    .await;
    let validated: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(validated["valid"], true);

    let (status, _, _) = request(port, "OPTIONS", "/api/validate-license", "").await;
    assert_eq!(status, 204);

    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();
}
