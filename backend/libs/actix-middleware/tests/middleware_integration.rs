use actix_middleware::{get_correlation_id, CorrelationIdMiddleware, Logging};
use actix_web::{test, web, App, HttpRequest, HttpResponse};

async fn echo_id(req: HttpRequest) -> HttpResponse {
    HttpResponse::Ok().body(get_correlation_id(&req).unwrap_or_default())
}

#[actix_web::test]
async fn test_inbound_correlation_id_is_echoed() {
    let app = test::init_service(
        App::new()
            .wrap(Logging)
            .wrap(CorrelationIdMiddleware)
            .route("/echo", web::get().to(echo_id)),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/echo")
        .insert_header(("x-correlation-id", "req-123"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers().get("x-correlation-id").unwrap(),
        "req-123"
    );
    let body = test::read_body(resp).await;
    assert_eq!(body, "req-123");
}

#[actix_web::test]
async fn test_missing_correlation_id_is_generated() {
    let app = test::init_service(
        App::new()
            .wrap(CorrelationIdMiddleware)
            .route("/echo", web::get().to(echo_id)),
    )
    .await;

    let req = test::TestRequest::get().uri("/echo").to_request();
    let resp = test::call_service(&app, req).await;

    let header = resp
        .headers()
        .get("x-correlation-id")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(header.len(), 36);
    let body = test::read_body(resp).await;
    assert_eq!(body, header.as_bytes());
}

#[actix_web::test]
async fn test_logging_passes_errors_through() {
    let app = test::init_service(
        App::new()
            .wrap(Logging)
            .route("/fail", web::get().to(|| async { HttpResponse::InternalServerError().finish() })),
    )
    .await;

    let req = test::TestRequest::get().uri("/fail").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500);
}
