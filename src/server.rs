//! Standalone actix-web server
//!
//! Every request goes through one catch-all service into the [`EdgeRouter`],
//! so path matching, CORS and preflight handling behave the same as on the
//! serverless deployment.

use crate::config::RelayConfig;
use crate::router::{CORS_HEADERS, EdgeRouter, RelayRequest, RelayResponse, client_identity};
use actix_web::http::StatusCode;
use actix_web::middleware::DefaultHeaders;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use tracing::Instrument;

const MAX_BODY_BYTES: usize = 1024 * 1024;

pub async fn dispatch(
    req: HttpRequest,
    body: web::Bytes,
    router: web::Data<EdgeRouter>,
) -> HttpResponse {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("request", id = %request_id);

    let client_id = client_identity(
        |name| {
            req.headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        },
        req.peer_addr().map(|addr| addr.ip().to_string()),
        router.trusts_proxy_headers(),
    );

    let request = RelayRequest {
        method: req.method().as_str().to_string(),
        path: req.path().to_string(),
        client_id,
        body: body.to_vec(),
    };

    let response = router.handle(request).instrument(span).await;
    into_http_response(response)
}

#[must_use]
pub fn into_http_response(response: RelayResponse) -> HttpResponse {
    let status = StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = HttpResponse::build(status);
    for (name, value) in response.headers {
        builder.insert_header((name, value));
    }
    builder.body(response.body)
}

/// CORS headers for responses actix produces before [`dispatch`] runs,
/// such as a 413 for an oversized body. Headers already set are kept.
#[must_use]
pub fn cors_defaults() -> DefaultHeaders {
    CORS_HEADERS
        .iter()
        .fold(DefaultHeaders::new(), |headers, header| headers.add(*header))
}

/// Runs the relay on `config.bind_address` until shutdown.
///
/// # Errors
///
/// Returns an error if the router cannot be built or the address cannot be bound.
pub async fn run(config: RelayConfig) -> std::io::Result<()> {
    let router = EdgeRouter::from_config(&config).map_err(|e| std::io::Error::other(e.to_string()))?;
    let router = web::Data::new(router);

    tracing::info!("Starting relay at http://{}", config.bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(router.clone())
            .app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
            .wrap(cors_defaults())
            .default_service(web::to(dispatch))
    })
    .bind(config.bind_address.as_str())?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchProvider;
    use actix_web::test;
    use std::sync::Arc;

    fn router() -> web::Data<EdgeRouter> {
        let config = RelayConfig::default();
        let search = Arc::new(SearchProvider::new(config.search.clone(), None));
        web::Data::new(EdgeRouter::new(&config, None, search, None))
    }

    #[actix_web::test]
    async fn test_health_through_actix() {
        let app = test::init_service(App::new().app_data(router()).default_service(web::to(dispatch))).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("access-control-allow-origin").unwrap(), "*");
        let body = test::read_body(resp).await;
        assert_eq!(body, web::Bytes::from_static(b"OK"));
    }

    #[actix_web::test]
    async fn test_preflight_through_actix() {
        let app = test::init_service(App::new().app_data(router()).default_service(web::to(dispatch))).await;

        let req = test::TestRequest::default()
            .method(actix_web::http::Method::OPTIONS)
            .uri("/api/chat")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("access-control-allow-methods").unwrap(),
            "GET, POST, OPTIONS"
        );
    }

    #[actix_web::test]
    async fn test_search_through_actix() {
        let app = test::init_service(App::new().app_data(router()).default_service(web::to(dispatch))).await;

        let req = test::TestRequest::post()
            .uri("/api/search")
            .insert_header(("Content-Type", "application/json"))
            .set_payload(r#"{"query":"SPF"}"#)
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert!(body["results"].is_string());
    }

    #[actix_web::test]
    async fn test_chat_without_key_through_actix() {
        let app = test::init_service(App::new().app_data(router()).default_service(web::to(dispatch))).await;

        let req = test::TestRequest::post()
            .uri("/api/chat")
            .set_payload(r#"{"messages":[{"role":"user","content":"hi"}]}"#)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.headers().get("access-control-allow-origin").unwrap(), "*");
    }

    #[actix_web::test]
    async fn test_oversized_body_rejected_with_cors() {
        let app = test::init_service(
            App::new()
                .app_data(router())
                .app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
                .wrap(cors_defaults())
                .default_service(web::to(dispatch)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/chat")
            .set_payload(vec![b'a'; MAX_BODY_BYTES + 1])
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(resp.headers().get("access-control-allow-origin").unwrap(), "*");
        assert_eq!(
            resp.headers().get("access-control-allow-methods").unwrap(),
            "GET, POST, OPTIONS"
        );
    }

    #[actix_web::test]
    async fn test_cors_defaults_do_not_duplicate_router_headers() {
        let app = test::init_service(
            App::new()
                .app_data(router())
                .wrap(cors_defaults())
                .default_service(web::to(dispatch)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get_all("access-control-allow-origin").count(), 1);
    }

    #[::core::prelude::v1::test]
    fn test_into_http_response_copies_headers() {
        let response = into_http_response(RelayResponse::text(404, "Not Found"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers().get("content-type").unwrap(), "text/plain");
    }
}
