use axum::{
    http::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN},
    http::{HeaderName, Method, Request, Response},
    routing::get,
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    normalize_path::NormalizePathLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::api::{accounts, auth, dashboard, handlers, records, students, subjects};
use crate::core::{config::Settings, metrics as app_metrics, state::AppState};

pub(crate) fn router(state: AppState) -> Router {
    let cors = build_cors_layer(state.settings());
    let api_prefix = state.settings().api().prefix.clone();
    let api = Router::new()
        .nest("/auth", auth::router())
        .nest("/dashboard", dashboard::router())
        .nest("/students", students::router())
        .nest("/grades", records::grades_router())
        .nest("/attendance", records::attendance_router())
        .nest("/observed-values", records::observed_values_router())
        .nest("/subjects", subjects::router())
        .nest("/accounts", accounts::router());

    let request_id_header = HeaderName::from_static("x-request-id");
    let request_id_header_for_span = request_id_header.clone();
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(move |request: &Request<_>| {
            let request_id = request
                .headers()
                .get(&request_id_header_for_span)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id
            )
        })
        .on_response(|response: &Response<axum::body::Body>, latency: Duration, _span: &Span| {
            let status_label = response.status().as_u16().to_string();
            metrics::counter!(
                app_metrics::HTTP_REQUESTS_TOTAL,
                "status" => status_label.clone()
            )
            .increment(1);
            metrics::histogram!(
                app_metrics::HTTP_REQUEST_DURATION_SECONDS,
                "status" => status_label
            )
            .record(latency.as_secs_f64());
        });

    let mut router: Router<AppState> = Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz).head(handlers::healthz));

    router = if api_prefix.is_empty() { router.merge(api) } else { router.nest(&api_prefix, api) };

    router = router
        .layer(NormalizePathLayer::trim_trailing_slash())
        .layer(trace_layer)
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors);

    if state.settings().telemetry().prometheus_enabled {
        router = router.route("/metrics", get(handlers::metrics));
    }

    router.with_state(state)
}

fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins = settings
        .cors()
        .origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();

    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            ACCEPT,
            ORIGIN,
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([HeaderName::from_static("x-request-id")])
        .max_age(Duration::from_secs(3600));

    if origins.is_empty() {
        // Wildcard origin cannot be combined with allow_credentials
        base.allow_origin(Any)
    } else {
        base.allow_credentials(true)
            .allow_origin(AllowOrigin::list(origins))
    }
}
