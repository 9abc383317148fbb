use axum::{http::Method, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod accommodations;
pub mod error;
pub mod finance;
pub mod hotels;
pub mod listing;
pub mod middleware;
pub mod records;
pub mod sales;
pub mod session;
pub mod state;
pub mod transfers;
pub mod users;

pub use state::AppState;

/// Every route sits behind the session middleware under `/v1`.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let v1 = Router::new()
        .merge(session::routes())
        .merge(hotels::routes())
        .merge(transfers::routes())
        .merge(accommodations::routes())
        .merge(sales::routes())
        .merge(finance::routes())
        .merge(users::routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::session_middleware,
        ));

    Router::new()
        .nest("/v1", v1)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
