//! HTTP application wiring: the router and the shared state injected into
//! handlers. Route composition lives here so `main` stays small and tests
//! can build the full application against a scratch store.
use axum::Router;
use axum::routing::{delete, get, post, put};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::repo::Repository;

#[derive(Clone)]
pub struct AppState {
    pub repo: Repository,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            )
        });

    Router::new()
        .route("/engines/acp/ory", delete(api::data::drop_everything))
        .route(
            "/engines/acp/ory/:flavor/allowed",
            post(api::allowed::allowed),
        )
        .route(
            "/engines/acp/ory/:flavor/policies",
            get(api::policies::list_policies).put(api::policies::upsert_policy),
        )
        .route(
            "/engines/acp/ory/:flavor/policies/batch",
            put(api::policies::upsert_policies),
        )
        .route(
            "/engines/acp/ory/:flavor/policies/:id",
            get(api::policies::get_policy).delete(api::policies::delete_policy),
        )
        .route(
            "/engines/acp/ory/:flavor/roles",
            get(api::roles::list_roles).put(api::roles::upsert_role),
        )
        .route(
            "/engines/acp/ory/:flavor/roles/:id",
            get(api::roles::get_role).delete(api::roles::delete_role),
        )
        .route(
            "/engines/acp/ory/:flavor/roles/:id/members",
            put(api::roles::add_members),
        )
        .route(
            "/engines/acp/ory/:flavor/roles/:id/members/:member",
            delete(api::roles::remove_member),
        )
        .route(
            "/engines/acp/ory/:flavor/reindex",
            post(api::data::reindex),
        )
        .route("/health/alive", get(api::system::alive))
        .route("/health/ready", get(api::system::ready))
        .route("/version", get(api::system::version))
        .layer(trace_layer)
        .with_state(state)
}
