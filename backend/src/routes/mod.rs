//! Route definitions for the Gelatin Production Management Platform

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - batch registry
        .nest("/batches", batch_routes(state.clone()))
        // Protected routes - blends and sheets
        .nest("/blends", blend_routes(state.clone()))
        // Protected routes - fiscal year bookkeeping
        .nest("/fiscal-years", fiscal_year_routes(state.clone()))
        // Protected routes - lab report import
        .nest("/imports", import_routes(state))
}

/// Batch registry routes (protected)
fn batch_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_batches).post(handlers::create_batch))
        .route("/available", get(handlers::list_available_batches))
        .route("/gaps", get(handlers::get_gap_report))
        .route("/export", get(handlers::export_batches_csv))
        .route(
            "/:batch_id",
            get(handlers::get_batch)
                .put(handlers::update_batch)
                .delete(handlers::delete_batch),
        )
        .route("/:batch_id/mark-used", post(handlers::mark_batch_used))
        .route(
            "/:batch_id/mark-available",
            post(handlers::mark_batch_available),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Blend routes (protected)
fn blend_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_blends).post(handlers::create_blend))
        .route("/preview", post(handlers::preview_blend))
        .route("/suggest", post(handlers::suggest_blend))
        .route("/export", get(handlers::export_blends_csv))
        .route(
            "/:blend_id",
            get(handlers::get_blend).delete(handlers::delete_blend),
        )
        .route("/:blend_id/sheet", get(handlers::get_blend_sheet_text))
        .route("/:blend_id/sheet.csv", get(handlers::get_blend_sheet_csv))
        .route("/:blend_id/sheet.pdf", get(handlers::get_blend_sheet_pdf))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Fiscal year routes (protected)
fn fiscal_year_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/current", get(handlers::get_current_fiscal_year))
        .route("/archive", post(handlers::archive_fiscal_year))
        .route("/:fiscal_year/counters", get(handlers::list_counters))
        .route("/:fiscal_year/archives", get(handlers::list_archives))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Lab report import routes (protected)
fn import_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/report", post(handlers::import_report))
        .route("/rows", post(handlers::import_rows))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
