use std::sync::Arc;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_cookies::CookieManagerLayer;

use crate::{
    handler::*,
    middleware::{mw_require_auth, mw_resolve_identity},
    AppState,
};

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let app = Router::new()
        .route("/get_all_list", get(get_all_list))
        .route("/new_list", get(new_list_page).post(new_list))
        .route("/new_todo/:list_id", get(new_todo_page).post(new_todo))
        .route("/list_todo/:list_id", get(list_todo).post(list_todo))
        .route(
            "/update_done/:todo_id",
            get(update_done).post(update_done).patch(update_done),
        )
        .route("/delete_todo/:todo_id", get(delete_todo).delete(delete_todo))
        .route("/delete_list/:list_id", get(delete_list).delete(delete_list))
        .route_layer(from_fn(mw_require_auth))
        .route("/", get(login_page).post(login))
        .route("/register", get(register_page).post(register))
        .route("/logout", get(logout))
        .route("/health", get(health_checker_handler))
        .layer(from_fn_with_state(app_state.clone(), mw_resolve_identity))
        .layer(CookieManagerLayer::new())
        .with_state(app_state);
    app
}
