use std::sync::Arc;

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use tower_cookies::Cookies;

use crate::{
    error::{AppError, ErrorPage},
    flash,
    model::Identity,
    session::{self, SESSION_COOKIE},
    templates, AppState,
};

// Resolve the session cookie into an `Identity` extension, once per request
pub async fn mw_resolve_identity<B>(
    State(data): State<Arc<AppState>>,
    cookies: Cookies,
    mut request: Request<B>,
    next: Next<B>,
) -> Response {
    let token = cookies.get(SESSION_COOKIE).map(|cookie| cookie.value().to_string());

    let identity = match token {
        Some(token) => match data.sessions.resolve(&data.db, &token).await {
            Ok(Some(user)) => Identity::User(user),
            Ok(None) => {
                tracing::debug!("dropping stale session cookie");
                session::clear_cookie(&cookies);
                Identity::Anonymous
            }
            Err(err) => return err.into_response(),
        },
        None => Identity::Anonymous,
    };

    let user = identity.current_user().cloned();
    request.extensions_mut().insert(identity);
    let response = next.run(request).await;

    // Error pages are rendered without an identity; redraw them with the user's nav
    let error_page = response.extensions().get::<ErrorPage>().cloned();
    match (user, error_page) {
        (Some(user), Some(ErrorPage(message))) => {
            let status = response.status();
            (status, Html(templates::error_page(status, Some(&user), &message))).into_response()
        }
        _ => response,
    }
}

// Guard for routes that need a logged-in user
pub async fn mw_require_auth<B>(
    cookies: Cookies,
    mut request: Request<B>,
    next: Next<B>,
) -> Response {
    let user = request
        .extensions()
        .get::<Identity>()
        .and_then(Identity::current_user)
        .cloned();

    let Some(user) = user else {
        flash::set(&cookies, &AppError::Unauthenticated.to_string());
        return AppError::Unauthenticated.into_response();
    };

    request.extensions_mut().insert(user);
    next.run(request).await
}
