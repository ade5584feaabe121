use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::templates;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("You've already signed up with that email, log in instead!")]
    DuplicateEmail,

    #[error("That email does not exist, please try again or register.")]
    UnknownUser,

    #[error("Password incorrect, please try again.")]
    BadPassword,

    #[error("A todo list titled '{0}' already exists.")]
    DuplicateTitle(String),

    #[error("{entity} with ID: {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Please log in to access this page.")]
    Unauthenticated,

    #[error("cryptographic operation failed")]
    Crypto,

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Token(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DuplicateEmail | Self::UnknownUser | Self::BadPassword | Self::Unauthenticated => {
                StatusCode::SEE_OTHER
            }
            Self::DuplicateTitle(_) => StatusCode::CONFLICT,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Crypto | Self::Database(_) | Self::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Attached to rendered error pages so the identity layer can redraw them with the user's nav
#[derive(Debug, Clone)]
pub struct ErrorPage(pub String);

fn error_response(status: StatusCode, message: String) -> Response {
    let page = templates::error_page(status, None, &message);
    let mut response = (status, Html(page)).into_response();
    response.extensions_mut().insert(ErrorPage(message));
    response
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            // Auth failures carrying a flash message are handled where the cookie jar is available.
            Self::DuplicateEmail | Self::UnknownUser | Self::BadPassword | Self::Unauthenticated => {
                Redirect::to("/").into_response()
            }
            Self::NotFound { .. } | Self::DuplicateTitle(_) => error_response(status, self.to_string()),
            Self::Crypto | Self::Database(_) | Self::Token(_) => {
                tracing::error!("request failed: {self:?}");
                error_response(status, "Something went wrong, please try again later.".to_string())
            }
        }
    }
}
