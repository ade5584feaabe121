use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form, Json,
};
use serde_json::json;
use tower_cookies::Cookies;

use crate::{
    auth, db,
    error::AppError,
    flash,
    model::{CurrentUser, Identity, Todo, TodoList},
    schema::{
        CreateTodoListSchema, CreateTodoSchema, FieldErrors, LoginSchema, RegisterSchema, Validate,
    },
    session::{self, SESSION_COOKIE},
    templates, AppState,
};

// Handler for the health checker route
pub async fn health_checker_handler() -> impl IntoResponse {
    const MESSAGE: &str = "Todo lists with Rust, SQLX, SQLite, and Axum";

    let json_response = json!({
        "status": "success",
        "message": MESSAGE
    });

    Json(json_response)
}

fn invalid_form(html: String) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response()
}

fn flash_redirect(cookies: &Cookies, err: &AppError, to: &str) -> Response {
    flash::set(cookies, &err.to_string());
    Redirect::to(to).into_response()
}

// Replaces whatever session the browser already had
async fn start_session(data: &AppState, cookies: &Cookies, user_id: i64) -> Result<(), AppError> {
    if let Some(previous) = cookies.get(SESSION_COOKIE) {
        data.sessions.teardown(&data.db, previous.value()).await?;
    }
    let token = data.sessions.establish(&data.db, user_id).await?;
    session::set_cookie(cookies, token);
    Ok(())
}

// Lists belonging to someone else are reported as missing
async fn owned_list(data: &AppState, list_id: i64, user: &CurrentUser) -> Result<TodoList, AppError> {
    match db::find_list(&data.db, list_id).await? {
        Some(list) if list.author_id == user.id => Ok(list),
        _ => Err(AppError::not_found("TodoList", list_id)),
    }
}

async fn owned_todo(
    data: &AppState,
    todo_id: i64,
    user: &CurrentUser,
) -> Result<(Todo, TodoList), AppError> {
    let todo = db::find_todo(&data.db, todo_id)
        .await?
        .ok_or_else(|| AppError::not_found("Todo", todo_id))?;

    match db::find_list(&data.db, todo.list_id).await? {
        Some(list) if list.author_id == user.id => Ok((todo, list)),
        _ => Err(AppError::not_found("Todo", todo_id)),
    }
}

async fn render_list(data: &AppState, user: &CurrentUser, list: &TodoList) -> Result<Response, AppError> {
    let todos = db::todos_by_list(&data.db, list.id).await?;
    Ok(Html(templates::list_todo_page(user, list, &todos)).into_response())
}

async fn render_overview(
    data: &AppState,
    user: &CurrentUser,
    flash: Option<&str>,
) -> Result<Response, AppError> {
    let lists = db::lists_by_author(&data.db, user.id).await?;
    Ok(Html(templates::all_lists_page(user, &lists, flash)).into_response())
}

pub async fn login_page(
    State(data): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    cookies: Cookies,
) -> Result<Response, AppError> {
    if identity.current_user().is_some() {
        return Ok(Redirect::to("/get_all_list").into_response());
    }
    let flash = flash::take(&cookies);
    let csrf_token = data.csrf.issue(&cookies)?;
    let page = templates::login_page(flash.as_deref(), &csrf_token, "", &FieldErrors::new());
    Ok(Html(page).into_response())
}

pub async fn login(
    State(data): State<Arc<AppState>>,
    cookies: Cookies,
    Form(body): Form<LoginSchema>,
) -> Result<Response, AppError> {
    let credentials = match body.validate(&data.csrf.guard(&cookies)) {
        Ok(credentials) => credentials,
        Err(errors) => {
            let csrf_token = data.csrf.issue(&cookies)?;
            let page = templates::login_page(None, &csrf_token, &body.email, &errors);
            return Ok(invalid_form(page));
        }
    };

    match auth::login(&data.db, &data.hasher, &credentials).await {
        Ok(user) => {
            start_session(&data, &cookies, user.id).await?;
            tracing::info!(user_id = user.id, "user logged in");
            Ok(Redirect::to("/get_all_list").into_response())
        }
        Err(err @ (AppError::UnknownUser | AppError::BadPassword)) => {
            Ok(flash_redirect(&cookies, &err, "/"))
        }
        Err(err) => Err(err),
    }
}

pub async fn register_page(
    State(data): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    cookies: Cookies,
) -> Result<Response, AppError> {
    if identity.current_user().is_some() {
        return Ok(Redirect::to("/get_all_list").into_response());
    }
    let flash = flash::take(&cookies);
    let csrf_token = data.csrf.issue(&cookies)?;
    let page = templates::register_page(flash.as_deref(), &csrf_token, "", &FieldErrors::new());
    Ok(Html(page).into_response())
}

pub async fn register(
    State(data): State<Arc<AppState>>,
    cookies: Cookies,
    Form(body): Form<RegisterSchema>,
) -> Result<Response, AppError> {
    let credentials = match body.validate(&data.csrf.guard(&cookies)) {
        Ok(credentials) => credentials,
        Err(errors) => {
            let csrf_token = data.csrf.issue(&cookies)?;
            let page = templates::register_page(None, &csrf_token, &body.email, &errors);
            return Ok(invalid_form(page));
        }
    };

    match auth::register(&data.db, &data.hasher, &credentials).await {
        Ok(user) => {
            start_session(&data, &cookies, user.id).await?;
            Ok(Redirect::to("/get_all_list").into_response())
        }
        Err(err @ AppError::DuplicateEmail) => Ok(flash_redirect(&cookies, &err, "/")),
        Err(err) => Err(err),
    }
}

pub async fn get_all_list(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    cookies: Cookies,
) -> Result<Response, AppError> {
    let flash = flash::take(&cookies);
    render_overview(&data, &user, flash.as_deref()).await
}

pub async fn new_list_page(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    cookies: Cookies,
) -> Result<Html<String>, AppError> {
    let csrf_token = data.csrf.issue(&cookies)?;
    Ok(Html(templates::new_list_page(
        &user,
        &csrf_token,
        &CreateTodoListSchema::default(),
        &FieldErrors::new(),
    )))
}

pub async fn new_list(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    cookies: Cookies,
    Form(body): Form<CreateTodoListSchema>,
) -> Result<Response, AppError> {
    let new_list = match body.validate(&data.csrf.guard(&cookies)) {
        Ok(new_list) => new_list,
        Err(errors) => {
            let csrf_token = data.csrf.issue(&cookies)?;
            let page = templates::new_list_page(&user, &csrf_token, &body, &errors);
            return Ok(invalid_form(page));
        }
    };

    match db::insert_list(&data.db, user.id, &new_list).await {
        Ok(list) => {
            tracing::info!(list_id = list.id, user_id = user.id, "created todo list");
            Ok(Redirect::to("/get_all_list").into_response())
        }
        Err(err @ AppError::DuplicateTitle(_)) => {
            let errors = FieldErrors::from([("title", err.to_string())]);
            let csrf_token = data.csrf.issue(&cookies)?;
            Ok((
                err.status_code(),
                Html(templates::new_list_page(&user, &csrf_token, &body, &errors)),
            )
                .into_response())
        }
        Err(err) => Err(err),
    }
}

pub async fn new_todo_page(
    Path(list_id): Path<i64>,
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    cookies: Cookies,
) -> Result<Response, AppError> {
    let list = owned_list(&data, list_id, &user).await?;
    let csrf_token = data.csrf.issue(&cookies)?;
    Ok(Html(templates::new_todo_page(
        &user,
        &list,
        &csrf_token,
        &CreateTodoSchema::default(),
        &FieldErrors::new(),
        None,
    ))
    .into_response())
}

pub async fn new_todo(
    Path(list_id): Path<i64>,
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    cookies: Cookies,
    Form(body): Form<CreateTodoSchema>,
) -> Result<Response, AppError> {
    let list = owned_list(&data, list_id, &user).await?;
    let validated = body.validate(&data.csrf.guard(&cookies));
    let csrf_token = data.csrf.issue(&cookies)?;

    let new_todo = match validated {
        Ok(new_todo) => new_todo,
        Err(errors) => {
            return Ok(invalid_form(templates::new_todo_page(
                &user,
                &list,
                &csrf_token,
                &body,
                &errors,
                None,
            )))
        }
    };

    let todo = db::insert_todo(&data.db, list.id, user.id, &new_todo).await?;
    tracing::info!(todo_id = todo.id, list_id = list.id, "added todo");

    // Fresh form so the next todo can be typed straight away
    let notice = format!("Added '{}'.", todo.todo_name);
    Ok(Html(templates::new_todo_page(
        &user,
        &list,
        &csrf_token,
        &CreateTodoSchema::default(),
        &FieldErrors::new(),
        Some(&notice),
    ))
    .into_response())
}

pub async fn list_todo(
    Path(list_id): Path<i64>,
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, AppError> {
    let list = owned_list(&data, list_id, &user).await?;
    render_list(&data, &user, &list).await
}

pub async fn update_done(
    Path(todo_id): Path<i64>,
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, AppError> {
    let (_, list) = owned_todo(&data, todo_id, &user).await?;

    let todo = db::toggle_done(&data.db, todo_id)
        .await?
        .ok_or_else(|| AppError::not_found("Todo", todo_id))?;
    tracing::debug!(todo_id, done = todo.done, "toggled todo");

    render_list(&data, &user, &list).await
}

pub async fn delete_todo(
    Path(todo_id): Path<i64>,
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, AppError> {
    let (_, list) = owned_todo(&data, todo_id, &user).await?;

    if !db::delete_todo(&data.db, todo_id).await? {
        return Err(AppError::not_found("Todo", todo_id));
    }
    tracing::info!(todo_id, list_id = list.id, "deleted todo");

    render_list(&data, &user, &list).await
}

pub async fn delete_list(
    Path(list_id): Path<i64>,
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response, AppError> {
    let list = owned_list(&data, list_id, &user).await?;

    if !db::delete_list(&data.db, list.id).await? {
        return Err(AppError::not_found("TodoList", list_id));
    }
    tracing::info!(list_id, user_id = user.id, "deleted todo list");

    let notice = format!("Deleted '{}'.", list.title);
    render_overview(&data, &user, Some(&notice)).await
}

pub async fn logout(State(data): State<Arc<AppState>>, cookies: Cookies) -> Redirect {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        if let Err(err) = data.sessions.teardown(&data.db, cookie.value()).await {
            tracing::warn!("failed to remove session record: {err}");
        }
    }
    session::clear_cookie(&cookies);
    Redirect::to("/")
}
