use axum::http::StatusCode;

use crate::{
    model::{CurrentUser, Todo, TodoList},
    schema::{CreateTodoListSchema, CreateTodoSchema, FieldErrors},
};

const STYLES: &str = r#"
    body {
        font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Arial, sans-serif;
        max-width: 800px;
        margin: 40px auto;
        padding: 0 20px;
        background: #f5f5f5;
    }
    .container {
        background: white;
        padding: 30px;
        border-radius: 8px;
        box-shadow: 0 2px 4px rgba(0,0,0,0.1);
    }
    nav { margin-bottom: 20px; }
    nav a { margin-right: 12px; }
    h1 { color: #333; border-bottom: 2px solid #0066cc; padding-bottom: 10px; }
    .form-group { margin: 15px 0; }
    label { display: block; font-weight: bold; margin-bottom: 5px; }
    input[type="text"], input[type="email"], input[type="password"], input[type="date"], textarea {
        width: 100%;
        padding: 10px;
        border: 1px solid #ddd;
        border-radius: 4px;
        box-sizing: border-box;
    }
    button { background: #0066cc; color: white; padding: 10px 20px; border: none; border-radius: 4px; }
    .flash { color: #31708f; background: #d9edf7; padding: 10px; border-radius: 4px; }
    .field-error { color: #d9534f; font-size: 13px; }
    .done { text-decoration: line-through; color: #999; }
    ul.items li { margin: 10px 0; }
"#;

fn layout(title: &str, user: Option<&CurrentUser>, flash: Option<&str>, body: &str) -> String {
    let nav = match user {
        Some(user) => format!(
            r#"<nav><span>{}</span> <a href="/get_all_list">My lists</a><a href="/new_list">New list</a><a href="/logout">Log out</a></nav>"#,
            html_escape(&user.email)
        ),
        None => r#"<nav><a href="/">Log in</a><a href="/register">Register</a></nav>"#.to_string(),
    };
    let flash = flash.map_or(String::new(), |message| {
        format!(r#"<div class="flash">{}</div>"#, html_escape(message))
    });
    let title = html_escape(title);

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Todo Lists - {title}</title>
    <style>{STYLES}</style>
</head>
<body>
    <div class="container">
        {nav}
        <h1>{title}</h1>
        {flash}
        {body}
    </div>
</body>
</html>"#
    )
}

fn field(
    errors: &FieldErrors,
    name: &'static str,
    label: &str,
    input_type: &str,
    value: &str,
) -> String {
    let error = errors.get(name).map_or(String::new(), |message| {
        format!(r#"<div class="field-error">{}</div>"#, html_escape(message))
    });
    format!(
        r#"<div class="form-group">
            <label for="{name}">{label}</label>
            <input type="{input_type}" id="{name}" name="{name}" value="{}">
            {error}
        </div>"#,
        html_escape(value)
    )
}

// Hidden token tying the submission to this browser's csrf cookie
fn csrf_field(errors: &FieldErrors, token: &str) -> String {
    let error = errors.get("csrf_token").map_or(String::new(), |message| {
        format!(r#"<div class="field-error">{}</div>"#, html_escape(message))
    });
    format!(
        r#"<input type="hidden" name="csrf_token" value="{}">{error}"#,
        html_escape(token)
    )
}

fn credentials_page(
    title: &str,
    action: &str,
    submit: &str,
    flash: Option<&str>,
    csrf_token: &str,
    email: &str,
    errors: &FieldErrors,
) -> String {
    let body = format!(
        r#"<form method="POST" action="{action}">
            {}
            {}
            {}
            <button type="submit">{submit}</button>
        </form>"#,
        csrf_field(errors, csrf_token),
        field(errors, "email", "Email", "email", email),
        field(errors, "password", "Password", "password", ""),
    );
    layout(title, None, flash, &body)
}

// The password is never echoed back
pub fn login_page(
    flash: Option<&str>,
    csrf_token: &str,
    email: &str,
    errors: &FieldErrors,
) -> String {
    credentials_page("Log In", "/", "Let Me In!", flash, csrf_token, email, errors)
}

pub fn register_page(
    flash: Option<&str>,
    csrf_token: &str,
    email: &str,
    errors: &FieldErrors,
) -> String {
    credentials_page("Register", "/register", "Sign Me Up!", flash, csrf_token, email, errors)
}

pub fn all_lists_page(user: &CurrentUser, lists: &[TodoList], flash: Option<&str>) -> String {
    let body = if lists.is_empty() {
        r#"<p>No lists yet. <a href="/new_list">Create one</a>.</p>"#.to_string()
    } else {
        let items: String = lists
            .iter()
            .map(|list| {
                format!(
                    r#"<li><a href="/list_todo/{id}"><strong>{}</strong></a> {} <small>{}</small>
                    <a href="/new_todo/{id}">add todo</a> <a href="/delete_list/{id}">delete</a></li>"#,
                    html_escape(&list.title),
                    html_escape(&list.subtitle),
                    html_escape(&list.date),
                    id = list.id,
                )
            })
            .collect();
        format!(r#"<ul class="items">{items}</ul>"#)
    };
    layout("My Todo Lists", Some(user), flash, &body)
}

pub fn new_list_page(
    user: &CurrentUser,
    csrf_token: &str,
    form: &CreateTodoListSchema,
    errors: &FieldErrors,
) -> String {
    let body = format!(
        r#"<form method="POST" action="/new_list">
            {}
            {}
            {}
            {}
            <button type="submit">Submit List</button>
        </form>"#,
        csrf_field(errors, csrf_token),
        field(errors, "title", "Todo list Title", "text", &form.title),
        field(errors, "subtitle", "Subtitle", "text", &form.subtitle),
        field(errors, "date", "Date", "date", &form.date),
    );
    layout("New Todo List", Some(user), None, &body)
}

pub fn new_todo_page(
    user: &CurrentUser,
    list: &TodoList,
    csrf_token: &str,
    form: &CreateTodoSchema,
    errors: &FieldErrors,
    notice: Option<&str>,
) -> String {
    let text_error = errors.get("text").map_or(String::new(), |message| {
        format!(r#"<div class="field-error">{}</div>"#, html_escape(message))
    });
    let checked = if form.is_done() { " checked" } else { "" };
    let body = format!(
        r#"<p><a href="/list_todo/{id}">Back to {list_title}</a></p>
        <form method="POST" action="/new_todo/{id}">
            {csrf}
            {name_field}
            <div class="form-group">
                <label><input type="checkbox" name="done" value="y"{checked}> Done</label>
            </div>
            <div class="form-group">
                <label for="text">Comment</label>
                <textarea id="text" name="text" rows="4">{text}</textarea>
                {text_error}
            </div>
            <button type="submit">Submit Todo</button>
        </form>"#,
        id = list.id,
        list_title = html_escape(&list.title),
        csrf = csrf_field(errors, csrf_token),
        name_field = field(errors, "todo_name", "Todo", "text", &form.todo_name),
        text = html_escape(&form.text),
    );
    layout(&format!("Add to {}", list.title), Some(user), notice, &body)
}

pub fn list_todo_page(user: &CurrentUser, list: &TodoList, todos: &[Todo]) -> String {
    let items: String = todos
        .iter()
        .map(|todo| {
            let class = if todo.done { "done" } else { "" };
            let toggle = if todo.done { "undo" } else { "done" };
            format!(
                r#"<li><span class="{class}"><strong>{}</strong> {}</span>
                <a href="/update_done/{id}">{toggle}</a> <a href="/delete_todo/{id}">delete</a></li>"#,
                html_escape(&todo.todo_name),
                html_escape(&todo.text),
                id = todo.id,
            )
        })
        .collect();
    let items = if todos.is_empty() {
        "<p>Nothing to do.</p>".to_string()
    } else {
        format!(r#"<ul class="items">{items}</ul>"#)
    };
    let body = format!(
        r#"<p>{} <small>{}</small></p>
        {items}
        <p><a href="/new_todo/{id}">Add a todo</a></p>"#,
        html_escape(&list.subtitle),
        html_escape(&list.date),
        id = list.id,
    );
    layout(&list.title, Some(user), None, &body)
}

pub fn error_page(status: StatusCode, user: Option<&CurrentUser>, message: &str) -> String {
    let title = status.canonical_reason().unwrap_or("Error");
    let body = format!(
        r#"<p>{}</p><p><a href="/get_all_list">Back to my lists</a></p>"#,
        html_escape(message)
    );
    layout(title, user, None, &body)
}

// Escape HTML special characters
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
