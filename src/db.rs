use std::str::FromStr;

use sqlx::{
    query, query_as,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::{
    error::AppError,
    model::{Todo, TodoList, User},
    schema::{NewTodo, NewTodoList},
};

const SCHEMA: [&str; 4] = [
    r#"CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email VARCHAR(100) NOT NULL UNIQUE,
        password VARCHAR(100) NOT NULL
    );"#,
    r#"CREATE TABLE IF NOT EXISTS todo_list (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        author_id INTEGER NOT NULL REFERENCES users(id),
        title VARCHAR(250) NOT NULL UNIQUE,
        subtitle VARCHAR(250) NOT NULL,
        date VARCHAR(250) NOT NULL
    );"#,
    r#"CREATE TABLE IF NOT EXISTS todo (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        list_id INTEGER NOT NULL REFERENCES todo_list(id) ON DELETE CASCADE,
        author_id INTEGER NOT NULL REFERENCES users(id),
        todo_name VARCHAR(250) NOT NULL,
        done BOOLEAN NOT NULL DEFAULT 0,
        text TEXT NOT NULL
    );"#,
    r#"CREATE TABLE IF NOT EXISTS sessions (
        id TEXT PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        expires_at INTEGER NOT NULL
    );"#,
];

// Connections are never recycled so `sqlite::memory:` databases live as long as the pool
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
}

pub async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        query(statement).execute(pool).await?;
    }
    Ok(())
}

pub async fn find_user(pool: &SqlitePool, id: i64) -> Result<Option<User>, AppError> {
    let user = query_as::<_, User>("SELECT id, email, password FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, AppError> {
    let user = query_as::<_, User>("SELECT id, email, password FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn insert_user(
    pool: &SqlitePool,
    email: &str,
    password_hash: &str,
) -> Result<User, AppError> {
    let result = query_as::<_, User>(
        "INSERT INTO users (email, password) VALUES (?, ?) RETURNING id, email, password",
    )
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await;

    match result {
        Ok(user) => Ok(user),
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Err(AppError::DuplicateEmail),
        Err(err) => Err(err.into()),
    }
}

pub async fn lists_by_author(pool: &SqlitePool, author_id: i64) -> Result<Vec<TodoList>, AppError> {
    let lists = query_as::<_, TodoList>(
        "SELECT id, author_id, title, subtitle, date FROM todo_list WHERE author_id = ? ORDER BY id",
    )
    .bind(author_id)
    .fetch_all(pool)
    .await?;
    Ok(lists)
}

pub async fn find_list(pool: &SqlitePool, id: i64) -> Result<Option<TodoList>, AppError> {
    let list = query_as::<_, TodoList>(
        "SELECT id, author_id, title, subtitle, date FROM todo_list WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(list)
}

pub async fn insert_list(
    pool: &SqlitePool,
    author_id: i64,
    list: &NewTodoList,
) -> Result<TodoList, AppError> {
    let result = query_as::<_, TodoList>(
        "INSERT INTO todo_list (author_id, title, subtitle, date) VALUES (?, ?, ?, ?) \
         RETURNING id, author_id, title, subtitle, date",
    )
    .bind(author_id)
    .bind(&list.title)
    .bind(&list.subtitle)
    .bind(list.date.format("%Y-%m-%d").to_string())
    .fetch_one(pool)
    .await;

    match result {
        Ok(list) => Ok(list),
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            Err(AppError::DuplicateTitle(list.title.clone()))
        }
        Err(err) => Err(err.into()),
    }
}

// Returns false when no list with that id existed
pub async fn delete_list(pool: &SqlitePool, id: i64) -> Result<bool, AppError> {
    let mut tx = pool.begin().await?;

    query("DELETE FROM todo WHERE list_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let rows_affected = query("DELETE FROM todo_list WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    Ok(rows_affected > 0)
}

pub async fn todos_by_list(pool: &SqlitePool, list_id: i64) -> Result<Vec<Todo>, AppError> {
    let todos = query_as::<_, Todo>(
        "SELECT id, list_id, author_id, todo_name, done, text FROM todo WHERE list_id = ? ORDER BY id",
    )
    .bind(list_id)
    .fetch_all(pool)
    .await?;
    Ok(todos)
}

pub async fn find_todo(pool: &SqlitePool, id: i64) -> Result<Option<Todo>, AppError> {
    let todo = query_as::<_, Todo>(
        "SELECT id, list_id, author_id, todo_name, done, text FROM todo WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(todo)
}

pub async fn insert_todo(
    pool: &SqlitePool,
    list_id: i64,
    author_id: i64,
    todo: &NewTodo,
) -> Result<Todo, AppError> {
    let todo = query_as::<_, Todo>(
        "INSERT INTO todo (list_id, author_id, todo_name, done, text) VALUES (?, ?, ?, ?, ?) \
         RETURNING id, list_id, author_id, todo_name, done, text",
    )
    .bind(list_id)
    .bind(author_id)
    .bind(&todo.todo_name)
    .bind(todo.done)
    .bind(&todo.text)
    .fetch_one(pool)
    .await?;
    Ok(todo)
}

pub async fn toggle_done(pool: &SqlitePool, id: i64) -> Result<Option<Todo>, AppError> {
    let todo = query_as::<_, Todo>(
        "UPDATE todo SET done = NOT done WHERE id = ? \
         RETURNING id, list_id, author_id, todo_name, done, text",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(todo)
}

pub async fn delete_todo(pool: &SqlitePool, id: i64) -> Result<bool, AppError> {
    let rows_affected = query("DELETE FROM todo WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(rows_affected > 0)
}
