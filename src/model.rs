// Registered account; `password` holds the salted hash, never the plaintext
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password: String,
}

// Data model representing a todo list
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct TodoList {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub subtitle: String,
    pub date: String,
}

// Data model representing a Todo item
#[derive(Debug, Clone, sqlx::FromRow, serde::Serialize)]
pub struct Todo {
    pub id: i64,
    pub list_id: i64,
    pub author_id: i64,
    pub todo_name: String,
    pub done: bool,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

// Resolved once per request from the session cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    User(CurrentUser),
}

impl Identity {
    pub fn current_user(&self) -> Option<&CurrentUser> {
        match self {
            Self::User(user) => Some(user),
            Self::Anonymous => None,
        }
    }
}
