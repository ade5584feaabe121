use std::{env, net::IpAddr, str::FromStr};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    Missing(&'static str),

    #[error("environment variable {name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

// Runtime settings, read from the environment (and `.env` via dotenv in main)
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub secret_key: String,
    pub cors_origin: String,
    pub session_ttl_hours: u64,
    pub password_iterations: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret_key = env::var("SECRET_KEY").map_err(|_| ConfigError::Missing("SECRET_KEY"))?;
        if secret_key.is_empty() {
            return Err(ConfigError::Missing("SECRET_KEY"));
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://todo.db".to_string()),
            host: parse_var("HOST", IpAddr::from([127, 0, 0, 1]))?,
            port: parse_var("PORT", 3000)?,
            secret_key,
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            session_ttl_hours: parse_var("SESSION_TTL_HOURS", 24)?,
            password_iterations: parse_var("PASSWORD_ITERATIONS", 260_000)?,
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_var_falls_back_to_default() {
        let port: u16 = parse_var("TODO_LISTS_TEST_UNSET_PORT", 8080).unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn parse_var_rejects_garbage() {
        env::set_var("TODO_LISTS_TEST_BAD_PORT", "not-a-port");
        let result: Result<u16, _> = parse_var("TODO_LISTS_TEST_BAD_PORT", 3000);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { name: "TODO_LISTS_TEST_BAD_PORT", .. })
        ));
    }
}
