use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub webhook_secret: String,
    pub progress_webhook_url: String,
    pub face_api_url: Option<String>,
    pub face_match_threshold: f64,
    pub student_rps: u32,
    pub staff_rps: u32,
    pub uploads_dir: String,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            webhook_secret: get_env("WEBHOOK_SECRET")?,
            progress_webhook_url: get_env("PROGRESS_WEBHOOK_URL")?,
            face_api_url: env::var("FACE_API_URL").ok(),
            face_match_threshold: get_env_parse("FACE_MATCH_THRESHOLD")?,
            student_rps: get_env_parse("STUDENT_RPS")?,
            staff_rps: get_env_parse("STAFF_RPS")?,
            uploads_dir: get_env_or("UPLOADS_DIR", "./uploads"),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(name)?;
    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_settings_fall_back_to_their_defaults() {
        assert_eq!(get_env_or("ELEARNING_TEST_UNSET", "./uploads"), "./uploads");

        std::env::set_var("ELEARNING_TEST_SET", "/srv/uploads");
        assert_eq!(get_env_or("ELEARNING_TEST_SET", "./uploads"), "/srv/uploads");
        std::env::remove_var("ELEARNING_TEST_SET");
    }
}
