pub mod appresult;
pub mod auth;
pub mod config;
pub mod db;
pub mod hub;
pub mod media;
pub mod profiles;
pub mod protocol;
pub mod rooms;

use axum::extract::FromRef;
use serde_json::Value;
use sqlx::SqlitePool;

pub use appresult::{AppError, AppResult};
pub use rooms::Relay;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub relay: Relay,
}

pub trait GetField {
    fn get_str_field(&self, field: &str) -> anyhow::Result<String>;
    fn get_obj_field(&self, field: &str) -> anyhow::Result<&Value>;
}

impl GetField for serde_json::Value {
    fn get_str_field(&self, field: &str) -> anyhow::Result<String> {
        Ok(
            self.get(field)
            .ok_or_else(|| anyhow::anyhow!("expected {field} in {self}"))?
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("expected {field} in {self} to be string"))?
            .to_owned()
        )
    }

    fn get_obj_field(&self, field: &str) -> anyhow::Result<&Value> {
        self.get(field)
        .ok_or_else(|| anyhow::anyhow!("expected {field} in {self}"))
    }
}
