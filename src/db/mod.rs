use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, sync::Arc};
use thiserror::Error;

pub mod inmem;

pub use inmem::InMemory;

#[derive(Error, Debug)]
pub enum UserStoreError {
    #[error("user not found, id: {id}")]
    NotFound { id: i64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUser {
    pub name: String,
}

#[async_trait]
pub trait UserStorer: Sync + Debug {
    async fn get_user(&self, id: i64) -> Result<User, UserStoreError>;
    async fn get_users(&self) -> Result<Vec<User>, UserStoreError>;
    async fn create_user(&self, create: CreateUser) -> Result<User, UserStoreError>;
    async fn update_user(&self, id: i64, update: UpdateUser) -> Result<User, UserStoreError>;
    async fn delete_user(&self, id: i64) -> Result<(), UserStoreError>;
}

pub type DynUserStorer = Arc<dyn UserStorer + Send + Sync>;
