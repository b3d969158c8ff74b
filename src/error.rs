use thiserror::Error;

use crate::db;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("user store error: {0}")]
    UserStore(#[from] db::UserStoreError),
    #[error("invalid user: {0}")]
    InvalidUser(String),
}
