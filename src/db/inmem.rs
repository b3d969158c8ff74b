use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;
use tracing::debug;

use crate::db::{self, CreateUser, UpdateUser, User};
use crate::metrics;

#[derive(Debug)]
pub struct InMemory {
    metrics: metrics::Metrics,
    users: RwLock<HashMap<i64, User>>,
    next_id: AtomicI64,
}

impl InMemory {
    pub fn new(metrics: metrics::Metrics) -> Self {
        debug!("creating new in-memory user store");
        InMemory {
            metrics,
            users: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl db::UserStorer for InMemory {
    async fn get_user(&self, id: i64) -> Result<User, db::UserStoreError> {
        debug!(id = id, "getting user");
        match self.users.read().expect("lock not poisoned").get(&id) {
            Some(user) => Ok(user.clone()),
            None => Err(db::UserStoreError::NotFound { id }),
        }
    }

    async fn get_users(&self) -> Result<Vec<User>, db::UserStoreError> {
        debug!("getting users");
        let users = self
            .users
            .read()
            .expect("lock not poisoned")
            .values()
            .cloned()
            .collect();
        Ok(users)
    }

    async fn create_user(&self, create: CreateUser) -> Result<User, db::UserStoreError> {
        let now = Utc::now();
        let user = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            name: create.name,
            created_at: now,
            updated_at: now,
        };
        debug!(id = user.id, name = user.name, "creating user");
        self.users
            .write()
            .expect("lock not poisoned")
            .insert(user.id, user.clone());
        self.metrics.users_current.inc();
        Ok(user)
    }

    async fn update_user(&self, id: i64, update: UpdateUser) -> Result<User, db::UserStoreError> {
        debug!(id = id, name = update.name, "updating user");
        let mut users = self.users.write().expect("lock not poisoned");
        match users.get_mut(&id) {
            Some(user) => {
                user.name = update.name;
                user.updated_at = Utc::now();
                Ok(user.clone())
            }
            None => Err(db::UserStoreError::NotFound { id }),
        }
    }

    async fn delete_user(&self, id: i64) -> Result<(), db::UserStoreError> {
        debug!(id = id, "deleting user");
        let removed = self.users.write().expect("lock not poisoned").remove(&id);
        match removed {
            Some(_) => {
                self.metrics.users_current.dec();
                Ok(())
            }
            None => Err(db::UserStoreError::NotFound { id }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::UserStorer;

    fn store() -> InMemory {
        InMemory::new(metrics::Metrics::new())
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids() {
        let store = store();
        let a = store
            .create_user(CreateUser {
                name: "alice".to_string(),
            })
            .await
            .unwrap();
        let b = store
            .create_user(CreateUser {
                name: "bob".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(store.metrics.users_current.get(), 2);
    }

    #[tokio::test]
    async fn get_missing_user_is_not_found() {
        let store = store();
        let err = store.get_user(42).await.unwrap_err();
        assert!(matches!(err, db::UserStoreError::NotFound { id: 42 }));
    }

    #[tokio::test]
    async fn update_bumps_updated_at() {
        let store = store();
        let user = store
            .create_user(CreateUser {
                name: "carol".to_string(),
            })
            .await
            .unwrap();

        let updated = store
            .update_user(
                user.id,
                UpdateUser {
                    name: "caroline".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "caroline");
        assert!(updated.updated_at >= user.updated_at);
        assert_eq!(updated.created_at, user.created_at);
    }

    #[tokio::test]
    async fn delete_missing_user_is_not_found() {
        let store = store();
        let err = store.delete_user(7).await.unwrap_err();
        assert!(matches!(err, db::UserStoreError::NotFound { id: 7 }));

        store
            .create_user(CreateUser {
                name: "dave".to_string(),
            })
            .await
            .unwrap();
        store.delete_user(1).await.unwrap();
        assert_eq!(store.metrics.users_current.get(), 0);
        assert!(store.get_users().await.unwrap().is_empty());
    }
}
