//! User and category lookups.
//!
//! Full user/category management lives in other services; this crate only
//! needs to know that a referenced user or category exists. The in-memory
//! directory can be seeded through the admin endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::{EventError, EventResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewUser {
    #[validate(length(min = 2, max = 250))]
    pub name: String,
    #[validate(email, length(min = 6, max = 254))]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewCategory {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Directory: Send + Sync {
    async fn get_user(&self, id: Uuid) -> EventResult<Option<User>>;

    async fn get_category(&self, id: Uuid) -> EventResult<Option<Category>>;

    /// Fails with `AlreadyExists` when the email is taken.
    async fn register_user(&self, input: NewUser) -> EventResult<User>;

    /// Fails with `AlreadyExists` when the name is taken.
    async fn register_category(&self, input: NewCategory) -> EventResult<Category>;
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryDirectory {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    categories: Arc<RwLock<HashMap<Uuid, Category>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn get_user(&self, id: Uuid) -> EventResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn get_category(&self, id: Uuid) -> EventResult<Option<Category>> {
        Ok(self.categories.read().await.get(&id).cloned())
    }

    async fn register_user(&self, input: NewUser) -> EventResult<User> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&input.email))
        {
            return Err(EventError::AlreadyExists(format!("User with email '{}'", input.email)));
        }

        let user = User {
            id: Uuid::now_v7(),
            name: input.name,
            email: input.email,
        };
        users.insert(user.id, user.clone());

        tracing::info!(user_id = %user.id, "Registered user");
        Ok(user)
    }

    async fn register_category(&self, input: NewCategory) -> EventResult<Category> {
        let mut categories = self.categories.write().await;
        if categories.values().any(|c| c.name == input.name) {
            return Err(EventError::AlreadyExists(format!("Category '{}'", input.name)));
        }

        let category = Category {
            id: Uuid::now_v7(),
            name: input.name,
        };
        categories.insert(category.id, category.clone());

        tracing::info!(category_id = %category.id, "Registered category");
        Ok(category)
    }
}
