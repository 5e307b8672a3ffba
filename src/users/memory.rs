//! In-process `UserRepository` used by the handler tests.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    repo::{RepoError, UserRepository},
    repo_types::{NewUser, ProfileStats, User, UserChanges},
};

fn apply(changes: UserChanges, user: &mut User) {
    if let Some(name) = changes.name {
        user.name = name;
    }
    if let Some(email) = changes.email {
        user.email = email;
    }
    if let Some(password) = changes.password {
        user.password = Some(password);
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<Uuid, User>>,
    counts: Mutex<HashMap<Uuid, (i64, i64, i64)>>,
}

impl InMemoryUserRepository {
    /// Inserts a row as-is, bypassing the unique check.
    pub fn seed(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn set_counts(&self, id: Uuid, blogs: i64, likes: i64, comments: i64) {
        self.counts.lock().unwrap().insert(id, (blogs, likes, comments));
    }

    pub fn get(&self, email: &str) -> Option<User> {
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        Ok(self.get(email))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn profile_with_counts(&self, email: &str) -> Result<Option<ProfileStats>, RepoError> {
        let Some(user) = self.get(email) else {
            return Ok(None);
        };
        let (blog_count, like_count, comment_count) = self
            .counts
            .lock()
            .unwrap()
            .get(&user.id)
            .copied()
            .unwrap_or_default();
        Ok(Some(ProfileStats {
            user,
            blog_count,
            like_count,
            comment_count,
        }))
    }

    async fn insert(&self, new: NewUser) -> Result<User, RepoError> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == new.email) {
            return Err(RepoError::Conflict);
        }
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password: Some(new.password_hash),
            role: new.role,
            image: None,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, RepoError> {
        let mut users = self.users.lock().unwrap();
        if let Some(email) = &changes.email {
            if users.values().any(|u| u.id != id && &u.email == email) {
                return Err(RepoError::Conflict);
            }
        }
        let user = users.get_mut(&id).ok_or(RepoError::NotFound)?;
        apply(changes, user);
        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo_types::Role;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "A".into(),
            email: email.into(),
            password_hash: "$argon2id$old".into(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn update_only_touches_supplied_fields() {
        let repo = InMemoryUserRepository::default();
        let user = repo.insert(new_user("a@x.com")).await.unwrap();
        let updated = repo
            .update(
                user.id,
                UserChanges {
                    name: Some("B".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "B");
        assert_eq!(updated.email, "a@x.com");
        assert_eq!(updated.password.as_deref(), Some("$argon2id$old"));
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let repo = InMemoryUserRepository::default();
        let err = repo
            .update(
                Uuid::new_v4(),
                UserChanges {
                    name: Some("B".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let repo = InMemoryUserRepository::default();
        repo.insert(new_user("a@x.com")).await.unwrap();
        let b = repo.insert(new_user("b@x.com")).await.unwrap();
        assert!(matches!(
            repo.insert(new_user("a@x.com")).await,
            Err(RepoError::Conflict)
        ));
        let err = repo
            .update(
                b.id,
                UserChanges {
                    email: Some("a@x.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Conflict));
    }
}
