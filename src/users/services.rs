use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

use super::{
    dto::{LoginRequest, RegisterRequest, UpdateProfileRequest},
    repo::{RepoError, UserRepository},
    repo_types::{NewUser, Role, User, UserChanges},
};
use crate::{auth::password::CredentialHasher, error::AppError};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Empty strings count as absent.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn checked_email(raw: &str) -> Result<String, AppError> {
    let email = normalize_email(raw);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::bad_request("Invalid email"));
    }
    Ok(email)
}

pub async fn register(
    users: &dyn UserRepository,
    hasher: &CredentialHasher,
    req: RegisterRequest,
) -> Result<User, AppError> {
    let (Some(name), Some(email), Some(password)) =
        (present(req.name), present(req.email), present(req.password))
    else {
        return Err(AppError::bad_request("Missing required fields"));
    };
    let email = checked_email(&email)?;

    // Fast path for a clear message; the unique index decides races.
    if users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::bad_request("User with this email already exists"));
    }

    let password_hash = hasher.hash(password).await?;

    let new = NewUser {
        name: name.trim().to_string(),
        email,
        password_hash,
        role: Role::default(),
    };
    match users.insert(new).await {
        Ok(user) => {
            info!(user_id = %user.id, email = %user.email, "user registered");
            Ok(user)
        }
        Err(RepoError::Conflict) => {
            warn!("registration lost unique-email race");
            Err(AppError::bad_request("User with this email already exists"))
        }
        Err(e) => Err(e.into()),
    }
}

/// Loads the caller's profile. Aggregate counts are read and then dropped;
/// the response shape carries identity fields only.
pub async fn load_profile(users: &dyn UserRepository, email: &str) -> Result<User, AppError> {
    let stats = users
        .profile_with_counts(email)
        .await?
        .ok_or(AppError::NotFound("User not found"))?;
    debug!(
        user_id = %stats.user.id,
        blog_count = stats.blog_count,
        like_count = stats.like_count,
        comment_count = stats.comment_count,
        "profile loaded"
    );
    Ok(stats.user)
}

pub async fn update_profile(
    users: &dyn UserRepository,
    hasher: &CredentialHasher,
    session_email: &str,
    req: UpdateProfileRequest,
) -> Result<User, AppError> {
    let user = users
        .find_by_email(session_email)
        .await?
        .ok_or(AppError::NotFound("User not found"))?;
    let Some(stored_hash) = user.password.clone() else {
        warn!(user_id = %user.id, "profile update on account without password");
        return Err(AppError::NotFound("User not found"));
    };

    let (Some(name), Some(email)) = (present(req.name), present(req.email)) else {
        return Err(AppError::bad_request("Missing required fields"));
    };
    let email = checked_email(&email)?;
    let new_password = present(req.new_password);

    if new_password.is_some() {
        let Some(current) = present(req.current_password) else {
            return Err(AppError::bad_request(
                "Current password is required to set a new password",
            ));
        };
        if !hasher.verify(current, stored_hash).await? {
            warn!(user_id = %user.id, "current password mismatch");
            return Err(AppError::bad_request("Current password is incorrect"));
        }
    }

    // Rows stored before normalization may be mixed-case; keep them as-is
    // when the caller only changes letter case or nothing at all.
    let email = if email == normalize_email(session_email) {
        user.email.clone()
    } else {
        if users.find_by_email(&email).await?.is_some() {
            warn!(user_id = %user.id, email = %email, "email already taken");
            return Err(AppError::bad_request("Email is already taken"));
        }
        email
    };

    let password = match new_password {
        Some(plain) => Some(hasher.hash(plain).await?),
        None => None,
    };
    let changes = UserChanges {
        name: Some(name.trim().to_string()),
        email: Some(email),
        password,
    };

    let updated = users.update(user.id, changes).await?;
    info!(user_id = %updated.id, "profile updated");
    Ok(updated)
}

pub async fn authenticate(
    users: &dyn UserRepository,
    hasher: &CredentialHasher,
    req: LoginRequest,
) -> Result<User, AppError> {
    let (Some(email), Some(password)) = (present(req.email), present(req.password)) else {
        return Err(AppError::bad_request("Missing required fields"));
    };
    let email = normalize_email(&email);

    let Some(user) = users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        hasher.verify_dummy(password).await?;
        return Err(AppError::Unauthorized("Invalid credentials"));
    };
    let Some(stored_hash) = user.password.clone() else {
        warn!(user_id = %user.id, "login on account without password");
        hasher.verify_dummy(password).await?;
        return Err(AppError::Unauthorized("Invalid credentials"));
    };
    if !hasher.verify(password, stored_hash).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized("Invalid credentials"));
    }

    info!(user_id = %user.id, "user logged in");
    Ok(user)
}
