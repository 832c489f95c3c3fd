use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::{
    AppState,
    db::now_sec,
    entities::{session, user},
    error::{AppError, AppResult},
};

pub const SESSION_COOKIE: &str = "session";

/// The signed-in user, resolved from the session cookie and handed to
/// handlers and templates explicitly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

impl CurrentUser {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|n| !n.trim().is_empty()).unwrap_or(&self.email)
    }
}

impl From<user::Model> for CurrentUser {
    fn from(model: user::Model) -> Self {
        Self { id: model.id, email: model.email, name: model.name }
    }
}

/// Extractor that never rejects for a missing or stale session.
#[derive(Clone, Debug)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl MaybeUser {
    pub fn require(self, message: &str) -> AppResult<CurrentUser> {
        self.0.ok_or_else(|| AppError::unauthorized(message))
    }
}

impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) else {
            return Ok(Self(None));
        };
        Ok(Self(user_for_session(&state.db, &token).await?))
    }
}

#[derive(Clone, Debug)]
pub struct Registration {
    pub name: Option<String>,
    pub email: String,
    pub password: String,
}

pub async fn register<C: ConnectionTrait>(db: &C, reg: Registration, cost: u32) -> AppResult<CurrentUser> {
    let email = normalize_email(&reg.email);
    if email.is_empty() || reg.password.is_empty() {
        return Err(AppError::bad_request("Email and password are required"));
    }
    if !email.contains('@') {
        return Err(AppError::bad_request("Invalid email address"));
    }

    let existing = user::Entity::find().filter(user::Column::Email.eq(email.as_str())).one(db).await?;
    if existing.is_some() {
        return Err(AppError::bad_request("User already exists"));
    }

    let password = reg.password;
    let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(anyhow::Error::from)?
        .map_err(anyhow::Error::from)?;

    let model = user::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        email: Set(email),
        name: Set(reg.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())),
        password_hash: Set(password_hash),
        created_at: Set(now_sec()),
    }
    .insert(db)
    .await?;

    tracing::info!(user_id = %model.id, "registered user");
    Ok(model.into())
}

/// Checks credentials and opens a session. Returns the user and the session
/// token to put in the cookie.
pub async fn login<C: ConnectionTrait>(
    db: &C,
    email: &str,
    password: &str,
    ttl_days: i64,
) -> AppResult<(CurrentUser, String)> {
    const INVALID: &str = "Invalid email or password";

    let email = normalize_email(email);
    let Some(found) = user::Entity::find().filter(user::Column::Email.eq(email.as_str())).one(db).await? else {
        return Err(AppError::unauthorized(INVALID));
    };

    let password = password.to_string();
    let hash = found.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(anyhow::Error::from)?
        .unwrap_or(false);
    if !valid {
        tracing::debug!(user_id = %found.id, "rejected login");
        return Err(AppError::unauthorized(INVALID));
    }

    let now = now_sec();
    let token = uuid::Uuid::new_v4().to_string();
    session::ActiveModel {
        token: Set(token.clone()),
        user_id: Set(found.id.clone()),
        created_at: Set(now),
        expires_at: Set(now + ttl_days.max(1) * 86_400),
    }
    .insert(db)
    .await?;

    tracing::info!(user_id = %found.id, "opened session");
    Ok((found.into(), token))
}

pub async fn logout<C: ConnectionTrait>(db: &C, token: &str) -> AppResult<()> {
    session::Entity::delete_by_id(token.to_string()).exec(db).await?;
    Ok(())
}

pub async fn user_for_session<C: ConnectionTrait>(db: &C, token: &str) -> AppResult<Option<CurrentUser>> {
    let Some(found) = session::Entity::find_by_id(token.to_string()).one(db).await? else {
        return Ok(None);
    };

    if found.expires_at <= now_sec() {
        tracing::debug!(user_id = %found.user_id, "dropping expired session");
        session::Entity::delete_by_id(found.token).exec(db).await?;
        return Ok(None);
    }

    let owner = user::Entity::find_by_id(found.user_id).one(db).await?;
    Ok(owner.map(CurrentUser::from))
}

pub fn session_cookie(token: String, ttl_days: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::days(ttl_days.max(1)))
        .build()
}

pub fn clear_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_a_non_blank_name() {
        let mut who = CurrentUser { id: "u1".into(), email: "ada@example.com".into(), name: Some("Ada".into()) };
        assert_eq!(who.display_name(), "Ada");
        who.name = Some("  ".into());
        assert_eq!(who.display_name(), "ada@example.com");
    }

    #[test]
    fn session_cookie_is_http_only_and_scoped_to_root() {
        let cookie = session_cookie("tok".into(), 7, false);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(7)));
    }
}
