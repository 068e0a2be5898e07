use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::generate_jwt_session,
    },
    error::{Error, QueryError},
    form::{CredentialsForm, UserForm},
    schema::{Id, User},
};

use super::unique_violation;
use sqlx::{Pool, Postgres};

const DUPLICATE_EMAIL: &str = "user with this email already exists.";
const INVALID_CREDENTIALS: &str = "Unable to authenticate with provided credentials.";

pub async fn get_user(pool: &Pool<Postgres>, email: &str) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Id) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Inserts a user whose `password` is already hashed. `None` when the email
/// is taken.
pub async fn register_user(
    email: &str,
    password: &str,
    name: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (email, password, name)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO NOTHING RETURNING *;
    ",
    )
    .bind(email)
    .bind(password)
    .bind(name)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn create_user(form: UserForm, pool: &Pool<Postgres>) -> Result<User, Error> {
    let (Some(email), Some(password), Some(name)) = (form.email, form.password, form.name) else {
        return Err(Error::field("non_field_errors", "Missing account details."));
    };

    let password = hash_password(&password)?;

    match register_user(&email, &password, &name, pool).await? {
        Some(user) => {
            log::info!("Registered user {}", user.id);
            Ok(user)
        }
        None => Err(Error::field("email", DUPLICATE_EMAIL)),
    }
}

/// Applies the fields present in `form`; a new password is re-hashed.
pub async fn update_user(
    user_id: Id,
    form: UserForm,
    pool: &Pool<Postgres>,
) -> Result<Option<User>, Error> {
    let password = match form.password {
        Some(password) => Some(hash_password(&password)?),
        None => None,
    };

    let row: Option<User> = sqlx::query_as(
        "
        UPDATE users SET
        email = COALESCE($1, email),
        name = COALESCE($2, name),
        password = COALESCE($3, password)
        WHERE id = $4
        RETURNING *
    ",
    )
    .bind(form.email)
    .bind(form.name)
    .bind(password)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| unique_violation(e, "email", DUPLICATE_EMAIL))?;

    Ok(row)
}

/// Exchanges credentials for a signed session token.
pub async fn login_user(
    credentials: &CredentialsForm,
    secret: &[u8],
    lifetime_hours: i64,
    pool: &Pool<Postgres>,
) -> Result<String, Error> {
    let user = match get_user(pool, &credentials.email).await? {
        Some(user) => user,
        None => return Err(Error::field("non_field_errors", INVALID_CREDENTIALS)),
    };

    if !user.is_active || !verify_password(&credentials.password, &user.password) {
        return Err(Error::field("non_field_errors", INVALID_CREDENTIALS));
    }

    generate_jwt_session(&user, secret, lifetime_hours)
}
