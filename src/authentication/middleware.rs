use warp::{reject::Rejection, Filter};

use crate::{
    actions::users::get_user_by_id,
    constants::AUTH_SCHEMES,
    error::{Error, HtmlError},
    state::{with_state, State},
};

use super::jwt::{verify_jwt_session, SessionData};

/// Extracts the token from `Authorization: Token <t>` (or `Bearer <t>`).
/// Unknown schemes count as no credentials at all.
pub fn bearer_token(header: Option<&str>) -> Result<&str, Error> {
    let header = header.ok_or(HtmlError::Unauthenticated.default())?;
    let (scheme, token) = header.trim().split_once(' ').unwrap_or((header.trim(), ""));

    if !AUTH_SCHEMES
        .iter()
        .any(|known| known.eq_ignore_ascii_case(scheme))
    {
        return Err(HtmlError::Unauthenticated.default());
    }

    let token = token.trim();
    if token.is_empty() || token.contains(' ') {
        return Err(HtmlError::InvalidSession.new("Invalid token header."));
    }

    Ok(token)
}

async fn resolve_session(header: Option<String>, state: State) -> Result<SessionData, Rejection> {
    let token = bearer_token(header.as_deref())?;
    let claims = verify_jwt_session(token, state.secret())?;

    match get_user_by_id(&state.pool, claims.user_id).await? {
        Some(user) => Ok(user.into()),
        None => Err(HtmlError::InactiveUser.default().into()),
    }
}

pub fn with_session(
    state: State,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_state(state))
        .and_then(resolve_session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_and_bearer_schemes_are_accepted() {
        assert_eq!(bearer_token(Some("Token abc.def")).unwrap(), "abc.def");
        assert_eq!(bearer_token(Some("Bearer abc.def")).unwrap(), "abc.def");
        assert_eq!(bearer_token(Some("bearer   abc.def ")).unwrap(), "abc.def");
    }

    #[test]
    fn missing_or_foreign_header_is_unauthenticated() {
        let error = bearer_token(None).unwrap_err();
        assert_eq!(
            error.info.as_deref(),
            Some("Authentication credentials were not provided.")
        );

        let error = bearer_token(Some("Basic dXNlcjpwYXNz")).unwrap_err();
        assert_eq!(error.code, 401);
        assert_eq!(
            error.info.as_deref(),
            Some("Authentication credentials were not provided.")
        );
    }

    #[test]
    fn malformed_header_is_invalid() {
        let error = bearer_token(Some("Token")).unwrap_err();
        assert_eq!(error.info.as_deref(), Some("Invalid token header."));

        let error = bearer_token(Some("Token a b")).unwrap_err();
        assert_eq!(error.info.as_deref(), Some("Invalid token header."));
    }
}
