use serde_json::{json, Value};
use warp::{
    filters::BoxedFilter, http::StatusCode, reject::Rejection, reply::Response, Filter, Reply,
};

use crate::{
    actions::users::{create_user, get_user_by_id, login_user, update_user},
    error::HtmlError,
    form::{CredentialsForm, UserForm},
    jwt::SessionData,
    middleware::with_session,
    permissions::ActionType,
    schema::UserProfile,
    state::{with_state, State},
};

use super::filters::json_body;

async fn register(body: Value, state: State) -> Result<impl Reply, Rejection> {
    let form = UserForm::parse(body, false)?;
    let user = create_user(form, &state.pool).await?;

    Ok(warp::reply::with_status(
        warp::reply::json(&UserProfile::from(user)),
        StatusCode::CREATED,
    ))
}

async fn token(body: Value, state: State) -> Result<impl Reply, Rejection> {
    let credentials = CredentialsForm::parse(body)?;
    let token = login_user(
        &credentials,
        state.secret(),
        state.config.token_lifetime_hours,
        &state.pool,
    )
    .await?;

    Ok(warp::reply::json(&json!({ "token": token })))
}

async fn me(session: SessionData, state: State) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnAccount)?;

    match get_user_by_id(&state.pool, session.user_id).await? {
        Some(user) => Ok(warp::reply::json(&UserProfile::from(user))),
        None => Err(HtmlError::InactiveUser.default().into()),
    }
}

async fn update_me(
    partial: bool,
    session: SessionData,
    body: Value,
    state: State,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnAccount)?;
    let form = UserForm::parse(body, partial)?;

    match update_user(session.user_id, form, &state.pool).await? {
        Some(user) => Ok(warp::reply::json(&UserProfile::from(user))),
        None => Err(HtmlError::InactiveUser.default().into()),
    }
}

pub fn routes(state: State) -> BoxedFilter<(Response,)> {
    let create = warp::path!("user" / "create")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(register);

    let login = warp::path!("user" / "token")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(token);

    let profile = warp::path!("user" / "me")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(me);

    let update = warp::path!("user" / "me")
        .and(
            warp::put()
                .map(|| false)
                .or(warp::patch().map(|| true))
                .unify(),
        )
        .and(with_session(state.clone()))
        .and(json_body())
        .and(with_state(state))
        .and_then(update_me);

    create
        .map(Reply::into_response)
        .or(login.map(Reply::into_response))
        .unify()
        .or(profile.map(Reply::into_response))
        .unify()
        .or(update.map(Reply::into_response))
        .unify()
        .boxed()
}
