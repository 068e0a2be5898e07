use serde_json::Value;
use warp::{
    filters::BoxedFilter, http::StatusCode, reject::Rejection, reply::Response, Filter, Reply,
};

use crate::{
    actions::attributes::{
        create_attribute, delete_attribute, get_attribute, list_attributes, update_attribute,
    },
    error::HtmlError,
    form::AttributeForm,
    jwt::SessionData,
    middleware::with_session,
    permissions::ActionType,
    schema::{AttributeKind, Id},
    state::{with_state, State},
};

use super::filters::{json_body, with_kind, ListQuery, QueryParams};

async fn list(
    kind: AttributeKind,
    params: QueryParams,
    session: SessionData,
    state: State,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnAttributes)?;
    let query = ListQuery::parse(&params)?;

    let listing = list_attributes(
        kind,
        session.user_id,
        query.assigned_only,
        query.page,
        &state.pool,
    )
    .await?;
    Ok(warp::reply::json(&listing))
}

async fn retrieve(
    kind: AttributeKind,
    id: Id,
    session: SessionData,
    state: State,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnAttributes)?;

    match get_attribute(kind, id, session.user_id, &state.pool).await? {
        Some(attribute) => Ok(warp::reply::json(&attribute)),
        None => Err(HtmlError::NotFound.default().into()),
    }
}

async fn create(
    kind: AttributeKind,
    session: SessionData,
    body: Value,
    state: State,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnAttributes)?;
    let form = AttributeForm::parse(body, false)?;
    let name = form.name.unwrap_or_default();

    let attribute = create_attribute(kind, session.user_id, &name, &state.pool).await?;
    Ok(warp::reply::with_status(
        warp::reply::json(&attribute),
        StatusCode::CREATED,
    ))
}

async fn update(
    kind: AttributeKind,
    id: Id,
    partial: bool,
    session: SessionData,
    body: Value,
    state: State,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnAttributes)?;

    if get_attribute(kind, id, session.user_id, &state.pool)
        .await?
        .is_none()
    {
        return Err(HtmlError::NotFound.default().into());
    }

    let form = AttributeForm::parse(body, partial)?;
    match update_attribute(kind, id, session.user_id, form.name, &state.pool).await? {
        Some(attribute) => Ok(warp::reply::json(&attribute)),
        None => Err(HtmlError::NotFound.default().into()),
    }
}

async fn remove(
    kind: AttributeKind,
    id: Id,
    session: SessionData,
    state: State,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnAttributes)?;

    if !delete_attribute(kind, id, session.user_id, &state.pool).await? {
        return Err(HtmlError::NotFound.default().into());
    }
    Ok(StatusCode::NO_CONTENT)
}

/// `/tags/...` or `/ingredients/...`, depending on `kind`.
pub fn routes(kind: AttributeKind, state: State) -> BoxedFilter<(Response,)> {
    let collection = warp::path(kind.field()).and(warp::path::end());
    let member = warp::path(kind.field())
        .and(warp::path::param::<Id>())
        .and(warp::path::end());

    let list_route = collection
        .and(warp::get())
        .and(with_kind(kind))
        .and(warp::query::<QueryParams>())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(list);

    let create_route = collection
        .and(warp::post())
        .and(with_kind(kind))
        .and(with_session(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(create);

    let retrieve_route = with_kind(kind)
        .and(member)
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(retrieve);

    let update_route = with_kind(kind)
        .and(member)
        .and(
            warp::put()
                .map(|| false)
                .or(warp::patch().map(|| true))
                .unify(),
        )
        .and(with_session(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(update);

    let delete_route = with_kind(kind)
        .and(member)
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state))
        .and_then(remove);

    list_route
        .map(Reply::into_response)
        .or(create_route.map(Reply::into_response))
        .unify()
        .or(retrieve_route.map(Reply::into_response))
        .unify()
        .or(update_route.map(Reply::into_response))
        .unify()
        .or(delete_route.map(Reply::into_response))
        .unify()
        .boxed()
}
