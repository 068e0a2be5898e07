use futures_util::TryStreamExt;
use serde_json::Value;
use warp::{
    filters::{multipart::FormData, BoxedFilter},
    http::StatusCode,
    reject::Rejection,
    reply::Response,
    Buf, Filter, Reply,
};

use crate::{
    actions::recipes::{
        create_recipe, delete_recipe, fetch_recipes, get_recipe, get_recipe_detail,
        set_recipe_image, update_recipe, RecipeFilter,
    },
    error::{Error, HtmlError},
    form::RecipeForm,
    jwt::SessionData,
    media::save_recipe_image,
    middleware::with_session,
    permissions::ActionType,
    schema::Id,
    state::{with_state, State},
};

use super::filters::{json_body, ListQuery, QueryParams};

async fn list_recipes(
    params: QueryParams,
    session: SessionData,
    state: State,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnRecipes)?;
    let query = ListQuery::parse(&params)?;
    let filter = RecipeFilter {
        tags: query.tags,
        ingredients: query.ingredients,
    };

    let listing = fetch_recipes(session.user_id, &filter, query.page, &state.pool).await?;
    Ok(warp::reply::json(&listing))
}

async fn retrieve_recipe(
    id: Id,
    session: SessionData,
    state: State,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnRecipes)?;

    match get_recipe_detail(id, session.user_id, &state.pool).await? {
        Some(recipe) => Ok(warp::reply::json(&recipe)),
        None => Err(HtmlError::NotFound.default().into()),
    }
}

async fn post_recipe(
    session: SessionData,
    body: Value,
    state: State,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnRecipes)?;
    let form = RecipeForm::parse(body, false)?;

    let recipe = create_recipe(session.user_id, form, &state.pool).await?;
    Ok(warp::reply::with_status(
        warp::reply::json(&recipe),
        StatusCode::CREATED,
    ))
}

async fn put_recipe(
    id: Id,
    partial: bool,
    session: SessionData,
    body: Value,
    state: State,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnRecipes)?;

    // Ownership first, so another user's recipe is 404 rather than 400.
    if get_recipe(id, session.user_id, &state.pool).await?.is_none() {
        return Err(HtmlError::NotFound.default().into());
    }

    let form = RecipeForm::parse(body, partial)?;
    match update_recipe(id, session.user_id, form, partial, &state.pool).await? {
        Some(recipe) => Ok(warp::reply::json(&recipe)),
        None => Err(HtmlError::NotFound.default().into()),
    }
}

async fn remove_recipe(
    id: Id,
    session: SessionData,
    state: State,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnRecipes)?;

    if !delete_recipe(id, session.user_id, &state.pool).await? {
        return Err(HtmlError::NotFound.default().into());
    }
    Ok(StatusCode::NO_CONTENT)
}

fn malformed_multipart(e: warp::Error) -> Error {
    log::debug!("Malformed multipart body: {e}");
    HtmlError::InvalidRequest.new("Malformed multipart body.")
}

/// Contents of the `image` part. Each part is read before the next one is
/// requested; other parts are skipped.
async fn read_image_part(mut form: FormData) -> Result<Option<Vec<u8>>, Error> {
    while let Some(part) = form.try_next().await.map_err(malformed_multipart)? {
        if part.name() != "image" {
            continue;
        }

        let data = part
            .stream()
            .try_fold(Vec::new(), |mut data, buf| async move {
                data.extend_from_slice(buf.chunk());
                Ok(data)
            })
            .await
            .map_err(malformed_multipart)?;

        return Ok(Some(data));
    }

    Ok(None)
}

async fn upload_image(
    id: Id,
    session: SessionData,
    form: FormData,
    state: State,
) -> Result<impl Reply, Rejection> {
    session.authenticate(ActionType::ManageOwnRecipes)?;

    if get_recipe(id, session.user_id, &state.pool).await?.is_none() {
        return Err(HtmlError::NotFound.default().into());
    }

    let data = match read_image_part(form).await? {
        Some(data) if !data.is_empty() => data,
        _ => return Err(Error::field("image", "No file was submitted.").into()),
    };

    let path = save_recipe_image(&state.config.media_root, &data).await?;
    match set_recipe_image(id, session.user_id, &path, &state.pool).await? {
        Some(image) => Ok(warp::reply::json(&image)),
        None => Err(HtmlError::NotFound.default().into()),
    }
}

pub fn routes(state: State) -> BoxedFilter<(Response,)> {
    let list = warp::path!("recipes")
        .and(warp::get())
        .and(warp::query::<QueryParams>())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(list_recipes);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(post_recipe);

    let retrieve = warp::path!("recipes" / Id)
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(retrieve_recipe);

    let update = warp::path!("recipes" / Id)
        .and(
            warp::put()
                .map(|| false)
                .or(warp::patch().map(|| true))
                .unify(),
        )
        .and(with_session(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(put_recipe);

    let delete = warp::path!("recipes" / Id)
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(remove_recipe);

    let upload = warp::path!("recipes" / Id / "upload-image")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(warp::multipart::form().max_length(state.config.max_upload_bytes))
        .and(with_state(state))
        .and_then(upload_image);

    list.map(Reply::into_response)
        .or(create.map(Reply::into_response))
        .unify()
        .or(retrieve.map(Reply::into_response))
        .unify()
        .or(update.map(Reply::into_response))
        .unify()
        .or(delete.map(Reply::into_response))
        .unify()
        .or(upload.map(Reply::into_response))
        .unify()
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "recipe-boundary";
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    fn multipart(parts: &[(&str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, data) in parts {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{name}.bin\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn form_data(body: Vec<u8>) -> FormData {
        warp::test::request()
            .method("POST")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(body)
            .filter(&warp::multipart::form())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn image_part_is_read_in_full() {
        let form = form_data(multipart(&[("image", JPEG)])).await;
        let data = read_image_part(form).await.unwrap();

        assert_eq!(data.as_deref(), Some(JPEG));
    }

    #[tokio::test]
    async fn other_parts_are_skipped() {
        let form = form_data(multipart(&[("caption", &b"soup"[..]), ("image", JPEG)])).await;
        let data = read_image_part(form).await.unwrap();

        assert_eq!(data.as_deref(), Some(JPEG));
    }

    #[tokio::test]
    async fn missing_image_part_is_none() {
        let form = form_data(multipart(&[("caption", &b"soup"[..])])).await;
        assert_eq!(read_image_part(form).await.unwrap(), None);
    }
}
