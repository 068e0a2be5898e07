use std::convert::Infallible;

use warp::{
    http::{header::WWW_AUTHENTICATE, HeaderValue},
    reject::Rejection,
    reply::Response,
    Reply,
};

use crate::error::{Error, HtmlError};

fn classify(err: &Rejection) -> Error {
    if let Some(error) = err.find::<Error>() {
        return error.clone();
    }
    if err.is_not_found() {
        return HtmlError::NotFound.default();
    }
    if let Some(e) = err.find::<warp::body::BodyDeserializeError>() {
        return HtmlError::InvalidRequest.new(&format!("JSON parse error - {e}"));
    }
    if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        return HtmlError::InvalidRequest.new(&e.to_string());
    }
    if let Some(e) = err.find::<warp::reject::MissingHeader>() {
        return HtmlError::InvalidRequest.new(&e.to_string());
    }
    if let Some(e) = err.find::<warp::reject::InvalidHeader>() {
        return HtmlError::InvalidRequest.new(&e.to_string());
    }
    if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        return HtmlError::PayloadTooLarge.default();
    }
    if err.find::<warp::reject::LengthRequired>().is_some() {
        return HtmlError::LengthRequired.default();
    }
    if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        return HtmlError::UnsupportedMediaType.default();
    }
    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return HtmlError::MethodNotAllowed.default();
    }

    log::error!("Unhandled rejection: {err:?}");
    HtmlError::Internal.default()
}

pub fn error_response(error: &Error) -> Response {
    let mut response =
        warp::reply::with_status(warp::reply::json(&error.body()), error.status()).into_response();

    if error.is_unauthenticated() {
        response
            .headers_mut()
            .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Token"));
    }

    response
}

/// Turns every rejection into a JSON error body.
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let error = classify(&err);

    if error.code >= 500 {
        log::error!("Request failed: {error}");
    } else {
        log::debug!("Request rejected: {error}");
    }

    Ok(error_response(&error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn not_found_rejection_becomes_404() {
        let response = handle_rejection(warp::reject::not_found()).await.unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn custom_error_keeps_status_and_challenge() {
        let rejection: Rejection = HtmlError::Unauthenticated.default().into();
        let response = handle_rejection(rejection).await.unwrap();

        assert_eq!(response.status(), 401);
        assert_eq!(response.headers()[WWW_AUTHENTICATE], "Token");
    }

    #[tokio::test]
    async fn validation_error_has_no_challenge() {
        let rejection: Rejection = Error::field("name", "This field is required.").into();
        let response = handle_rejection(rejection).await.unwrap();

        assert_eq!(response.status(), 400);
        assert!(response.headers().get(WWW_AUTHENTICATE).is_none());
    }
}
