use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use serde::Serialize;
use warp::http::StatusCode;

pub use crate::database::error::QueryError;

/// Field name -> list of messages, serialized as `{"field": ["message"]}`.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone)]
pub struct Error {
    pub code: u16,
    pub info: Option<String>,
    pub fields: Option<FieldErrors>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlError {
    InvalidRequest,
    Unauthenticated,
    InvalidSession,
    InactiveUser,
    NotFound,
    MethodNotAllowed,
    LengthRequired,
    PayloadTooLarge,
    UnsupportedMediaType,
    Internal,
}

impl HtmlError {
    pub fn code(&self) -> u16 {
        match self {
            HtmlError::InvalidRequest => 400,
            HtmlError::Unauthenticated => 401,
            HtmlError::InvalidSession => 401,
            HtmlError::InactiveUser => 401,
            HtmlError::NotFound => 404,
            HtmlError::MethodNotAllowed => 405,
            HtmlError::LengthRequired => 411,
            HtmlError::PayloadTooLarge => 413,
            HtmlError::UnsupportedMediaType => 415,
            HtmlError::Internal => 500,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            HtmlError::InvalidRequest => "Invalid request",
            HtmlError::Unauthenticated => "Authentication credentials were not provided.",
            HtmlError::InvalidSession => "Invalid token.",
            HtmlError::InactiveUser => "User inactive or deleted.",
            HtmlError::NotFound => "Not found.",
            HtmlError::MethodNotAllowed => "Method not allowed.",
            HtmlError::LengthRequired => "A Content-Length header is required.",
            HtmlError::PayloadTooLarge => "Request body is too large.",
            HtmlError::UnsupportedMediaType => "Unsupported media type in request.",
            HtmlError::Internal => "Internal server error",
        }
    }

    pub fn new(self, info: &str) -> Error {
        Error {
            code: self.code(),
            info: Some(info.to_string()),
            fields: None,
        }
    }

    pub fn default(self) -> Error {
        self.new(self.message())
    }
}

impl Error {
    pub fn fields(fields: FieldErrors) -> Self {
        Self {
            code: 400,
            info: None,
            fields: Some(fields),
        }
    }

    /// Single field validation error.
    pub fn field(name: &str, message: &str) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(name.to_string(), vec![message.to_string()]);
        Self::fields(fields)
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Whether the `WWW-Authenticate` challenge belongs on the response.
    pub fn is_unauthenticated(&self) -> bool {
        self.code == 401
    }

    pub fn body(&self) -> ErrorBody {
        match &self.fields {
            Some(fields) => ErrorBody::Fields(fields.clone()),
            None => ErrorBody::Detail {
                detail: self
                    .info
                    .clone()
                    .unwrap_or_else(|| String::from("Unknown error")),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ErrorBody {
    Detail { detail: String },
    Fields(FieldErrors),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.info, &self.fields) {
            (Some(info), _) => write!(f, "{} ({info})", self.code),
            (None, Some(fields)) => write!(f, "{} {fields:?}", self.code),
            (None, None) => write!(f, "{}", self.code),
        }
    }
}

impl std::error::Error for Error {}

impl warp::reject::Reject for Error {}
