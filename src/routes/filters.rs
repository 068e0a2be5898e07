use std::{collections::HashMap, convert::Infallible};

use serde_json::Value;
use warp::{reject::Rejection, Filter};

use crate::{
    constants::MAX_JSON_BODY_BYTES,
    error::{Error, FieldErrors},
    pagination::PageRequest,
    schema::{AttributeKind, Id},
};

pub type QueryParams = HashMap<String, String>;

/// Query string options understood by the list endpoints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<Id>>,
    pub assigned_only: bool,
    pub page: PageRequest,
}

impl ListQuery {
    pub fn parse(params: &QueryParams) -> Result<Self, Error> {
        let mut errors = FieldErrors::new();
        let mut record = |key: &str, message: &str| {
            errors
                .entry(key.to_string())
                .or_default()
                .push(message.to_string());
        };

        let mut id_list = |kind: AttributeKind| match params.get(kind.field()) {
            Some(value) => match parse_id_list(value) {
                Ok(ids) => ids,
                Err(message) => {
                    record(kind.field(), message);
                    None
                }
            },
            None => None,
        };
        let tags = id_list(AttributeKind::Tag);
        let ingredients = id_list(AttributeKind::Ingredient);

        let assigned_only = match params.get("assigned_only").map(|v| v.trim()) {
            None | Some("") | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(_) => {
                record("assigned_only", "Must be 0 or 1.");
                false
            }
        };

        let mut number = |key: &str, min: i64| match params.get(key) {
            Some(value) => match value.trim().parse::<i64>() {
                Ok(n) if n >= min => Some(n),
                _ => {
                    record(key, &format!("Must be an integer of at least {min}."));
                    None
                }
            },
            None => None,
        };
        let limit = number("limit", 1);
        let offset = number("offset", 0);

        if !errors.is_empty() {
            return Err(Error::fields(errors));
        }

        Ok(Self {
            tags,
            ingredients,
            assigned_only,
            page: PageRequest::new(limit, offset),
        })
    }
}

/// `"1,2,3"` -> ids. An empty value means no filter.
pub fn parse_id_list(value: &str) -> Result<Option<Vec<Id>>, &'static str> {
    if value.trim().is_empty() {
        return Ok(None);
    }

    value
        .split(',')
        .map(|id| id.trim().parse::<Id>())
        .collect::<Result<Vec<Id>, _>>()
        .map(Some)
        .map_err(|_| "Enter a comma-separated list of ids.")
}

pub fn json_body() -> impl Filter<Extract = (Value,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_JSON_BODY_BYTES).and(warp::body::json())
}

pub fn with_kind(
    kind: AttributeKind,
) -> impl Filter<Extract = (AttributeKind,), Error = Infallible> + Clone {
    warp::any().map(move || kind)
}
