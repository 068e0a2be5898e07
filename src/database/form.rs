use std::str::FromStr;

use serde_json::{Map, Value};

use crate::{
    constants::{
        MAX_CHAR_FIELD_LENGTH, MIN_PASSWORD_LENGTH, PRICE_DECIMAL_PLACES, PRICE_MAX_DIGITS,
    },
    error::{Error, FieldErrors},
};

pub type FormData = Map<String, Value>;

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_BLANK: &str = "This field may not be blank.";
const INVALID_STRING: &str = "Not a valid string.";
const INVALID_INTEGER: &str = "A valid integer is required.";
const INVALID_NUMBER: &str = "A valid number is required.";
const INVALID_EMAIL: &str = "Enter a valid email address.";

/// Request body being validated. Every getter records its own field errors
/// and returns `None` when the field is absent or invalid; `finish` turns the
/// collected errors into a single 400.
///
/// In partial mode (PATCH) absent fields are never an error.
pub struct Form {
    inner: FormData,
    partial: bool,
    errors: FieldErrors,
}

impl Form {
    pub fn from_data(data: FormData, partial: bool) -> Self {
        Self {
            inner: data,
            partial,
            errors: FieldErrors::new(),
        }
    }

    pub fn from_value(value: Value, partial: bool) -> Result<Self, Error> {
        match value {
            Value::Object(data) => Ok(Self::from_data(data, partial)),
            other => Err(Error::field(
                "non_field_errors",
                &format!(
                    "Invalid data. Expected a dictionary, but got {}.",
                    type_name(&other)
                ),
            )),
        }
    }

    pub fn error(&mut self, key: &str, message: &str) {
        self.errors
            .entry(key.to_string())
            .or_default()
            .push(message.to_string());
    }

    /// Fetches a present, non-null value, recording `required`/`null` errors.
    fn take(&mut self, key: &str, required: bool) -> Option<Value> {
        match self.inner.get(key) {
            None => {
                if required && !self.partial {
                    self.error(key, REQUIRED);
                }
                None
            }
            Some(Value::Null) => {
                self.error(key, NOT_NULL);
                None
            }
            Some(value) => Some(value.to_owned()),
        }
    }

    fn as_text(&mut self, key: &str, value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => {
                self.error(key, INVALID_STRING);
                None
            }
        }
    }

    /// Trimmed string of at most `max_length` characters. Blank values are
    /// only accepted when the field is optional.
    pub fn get_str(&mut self, key: &str, max_length: usize, required: bool) -> Option<String> {
        let value = self.take(key, required)?;
        let value = self.as_text(key, value)?;
        let value = value.trim().to_string();

        if value.is_empty() && required {
            self.error(key, NOT_BLANK);
            return None;
        }
        if value.chars().count() > max_length {
            self.error(
                key,
                &format!("Ensure this field has no more than {max_length} characters."),
            );
            return None;
        }

        Some(value)
    }

    /// Untrimmed, non-blank string. Used for secrets.
    pub fn get_raw_str(&mut self, key: &str, required: bool) -> Option<String> {
        let value = self.take(key, required)?;
        let value = self.as_text(key, value)?;

        if value.is_empty() {
            self.error(key, NOT_BLANK);
            return None;
        }

        Some(value)
    }

    pub fn get_number<T>(&mut self, key: &str, required: bool) -> Option<T>
    where
        T: FromStr,
    {
        let value = self.take(key, required)?;
        let text = match value {
            Value::Number(n) => match n.as_i64() {
                Some(n) => n.to_string(),
                None => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 => format!("{}", f as i64),
                    _ => String::new(),
                },
            },
            Value::String(s) => s.trim().to_string(),
            _ => String::new(),
        };

        match text.parse() {
            Ok(number) => Some(number),
            Err(_) => {
                self.error(key, INVALID_INTEGER);
                None
            }
        }
    }

    pub fn get_price(&mut self, key: &str, required: bool) -> Option<String> {
        let value = self.take(key, required)?;
        let text = match value {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s,
            _ => {
                self.error(key, INVALID_NUMBER);
                return None;
            }
        };

        match parse_price(&text) {
            Ok(price) => Some(price),
            Err(message) => {
                self.error(key, &message);
                None
            }
        }
    }

    pub fn get_email(&mut self, key: &str, required: bool) -> Option<String> {
        let email = self.get_str(key, MAX_CHAR_FIELD_LENGTH, required)?;

        match normalize_email(&email) {
            Some(email) => Some(email),
            None => {
                self.error(key, INVALID_EMAIL);
                None
            }
        }
    }

    pub fn get_password(&mut self, key: &str, required: bool) -> Option<String> {
        let password = self.get_raw_str(key, required)?;

        if password.chars().count() < MIN_PASSWORD_LENGTH {
            self.error(
                key,
                &format!("Ensure this field has at least {MIN_PASSWORD_LENGTH} characters."),
            );
            return None;
        }

        Some(password)
    }

    /// List of `{"name": ...}` objects, reduced to the names.
    pub fn get_names(&mut self, key: &str) -> Option<Vec<String>> {
        let value = self.take(key, false)?;
        let items = match value {
            Value::Array(items) => items,
            other => {
                self.error(
                    key,
                    &format!(
                        "Expected a list of items but got type \"{}\".",
                        type_name(&other)
                    ),
                );
                return None;
            }
        };

        let mut names = Vec::with_capacity(items.len());
        for item in items {
            let name = item
                .get("name")
                .and_then(Value::as_str)
                .map(|name| name.trim().to_string())
                .filter(|name| {
                    !name.is_empty() && name.chars().count() <= MAX_CHAR_FIELD_LENGTH
                });

            match name {
                Some(name) => names.push(name),
                None => {
                    self.error(
                        key,
                        &format!(
                            "Each item needs a non-blank \"name\" of at most {MAX_CHAR_FIELD_LENGTH} characters."
                        ),
                    );
                    return None;
                }
            }
        }

        Some(names)
    }

    pub fn finish(self) -> Result<(), Error> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(Error::fields(self.errors))
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Validates a decimal with at most 5 digits and 2 decimal places and
/// renders it with exactly 2 decimal places.
pub fn parse_price(text: &str) -> Result<String, String> {
    let text = text.trim();
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (unsigned, ""),
    };

    let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return Err(INVALID_NUMBER.to_string());
    }

    let whole = whole.trim_start_matches('0');
    let max_whole_digits = PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES;

    if whole.len() + fraction.len() > PRICE_MAX_DIGITS {
        return Err(format!(
            "Ensure that there are no more than {PRICE_MAX_DIGITS} digits in total."
        ));
    }
    if fraction.len() > PRICE_DECIMAL_PLACES {
        return Err(format!(
            "Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places."
        ));
    }
    if whole.len() > max_whole_digits {
        return Err(format!(
            "Ensure that there are no more than {max_whole_digits} digits before the decimal point."
        ));
    }

    let whole = if whole.is_empty() { "0" } else { whole };
    let is_zero = whole == "0" && fraction.chars().all(|c| c == '0');
    let sign = if negative && !is_zero { "-" } else { "" };

    Ok(format!(
        "{}{}.{:0<width$}",
        sign,
        whole,
        fraction,
        width = PRICE_DECIMAL_PLACES
    ))
}

/// Checks the general `local@domain.tld` shape and lower-cases the domain.
pub fn normalize_email(email: &str) -> Option<String> {
    let (local, domain) = email.rsplit_once('@')?;

    let valid = !local.is_empty()
        && !local.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty());

    if !valid {
        return None;
    }

    Some(format!("{local}@{}", domain.to_lowercase()))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeForm {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
}

impl RecipeForm {
    /// Any `user` or `id` key in the payload is ignored; ownership always
    /// comes from the session.
    pub fn parse(value: Value, partial: bool) -> Result<Self, Error> {
        let mut form = Form::from_value(value, partial)?;

        let recipe = Self {
            title: form.get_str("title", MAX_CHAR_FIELD_LENGTH, true),
            time_minutes: form.get_number("time_minutes", true),
            price: form.get_price("price", true),
            description: form.get_str("description", usize::MAX, false),
            link: form.get_str("link", MAX_CHAR_FIELD_LENGTH, false),
            tags: form.get_names("tags"),
            ingredients: form.get_names("ingredients"),
        };

        form.finish()?;
        Ok(recipe)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeForm {
    pub name: Option<String>,
}

impl AttributeForm {
    pub fn parse(value: Value, partial: bool) -> Result<Self, Error> {
        let mut form = Form::from_value(value, partial)?;
        let attribute = Self {
            name: form.get_str("name", MAX_CHAR_FIELD_LENGTH, true),
        };

        form.finish()?;
        Ok(attribute)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserForm {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

impl UserForm {
    pub fn parse(value: Value, partial: bool) -> Result<Self, Error> {
        let mut form = Form::from_value(value, partial)?;
        let user = Self {
            email: form.get_email("email", true),
            password: form.get_password("password", true),
            name: form.get_str("name", MAX_CHAR_FIELD_LENGTH, true),
        };

        form.finish()?;
        Ok(user)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CredentialsForm {
    pub email: String,
    pub password: String,
}

impl CredentialsForm {
    pub fn parse(value: Value) -> Result<Self, Error> {
        let mut form = Form::from_value(value, false)?;
        let email = form.get_str("email", MAX_CHAR_FIELD_LENGTH, true);
        let password = form.get_raw_str("password", true);

        form.finish()?;
        match (email, password) {
            (Some(email), Some(password)) => Ok(Self {
                email: normalize_email(&email).unwrap_or(email),
                password,
            }),
            _ => Err(Error::field("non_field_errors", "Must include \"email\" and \"password\".")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_errors(error: Error) -> FieldErrors {
        error.fields.expect("expected field errors")
    }

    #[test]
    fn price_is_rendered_with_two_decimals() {
        assert_eq!(parse_price("5.5").unwrap(), "5.50");
        assert_eq!(parse_price("5").unwrap(), "5.00");
        assert_eq!(parse_price(".25").unwrap(), "0.25");
        assert_eq!(parse_price("007.10").unwrap(), "7.10");
        assert_eq!(parse_price("-0.00").unwrap(), "0.00");
        assert_eq!(parse_price("-2.5").unwrap(), "-2.50");
    }

    #[test]
    fn price_limits_digits() {
        assert_eq!(
            parse_price("1234.5").unwrap_err(),
            "Ensure that there are no more than 3 digits before the decimal point."
        );
        assert_eq!(
            parse_price("1.234").unwrap_err(),
            "Ensure that there are no more than 2 decimal places."
        );
        assert_eq!(
            parse_price("1234.56").unwrap_err(),
            "Ensure that there are no more than 5 digits in total."
        );
        assert_eq!(parse_price("abc").unwrap_err(), INVALID_NUMBER);
        assert_eq!(parse_price(".").unwrap_err(), INVALID_NUMBER);
        assert_eq!(parse_price("1e3").unwrap_err(), INVALID_NUMBER);
    }

    #[test]
    fn email_domain_is_lowercased() {
        assert_eq!(
            normalize_email("Test1@EXAMPLE.com").as_deref(),
            Some("Test1@example.com")
        );
        assert_eq!(normalize_email("no-at-sign.com"), None);
        assert_eq!(normalize_email("user@localhost"), None);
        assert_eq!(normalize_email("@example.com"), None);
        assert_eq!(normalize_email("us er@example.com"), None);
    }

    #[test]
    fn recipe_form_requires_core_fields() {
        let error = RecipeForm::parse(json!({"link": "http://example.com"}), false).unwrap_err();
        let fields = field_errors(error);

        assert_eq!(fields["title"], vec![REQUIRED]);
        assert_eq!(fields["time_minutes"], vec![REQUIRED]);
        assert_eq!(fields["price"], vec![REQUIRED]);
        assert!(!fields.contains_key("link"));
    }

    #[test]
    fn recipe_form_partial_accepts_subset() {
        let form = RecipeForm::parse(json!({"title": "  New recipe title "}), true).unwrap();

        assert_eq!(form.title.as_deref(), Some("New recipe title"));
        assert_eq!(form.price, None);
        assert_eq!(form.tags, None);
    }

    #[test]
    fn recipe_form_parses_everything() {
        let form = RecipeForm::parse(
            json!({
                "title": "Thai Prawn Curry",
                "time_minutes": "30",
                "price": 2.5,
                "user": 99,
                "tags": [{"name": "Thai"}, {"name": "Dinner"}],
                "ingredients": [],
            }),
            false,
        )
        .unwrap();

        assert_eq!(form.time_minutes, Some(30));
        assert_eq!(form.price.as_deref(), Some("2.50"));
        assert_eq!(
            form.tags,
            Some(vec![String::from("Thai"), String::from("Dinner")])
        );
        assert_eq!(form.ingredients, Some(vec![]));
        assert_eq!(form.description, None);
    }

    #[test]
    fn recipe_form_rejects_bad_lists() {
        let error = RecipeForm::parse(
            json!({"title": "a", "time_minutes": 1, "price": "1", "tags": "Thai", "ingredients": [{"name": ""}]}),
            false,
        )
        .unwrap_err();
        let fields = field_errors(error);

        assert_eq!(
            fields["tags"],
            vec!["Expected a list of items but got type \"str\"."]
        );
        assert!(fields.contains_key("ingredients"));
    }

    #[test]
    fn recipe_form_rejects_null_and_bad_integer() {
        let error =
            RecipeForm::parse(json!({"title": null, "time_minutes": 1.5, "price": true}), true)
                .unwrap_err();
        let fields = field_errors(error);

        assert_eq!(fields["title"], vec![NOT_NULL]);
        assert_eq!(fields["time_minutes"], vec![INVALID_INTEGER]);
        assert_eq!(fields["price"], vec![INVALID_NUMBER]);
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let error = RecipeForm::parse(json!([1, 2]), false).unwrap_err();
        let fields = field_errors(error);
        assert_eq!(
            fields["non_field_errors"],
            vec!["Invalid data. Expected a dictionary, but got list."]
        );
    }

    #[test]
    fn user_form_checks_password_and_email() {
        let error = UserForm::parse(
            json!({"email": "not-an-email", "password": "pw", "name": "Test"}),
            false,
        )
        .unwrap_err();
        let fields = field_errors(error);

        assert_eq!(fields["email"], vec![INVALID_EMAIL]);
        assert_eq!(
            fields["password"],
            vec!["Ensure this field has at least 5 characters."]
        );
        assert!(!fields.contains_key("name"));
    }

    #[test]
    fn user_form_partial_update() {
        let form = UserForm::parse(json!({"name": "Updated name"}), true).unwrap();
        assert_eq!(form.name.as_deref(), Some("Updated name"));
        assert_eq!(form.password, None);
    }

    #[test]
    fn attribute_name_length_is_limited() {
        let long = "x".repeat(MAX_CHAR_FIELD_LENGTH + 1);
        let error = AttributeForm::parse(json!({ "name": long }), false).unwrap_err();
        assert_eq!(
            field_errors(error)["name"],
            vec!["Ensure this field has no more than 255 characters."]
        );

        let error = AttributeForm::parse(json!({ "name": "   " }), false).unwrap_err();
        assert_eq!(field_errors(error)["name"], vec![NOT_BLANK]);
    }

    #[test]
    fn credentials_require_both_fields() {
        let error = CredentialsForm::parse(json!({"email": "test@example.com", "password": ""}))
            .unwrap_err();
        assert_eq!(field_errors(error)["password"], vec![NOT_BLANK]);

        let credentials =
            CredentialsForm::parse(json!({"email": "Test@Example.com", "password": " pass "}))
                .unwrap();
        assert_eq!(credentials.email, "Test@example.com");
        assert_eq!(credentials.password, " pass ");
    }
}
