pub const MAX_JSON_BODY_BYTES: u64 = 64 * 1024;

pub const MAX_CHAR_FIELD_LENGTH: usize = 255;
pub const MIN_PASSWORD_LENGTH: usize = 5;

pub const PRICE_MAX_DIGITS: usize = 5;
pub const PRICE_DECIMAL_PLACES: usize = 2;

/// URL prefix uploaded files are served under.
pub const MEDIA_URL: &str = "/media/";
/// Directory below the media root that recipe images are written to.
pub const RECIPE_IMAGE_DIR: &str = "uploads/recipe";

pub const AUTH_SCHEMES: &[&str] = &["Token", "Bearer"];
