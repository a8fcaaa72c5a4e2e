mod validate;

pub use self::validate::{JsonBody, SimpleValidatedJson, parse_validated};
