use goneat_types::ValidationError;
use jsonschema::error::ValidationErrorKind;

/// Path reported for errors on the document itself.
pub const ROOT_PATH: &str = "(root)";

pub(crate) fn convert_error(err: &jsonschema::ValidationError<'_>) -> ValidationError {
    let path = field_path(&err.instance_path.to_string());
    let message = match &err.kind {
        ValidationErrorKind::Not { .. } => format!(
            "{path} matches a schema it must not match; this usually means mutually exclusive \
             fields are set together, remove one of them"
        ),
        ValidationErrorKind::OneOfMultipleValid { .. } => format!(
            "{path} matches more than one allowed shape (oneOf); adjust it so exactly one applies"
        ),
        _ => err.to_string(),
    };
    ValidationError::new(path, message)
}

/// Turn a JSON pointer (`/a/b/0`) into a dotted field path (`a.b.0`).
pub fn field_path(pointer: &str) -> String {
    let trimmed = pointer.trim_start_matches('/');
    if trimmed.is_empty() {
        return ROOT_PATH.to_string();
    }
    trimmed
        .split('/')
        .map(|seg| seg.replace("~1", "/").replace("~0", "~"))
        .collect::<Vec<_>>()
        .join(".")
}
