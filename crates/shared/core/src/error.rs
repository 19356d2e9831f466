use thiserror::Error;

/// The upstream payload could not be decoded at all.
///
/// Payloads that decode but carry no usable depth are not errors; they
/// normalize to the empty snapshot.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("malformed depth payload")]
    Json(#[from] serde_json::Error),
}
