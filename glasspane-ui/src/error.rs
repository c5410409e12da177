use thiserror::Error;

pub type UiResult<T> = Result<T, UiError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UiError {
    #[error("Unknown element kind '{kind}'")]
    UnknownKind { kind: String },
}
