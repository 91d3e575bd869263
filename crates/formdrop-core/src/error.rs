use thiserror::Error;

/// Reasons a submission is refused before anything is uploaded.
///
/// The display strings are sent to the caller verbatim, so they stay in the
/// language of the form that posts to us.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Nem kép.")]
    NotAnImage,

    #[error("Túl nagy fájl.")]
    TooLarge,

    #[error("Nincs kép.")]
    NoImage,

    #[error("{0}")]
    MalformedBody(String),
}
