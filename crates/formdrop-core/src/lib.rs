pub mod error;
pub mod intake;
pub mod naming;
pub mod notification;
pub mod submission;

pub use error::ValidationError;
pub use intake::Intake;
pub use naming::KeyMinter;
pub use submission::{Attachment, StoredAsset, Submission};
