pub mod inbox;
pub mod traits;

pub use inbox::InboxSource;
pub use traits::{Upload, UploadSource};
