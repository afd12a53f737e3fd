pub mod mime;
pub mod rejection;

pub use mime::{encode_header, format_address, MimeMessage};
pub use rejection::RejectionNotifier;
