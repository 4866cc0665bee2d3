pub mod frame;
pub mod messages;

pub use frame::{decode_binary_frame, encode_binary_frame, BinaryHeader};
pub use messages::{ClientMessage, ServerEvent};
