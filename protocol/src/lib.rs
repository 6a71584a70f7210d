mod envelope;
mod message;
mod message_type;
mod types;

pub use envelope::*;
pub use message::*;
pub use message_type::*;
pub use types::*;

pub extern crate serde;
pub extern crate serde_json;
