pub mod constants;
pub mod errors;
pub mod protocol;
pub mod types;

pub use constants::*;
pub use errors::{ErrorCategory, ProtocolError};
pub use protocol::{Framing, Message, WinnersResponse};
pub use types::*;
