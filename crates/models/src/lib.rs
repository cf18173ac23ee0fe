pub mod events;
pub mod datagram;
pub mod error;

pub use events::*;
pub use datagram::*;
pub use error::*;
