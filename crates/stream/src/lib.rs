pub mod buffer;
pub mod registry;
pub mod subscription;
pub mod event_bus;
pub mod message;
pub mod writer;

pub use buffer::*;
pub use registry::*;
pub use subscription::*;
pub use event_bus::*;
pub use message::*;
pub use writer::*;
