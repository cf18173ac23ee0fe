pub mod routes;
pub mod stream;

pub use routes::*;
pub use stream::*;
