pub mod ingest;
pub mod metrics;
pub mod synthetic;

pub use ingest::*;
pub use metrics::*;
pub use synthetic::*;
