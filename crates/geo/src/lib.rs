pub mod locator;
pub mod range_table;

pub use locator::*;
pub use range_table::*;
