pub mod interval;
pub mod price;

pub use interval::*;
pub use price::*;
