pub mod context;
pub mod logging;
pub mod math;
pub mod time;

pub use context::{CallContext, Interrupted};
