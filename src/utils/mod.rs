pub mod equity;
pub mod logging;
pub mod time;

pub use equity::*;
pub use time::*;
