pub mod fixed_point;
pub mod matches;
pub mod payload;
pub mod state;

pub use fixed_point::*;
pub use matches::*;
pub use payload::*;
pub use state::*;
