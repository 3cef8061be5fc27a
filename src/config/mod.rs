pub mod routing;
pub mod settings;

pub use routing::{Routing, RoutingError};
pub use settings::*;
