mod cors;
mod path;
mod rate_limit;

pub use cors::*;
pub use path::*;
pub use rate_limit::*;
