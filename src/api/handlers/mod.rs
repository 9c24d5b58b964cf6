mod exec;
mod health;
mod search;

pub use exec::*;
pub use health::*;
pub use search::*;
