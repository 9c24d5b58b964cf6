mod command;
mod reply;
mod search;

pub use command::*;
pub use reply::*;
pub use search::*;
