mod blocklist;
mod renderer;
mod search;
mod translator;

pub use blocklist::*;
pub use renderer::*;
pub use search::*;
pub use translator::*;
