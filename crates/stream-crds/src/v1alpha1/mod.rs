mod spec;
mod status;
mod types;

pub use spec::*;
pub use status::*;
pub use types::*;
