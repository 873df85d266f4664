pub mod deploy;
pub mod status;

pub use deploy::*;
pub use status::*;
