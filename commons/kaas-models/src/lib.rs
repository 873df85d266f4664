pub mod environment;
pub mod provision;
pub mod status;

pub use environment::*;
pub use provision::*;
pub use status::*;
