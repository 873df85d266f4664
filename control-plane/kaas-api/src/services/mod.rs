pub mod credentials;
pub mod existence;
pub mod provision;
pub mod status;

pub use credentials::{InstanceCodeGenerator, generate_password, generate_username};
pub use existence::ensure_names_free;
pub use provision::{ProvisionService, ProvisionSettings};
pub use status::StatusService;
