//! Host-side building blocks for wiring a field registry outside of a web
//! framework: snapshot accessors, a process token, and path helpers.

mod path_processing;
pub mod request;
pub mod session;
pub mod token;

pub use path_processing::{config_file_path, expand_tilde};
pub use request::RequestSnapshot;
pub use session::MemorySession;
pub use token::ProcessToken;
