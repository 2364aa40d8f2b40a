pub mod diagnostics;
pub mod docstatus;
pub mod error;
pub mod file;
pub mod health;
pub mod project;

pub use diagnostics::*;
pub use docstatus::*;
pub use error::*;
pub use file::*;
pub use health::*;
pub use project::*;
