pub mod diagnostics;
pub mod doc_status;
pub mod file_create;
pub mod file_delete;
pub mod health;
pub mod project_create;
pub mod project_get;

pub use diagnostics::*;
pub use doc_status::*;
pub use file_create::*;
pub use file_delete::*;
pub use health::*;
pub use project_create::*;
pub use project_get::*;
