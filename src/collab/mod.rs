pub mod address;
pub mod awareness;
pub mod engine;
pub mod flush;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod session;
