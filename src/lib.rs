pub mod config;
pub mod input;
pub mod models;
pub mod services;
pub mod storage;
pub mod workspace;

pub use workspace::Workspace;
