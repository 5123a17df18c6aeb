pub mod project;
pub mod store;
pub mod task;
pub mod tree;
