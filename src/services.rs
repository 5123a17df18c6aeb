pub mod calendar;
pub mod projects;
pub mod tasks;
pub mod views;
