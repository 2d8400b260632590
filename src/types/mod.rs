// src/types/mod.rs
pub mod application;
pub mod job;
pub mod response;

pub use application::{first_application, ApplicationData};
pub use job::{ParsedJobData, SalaryRange};
