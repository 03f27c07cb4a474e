pub mod config;
pub mod error;
pub mod linearize;
pub mod marker;
pub mod pdf;
pub mod pipeline;
pub mod tools;
