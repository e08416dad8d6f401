// Document reading for uploaded financial reports

pub mod processor;

pub use processor::*;
