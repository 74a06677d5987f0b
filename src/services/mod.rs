pub mod scan_service;
pub mod scanner;
pub mod scratch;
