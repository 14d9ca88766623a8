pub mod port;
pub mod service;
