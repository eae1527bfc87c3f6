pub mod afk_service;

pub use afk_service::*;
