// Core logging module - event models, snapshot cache and channel routing.

pub mod logging_models;
pub mod logging_service;

pub use logging_models::*;
pub use logging_service::*;
