// Core tags module - canned responses.

pub mod tag_models;
pub mod tag_service;

pub use tag_models::*;
pub use tag_service::*;
