// Core moderation module - infraction ledger, escalation and detectors.
// Following the same pattern as the logging module.

pub mod detection;
pub mod escalation;
pub mod moderation_models;
pub mod moderation_service;

pub use detection::*;
pub use escalation::*;
pub use moderation_models::*;
pub use moderation_service::*;
