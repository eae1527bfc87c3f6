// Expiring caches shared by the core services.

pub mod ttl_cache;

pub use ttl_cache::{CaseInsensitiveCache, TtlCache};
