pub mod sqlite_settings_store;
pub use sqlite_settings_store::SqliteSettingsStore;
