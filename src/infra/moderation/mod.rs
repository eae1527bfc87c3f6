pub mod sqlite_infraction_store;
pub use sqlite_infraction_store::SqliteInfractionStore;
