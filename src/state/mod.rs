mod sqlite;

pub use sqlite::SqliteItineraryStore;
