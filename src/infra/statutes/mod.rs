pub mod release_client;
pub mod sqlite_store;

pub use release_client::ReleaseClient;
pub use sqlite_store::SqliteStatuteStore;
