pub mod assignments;
pub mod autosave;
pub mod database;
pub mod debounce;
pub mod history;
pub mod kv;
pub mod reconcile;
pub mod schema;
