// Persistence: key-value backends, durable chapter records, project library.

pub mod chapters;
pub mod kv;
pub mod meta_db;
pub mod projects;
