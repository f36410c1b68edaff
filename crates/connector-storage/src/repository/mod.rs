//! Database repositories for each table.

pub mod kv;

pub use kv::KvRepo;
