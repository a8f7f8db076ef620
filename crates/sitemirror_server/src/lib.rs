pub mod config;
pub mod db;
pub mod git_sync;
pub mod handlers;
pub mod mirror;
pub mod snapshot_writer;
