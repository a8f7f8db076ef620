pub mod admin;

pub use admin::{AdminState, admin_routes};
