pub mod database;
pub mod role;
