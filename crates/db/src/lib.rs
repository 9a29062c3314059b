pub mod connection;
pub mod models;
pub mod session;
pub mod statements;

pub use connection::{AdminConnectOptions, DBService, SslMode};
pub use session::AdminSession;
