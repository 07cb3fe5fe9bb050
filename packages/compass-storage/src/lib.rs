pub mod accounts;
pub mod applicants;
pub mod db;
pub mod deliveries;
pub mod jobs;
pub mod models;
pub mod outbox;
pub mod profiles;
pub mod recommendations;
pub mod schema;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
