pub mod activity;
pub mod contact;
pub mod job;
pub mod profile;
pub mod taxonomy;
pub mod text;

mod error;

pub use error::{Error, Result};
