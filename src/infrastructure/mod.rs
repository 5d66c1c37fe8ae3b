pub mod database;
pub mod error;

pub use database::Database;
pub use error::{AppError, AppResult};
