// Service exports
pub mod memory;
pub mod postgres;
pub mod predictor;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use predictor::PredictionClient;
pub use store::{FeedbackWrite, MatchStore, StoreError};
