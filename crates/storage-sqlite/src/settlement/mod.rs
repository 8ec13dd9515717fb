pub mod model;
pub mod repository;

pub use model::{CategoryCompletionDB, SettlementConfirmationDB};
pub use repository::SettlementRepository;
