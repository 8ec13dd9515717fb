pub mod model;
pub mod repository;

pub use model::{CheckinDB, CheckinReviewDB};
pub use repository::CheckinRepository;
