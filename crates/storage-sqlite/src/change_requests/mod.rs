pub mod model;
pub mod repository;

pub use model::{ChangeRequestDB, ChangeVoteDB};
pub use repository::ChangeRequestRepository;
