pub mod model;
pub mod repository;

pub use model::{GoalConfirmationDB, GoalDB, GoalParticipantDB};
pub use repository::GoalRepository;
