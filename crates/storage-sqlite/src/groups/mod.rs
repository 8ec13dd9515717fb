pub mod model;
pub mod repository;

pub use model::{GroupDB, MemberDB};
pub use repository::GroupRepository;
