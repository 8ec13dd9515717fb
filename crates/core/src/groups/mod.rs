//! Groups module - pact groups and their member rosters.

mod groups_model;
mod groups_service;
mod groups_traits;


pub use groups_model::{Group, Member, MemberRole, NewGroup};
pub use groups_service::GroupService;
pub use groups_traits::{GroupRepositoryTrait, GroupServiceTrait};
