//! Goals module - the goal lifecycle state machine.

mod goals_model;
mod goals_service;
mod goals_traits;


pub use goals_model::{
    due_transition, duration_months, validate_goal_fields, ConfirmationStatus, Goal,
    GoalConfirmation, GoalDetail, GoalParticipant, GoalStatus, NewGoal,
};
pub use goals_service::GoalService;
pub(crate) use goals_service::{apply_time_transition, validate_duration_ladder};
pub use goals_traits::{GoalRepositoryTrait, GoalServiceTrait};
