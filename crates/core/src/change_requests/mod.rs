//! Change requests module - unanimous-consent goal modification/cancellation.

mod change_requests_model;
mod change_requests_service;
mod change_requests_traits;


pub use change_requests_model::{
    effective_expiry, ChangeRequest, ChangeRequestDetail, ChangeRequestStatus, ChangeRequestType,
    ChangeVote, ProposedChanges, VoteStatus,
};
pub use change_requests_service::ChangeRequestService;
pub use change_requests_traits::{ChangeRequestRepositoryTrait, ChangeRequestServiceTrait};
