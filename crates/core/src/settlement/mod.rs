//! Settlement module - end-of-period tally, sign-off, and archival.

mod settlement_model;
mod settlement_service;
mod settlement_traits;


pub use settlement_model::{
    duration_ladder_months, AchieverResult, CategoryCompletion, SettlementConfirmation,
    SettlementResult,
};
pub use settlement_service::SettlementService;
pub use settlement_traits::{SettlementRepositoryTrait, SettlementServiceTrait};
