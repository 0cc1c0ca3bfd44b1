//! Data Transfer Objects (DTOs)
//!
//! DTOs are used for API boundaries and use case inputs/outputs.

mod order_dto;
mod plan_dto;

pub use order_dto::PlaceOrderDto;
pub use plan_dto::{CreatePlanDto, PlanDto};
