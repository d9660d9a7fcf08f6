pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::planner_store::{Direction, PlannerPhase, PlannerStore, RetryPolicy};
pub use domain::models::{DayCell, Event, EventId, MonthView, ViewMonth};
pub use error::PlannerError;
pub use infrastructure::planner_api::{HttpPlannerApi, PlannerApi, PlannerApiConfig};
