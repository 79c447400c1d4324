pub mod service;

pub use service::PlanningService;
