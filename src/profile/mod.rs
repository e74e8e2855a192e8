pub mod planner;
pub mod profile;
