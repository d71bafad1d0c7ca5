pub mod planner;
pub mod series;
pub mod weather;
pub mod window;
