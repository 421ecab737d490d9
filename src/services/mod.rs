pub mod classifier;
pub mod eta_builder;
pub mod geocoder;
pub mod llm;
pub mod planner;
pub mod routing;
pub mod timezone;
pub mod trip_machine;
pub mod validator;
