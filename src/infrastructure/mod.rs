pub mod config;
pub mod error;
pub mod exact_alarm;
pub mod notification_center;
pub mod state_repository;
pub mod trigger_backend;
pub mod weekday;
