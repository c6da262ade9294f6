pub mod alarm_service;
pub mod app;
pub mod bootstrap;
pub mod plan;
