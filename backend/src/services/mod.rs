pub mod host_service;
pub mod persistence_service;
pub mod scheduler_service;
pub mod wheel_service;
