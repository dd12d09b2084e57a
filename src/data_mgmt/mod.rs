pub mod last_sensor_cache;
pub mod models;
pub mod publish;
