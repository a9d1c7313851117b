//! Daily light-exposure schedule from today's sunrise and sunset

pub mod config;
pub mod error;
pub mod geolocation;
pub mod home;
pub mod location;
pub mod preference;
pub mod schedule;
pub mod sun;
pub mod utils;
pub mod view;
