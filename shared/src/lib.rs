pub mod config;
pub mod constants;
pub mod error;
pub mod protocol;
pub mod rotation_store;
pub mod session;
pub mod slave_state;
pub mod timer;
pub mod wheel;
