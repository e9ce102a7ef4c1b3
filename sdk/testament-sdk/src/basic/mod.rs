pub mod coordinator;
pub mod gateway;
pub mod role;
