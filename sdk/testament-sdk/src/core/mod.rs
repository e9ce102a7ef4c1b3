pub mod abi;
pub mod connection;
pub mod constants;
