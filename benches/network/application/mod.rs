pub mod mqtt;
pub mod rpc;
