pub mod cdn;
pub mod key_generator;
pub mod offload;
pub mod settings;
pub mod storage;
