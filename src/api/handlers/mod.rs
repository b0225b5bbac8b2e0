pub mod generate_file;
pub mod health;
pub mod hooks;
pub mod migrate;
pub mod settings;
