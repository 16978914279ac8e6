pub mod history;
pub mod loader;
pub mod read;
