pub mod cli;
pub mod error;
pub mod model;
pub mod provider;
pub mod services;
pub mod session;
pub mod settings;
pub mod shell;
pub mod state_machine;
pub mod store;
pub mod view;
pub mod wire;
