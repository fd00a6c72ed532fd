#![allow(clippy::result_large_err)]

pub use build_env::BuildEnv;
pub use callback::*;
pub use ops::Operation;
pub use options::*;

mod callback;
mod installation_variables;
mod ops;
mod options;
mod tools;

pub mod build_env;
pub mod config;
pub mod error;
pub mod hardware;
