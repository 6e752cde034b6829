pub mod assessment;
pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod result;
pub mod routes;
pub mod state;
