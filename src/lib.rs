pub mod config;
pub mod export;
pub mod frame;
pub mod pipeline;
