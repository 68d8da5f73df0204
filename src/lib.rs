pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod gpu;
pub mod processing;
pub mod scan;
pub mod view;
pub mod tasks {
    pub mod refresh;
}
