// src/services/mod.rs
pub mod gateway;
pub mod history_store;
pub mod http_gateway;
pub mod image_processor;

pub use gateway::ImageGateway;
pub use history_store::HistoryStore;
pub use http_gateway::HttpGateway;
pub use image_processor::ImageProcessor;
