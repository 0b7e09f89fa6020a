pub mod app_services;
pub mod error;
pub mod grid_cache;
pub mod pipeline;
pub mod renderer;
pub mod select_sheet;
pub mod settings;
pub mod status_poller;
pub mod upload_session;
