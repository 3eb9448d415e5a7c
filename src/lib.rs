//! Full-screen display client for a hosted image API.
//!
//! The [`poller`] turns the settings published by the [`settings_store`] into
//! a stream of [`model::UiState`] values; the surfaces in the binary render
//! whichever state is current.

pub mod api_client;
pub mod config;
pub mod errors;
pub mod image_loader;
pub mod media_cache;
pub mod model;
pub mod poller;
pub mod settings_store;
