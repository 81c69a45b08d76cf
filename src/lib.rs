#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub(crate) mod api;
pub mod app;
pub mod clients;
pub mod config;
pub mod curation;
pub mod observability;
pub mod scheduler;
pub mod store;
pub mod templates;
pub mod util;
