//! HTTP front-end of the revenue prediction service

pub mod api;
pub mod config;
