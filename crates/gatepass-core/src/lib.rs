//! Core gatepass library (API client, session, queries, screens, config).

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod models;
pub mod query;
pub mod screens;
pub mod session;
