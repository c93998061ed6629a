//! Gated Content Analytics API Library
//!
//! Backend for the gated content dashboard: fetches aggregates and leads from the
//! `gated-content-api` edge function, classifies leads into funnel stages and
//! serves page-shaped JSON behind a shared-password session.
//!
//! # Modules
//!
//! - `auth`: Password login, sessions and the session middleware.
//! - `cache_validator`: Checksummed cache entries for upstream responses.
//! - `circuit_breaker`: Circuit breaker for upstream calls.
//! - `classification`: Pre-MQL / MQL classifier.
//! - `config`: Configuration management.
//! - `dashboard`: Page view models.
//! - `errors`: Error handling types.
//! - `funnel`: Lead → MQL funnel statistics.
//! - `gated_content_client`: Edge function client.
//! - `handlers`: HTTP request handlers.
//! - `labels`: Display labels, bands and groupings.
//! - `lead_filter`: In-memory lead filtering and sorting.
//! - `models`: Upstream data models.
//! - `routes`: Router and middleware stack.

pub mod auth;
pub mod cache_validator;
pub mod circuit_breaker;
pub mod classification;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod funnel;
pub mod gated_content_client;
pub mod handlers;
pub mod labels;
pub mod lead_filter;
pub mod models;
pub mod routes;
