//! # Arena Tracker
//!
//! Records match results for a competitive arena game and serves derived
//! statistics to presentation layers.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (matches, participants, profiles)
//!   and the tolerant document-conversion layer
//! - **store**: Document store boundary and the in-memory implementation
//! - **query**: Query planner with missing-index fallback, and the batch
//!   participant loader
//! - **cache**: Versioned TTL result cache, invalidation events, and the
//!   request-scoped fetch memo
//! - **analytics**: Aggregation pipelines (activity, win rates, class
//!   stats, durations, totals, leaderboards, rating history)
//! - **service**: Mutation path (create/update/delete) and the rating
//!   engine
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod analytics;
pub mod api;
pub mod cache;
pub mod config;
pub mod models;
pub mod query;
pub mod service;
pub mod store;

pub use models::*;
