#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Alert dashboard orchestration.
//!
//! [`DashboardController`] is the single entry point a UI shell talks to:
//! it owns the map overlay, fetches alerts through an
//! [`reach_source::AlertSource`], and turns user actions (date range,
//! filters, marker and map clicks) into camera moves, highlights and a
//! [`DetailView`].

pub mod config;
pub mod controller;
pub mod detail;
pub mod popup;

pub use config::{ConfigError, DashboardConfig};
pub use controller::{DashboardController, FetchStatus, FetchTicket};
pub use detail::{DetailKind, DetailView};
