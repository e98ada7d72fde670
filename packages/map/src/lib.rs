#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map overlay control on top of an injected map engine.
//!
//! The rendering engine itself is external and reached only through the
//! [`MapEngine`] trait. [`OverlayController`] owns the engine handle and
//! funnels every mutation through its methods: camera moves, full marker
//! replacement, and a single-slot polygon highlight that waits for the
//! style to load and retries across renderer context loss.
//!
//! Nothing here blocks. Work that cannot run yet is parked in a
//! [`Deferred`] queue and resumed by [`OverlayController::on_event`]
//! (style ready) or [`OverlayController::poll`] (timer due).

pub mod engine;
pub mod headless;
pub mod overlay;
pub mod schedule;

pub use engine::{
    EngineError, LayerPaint, LayerSpec, MapEngine, MapEvent, MapInteraction, Marker, MarkerId,
};
pub use headless::{HeadlessEngine, HeadlessSnapshot, SourceSnapshot};
pub use overlay::{
    HighlightOutcome, HighlightPolygon, HighlightState, HighlightStyle, OverlayController,
};
pub use schedule::{Clock, Deferred, ManualClock, RetryPolicy, SystemClock, Trigger};
