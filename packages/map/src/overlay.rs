//! The overlay controller: camera, markers and the polygon highlight.
//!
//! The highlight is a single slot. Asking for a new one always clears the
//! old one first and cancels any highlight still waiting to be applied,
//! so at most one polygon is ever shown or pending.
//!
//! Applying a highlight adds one `GeoJSON` source and two layers bound to
//! it (fill, then outline). It can fail for transient reasons: the style
//! is still loading, or the renderer lost its context. A request made
//! before the style is ready waits for [`MapEvent::StyleLoaded`]; a
//! request whose layer add fails is retried on a timer per the
//! [`RetryPolicy`] and then abandoned. Neither case is an error for the
//! caller.

use geojson::GeoJson;
use reach_geometry::{LngLat, RawAreaGeometry, to_geojson_polygon};
use serde::{Deserialize, Serialize};

use crate::engine::{
    EngineError, LayerPaint, LayerSpec, MapEngine, MapEvent, MapInteraction, Marker, MarkerId,
};
use crate::schedule::{Clock, Deferred, RetryPolicy, SystemClock, Trigger};

/// Source ID backing the highlight layers.
pub const HIGHLIGHT_SOURCE_ID: &str = "alert-highlight";
/// Fill layer ID.
pub const HIGHLIGHT_FILL_LAYER_ID: &str = "alert-highlight-fill";
/// Outline layer ID.
pub const HIGHLIGHT_OUTLINE_LAYER_ID: &str = "alert-highlight-outline";

/// Paint settings for the highlight layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightStyle {
    /// Fill color.
    pub fill_color: String,
    /// Fill opacity; keep it low so the base map stays readable.
    pub fill_opacity: f64,
    /// Outline color.
    pub outline_color: String,
    /// Outline width in pixels.
    pub outline_width: f64,
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self {
            fill_color: "#ef4444".to_string(),
            fill_opacity: 0.25,
            outline_color: "#b91c1c".to_string(),
            outline_width: 2.0,
        }
    }
}

/// A polygon ready to be drawn as a highlight.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightPolygon {
    ring: Vec<LngLat>,
    data: GeoJson,
}

impl HighlightPolygon {
    /// Extracts the polygon from an area geometry.
    ///
    /// Returns `None` for geometries without polygon data (points, bare
    /// pairs, unparseable WKT, rings under three points).
    #[must_use]
    pub fn from_geometry(geometry: &RawAreaGeometry) -> Option<Self> {
        let ring = geometry.polygon_ring()?;
        let data = to_geojson_polygon(&ring)?;
        Some(Self { ring, data })
    }

    /// The outer ring as parsed.
    #[must_use]
    pub fn ring(&self) -> &[LngLat] {
        &self.ring
    }

    /// The `GeoJSON` feature handed to the engine.
    #[must_use]
    pub const fn data(&self) -> &GeoJson {
        &self.data
    }
}

/// What is currently highlighted.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HighlightState {
    /// Nothing.
    #[default]
    Empty,
    /// This polygon's layers are on the map.
    Showing(HighlightPolygon),
}

/// Result of a highlight attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightOutcome {
    /// The polygon is on the map.
    Shown,
    /// The style is not ready; the highlight will be applied once it is.
    Deferred,
    /// Adding the layers failed; a retry is scheduled.
    RetryScheduled,
    /// Adding the layers failed and no retries remain.
    Abandoned,
    /// The geometry has no polygon to draw; nothing changed.
    NoPolygon,
}

#[derive(Debug)]
struct HighlightJob {
    polygon: HighlightPolygon,
    retry: u32,
}

/// Owns the map engine handle and all overlay state.
pub struct OverlayController<E, C = SystemClock> {
    engine: E,
    clock: C,
    retry_policy: RetryPolicy,
    style: HighlightStyle,
    camera_target: Option<LngLat>,
    zoom: Option<f64>,
    markers: Vec<(MarkerId, String)>,
    highlight: HighlightState,
    pending: Deferred<HighlightJob>,
}

impl<E: MapEngine> OverlayController<E, SystemClock> {
    /// Creates a controller on the system clock.
    #[must_use]
    pub fn new(engine: E, retry_policy: RetryPolicy) -> Self {
        Self::with_clock(engine, SystemClock, retry_policy)
    }
}

impl<E: MapEngine, C: Clock> OverlayController<E, C> {
    /// Creates a controller with an explicit clock.
    #[must_use]
    pub fn with_clock(engine: E, clock: C, retry_policy: RetryPolicy) -> Self {
        Self {
            engine,
            clock,
            retry_policy,
            style: HighlightStyle::default(),
            camera_target: None,
            zoom: None,
            markers: Vec::new(),
            highlight: HighlightState::Empty,
            pending: Deferred::new(),
        }
    }

    /// Replaces the highlight paint settings.
    #[must_use]
    pub fn with_highlight_style(mut self, style: HighlightStyle) -> Self {
        self.style = style;
        self
    }

    /// The engine handle, for inspection.
    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// The current highlight.
    #[must_use]
    pub const fn highlight_state(&self) -> &HighlightState {
        &self.highlight
    }

    /// Whether a highlight is waiting on the style or a retry timer.
    #[must_use]
    pub fn has_pending_highlight(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Where the camera was last sent.
    #[must_use]
    pub const fn camera_target(&self) -> Option<LngLat> {
        self.camera_target
    }

    /// The zoom the camera was last sent to.
    #[must_use]
    pub const fn zoom(&self) -> Option<f64> {
        self.zoom
    }

    /// Number of markers currently placed.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// When [`Self::poll`] next has work to do, if ever.
    #[must_use]
    pub fn next_deadline(&self) -> Option<std::time::Instant> {
        self.pending.next_deadline()
    }

    /// Flies the camera to `point`, keeping the current zoom when `zoom`
    /// is `None`. Does not wait for the animation.
    pub fn set_view(&mut self, point: LngLat, zoom: Option<f64>) {
        let zoom = zoom.unwrap_or_else(|| self.engine.zoom());

        if let Err(e) = self.engine.fly_to(point, zoom) {
            log::warn!("Camera move to {point} failed: {e}");
        }

        self.camera_target = Some(point);
        self.zoom = Some(zoom);
    }

    /// Removes every placed marker, then places `markers`.
    ///
    /// Markers the engine refuses are logged and skipped.
    pub fn set_markers(&mut self, markers: &[Marker]) {
        for (id, key) in self.markers.drain(..) {
            if let Err(e) = self.engine.remove_marker(id) {
                log::debug!("Removing marker {key} failed: {e}");
            }
        }

        for marker in markers {
            match self.engine.add_marker(marker) {
                Ok(id) => self.markers.push((id, marker.key.clone())),
                Err(e) => log::warn!("Adding marker {} failed: {e}", marker.key),
            }
        }

        log::debug!("Placed {}/{} markers", self.markers.len(), markers.len());
    }

    /// Highlights the polygon in `geometry`, replacing any current one.
    pub fn highlight(&mut self, geometry: &RawAreaGeometry) -> HighlightOutcome {
        let Some(polygon) = HighlightPolygon::from_geometry(geometry) else {
            log::debug!("Geometry has no polygon to highlight");
            return HighlightOutcome::NoPolygon;
        };

        self.clear_highlight();
        self.run(HighlightJob { polygon, retry: 0 })
    }

    /// Removes the highlight and cancels any pending one.
    ///
    /// Idempotent: missing layers and sources are not errors.
    pub fn clear_highlight(&mut self) {
        let cancelled = self.pending.cancel_all();
        if cancelled > 0 {
            log::debug!("Cancelled {cancelled} pending highlight(s)");
        }

        self.remove_highlight_layers();
        self.highlight = HighlightState::Empty;
    }

    /// Feeds an engine event to the controller.
    ///
    /// Lifecycle events resume or re-queue highlight work; clicks are
    /// translated into [`MapInteraction`]s for the caller.
    pub fn on_event(&mut self, event: MapEvent) -> Option<MapInteraction> {
        match event {
            MapEvent::StyleLoaded | MapEvent::ContextRestored => {
                for job in self.pending.take_style_ready() {
                    self.run(job);
                }
                None
            }
            MapEvent::ContextLost => {
                log::warn!("Map rendering context lost");
                if let HighlightState::Showing(polygon) = std::mem::take(&mut self.highlight) {
                    self.pending
                        .schedule(Trigger::StyleReady, HighlightJob { polygon, retry: 0 });
                }
                None
            }
            MapEvent::Click(point) => Some(MapInteraction::LocationSelected(point)),
            MapEvent::MarkerClicked(id) => self
                .markers
                .iter()
                .find(|(marker_id, _)| *marker_id == id)
                .map(|(_, key)| MapInteraction::MarkerSelected(key.clone())),
        }
    }

    /// Runs timed highlight work that is due.
    pub fn poll(&mut self) -> Vec<HighlightOutcome> {
        let due = self.pending.take_due(self.clock.now());
        due.into_iter().map(|job| self.run(job)).collect()
    }

    fn run(&mut self, job: HighlightJob) -> HighlightOutcome {
        if !self.engine.is_style_loaded() {
            log::debug!("Map style not loaded, deferring highlight");
            self.pending.schedule(Trigger::StyleReady, job);
            return HighlightOutcome::Deferred;
        }

        // Leftovers from a failed attempt or a reset renderer.
        self.remove_highlight_layers();

        match self.add_highlight_layers(&job.polygon) {
            Ok(()) => {
                self.highlight = HighlightState::Showing(job.polygon);
                HighlightOutcome::Shown
            }
            Err(e) => {
                self.remove_highlight_layers();
                let retry = job.retry + 1;

                if let Some(delay) = self.retry_policy.delay_before(retry) {
                    log::warn!("Highlight failed ({e}), retry {retry} in {delay:?}");
                    let at = self.clock.now() + delay;
                    self.pending.schedule(
                        Trigger::At(at),
                        HighlightJob {
                            polygon: job.polygon,
                            retry,
                        },
                    );
                    HighlightOutcome::RetryScheduled
                } else {
                    log::warn!("Highlight failed ({e}), giving up");
                    HighlightOutcome::Abandoned
                }
            }
        }
    }

    fn add_highlight_layers(&mut self, polygon: &HighlightPolygon) -> Result<(), EngineError> {
        self.engine.add_source(HIGHLIGHT_SOURCE_ID, polygon.data())?;
        self.engine.add_layer(&LayerSpec {
            id: HIGHLIGHT_FILL_LAYER_ID.to_string(),
            source: HIGHLIGHT_SOURCE_ID.to_string(),
            paint: LayerPaint::Fill {
                color: self.style.fill_color.clone(),
                opacity: self.style.fill_opacity,
            },
        })?;
        self.engine.add_layer(&LayerSpec {
            id: HIGHLIGHT_OUTLINE_LAYER_ID.to_string(),
            source: HIGHLIGHT_SOURCE_ID.to_string(),
            paint: LayerPaint::Line {
                color: self.style.outline_color.clone(),
                width: self.style.outline_width,
            },
        })?;
        Ok(())
    }

    /// Layers go before their source: a source cannot be removed while a
    /// layer references it.
    fn remove_highlight_layers(&mut self) {
        for layer in [HIGHLIGHT_FILL_LAYER_ID, HIGHLIGHT_OUTLINE_LAYER_ID] {
            if self.engine.has_layer(layer) {
                log_removal(layer, self.engine.remove_layer(layer));
            }
        }

        if self.engine.has_source(HIGHLIGHT_SOURCE_ID) {
            log_removal(
                HIGHLIGHT_SOURCE_ID,
                self.engine.remove_source(HIGHLIGHT_SOURCE_ID),
            );
        }
    }
}

fn log_removal(id: &str, result: Result<(), EngineError>) {
    match result {
        Ok(()) => {}
        Err(e) if e.is_not_found() => log::debug!("{id} already gone"),
        Err(e) => log::warn!("Removing {id} failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::headless::HeadlessEngine;
    use crate::schedule::ManualClock;

    fn square(offset: f64) -> RawAreaGeometry {
        RawAreaGeometry::Wkt(format!(
            "POLYGON(({o} {o}, {p} {o}, {p} {p}, {o} {p}, {o} {o}))",
            o = offset,
            p = offset + 1.0
        ))
    }

    fn controller(
        engine: &HeadlessEngine,
        clock: &ManualClock,
    ) -> OverlayController<HeadlessEngine, ManualClock> {
        OverlayController::with_clock(engine.clone(), clock.clone(), RetryPolicy::default())
    }

    fn showing_ring(controller: &OverlayController<HeadlessEngine, ManualClock>) -> Vec<LngLat> {
        match controller.highlight_state() {
            HighlightState::Showing(polygon) => polygon.ring().to_vec(),
            HighlightState::Empty => panic!("expected a highlight"),
        }
    }

    #[test]
    fn highlight_adds_source_fill_and_outline() {
        let engine = HeadlessEngine::loaded(LngLat::new(85.3, 27.7), 7.0);
        let clock = ManualClock::new();
        let mut overlay = controller(&engine, &clock);

        assert_eq!(overlay.highlight(&square(0.0)), HighlightOutcome::Shown);
        assert_eq!(
            engine.layer_ids(),
            vec![HIGHLIGHT_FILL_LAYER_ID, HIGHLIGHT_OUTLINE_LAYER_ID]
        );
        assert!(engine.has_source(HIGHLIGHT_SOURCE_ID));
    }

    #[test]
    fn second_highlight_replaces_first() {
        let engine = HeadlessEngine::loaded(LngLat::new(0.0, 0.0), 5.0);
        let clock = ManualClock::new();
        let mut overlay = controller(&engine, &clock);

        overlay.highlight(&square(0.0));
        assert_eq!(overlay.highlight(&square(10.0)), HighlightOutcome::Shown);

        assert_eq!(engine.layer_count(), 2);
        assert_eq!(engine.source_count(), 1);
        assert_eq!(showing_ring(&overlay)[0], LngLat::new(10.0, 10.0));

        let expected = HighlightPolygon::from_geometry(&square(10.0)).unwrap();
        assert_eq!(
            engine.source_data(HIGHLIGHT_SOURCE_ID).as_ref(),
            Some(expected.data())
        );
    }

    #[test]
    fn clear_is_idempotent() {
        let engine = HeadlessEngine::loaded(LngLat::new(0.0, 0.0), 5.0);
        let clock = ManualClock::new();
        let mut overlay = controller(&engine, &clock);

        overlay.clear_highlight();
        assert_eq!(engine.layer_count(), 0);

        overlay.highlight(&square(0.0));
        overlay.clear_highlight();
        overlay.clear_highlight();

        assert_eq!(engine.layer_count(), 0);
        assert_eq!(engine.source_count(), 0);
        assert_eq!(overlay.highlight_state(), &HighlightState::Empty);
    }

    #[test]
    fn point_geometry_is_a_no_op() {
        let engine = HeadlessEngine::loaded(LngLat::new(0.0, 0.0), 5.0);
        let clock = ManualClock::new();
        let mut overlay = controller(&engine, &clock);
        overlay.highlight(&square(0.0));

        let point = RawAreaGeometry::Point(LngLat::new(70.1, 31.2));
        assert_eq!(overlay.highlight(&point), HighlightOutcome::NoPolygon);
        assert_eq!(engine.layer_count(), 2);
    }

    #[test]
    fn highlight_waits_for_style() {
        let engine = HeadlessEngine::new(LngLat::new(0.0, 0.0), 5.0);
        let clock = ManualClock::new();
        let mut overlay = controller(&engine, &clock);

        assert_eq!(overlay.highlight(&square(0.0)), HighlightOutcome::Deferred);
        assert_eq!(engine.layer_count(), 0);
        assert!(overlay.has_pending_highlight());

        engine.load_style();
        overlay.on_event(MapEvent::StyleLoaded);

        assert_eq!(engine.layer_count(), 2);
        assert!(!overlay.has_pending_highlight());
    }

    #[test]
    fn newer_deferred_highlight_wins() {
        let engine = HeadlessEngine::new(LngLat::new(0.0, 0.0), 5.0);
        let clock = ManualClock::new();
        let mut overlay = controller(&engine, &clock);

        overlay.highlight(&square(0.0));
        overlay.highlight(&square(20.0));

        engine.load_style();
        overlay.on_event(MapEvent::StyleLoaded);

        assert_eq!(engine.layer_count(), 2);
        assert_eq!(showing_ring(&overlay)[0], LngLat::new(20.0, 20.0));
    }

    #[test]
    fn clear_cancels_deferred_highlight() {
        let engine = HeadlessEngine::new(LngLat::new(0.0, 0.0), 5.0);
        let clock = ManualClock::new();
        let mut overlay = controller(&engine, &clock);

        overlay.highlight(&square(0.0));
        overlay.clear_highlight();

        engine.load_style();
        overlay.on_event(MapEvent::StyleLoaded);

        assert_eq!(engine.layer_count(), 0);
    }

    #[test]
    fn failed_add_is_retried_once_after_delay() {
        let engine = HeadlessEngine::loaded(LngLat::new(0.0, 0.0), 5.0);
        let clock = ManualClock::new();
        let mut overlay = controller(&engine, &clock);
        engine.fail_next_layer_adds(1);

        assert_eq!(
            overlay.highlight(&square(0.0)),
            HighlightOutcome::RetryScheduled
        );
        assert_eq!(engine.layer_count(), 0);
        assert_eq!(engine.source_count(), 0);

        assert!(overlay.poll().is_empty());

        clock.advance(Duration::from_millis(300));
        assert_eq!(overlay.poll(), vec![HighlightOutcome::Shown]);
        assert_eq!(engine.layer_count(), 2);
    }

    #[test]
    fn second_failure_gives_up_silently() {
        let engine = HeadlessEngine::loaded(LngLat::new(0.0, 0.0), 5.0);
        let clock = ManualClock::new();
        let mut overlay = controller(&engine, &clock);
        engine.fail_next_layer_adds(2);

        overlay.highlight(&square(0.0));
        clock.advance(Duration::from_secs(1));

        assert_eq!(overlay.poll(), vec![HighlightOutcome::Abandoned]);
        assert_eq!(engine.layer_count(), 0);
        assert_eq!(overlay.highlight_state(), &HighlightState::Empty);
        assert!(!overlay.has_pending_highlight());
    }

    #[test]
    fn highlight_survives_context_loss() {
        let engine = HeadlessEngine::loaded(LngLat::new(0.0, 0.0), 5.0);
        let clock = ManualClock::new();
        let mut overlay = controller(&engine, &clock);
        overlay.highlight(&square(3.0));

        engine.lose_context();
        overlay.on_event(MapEvent::ContextLost);
        assert_eq!(engine.layer_count(), 0);
        assert!(overlay.has_pending_highlight());

        engine.restore_context();
        overlay.on_event(MapEvent::ContextRestored);

        assert_eq!(engine.layer_count(), 2);
        assert_eq!(showing_ring(&overlay)[0], LngLat::new(3.0, 3.0));
    }

    #[test]
    fn highlight_requested_during_context_loss_waits_for_restore() {
        let engine = HeadlessEngine::loaded(LngLat::new(0.0, 0.0), 5.0);
        let clock = ManualClock::new();
        let mut overlay = controller(&engine, &clock);

        engine.lose_context();
        overlay.on_event(MapEvent::ContextLost);
        assert_eq!(overlay.highlight(&square(0.0)), HighlightOutcome::Deferred);

        engine.restore_context();
        overlay.on_event(MapEvent::ContextRestored);
        assert_eq!(engine.layer_count(), 2);
    }

    #[test]
    fn set_view_uses_current_zoom_when_unspecified() {
        let engine = HeadlessEngine::loaded(LngLat::new(0.0, 0.0), 7.0);
        let clock = ManualClock::new();
        let mut overlay = controller(&engine, &clock);

        overlay.set_view(LngLat::new(85.1, 27.1), None);
        assert_eq!(engine.center(), LngLat::new(85.1, 27.1));
        assert!((engine.zoom() - 7.0).abs() < f64::EPSILON);

        overlay.set_view(LngLat::new(83.9, 28.2), Some(12.0));
        assert!((engine.zoom() - 12.0).abs() < f64::EPSILON);
        assert_eq!(overlay.camera_target(), Some(LngLat::new(83.9, 28.2)));
    }

    #[test]
    fn set_markers_replaces_everything() {
        let engine = HeadlessEngine::loaded(LngLat::new(0.0, 0.0), 7.0);
        let clock = ManualClock::new();
        let mut overlay = controller(&engine, &clock);

        let marker = |key: &str| Marker {
            key: key.to_string(),
            position: LngLat::new(1.0, 1.0),
            popup_html: None,
        };

        overlay.set_markers(&[marker("a"), marker("b"), marker("c")]);
        assert_eq!(engine.marker_count(), 3);

        overlay.set_markers(&[marker("d")]);
        assert_eq!(engine.marker_count(), 1);
        assert_eq!(overlay.marker_count(), 1);
        assert_eq!(engine.marker_keys(), vec!["d"]);
    }

    #[test]
    fn clicks_become_interactions() {
        let engine = HeadlessEngine::loaded(LngLat::new(0.0, 0.0), 7.0);
        let clock = ManualClock::new();
        let mut overlay = controller(&engine, &clock);
        overlay.set_markers(&[Marker {
            key: "alert-7".to_string(),
            position: LngLat::new(1.0, 1.0),
            popup_html: None,
        }]);

        let id = engine.marker_id("alert-7").unwrap();
        assert_eq!(
            overlay.on_event(MapEvent::MarkerClicked(id)),
            Some(MapInteraction::MarkerSelected("alert-7".to_string()))
        );
        assert_eq!(
            overlay.on_event(MapEvent::Click(LngLat::new(2.0, 3.0))),
            Some(MapInteraction::LocationSelected(LngLat::new(2.0, 3.0)))
        );
        assert_eq!(overlay.on_event(MapEvent::MarkerClicked(MarkerId(999))), None);
    }
}
