//! The dashboard controller.
//!
//! Ties an [`AlertSource`] to an [`OverlayController`]: fetches alerts
//! for the current date range, turns them into view models and markers,
//! applies local severity/category filters, and drives selection (camera
//! move, polygon highlight, detail panel).
//!
//! Fetches are stamped with a generation number. Only the result of the
//! most recently started fetch is applied; an older one finishing late is
//! dropped.

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use reach_alert::{TransformConfig, transform_all};
use reach_alert_models::{AlertCategory, AlertSeverity, AlertViewModel, RawAlert};
use reach_geometry::LngLat;
use reach_map::{
    Clock, HighlightOutcome, MapEngine, MapEvent, MapInteraction, Marker, OverlayController,
    SystemClock,
};
use reach_source::{AlertFilter, AlertSource, SourceError};
use serde::Serialize;

use crate::config::DashboardConfig;
use crate::detail::DetailView;
use crate::popup::marker_for;

/// State of the alert list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum FetchStatus {
    /// Nothing fetched yet.
    #[default]
    Idle,
    /// A fetch is in flight.
    Loading,
    /// The last fetch succeeded.
    Ready,
    /// The last fetch failed. Alerts from before it are still shown.
    Failed(String),
}

/// Identifies one started fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    filter: AlertFilter,
}

impl FetchTicket {
    /// Monotonic fetch number.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// The filter to fetch with.
    #[must_use]
    pub const fn filter(&self) -> &AlertFilter {
        &self.filter
    }
}

/// Coordinates the alert list, the map overlay and the detail panel.
pub struct DashboardController<E, C = SystemClock> {
    source: Arc<dyn AlertSource>,
    overlay: OverlayController<E, C>,
    transform: TransformConfig,
    select_zoom: f64,
    filter: AlertFilter,
    min_severity: AlertSeverity,
    categories: Vec<AlertCategory>,
    alerts: Vec<AlertViewModel>,
    status: FetchStatus,
    generation: u64,
    detail: Option<DetailView>,
}

impl<E: MapEngine> DashboardController<E, SystemClock> {
    /// Creates a controller on the system clock.
    #[must_use]
    pub fn new(engine: E, source: Arc<dyn AlertSource>, config: &DashboardConfig) -> Self {
        Self::with_clock(engine, SystemClock, source, config)
    }
}

impl<E: MapEngine, C: Clock> DashboardController<E, C> {
    /// Creates a controller and moves the camera to the configured start
    /// view.
    #[must_use]
    pub fn with_clock(
        engine: E,
        clock: C,
        source: Arc<dyn AlertSource>,
        config: &DashboardConfig,
    ) -> Self {
        let mut overlay = OverlayController::with_clock(engine, clock, config.highlight.retry)
            .with_highlight_style(config.highlight.style.clone());
        overlay.set_view(config.map.center, Some(config.map.zoom));

        Self {
            source,
            overlay,
            transform: config.transform,
            select_zoom: config.map.select_zoom,
            filter: AlertFilter::default(),
            min_severity: AlertSeverity::Unknown,
            categories: Vec::new(),
            alerts: Vec::new(),
            status: FetchStatus::Idle,
            generation: 0,
            detail: None,
        }
    }

    /// The overlay controller, for inspection.
    #[must_use]
    pub const fn overlay(&self) -> &OverlayController<E, C> {
        &self.overlay
    }

    /// Every alert from the last successful fetch.
    #[must_use]
    pub fn alerts(&self) -> &[AlertViewModel] {
        &self.alerts
    }

    /// Fetch state.
    #[must_use]
    pub const fn status(&self) -> &FetchStatus {
        &self.status
    }

    /// The date filter sent with fetches.
    #[must_use]
    pub const fn filter(&self) -> &AlertFilter {
        &self.filter
    }

    /// The open detail panel, if any.
    #[must_use]
    pub const fn detail(&self) -> Option<&DetailView> {
        self.detail.as_ref()
    }

    /// ID of the selected alert, if an alert (not a location) is selected.
    #[must_use]
    pub fn selected_alert_id(&self) -> Option<&str> {
        self.detail
            .as_ref()
            .filter(|detail| !detail.is_location())
            .map(|detail| detail.id.as_str())
    }

    /// Alerts passing the local severity and category filters, in fetch
    /// order.
    #[must_use]
    pub fn visible_alerts(&self) -> Vec<&AlertViewModel> {
        self.alerts
            .iter()
            .filter(|alert| alert.severity >= self.min_severity)
            .filter(|alert| self.categories.is_empty() || self.categories.contains(&alert.category))
            .collect()
    }

    /// Starts a fetch for the current filter.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        self.status = FetchStatus::Loading;
        log::debug!("Starting fetch #{} ({:?})", self.generation, self.filter);

        FetchTicket {
            generation: self.generation,
            filter: self.filter,
        }
    }

    /// Applies the result of the fetch identified by `ticket`.
    ///
    /// Returns `false` and changes nothing if a newer fetch has started
    /// since. On failure the previous alerts stay in place.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<RawAlert>, SourceError>,
    ) -> bool {
        if ticket.generation != self.generation {
            log::debug!(
                "Discarding stale fetch #{} (latest is #{})",
                ticket.generation,
                self.generation
            );
            return false;
        }

        match result {
            Ok(raw) => {
                self.alerts = transform_all(&raw, &self.transform);
                self.status = FetchStatus::Ready;
                log::info!("Loaded {} alerts", self.alerts.len());

                let selection_gone = self
                    .selected_alert_id()
                    .is_some_and(|id| !self.alerts.iter().any(|alert| alert.id == id));
                if selection_gone {
                    log::debug!("Selected alert is no longer listed, closing detail");
                    self.close_detail();
                }
                self.sync_markers();
            }
            Err(e) if e.is_network() => {
                log::warn!("Alert source {} unreachable: {e}", self.source.name());
                self.status = FetchStatus::Failed(e.to_string());
            }
            Err(e) => {
                log::warn!("Failed to fetch alerts from {}: {e}", self.source.name());
                self.status = FetchStatus::Failed(e.to_string());
            }
        }

        true
    }

    /// Fetches alerts for the current filter and applies them.
    pub async fn refresh(&mut self) -> &FetchStatus {
        let ticket = self.begin_fetch();
        let source = Arc::clone(&self.source);
        let result = source.fetch_alerts(ticket.filter()).await;
        self.complete_fetch(ticket, result);
        &self.status
    }

    /// Sets the inclusive date range (reversed bounds are swapped) and
    /// refetches.
    pub async fn set_date_range(
        &mut self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> &FetchStatus {
        self.filter = AlertFilter::new(start, end);
        self.refresh().await
    }

    /// Sets the range to the `days` days before `today` through `today`
    /// and refetches.
    pub async fn set_recent_days(&mut self, days: u64, today: NaiveDate) -> &FetchStatus {
        let start = today
            .checked_sub_days(Days::new(days))
            .unwrap_or(NaiveDate::MIN);
        self.set_date_range(Some(start), Some(today)).await
    }

    /// Hides alerts below `severity`. [`AlertSeverity::Unknown`] shows all.
    pub fn set_min_severity(&mut self, severity: AlertSeverity) {
        self.min_severity = severity;
        self.sync_markers();
    }

    /// Shows only alerts in `categories`. An empty list shows all.
    pub fn set_categories(&mut self, categories: Vec<AlertCategory>) {
        self.categories = categories;
        self.sync_markers();
    }

    /// Selects an alert: flies to its point, highlights its polygon, and
    /// opens its detail. Returns `None` for an unknown ID.
    pub fn select_alert(&mut self, id: &str) -> Option<&DetailView> {
        let Some(alert) = self.alerts.iter().find(|alert| alert.id == id) else {
            log::warn!("Cannot select unknown alert {id}");
            return None;
        };
        let point = alert.point;
        let polygon = alert.polygon.clone();
        let detail = DetailView::for_alert(alert);

        self.overlay.set_view(point, Some(self.select_zoom));

        let outcome = polygon
            .as_ref()
            .map_or(HighlightOutcome::NoPolygon, |geometry| {
                self.overlay.highlight(geometry)
            });
        if outcome == HighlightOutcome::NoPolygon {
            self.overlay.clear_highlight();
        }
        log::debug!("Selected alert {id}: highlight {outcome:?}");

        self.detail = Some(detail);
        self.detail.as_ref()
    }

    /// Opens the detail of a clicked location and clears any highlight.
    pub fn select_location(&mut self, point: LngLat) -> &DetailView {
        self.overlay.clear_highlight();
        self.detail.insert(DetailView::for_location(point))
    }

    /// Closes the detail panel and clears the highlight.
    pub fn close_detail(&mut self) {
        self.detail = None;
        self.overlay.clear_highlight();
    }

    /// Routes an engine event through the overlay and acts on the
    /// resulting selection.
    pub fn handle_map_event(&mut self, event: MapEvent) {
        match self.overlay.on_event(event) {
            Some(MapInteraction::MarkerSelected(id)) => {
                self.select_alert(&id);
            }
            Some(MapInteraction::LocationSelected(point)) => {
                self.select_location(point);
            }
            None => {}
        }
    }

    /// Runs due overlay work (highlight retries).
    pub fn tick(&mut self) -> Vec<HighlightOutcome> {
        self.overlay.poll()
    }

    /// When [`Self::tick`] next has work to do.
    pub fn next_deadline(&self) -> Option<std::time::Instant> {
        self.overlay.next_deadline()
    }

    fn sync_markers(&mut self) {
        let markers: Vec<Marker> = self
            .visible_alerts()
            .into_iter()
            .map(marker_for)
            .collect();
        self.overlay.set_markers(&markers);
    }
}
