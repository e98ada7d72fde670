//! An in-memory [`MapEngine`] with no renderer.
//!
//! Used by the CLI to drive a dashboard session without a display, and by
//! tests to observe exactly which sources, layers and markers exist.
//! Clones share state, so a test can keep one handle for inspection while
//! the controller owns another.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use geojson::GeoJson;
use reach_geometry::LngLat;
use serde::Serialize;

use crate::engine::{EngineError, LayerSpec, MapEngine, Marker, MarkerId};

#[derive(Debug)]
struct HeadlessState {
    center: LngLat,
    zoom: f64,
    style_loaded: bool,
    context_lost: bool,
    failing_layer_adds: u32,
    next_marker_id: u64,
    markers: BTreeMap<MarkerId, Marker>,
    sources: Vec<(String, GeoJson)>,
    layers: Vec<LayerSpec>,
}

/// A shared handle to an in-memory map.
#[derive(Debug, Clone)]
pub struct HeadlessEngine {
    state: Rc<RefCell<HeadlessState>>,
}

/// Serializable view of a [`HeadlessEngine`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlessSnapshot {
    pub center: LngLat,
    pub zoom: f64,
    pub style_loaded: bool,
    pub context_lost: bool,
    pub markers: Vec<Marker>,
    pub sources: Vec<SourceSnapshot>,
    pub layers: Vec<LayerSpec>,
}

/// One source in a [`HeadlessSnapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct SourceSnapshot {
    pub id: String,
    pub data: GeoJson,
}

impl HeadlessEngine {
    /// Creates a map at `center`/`zoom` whose style has not loaded yet.
    #[must_use]
    pub fn new(center: LngLat, zoom: f64) -> Self {
        Self {
            state: Rc::new(RefCell::new(HeadlessState {
                center,
                zoom,
                style_loaded: false,
                context_lost: false,
                failing_layer_adds: 0,
                next_marker_id: 1,
                markers: BTreeMap::new(),
                sources: Vec::new(),
                layers: Vec::new(),
            })),
        }
    }

    /// Creates a map whose style is already loaded.
    #[must_use]
    pub fn loaded(center: LngLat, zoom: f64) -> Self {
        let engine = Self::new(center, zoom);
        engine.load_style();
        engine
    }

    /// Marks the style as loaded.
    pub fn load_style(&self) {
        self.state.borrow_mut().style_loaded = true;
    }

    /// Simulates renderer context loss: every source and layer is dropped
    /// and further style mutations fail until [`Self::restore_context`].
    pub fn lose_context(&self) {
        let mut state = self.state.borrow_mut();
        state.context_lost = true;
        state.layers.clear();
        state.sources.clear();
    }

    /// Ends a simulated context loss.
    pub fn restore_context(&self) {
        self.state.borrow_mut().context_lost = false;
    }

    /// Makes the next `count` layer additions fail with
    /// [`EngineError::ContextLost`].
    pub fn fail_next_layer_adds(&self, count: u32) {
        self.state.borrow_mut().failing_layer_adds = count;
    }

    /// Current camera center.
    #[must_use]
    pub fn center(&self) -> LngLat {
        self.state.borrow().center
    }

    /// Number of layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.state.borrow().layers.len()
    }

    /// Layer IDs in draw order.
    #[must_use]
    pub fn layer_ids(&self) -> Vec<String> {
        self.state
            .borrow()
            .layers
            .iter()
            .map(|layer| layer.id.clone())
            .collect()
    }

    /// Number of sources.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.state.borrow().sources.len()
    }

    /// Data of the source with this ID.
    #[must_use]
    pub fn source_data(&self, id: &str) -> Option<GeoJson> {
        self.state
            .borrow()
            .sources
            .iter()
            .find(|(source_id, _)| source_id == id)
            .map(|(_, data)| data.clone())
    }

    /// Number of markers.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.state.borrow().markers.len()
    }

    /// Marker keys in placement order.
    #[must_use]
    pub fn marker_keys(&self) -> Vec<String> {
        self.state
            .borrow()
            .markers
            .values()
            .map(|marker| marker.key.clone())
            .collect()
    }

    /// The handle of the first marker with this key.
    #[must_use]
    pub fn marker_id(&self, key: &str) -> Option<MarkerId> {
        self.state
            .borrow()
            .markers
            .iter()
            .find(|(_, marker)| marker.key == key)
            .map(|(id, _)| *id)
    }

    /// Captures the full map state.
    #[must_use]
    pub fn snapshot(&self) -> HeadlessSnapshot {
        let state = self.state.borrow();
        HeadlessSnapshot {
            center: state.center,
            zoom: state.zoom,
            style_loaded: state.style_loaded,
            context_lost: state.context_lost,
            markers: state.markers.values().cloned().collect(),
            sources: state
                .sources
                .iter()
                .map(|(id, data)| SourceSnapshot {
                    id: id.clone(),
                    data: data.clone(),
                })
                .collect(),
            layers: state.layers.clone(),
        }
    }
}

impl HeadlessState {
    fn ensure_style_ready(&self) -> Result<(), EngineError> {
        if self.context_lost {
            return Err(EngineError::ContextLost);
        }
        if !self.style_loaded {
            return Err(EngineError::StyleNotLoaded);
        }
        Ok(())
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.iter().any(|(source_id, _)| source_id == id)
    }
}

impl MapEngine for HeadlessEngine {
    fn fly_to(&mut self, center: LngLat, zoom: f64) -> Result<(), EngineError> {
        if !zoom.is_finite() {
            return Err(EngineError::Rejected(format!("invalid zoom {zoom}")));
        }
        let mut state = self.state.borrow_mut();
        state.center = center;
        state.zoom = zoom;
        Ok(())
    }

    fn zoom(&self) -> f64 {
        self.state.borrow().zoom
    }

    fn add_marker(&mut self, marker: &Marker) -> Result<MarkerId, EngineError> {
        let mut state = self.state.borrow_mut();
        let id = MarkerId(state.next_marker_id);
        state.next_marker_id += 1;
        state.markers.insert(id, marker.clone());
        Ok(id)
    }

    fn remove_marker(&mut self, id: MarkerId) -> Result<(), EngineError> {
        self.state
            .borrow_mut()
            .markers
            .remove(&id)
            .map(|_| ())
            .ok_or(EngineError::MarkerNotFound(id))
    }

    fn is_style_loaded(&self) -> bool {
        let state = self.state.borrow();
        state.style_loaded && !state.context_lost
    }

    fn add_source(&mut self, id: &str, data: &GeoJson) -> Result<(), EngineError> {
        let mut state = self.state.borrow_mut();
        state.ensure_style_ready()?;
        if state.has_source(id) {
            return Err(EngineError::Rejected(format!("source {id} already exists")));
        }
        state.sources.push((id.to_string(), data.clone()));
        Ok(())
    }

    fn add_layer(&mut self, layer: &LayerSpec) -> Result<(), EngineError> {
        let mut state = self.state.borrow_mut();
        state.ensure_style_ready()?;

        if state.failing_layer_adds > 0 {
            state.failing_layer_adds -= 1;
            return Err(EngineError::ContextLost);
        }
        if state.layers.iter().any(|existing| existing.id == layer.id) {
            return Err(EngineError::Rejected(format!(
                "layer {} already exists",
                layer.id
            )));
        }
        if !state.has_source(&layer.source) {
            return Err(EngineError::SourceNotFound(layer.source.clone()));
        }

        state.layers.push(layer.clone());
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError> {
        let mut state = self.state.borrow_mut();
        let before = state.layers.len();
        state.layers.retain(|layer| layer.id != id);
        if state.layers.len() == before {
            return Err(EngineError::LayerNotFound(id.to_string()));
        }
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<(), EngineError> {
        let mut state = self.state.borrow_mut();
        if !state.has_source(id) {
            return Err(EngineError::SourceNotFound(id.to_string()));
        }
        if state.layers.iter().any(|layer| layer.source == id) {
            return Err(EngineError::Rejected(format!("source {id} is in use")));
        }
        state.sources.retain(|(source_id, _)| source_id != id);
        Ok(())
    }

    fn has_layer(&self, id: &str) -> bool {
        self.state.borrow().layers.iter().any(|layer| layer.id == id)
    }

    fn has_source(&self, id: &str) -> bool {
        self.state.borrow().has_source(id)
    }
}
