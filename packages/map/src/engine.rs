//! The map engine capability consumed by the overlay controller.

use geojson::GeoJson;
use reach_geometry::LngLat;
use serde::{Deserialize, Serialize};

/// Errors reported by a map engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The rendering context was lost; the operation may succeed later.
    #[error("rendering context lost")]
    ContextLost,

    /// The map style has not finished loading.
    #[error("map style not loaded")]
    StyleNotLoaded,

    /// No layer with this ID exists.
    #[error("layer not found: {0}")]
    LayerNotFound(String),

    /// No source with this ID exists.
    #[error("source not found: {0}")]
    SourceNotFound(String),

    /// No marker with this ID exists.
    #[error("marker not found: {0:?}")]
    MarkerNotFound(MarkerId),

    /// The engine refused the operation.
    #[error("rejected: {0}")]
    Rejected(String),
}

impl EngineError {
    /// Returns `true` for "does not exist" errors, which removal code
    /// treats as already done.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::LayerNotFound(_) | Self::SourceNotFound(_) | Self::MarkerNotFound(_)
        )
    }
}

/// Engine-assigned marker handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarkerId(pub u64);

/// A marker to place on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    /// Key reported back when the marker is clicked (an alert ID).
    pub key: String,
    /// Where to place it.
    pub position: LngLat,
    /// Popup shown when the marker is opened.
    pub popup_html: Option<String>,
}

/// How a layer is drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerPaint {
    /// Filled polygon interior.
    Fill {
        /// CSS color.
        color: String,
        /// 0.0 (transparent) to 1.0 (opaque).
        opacity: f64,
    },
    /// Stroked polygon boundary.
    Line {
        /// CSS color.
        color: String,
        /// Stroke width in pixels.
        width: f64,
    },
}

/// A style layer bound to a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Layer ID.
    pub id: String,
    /// ID of the source the layer draws.
    pub source: String,
    /// Paint properties.
    pub paint: LayerPaint,
}

/// Events emitted by the engine and fed back to the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapEvent {
    /// The map surface was clicked away from any marker.
    Click(LngLat),
    /// A marker was clicked.
    MarkerClicked(MarkerId),
    /// The style finished loading; sources and layers can be added.
    StyleLoaded,
    /// The rendering context was lost. Sources and layers are gone.
    ContextLost,
    /// The rendering context came back.
    ContextRestored,
}

/// User interactions the controller derives from engine events.
#[derive(Debug, Clone, PartialEq)]
pub enum MapInteraction {
    /// A location on the map was selected.
    LocationSelected(LngLat),
    /// The marker with this key was selected.
    MarkerSelected(String),
}

/// A map rendering engine.
///
/// Mirrors the small imperative surface of web map libraries: camera,
/// markers, and style sources/layers. Implementations report transient
/// renderer trouble as [`EngineError::ContextLost`] or
/// [`EngineError::StyleNotLoaded`].
pub trait MapEngine {
    /// Starts animating the camera to `center` at `zoom`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the engine cannot move the camera.
    fn fly_to(&mut self, center: LngLat, zoom: f64) -> Result<(), EngineError>;

    /// The current zoom level.
    fn zoom(&self) -> f64;

    /// Places a marker.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the marker cannot be added.
    fn add_marker(&mut self, marker: &Marker) -> Result<MarkerId, EngineError>;

    /// Removes a marker.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MarkerNotFound`] if it does not exist.
    fn remove_marker(&mut self, id: MarkerId) -> Result<(), EngineError>;

    /// Whether the style has loaded and accepts sources and layers.
    fn is_style_loaded(&self) -> bool;

    /// Adds a `GeoJSON` source.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the source cannot be added.
    fn add_source(&mut self, id: &str, data: &GeoJson) -> Result<(), EngineError>;

    /// Adds a layer drawing an existing source.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the layer cannot be added.
    fn add_layer(&mut self, layer: &LayerSpec) -> Result<(), EngineError>;

    /// Removes a layer.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::LayerNotFound`] if it does not exist.
    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError>;

    /// Removes a source. Fails while any layer still references it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SourceNotFound`] if it does not exist.
    fn remove_source(&mut self, id: &str) -> Result<(), EngineError>;

    /// Whether a layer with this ID exists.
    fn has_layer(&self, id: &str) -> bool;

    /// Whether a source with this ID exists.
    fn has_source(&self, id: &str) -> bool;
}
