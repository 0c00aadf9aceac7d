//! Rendering backend abstraction.
//!
//! The engine only talks to a map through [`Renderer`]. [`RenderGraph`] is a
//! headless implementation that keeps the scene in memory and rasterises it on
//! capture; a browser or GPU backend implements the same trait.

mod raster;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{mapping::Color, route::Coordinate, Result};

pub use raster::{CompositeSurface, Raster};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(u64);

/// Opaque handle to a marker owned by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(u64);

/// Visible map area in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub device_pixel_ratio: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub from: Coordinate,
    pub to: Coordinate,
    pub stroke: Stroke,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointFeature {
    pub coordinate: Coordinate,
    pub radius: f32,
    pub fill: Color,
    pub tooltip: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    Polyline {
        coordinates: Vec<Coordinate>,
        stroke: Stroke,
    },
    Segments(Vec<Segment>),
    Points(Vec<PointFeature>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkerStyle {
    Circle {
        radius: f32,
        fill: Color,
        outline: Color,
    },
    Photo {
        label: String,
    },
}

/// Overlay text shown next to the animation controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackStatus {
    pub progress: String,
    pub elapsed: String,
}

pub trait Renderer {
    fn add_layer(&mut self, layer: Layer) -> LayerId;

    /// Appends a segment to a [`Layer::Segments`] layer.
    fn append_segment(&mut self, layer: LayerId, segment: Segment);

    fn remove_layer(&mut self, layer: LayerId);

    fn place_marker(&mut self, at: Coordinate, style: MarkerStyle) -> MarkerId;

    fn move_marker(&mut self, marker: MarkerId, to: Coordinate);

    fn remove_marker(&mut self, marker: MarkerId);

    fn set_marker_tooltip(&mut self, marker: MarkerId, tooltip: Option<String>);

    fn center_on(&mut self, at: Coordinate);

    fn fit_bounds(&mut self, coordinates: &[Coordinate]);

    fn show_status(&mut self, status: &PlaybackStatus);

    fn clear_status(&mut self);

    fn viewport(&self) -> Viewport;

    /// Redraws the current visual state into `surface`.
    fn capture(&self, surface: &mut CompositeSurface) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub coordinate: Coordinate,
    pub style: MarkerStyle,
    pub tooltip: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct View {
    center: Coordinate,
    degrees_per_px: f64,
}

const BACKGROUND: Color = Color::rgb(0xf1, 0xf5, 0xf9);
const FIT_PADDING: f64 = 0.9;
const MIN_DEGREES_PER_PX: f64 = 1e-7;

/// In-memory scene that rasterises with a plain equirectangular projection.
#[derive(Debug)]
pub struct RenderGraph {
    viewport: Viewport,
    layers: BTreeMap<LayerId, Layer>,
    markers: BTreeMap<MarkerId, Marker>,
    view: Option<View>,
    status: Option<PlaybackStatus>,
    next_id: u64,
}

impl RenderGraph {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            layers: BTreeMap::new(),
            markers: BTreeMap::new(),
            view: None,
            status: None,
            next_id: 0,
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(&id)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn marker(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(&id)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn status(&self) -> Option<&PlaybackStatus> {
        self.status.as_ref()
    }

    pub fn center(&self) -> Option<Coordinate> {
        self.view.map(|view| view.center)
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn scene_coordinates(&self) -> Vec<Coordinate> {
        let mut coords = Vec::new();
        for layer in self.layers.values() {
            match layer {
                Layer::Polyline { coordinates, .. } => coords.extend_from_slice(coordinates),
                Layer::Segments(segments) => {
                    coords.extend(segments.iter().flat_map(|s| [s.from, s.to]))
                }
                Layer::Points(points) => coords.extend(points.iter().map(|p| p.coordinate)),
            }
        }
        coords.extend(self.markers.values().map(|m| m.coordinate));
        coords
    }

    fn fitted_view(&self, coordinates: &[Coordinate]) -> Option<View> {
        let first = coordinates.first()?;
        let (mut min_lat, mut max_lat, mut min_lon, mut max_lon) =
            (first.lat, first.lat, first.lon, first.lon);
        for c in coordinates {
            min_lat = min_lat.min(c.lat);
            max_lat = max_lat.max(c.lat);
            min_lon = min_lon.min(c.lon);
            max_lon = max_lon.max(c.lon);
        }
        let width = f64::from(self.viewport.width.max(1)) * FIT_PADDING;
        let height = f64::from(self.viewport.height.max(1)) * FIT_PADDING;
        let degrees_per_px = ((max_lon - min_lon) / width)
            .max((max_lat - min_lat) / height)
            .max(MIN_DEGREES_PER_PX);
        Some(View {
            center: Coordinate::new((min_lat + max_lat) / 2.0, (min_lon + max_lon) / 2.0),
            degrees_per_px,
        })
    }
}

impl Renderer for RenderGraph {
    fn add_layer(&mut self, layer: Layer) -> LayerId {
        let id = LayerId(self.next_id());
        self.layers.insert(id, layer);
        id
    }

    fn append_segment(&mut self, layer: LayerId, segment: Segment) {
        match self.layers.get_mut(&layer) {
            Some(Layer::Segments(segments)) => segments.push(segment),
            Some(_) => tracing::warn!(?layer, "segment appended to a non-segment layer"),
            None => tracing::debug!(?layer, "segment appended to a removed layer"),
        }
    }

    fn remove_layer(&mut self, layer: LayerId) {
        self.layers.remove(&layer);
    }

    fn place_marker(&mut self, at: Coordinate, style: MarkerStyle) -> MarkerId {
        let id = MarkerId(self.next_id());
        self.markers.insert(
            id,
            Marker {
                coordinate: at,
                style,
                tooltip: None,
            },
        );
        id
    }

    fn move_marker(&mut self, marker: MarkerId, to: Coordinate) {
        if let Some(m) = self.markers.get_mut(&marker) {
            m.coordinate = to;
        }
    }

    fn remove_marker(&mut self, marker: MarkerId) {
        self.markers.remove(&marker);
    }

    fn set_marker_tooltip(&mut self, marker: MarkerId, tooltip: Option<String>) {
        if let Some(m) = self.markers.get_mut(&marker) {
            m.tooltip = tooltip;
        }
    }

    fn center_on(&mut self, at: Coordinate) {
        let degrees_per_px = match self.view {
            Some(view) => view.degrees_per_px,
            None => self
                .fitted_view(&self.scene_coordinates())
                .map(|view| view.degrees_per_px)
                .unwrap_or(MIN_DEGREES_PER_PX),
        };
        self.view = Some(View {
            center: at,
            degrees_per_px,
        });
    }

    fn fit_bounds(&mut self, coordinates: &[Coordinate]) {
        if let Some(view) = self.fitted_view(coordinates) {
            self.view = Some(view);
        }
    }

    fn show_status(&mut self, status: &PlaybackStatus) {
        self.status = Some(status.clone());
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn capture(&self, surface: &mut CompositeSurface) -> Result<()> {
        let scale = surface.scale();
        let raster = surface.raster_mut();
        raster.fill(BACKGROUND);

        let Some(view) = self.view.or_else(|| self.fitted_view(&self.scene_coordinates()))
        else {
            return Ok(());
        };

        let (half_w, half_h) = (
            f64::from(raster.width()) / 2.0,
            f64::from(raster.height()) / 2.0,
        );
        let project = |c: &Coordinate| {
            (
                half_w + (c.lon - view.center.lon) / view.degrees_per_px * scale,
                half_h - (c.lat - view.center.lat) / view.degrees_per_px * scale,
            )
        };

        for layer in self.layers.values() {
            match layer {
                Layer::Polyline {
                    coordinates,
                    stroke,
                } => {
                    for pair in coordinates.windows(2) {
                        raster.draw_line(
                            project(&pair[0]),
                            project(&pair[1]),
                            f64::from(stroke.width) * scale,
                            stroke.color,
                        );
                    }
                }
                Layer::Segments(segments) => {
                    for segment in segments {
                        raster.draw_line(
                            project(&segment.from),
                            project(&segment.to),
                            f64::from(segment.stroke.width) * scale,
                            segment.stroke.color,
                        );
                    }
                }
                Layer::Points(points) => {
                    for point in points {
                        let (x, y) = project(&point.coordinate);
                        raster.fill_circle(x, y, f64::from(point.radius) * scale, point.fill);
                    }
                }
            }
        }

        for marker in self.markers.values() {
            let (x, y) = project(&marker.coordinate);
            match &marker.style {
                MarkerStyle::Circle {
                    radius,
                    fill,
                    outline,
                } => {
                    let r = f64::from(*radius) * scale;
                    raster.fill_circle(x, y, r + 2.0 * scale, *outline);
                    raster.fill_circle(x, y, r, *fill);
                }
                MarkerStyle::Photo { .. } => {
                    raster.fill_circle(x, y, 15.0 * scale, Color::WHITE);
                    raster.fill_circle(x, y, 12.0 * scale, Color::rgb(0x64, 0x74, 0x8b));
                }
            }
        }

        Ok(())
    }
}
