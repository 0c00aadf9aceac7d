use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    mapping::{speed_color, Color, SpeedUnit},
    render::{Layer, LayerId, PointFeature, Renderer, Segment, Stroke},
    route::{Route, RoutePoint},
};

const ROUTE_STROKE: Stroke = Stroke {
    color: Color::rgb(0x25, 0x63, 0xeb),
    width: 4.0,
};
const HEATMAP_WIDTH: f32 = 6.0;
const POINT_RADIUS: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Route,
    Points,
    Heatmap,
    Animated,
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DisplayMode::Route => "route",
            DisplayMode::Points => "points",
            DisplayMode::Heatmap => "heatmap",
            DisplayMode::Animated => "animated",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneOptions {
    pub show_tooltips: bool,
    pub speed_unit: SpeedUnit,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            show_tooltips: true,
            speed_unit: SpeedUnit::Kmh,
        }
    }
}

/// Static representations of the loaded route. The animated mode is owned by
/// the animation engine; this only tracks that it is the active mode.
#[derive(Debug, Default)]
pub struct Scene {
    mode: DisplayMode,
    layer: Option<LayerId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn set_animated(&mut self) {
        self.mode = DisplayMode::Animated;
    }

    /// Back to the route mode once playback ends. The engine's track stands
    /// in for the route layer, so nothing is drawn.
    pub fn leave_animated(&mut self) {
        if self.mode == DisplayMode::Animated {
            self.mode = DisplayMode::Route;
        }
    }

    /// Removes the static layer, if any.
    pub fn clear(&mut self, renderer: &mut dyn Renderer) {
        if let Some(layer) = self.layer.take() {
            renderer.remove_layer(layer);
        }
    }

    /// Replaces the current static layer with `mode`. Without a route only
    /// the mode changes.
    pub fn show(
        &mut self,
        mode: DisplayMode,
        route: Option<&Route>,
        renderer: &mut dyn Renderer,
        options: SceneOptions,
    ) {
        self.clear(renderer);
        self.mode = mode;

        let Some(route) = route else {
            return;
        };

        let layer = match mode {
            DisplayMode::Route => Layer::Polyline {
                coordinates: route.coordinates(),
                stroke: ROUTE_STROKE,
            },
            DisplayMode::Points => Layer::Points(
                route
                    .points()
                    .iter()
                    .enumerate()
                    .map(|(index, point)| PointFeature {
                        coordinate: point.coordinate,
                        radius: POINT_RADIUS,
                        fill: speed_color(point.speed.unwrap_or(0.0)),
                        tooltip: options
                            .show_tooltips
                            .then(|| point_tooltip(point, index, options.speed_unit)),
                    })
                    .collect(),
            ),
            DisplayMode::Heatmap => Layer::Segments(heatmap_segments(route)),
            DisplayMode::Animated => return,
        };

        self.layer = Some(renderer.add_layer(layer));
        tracing::debug!(%mode, points = route.len(), "static layer drawn");
    }
}

fn heatmap_segments(route: &Route) -> Vec<Segment> {
    route
        .points()
        .windows(2)
        .map(|pair| Segment {
            from: pair[0].coordinate,
            to: pair[1].coordinate,
            stroke: Stroke {
                color: speed_color(pair[0].speed.unwrap_or(0.0)),
                width: HEATMAP_WIDTH,
            },
        })
        .collect()
}

fn time_label(point: &RoutePoint) -> String {
    point
        .timestamp
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn speed_label(point: &RoutePoint, unit: SpeedUnit) -> String {
    point
        .speed
        .map(|s| unit.format(s))
        .unwrap_or_else(|| "N/A".to_string())
}

fn heart_rate_label(point: &RoutePoint) -> String {
    point
        .heart_rate
        .map(|hr| format!("{hr} bpm"))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Hover text for one point of the points layer. `index` is zero based.
pub fn point_tooltip(point: &RoutePoint, index: usize, unit: SpeedUnit) -> String {
    let elevation = point
        .elevation
        .map(|e| format!("{e:.1}m"))
        .unwrap_or_else(|| "N/A".to_string());
    format!(
        "Point {}\nTime: {}\nSpeed: {}\nHeart Rate: {}\nElevation: {}",
        index + 1,
        time_label(point),
        speed_label(point, unit),
        heart_rate_label(point),
        elevation
    )
}

/// Text attached to the moving marker.
pub fn animation_tooltip(point: &RoutePoint, unit: SpeedUnit) -> String {
    format!(
        "Current Position\nTime: {}\nSpeed: {}\nHeart Rate: {}",
        time_label(point),
        speed_label(point, unit),
        heart_rate_label(point)
    )
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{
        render::{RenderGraph, Viewport},
        route::Coordinate,
    };

    fn graph() -> RenderGraph {
        RenderGraph::new(Viewport {
            width: 200,
            height: 200,
            device_pixel_ratio: 1.0,
        })
    }

    fn route() -> Route {
        Route::new(
            (0..4)
                .map(|i| RoutePoint {
                    speed: Some(i as f64 * 3.0),
                    ..RoutePoint::at(Coordinate::new(i as f64 * 0.001, 0.0))
                })
                .collect(),
        )
    }

    #[test]
    fn switching_modes_replaces_the_layer() {
        let mut renderer = graph();
        let mut scene = Scene::new();
        let route = route();

        scene.show(DisplayMode::Route, Some(&route), &mut renderer, SceneOptions::default());
        assert_eq!(renderer.layer_count(), 1);

        scene.show(DisplayMode::Heatmap, Some(&route), &mut renderer, SceneOptions::default());
        assert_eq!(renderer.layer_count(), 1);
        assert_eq!(scene.mode(), DisplayMode::Heatmap);

        scene.clear(&mut renderer);
        assert_eq!(renderer.layer_count(), 0);
    }

    #[test]
    fn leaving_animation_only_resets_the_animated_mode() {
        let mut scene = Scene::new();
        scene.set_animated();
        scene.leave_animated();
        assert_eq!(scene.mode(), DisplayMode::Route);

        let mut renderer = graph();
        scene.show(DisplayMode::Heatmap, Some(&route()), &mut renderer, SceneOptions::default());
        scene.leave_animated();
        assert_eq!(scene.mode(), DisplayMode::Heatmap);
        assert_eq!(renderer.layer_count(), 1);
    }

    #[test]
    fn heatmap_colours_each_segment_by_its_start_speed() {
        let segments = heatmap_segments(&route());
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].stroke.color.to_hex(), "#313695");
        // 6 m/s is 21.6 km/h.
        assert_eq!(segments[2].stroke.color.to_hex(), "#e0f3f8");
    }

    #[test]
    fn points_honour_tooltip_toggle() {
        let mut renderer = graph();
        let mut scene = Scene::new();
        let options = SceneOptions {
            show_tooltips: false,
            speed_unit: SpeedUnit::Kmh,
        };
        scene.show(DisplayMode::Points, Some(&route()), &mut renderer, options);

        let layer = scene.layer.unwrap();
        match renderer.layer(layer) {
            Some(Layer::Points(points)) => {
                assert_eq!(points.len(), 4);
                assert!(points.iter().all(|p| p.tooltip.is_none()));
            }
            other => panic!("unexpected layer {other:?}"),
        }
    }

    #[test]
    fn tooltips_fall_back_for_missing_fields() {
        let point = RoutePoint::at(Coordinate::new(1.0, 2.0));
        let text = point_tooltip(&point, 0, SpeedUnit::Kmh);
        assert!(text.starts_with("Point 1\nTime: Unknown"));
        assert!(text.contains("Speed: N/A"));
        assert!(text.ends_with("Elevation: N/A"));

        let timed = RoutePoint {
            timestamp: Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 5).unwrap()),
            speed: Some(5.0),
            heart_rate: Some(133),
            ..point
        };
        assert_eq!(
            animation_tooltip(&timed, SpeedUnit::Mph),
            "Current Position\nTime: 08:30:05\nSpeed: 11.2 mph\nHeart Rate: 133 bpm"
        );
    }
}
