//! Immutable configuration, built once and shared by reference.
//!
//! Every struct deserializes with `#[serde(default)]`, so a shell can
//! supply a partial JSON document and inherit the remaining defaults.

use serde::{Deserialize, Serialize};

/// Graph-wide interaction and rendering switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub grid_size: f64,
    pub grid_enabled: bool,
    /// Pixels a touch/pen pointer must travel before a drag starts.
    pub tolerance: f64,
    pub keep_edges_in_foreground: bool,
    pub keep_edges_in_background: bool,
    /// Reorder shape nodes to follow model order on every redraw.
    pub ordered: bool,
    pub folding_enabled: bool,
    pub allow_dangling_edges: bool,
    /// Clamp group resizes so children stay inside.
    pub constrain_children_on_resize: bool,
    pub clone_on_connect: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            grid_size: 10.0,
            grid_enabled: true,
            tolerance: 4.0,
            keep_edges_in_foreground: false,
            keep_edges_in_background: false,
            ordered: true,
            folding_enabled: true,
            allow_dangling_edges: true,
            constrain_children_on_resize: false,
            clone_on_connect: false,
        }
    }
}

/// Look and behavior of vertex handles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandleConfig {
    pub handle_size: f64,
    pub label_handle_size: f64,
    pub handle_fill_color: String,
    pub handle_stroke_color: String,
    pub label_handle_fill_color: String,
    pub connect_handle_fill_color: String,
    pub locked_handle_fill_color: String,
    pub rotation_handle_fill_color: String,
    pub selection_color: String,
    pub selection_stroke_width: f64,
    pub selection_dashed: bool,
    /// Distance of the rotation handle above the top edge.
    pub rotation_handle_offset: f64,
    pub rotation_enabled: bool,
    /// Snap rotation to coarse steps while dragging.
    pub rotation_raster: bool,
    pub live_preview: bool,
    pub single_sizer: bool,
    /// Show the label handle even when the label cannot move.
    pub manual_label_handle: bool,
    /// Minimum rendered size below which only the corner sizer is shown.
    pub single_sizer_threshold: f64,
}

impl Default for HandleConfig {
    fn default() -> Self {
        Self {
            handle_size: 7.0,
            label_handle_size: 4.0,
            handle_fill_color: "#00FF00".into(),
            handle_stroke_color: "black".into(),
            label_handle_fill_color: "yellow".into(),
            connect_handle_fill_color: "#0000FF".into(),
            locked_handle_fill_color: "#FF0000".into(),
            rotation_handle_fill_color: "#29b6f2".into(),
            selection_color: "#00FF00".into(),
            selection_stroke_width: 1.0,
            selection_dashed: true,
            rotation_handle_offset: 16.0,
            rotation_enabled: true,
            rotation_raster: true,
            live_preview: false,
            single_sizer: false,
            manual_label_handle: false,
            single_sizer_threshold: 0.0,
        }
    }
}

/// Edge handler behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeHandleConfig {
    pub snap_to_terminals: bool,
    pub clone_enabled: bool,
    pub add_enabled: bool,
    pub remove_enabled: bool,
    /// Edges without waypoints get one draggable handle midway.
    pub virtual_bend: bool,
    pub valid_color: String,
    pub invalid_color: String,
    pub selection_color: String,
    pub selection_stroke_width: f64,
    pub selection_dashed: bool,
}

impl Default for EdgeHandleConfig {
    fn default() -> Self {
        Self {
            snap_to_terminals: false,
            clone_enabled: true,
            add_enabled: false,
            remove_enabled: false,
            virtual_bend: true,
            valid_color: "#00FF00".into(),
            invalid_color: "#FF0000".into(),
            selection_color: "#00FF00".into(),
            selection_stroke_width: 1.0,
            selection_dashed: true,
        }
    }
}

/// Defaults used by shapes and painting surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeDefaults {
    pub shadow_offset_x: f64,
    pub shadow_offset_y: f64,
    pub shadow_color: String,
    pub shadow_opacity: f64,
    pub marker_size: f64,
    pub font_size: f64,
    pub font_family: String,
    pub font_color: String,
    pub line_height: f64,
    /// Corner radius as a fraction of the smaller side for `rounded=1`.
    pub rounding_factor: f64,
    /// Corner radius for rounded polylines.
    pub line_arc_size: f64,
    /// Title bar size of swimlanes.
    pub swimlane_start_size: f64,
    /// Width of the invisible stroke that widens edge hit areas.
    pub stroke_tolerance: f64,
    pub dash_pattern: String,
}

impl Default for ShapeDefaults {
    fn default() -> Self {
        Self {
            shadow_offset_x: 2.0,
            shadow_offset_y: 3.0,
            shadow_color: "gray".into(),
            shadow_opacity: 1.0,
            marker_size: 6.0,
            font_size: 11.0,
            font_family: "Arial,Helvetica".into(),
            font_color: "black".into(),
            line_height: 1.2,
            rounding_factor: 0.15,
            line_arc_size: 20.0,
            swimlane_start_size: 40.0,
            stroke_tolerance: 8.0,
            dash_pattern: "3 3".into(),
        }
    }
}

/// Everything above, as loaded by the embedding shell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub graph: GraphConfig,
    pub handles: HandleConfig,
    pub edges: EdgeHandleConfig,
    pub shapes: ShapeDefaults,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: Config =
            serde_json::from_str(r#"{ "graph": { "grid_size": 20 }, "handles": { "live_preview": true } }"#)
                .unwrap();
        assert_eq!(cfg.graph.grid_size, 20.0);
        assert!(cfg.graph.grid_enabled);
        assert!(cfg.handles.live_preview);
        assert_eq!(cfg.shapes.marker_size, 6.0);
    }
}
