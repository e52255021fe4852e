//! Browser bindings: a [`Surface`] over a canvas 2D context and the
//! normalization of DOM pointer events to surface pixels.
//!
//! This module is the only place that touches [`web_sys`]. Every fallible
//! `Canvas2D` call maps its `JsValue` error to [`SceneError::Surface`].

#[cfg(test)]
#[path = "web_test.rs"]
mod web_test;

use std::f64::consts::TAU;

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, Element, HtmlCanvasElement, MouseEvent, TouchEvent};

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::SceneError;
use crate::geom::{Affine, Point, Rect};
use crate::render::Surface;

/// An engine drawing on a browser canvas.
pub type WebEngine = Engine<CanvasSurface>;

fn js(err: JsValue) -> SceneError {
    SceneError::Surface(format!("{err:?}"))
}

/// Canvas 2D context adapted to [`Surface`].
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    /// Acquire the `2d` context of `canvas`.
    ///
    /// # Errors
    ///
    /// [`SceneError::Surface`] if the canvas has no 2D context.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, SceneError> {
        let ctx = canvas
            .get_context("2d")
            .map_err(js)?
            .ok_or_else(|| SceneError::Surface("canvas has no 2d context".into()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|object| js(object.into()))?;
        Ok(Self { canvas, ctx })
    }

    #[must_use]
    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    #[must_use]
    pub fn context(&self) -> &CanvasRenderingContext2d {
        &self.ctx
    }

    fn trace_polygon(&self, points: &[Point]) {
        self.ctx.begin_path();
        let mut points = points.iter();
        if let Some(first) = points.next() {
            self.ctx.move_to(first.x, first.y);
        }
        for point in points {
            self.ctx.line_to(point.x, point.y);
        }
        self.ctx.close_path();
    }
}

impl Surface for CanvasSurface {
    fn size(&self) -> (f64, f64) {
        (f64::from(self.canvas.width()), f64::from(self.canvas.height()))
    }

    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    fn set_transform(&mut self, m: &Affine) -> Result<(), SceneError> {
        let [a, b, c, d, e, f] = m.coefficients();
        self.ctx.set_transform(a, b, c, d, e, f).map_err(js)
    }

    fn transform(&mut self, m: &Affine) -> Result<(), SceneError> {
        let [a, b, c, d, e, f] = m.coefficients();
        self.ctx.transform(a, b, c, d, e, f).map_err(js)
    }

    fn fill_rect(&mut self, rect: &Rect, style: &str) {
        self.ctx.set_fill_style_str(style);
        self.ctx.fill_rect(rect.min.x, rect.min.y, rect.width(), rect.height());
    }

    fn fill_polygon(&mut self, points: &[Point], style: &str) {
        self.ctx.set_fill_style_str(style);
        self.trace_polygon(points);
        self.ctx.fill();
    }

    fn stroke_polygon(&mut self, points: &[Point], style: &str, line_width: f64) {
        self.ctx.set_stroke_style_str(style);
        self.ctx.set_line_width(line_width);
        self.trace_polygon(points);
        self.ctx.stroke();
    }

    fn fill_ellipse(&mut self, center: Point, radius_x: f64, radius_y: f64, style: &str) -> Result<(), SceneError> {
        self.ctx.set_fill_style_str(style);
        self.ctx.begin_path();
        self.ctx.ellipse(center.x, center.y, radius_x, radius_y, 0.0, 0.0, TAU).map_err(js)?;
        self.ctx.fill();
        Ok(())
    }
}

impl WebEngine {
    /// Build an engine drawing on `canvas`.
    ///
    /// # Errors
    ///
    /// [`SceneError::Surface`] without a 2D context, or a config validation
    /// error.
    pub fn for_canvas(canvas: HtmlCanvasElement, config: EngineConfig) -> Result<Self, SceneError> {
        Engine::new(CanvasSurface::new(canvas)?, config)
    }

    /// Run one frame stamped with the browser's wall clock.
    ///
    /// # Errors
    ///
    /// Propagates effect errors from [`Engine::frame`].
    pub fn frame_now(&mut self) -> Result<bool, SceneError> {
        self.frame(js_sys::Date::now())
    }
}

// =============================================================
// Input normalization
// =============================================================

/// Mouse position relative to the canvas.
#[must_use]
pub fn mouse_point(event: &MouseEvent) -> Point {
    Point::new(f64::from(event.offset_x()), f64::from(event.offset_y()))
}

/// Position of the most recently changed touch, relative to `surface`.
#[must_use]
pub fn touch_point(event: &TouchEvent, surface: &Element) -> Point {
    let touches = event.changed_touches();
    let touch = touches
        .item(touches.length().saturating_sub(1))
        .map(|t| Point::new(f64::from(t.client_x()), f64::from(t.client_y())));
    let rect = surface.get_bounding_client_rect();
    relative_to(touch, Point::new(rect.left(), rect.top()))
}

/// A client point relative to the surface's top-left corner. A missing
/// point lands on that corner.
pub(crate) fn relative_to(client: Option<Point>, corner: Point) -> Point {
    corner.vector_to(client.unwrap_or(corner))
}
