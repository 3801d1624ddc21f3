//! Shape-name registry.
//!
//! Maps the `shape` style value to a [`Painter`]: the built-in kinds,
//! custom painters registered at runtime, and stencils. Unknown names
//! fall back to `connector` for edges and `rectangle` for vertices.

use crate::shape::stencil::Stencil;
use crate::shape::{Painter, Shape, ShapeKind, ShapePainter};
use dg_core::style::keys;
use dg_core::{ShapeDefaults, Style};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("unknown stencil: {0}")]
    UnknownStencil(String),
    #[error("shape name already taken by a built-in: {0}")]
    Builtin(String),
}

#[derive(Debug, Clone)]
pub struct ShapeRegistry {
    painters: HashMap<String, Painter>,
    defaults: Arc<ShapeDefaults>,
    pub default_vertex: ShapeKind,
    pub default_edge: ShapeKind,
}

impl ShapeRegistry {
    pub fn new(defaults: Arc<ShapeDefaults>) -> Self {
        let painters = ShapeKind::ALL
            .into_iter()
            .filter(|k| *k != ShapeKind::Text)
            .map(|k| (k.name().to_string(), Painter::Builtin(k)))
            .collect();
        Self {
            painters,
            defaults,
            default_vertex: ShapeKind::Rectangle,
            default_edge: ShapeKind::Connector,
        }
    }

    pub fn defaults(&self) -> &Arc<ShapeDefaults> {
        &self.defaults
    }

    pub fn contains(&self, name: &str) -> bool {
        self.painters.contains_key(name)
    }

    /// Register a custom painter. Built-in names cannot be replaced.
    pub fn register(
        &mut self,
        name: &str,
        painter: Arc<dyn ShapePainter>,
    ) -> Result<(), RegistryError> {
        if ShapeKind::parse(name).is_some() {
            return Err(RegistryError::Builtin(name.to_string()));
        }
        log::debug!("registered painter {name}");
        self.painters.insert(name.to_string(), Painter::Custom(painter));
        Ok(())
    }

    /// Register a stencil under its own name, replacing an earlier one.
    pub fn register_stencil(&mut self, stencil: Stencil) -> Result<(), RegistryError> {
        if ShapeKind::parse(&stencil.name).is_some() {
            return Err(RegistryError::Builtin(stencil.name));
        }
        log::debug!("registered stencil {}", stencil.name);
        self.painters
            .insert(stencil.name.clone(), Painter::Stencil(Arc::new(stencil)));
        Ok(())
    }

    pub fn stencil(&self, name: &str) -> Result<Arc<Stencil>, RegistryError> {
        match self.painters.get(name) {
            Some(Painter::Stencil(s)) => Ok(Arc::clone(s)),
            _ => Err(RegistryError::UnknownStencil(name.to_string())),
        }
    }

    /// Resolve a painter, falling back to the default kind.
    pub fn painter(&self, name: Option<&str>, is_edge: bool) -> Painter {
        if let Some(name) = name
            && let Some(p) = self.painters.get(name)
        {
            return p.clone();
        }
        if let Some(name) = name {
            log::warn!("unknown shape {name}, using default");
        }
        Painter::Builtin(if is_edge {
            self.default_edge
        } else {
            self.default_vertex
        })
    }

    /// New shape for a resolved style, with the style applied.
    pub fn create_shape(&self, style: &Style, is_edge: bool) -> Shape {
        let painter = self.painter(style.get(keys::SHAPE), is_edge);
        let mut shape = Shape::new(painter, Arc::clone(&self.defaults));
        shape.apply(style);
        shape
    }

    pub fn create_text_shape(&self, style: &Style) -> Shape {
        let mut shape = Shape::new(Painter::Builtin(ShapeKind::Text), Arc::clone(&self.defaults));
        shape.apply(style);
        shape
    }
}

impl Default for ShapeRegistry {
    fn default() -> Self {
        Self::new(Arc::new(ShapeDefaults::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct Star;

    impl ShapePainter for Star {}

    #[test]
    fn unknown_names_fall_back_by_cell_kind() {
        let r = ShapeRegistry::default();
        assert_eq!(r.painter(Some("nope"), true).kind(), Some(ShapeKind::Connector));
        assert_eq!(r.painter(Some("nope"), false).kind(), Some(ShapeKind::Rectangle));
        assert_eq!(r.painter(None, false).kind(), Some(ShapeKind::Rectangle));
        assert_eq!(r.painter(Some("cloud"), false).kind(), Some(ShapeKind::Cloud));
    }

    #[test]
    fn text_is_not_a_style_shape() {
        let r = ShapeRegistry::default();
        assert!(!r.contains("text"));
        assert!(r.contains("doubleEllipse"));
    }

    #[test]
    fn stencils_and_custom_painters_resolve_by_name() {
        let mut r = ShapeRegistry::default();
        r.register_stencil(Stencil::new("gear", 10.0, 10.0)).unwrap();
        r.register("star", Arc::new(Star)).unwrap();
        assert!(r.painter(Some("gear"), false).is_stencil());
        assert!(matches!(r.painter(Some("star"), false), Painter::Custom(_)));
        assert_eq!(r.stencil("gear").unwrap().name, "gear");
        assert_eq!(
            r.stencil("star").unwrap_err(),
            RegistryError::UnknownStencil("star".into())
        );
    }

    #[test]
    fn builtin_names_are_reserved() {
        let mut r = ShapeRegistry::default();
        assert_eq!(
            r.register("ellipse", Arc::new(Star)),
            Err(RegistryError::Builtin("ellipse".into()))
        );
    }

    #[test]
    fn create_shape_applies_style() {
        let r = ShapeRegistry::default();
        let style = Style::parse("shape=rhombus;strokeWidth=2").unwrap();
        let s = r.create_shape(&style, false);
        assert_eq!(s.kind(), Some(ShapeKind::Rhombus));
        assert_eq!(s.stroke_width, 2.0);
    }
}
