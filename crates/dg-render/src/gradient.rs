//! Reference-counted, content-addressed gradient definitions.
//!
//! A gradient is identified by its normalized colors, alphas and
//! direction. North and west gradients are stored as their south/east
//! mirror with the stops exchanged, so the two spellings share one
//! definition. Each paint that uses a definition takes a reference; the
//! `<linearGradient>` leaves the tree when the last reference goes.

use crate::markup::{Document, NodeRef};
use dg_core::{Color, Direction};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GradientKey {
    pub start: String,
    pub end: String,
    /// Stop opacities in percent.
    pub alpha1: u8,
    pub alpha2: u8,
    /// Always `South` or `East` after normalization.
    pub direction: Direction,
}

fn percent(alpha: f64) -> u8 {
    (alpha.clamp(0.0, 1.0) * 100.0).round() as u8
}

impl GradientKey {
    pub fn new(start: Color, end: Color, alpha1: f64, alpha2: f64, direction: Direction) -> Self {
        let (mut start, mut end) = (start.id_fragment(), end.id_fragment());
        let (mut alpha1, mut alpha2) = (percent(alpha1), percent(alpha2));
        let direction = match direction {
            Direction::North | Direction::West => {
                std::mem::swap(&mut start, &mut end);
                std::mem::swap(&mut alpha1, &mut alpha2);
                if direction == Direction::North {
                    Direction::South
                } else {
                    Direction::East
                }
            }
            d => d,
        };
        Self {
            start,
            end,
            alpha1,
            alpha2,
            direction,
        }
    }

    /// Id before collision probing.
    pub fn base_id(&self) -> String {
        let dir = if self.direction == Direction::East { 'e' } else { 's' };
        format!(
            "dg-gradient-{}-{}-{}-{}-{dir}",
            self.start, self.alpha1, self.end, self.alpha2
        )
    }
}

#[derive(Debug)]
struct GradientEntry {
    id: String,
    node: NodeRef,
    refs: usize,
}

#[derive(Debug, Default)]
pub struct GradientCache {
    entries: HashMap<GradientKey, GradientEntry>,
}

impl GradientCache {
    fn key_for_id(&self, id: &str) -> Option<GradientKey> {
        self.entries
            .iter()
            .find(|(_, e)| e.id == id)
            .map(|(k, _)| k.clone())
    }
}

impl Document {
    /// Take a reference on the definition for `key`, creating it in
    /// `<defs>` if needed. Returns its element id.
    pub fn acquire_gradient(&mut self, key: &GradientKey) -> String {
        let live = self
            .gradients
            .entries
            .get(key)
            .is_some_and(|e| self.contains(e.node));
        if live && let Some(entry) = self.gradients.entries.get_mut(key) {
            entry.refs += 1;
            return entry.id.clone();
        }

        let base = key.base_id();
        let mut id = base.clone();
        let mut counter = 0;
        while self.has_id(&id) {
            counter += 1;
            id = format!("{base}-{counter}");
        }

        let node = self.create("linearGradient");
        self.set_attr(node, "id", &id);
        let (x2, y2) = if key.direction == Direction::East {
            ("100%", "0%")
        } else {
            ("0%", "100%")
        };
        self.set_attr(node, "x1", "0%");
        self.set_attr(node, "y1", "0%");
        self.set_attr(node, "x2", x2);
        self.set_attr(node, "y2", y2);
        for (offset, color, alpha) in [("0%", &key.start, key.alpha1), ("100%", &key.end, key.alpha2)] {
            let stop = self.create("stop");
            self.set_attr(stop, "offset", offset);
            let mut style = format!("stop-color:#{color}");
            if alpha < 100 {
                style.push_str(&format!(";stop-opacity:{}", f64::from(alpha) / 100.0));
            }
            self.set_attr(stop, "style", style);
            self.append(node, stop);
        }
        let defs = self.defs();
        self.append(defs, node);
        log::trace!("gradient {id} created");
        self.gradients.entries.insert(
            key.clone(),
            GradientEntry {
                id: id.clone(),
                node,
                refs: 1,
            },
        );
        id
    }

    /// Drop one reference. Returns the remaining count; at zero the
    /// definition is removed from the tree.
    pub fn release_gradient(&mut self, id: &str) -> usize {
        let Some(key) = self.gradients.key_for_id(id) else {
            return 0;
        };
        let Some(entry) = self.gradients.entries.get_mut(&key) else {
            return 0;
        };
        entry.refs = entry.refs.saturating_sub(1);
        let remaining = entry.refs;
        if remaining == 0 {
            let node = entry.node;
            self.gradients.entries.remove(&key);
            self.remove(node);
            log::trace!("gradient {id} removed");
        }
        remaining
    }

    pub fn gradient_refs(&self, id: &str) -> usize {
        self.gradients
            .entries
            .values()
            .find(|e| e.id == id)
            .map_or(0, |e| e.refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(start: &str, end: &str, dir: Direction) -> GradientKey {
        GradientKey::new(
            Color::parse(start).unwrap(),
            Color::parse(end).unwrap(),
            1.0,
            1.0,
            dir,
        )
    }

    #[test]
    fn identical_requests_share_a_definition() {
        let mut doc = Document::svg();
        let a = doc.acquire_gradient(&key("#FFFFFF", "#000000", Direction::South));
        let b = doc.acquire_gradient(&key("#ffffff", "black", Direction::South));
        assert_eq!(a, b);
        assert_eq!(doc.gradient_refs(&a), 2);
        assert_eq!(doc.find_all("linearGradient").len(), 1);
    }

    #[test]
    fn any_difference_is_a_new_definition() {
        let mut doc = Document::svg();
        let a = doc.acquire_gradient(&key("#FFFFFF", "#000000", Direction::South));
        let b = doc.acquire_gradient(&key("#FFFFFF", "#000000", Direction::East));
        let c = doc.acquire_gradient(&GradientKey::new(
            Color::WHITE,
            Color::BLACK,
            0.5,
            1.0,
            Direction::South,
        ));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn north_is_south_reversed() {
        assert_eq!(
            key("#FF0000", "#0000FF", Direction::North),
            key("#0000FF", "#FF0000", Direction::South)
        );
    }

    #[test]
    fn collisions_are_probed() {
        let mut doc = Document::svg();
        let k = key("#FFFFFF", "#000000", Direction::South);
        let squatter = doc.create("g");
        doc.set_attr(squatter, "id", k.base_id());
        let root = doc.root();
        doc.append(root, squatter);
        let id = doc.acquire_gradient(&k);
        assert_eq!(id, format!("{}-1", k.base_id()));
    }

    #[test]
    fn last_release_removes_node() {
        let mut doc = Document::svg();
        let k = key("#FFFFFF", "#000000", Direction::South);
        let id = doc.acquire_gradient(&k);
        doc.acquire_gradient(&k);
        assert_eq!(doc.release_gradient(&id), 1);
        assert!(doc.find_by_id(&id).is_some());
        assert_eq!(doc.release_gradient(&id), 0);
        assert!(doc.find_by_id(&id).is_none());
        assert_eq!(doc.gradient_refs(&id), 0);
    }
}
