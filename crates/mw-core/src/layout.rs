//! Organelle layouts: positioned organelles on a hex grid that never overlap.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::hex::{HEX_SIZE, Hex};

/// Internal name of the filler organelle that others may replace.
pub const CYTOPLASM: &str = "cytoplasm";

/// Distance from the origin to the far edge of the outermost hex.
pub fn hex_radius(hexes: &[Hex]) -> f32 {
    hexes
        .iter()
        .map(|h| h.to_cartesian().length() + HEX_SIZE)
        .fold(0.0, f32::max)
}

/// Static description of an organelle type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganelleDefinition {
    /// Display name.
    pub name: String,
    /// Mass used for the layout's centre of mass.
    pub mass: f32,
    /// Hexes relative to the anchor, before rotation.
    pub hexes: Vec<Hex>,
}

impl OrganelleDefinition {
    /// A definition with the given hex shape at orientation 0.
    pub fn new(name: impl Into<String>, mass: f32, hexes: Vec<Hex>) -> Self {
        Self {
            name: name.into(),
            mass,
            hexes,
        }
    }

    /// Single-hex cytoplasm.
    pub fn cytoplasm() -> Self {
        Self::new(CYTOPLASM, 0.1, vec![Hex::ZERO])
    }

    /// Hexes relative to the anchor after rotating by `orientation` sixths.
    pub fn rotated_hexes(&self, orientation: u32) -> impl Iterator<Item = Hex> + '_ {
        self.hexes.iter().map(move |h| h.rotated(orientation))
    }

    /// Cytoplasm may be replaced by other organelles.
    pub fn is_cytoplasm(&self) -> bool {
        self.name == CYTOPLASM
    }
}

/// Anything that occupies hexes in a layout.
pub trait PositionedOrganelle {
    /// Shape and mass of the organelle.
    fn definition(&self) -> &OrganelleDefinition;
    /// Position of the organelle's origin hex.
    fn position(&self) -> Hex;
    /// Rotation in 60 degree steps.
    fn orientation(&self) -> u32;

    /// Absolute hexes covered by this organelle.
    fn occupied_hexes(&self) -> Vec<Hex> {
        let position = self.position();
        self.definition()
            .rotated_hexes(self.orientation())
            .map(|h| h + position)
            .collect()
    }
}

/// An organelle placed at a hex with an orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrganelle {
    /// Shared shape and mass.
    pub definition: Arc<OrganelleDefinition>,
    /// Origin hex.
    pub position: Hex,
    /// Rotation in 60 degree steps.
    pub orientation: u32,
}

impl PlacedOrganelle {
    /// Place `definition` at `position` with the given rotation.
    pub fn new(definition: Arc<OrganelleDefinition>, position: Hex, orientation: u32) -> Self {
        Self {
            definition,
            position,
            orientation,
        }
    }
}

impl PositionedOrganelle for PlacedOrganelle {
    fn definition(&self) -> &OrganelleDefinition {
        &self.definition
    }

    fn position(&self) -> Hex {
        self.position
    }

    fn orientation(&self) -> u32 {
        self.orientation
    }
}

type Callback<T> = Box<dyn FnMut(&T) + Send>;

/// A list of positioned organelles. Verifies that they don't overlap.
pub struct OrganelleLayout<T> {
    organelles: Vec<T>,
    on_added: Option<Callback<T>>,
    on_removed: Option<Callback<T>>,
}

impl<T: fmt::Debug> fmt::Debug for OrganelleLayout<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrganelleLayout")
            .field("organelles", &self.organelles)
            .finish_non_exhaustive()
    }
}

impl<T> Default for OrganelleLayout<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OrganelleLayout<T> {
    /// An empty layout without callbacks.
    pub fn new() -> Self {
        Self {
            organelles: Vec::new(),
            on_added: None,
            on_removed: None,
        }
    }

    /// Create a layout that reports additions and removals.
    pub fn with_callbacks(
        on_added: impl FnMut(&T) + Send + 'static,
        on_removed: impl FnMut(&T) + Send + 'static,
    ) -> Self {
        Self {
            organelles: Vec::new(),
            on_added: Some(Box::new(on_added)),
            on_removed: Some(Box::new(on_removed)),
        }
    }

    /// Number of organelles.
    pub fn len(&self) -> usize {
        self.organelles.len()
    }

    /// True when no organelle is placed.
    pub fn is_empty(&self) -> bool {
        self.organelles.is_empty()
    }

    /// Organelle by insertion index.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.organelles.get(index)
    }

    /// Organelles in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.organelles.iter()
    }
}

impl<T: PositionedOrganelle> OrganelleLayout<T> {
    /// Adds a new organelle. Fails if it overlaps an existing one.
    pub fn add(&mut self, organelle: T) -> CoreResult<()> {
        if !self.can_place(&organelle, false) {
            return Err(CoreError::OrganelleOverlap {
                name: organelle.definition().name.clone(),
                position: organelle.position(),
            });
        }
        if let Some(cb) = self.on_added.as_mut() {
            cb(&organelle);
        }
        self.organelles.push(organelle);
        Ok(())
    }

    /// Returns true if none of the organelle's hexes are taken.
    ///
    /// With `allow_cytoplasm_overlap`, hexes held by cytoplasm count as free.
    pub fn can_place(&self, organelle: &T, allow_cytoplasm_overlap: bool) -> bool {
        organelle.occupied_hexes().into_iter().all(|hex| {
            match self.organelle_at(hex) {
                None => true,
                Some(existing) => allow_cytoplasm_overlap && existing.definition().is_cytoplasm(),
            }
        })
    }

    /// Like [`can_place`](Self::can_place), but also requires the organelle
    /// to touch an existing hex, or to replace the last remaining cytoplasm.
    pub fn can_place_and_is_touching(
        &self,
        organelle: &T,
        allow_cytoplasm_overlap: bool,
        allow_replacing_last_cytoplasm: bool,
    ) -> bool {
        if !self.can_place(organelle, allow_cytoplasm_overlap) {
            return false;
        }
        self.is_touching_existing_hex(organelle)
            || (allow_replacing_last_cytoplasm && self.is_replacing_last(organelle))
    }

    /// Returns true if one of the organelle's hexes borders a placed hex.
    pub fn is_touching_existing_hex(&self, organelle: &T) -> bool {
        organelle
            .occupied_hexes()
            .into_iter()
            .any(|hex| self.check_if_hex_is_next_to(hex))
    }

    /// Returns true if the layout is a single cytoplasm sitting at the
    /// organelle's anchor.
    pub fn is_replacing_last(&self, organelle: &T) -> bool {
        if self.len() != 1 {
            return false;
        }
        self.organelle_at(organelle.position())
            .is_some_and(|existing| existing.definition().is_cytoplasm())
    }

    /// Returns true if some placed organelle has a hex next to `location`.
    pub fn check_if_hex_is_next_to(&self, location: Hex) -> bool {
        location
            .neighbours()
            .any(|neighbour| self.organelle_at(neighbour).is_some())
    }

    /// The organelle covering `location`, if any.
    pub fn organelle_at(&self, location: Hex) -> Option<&T> {
        self.organelles.iter().find(|organelle| {
            let relative = location - organelle.position();
            organelle
                .definition()
                .rotated_hexes(organelle.orientation())
                .any(|hex| hex == relative)
        })
    }

    /// Removes the organelle covering `location`. Returns false if the hex was empty.
    pub fn remove_organelle_at(&mut self, location: Hex) -> bool {
        let Some(index) = self.index_at(location) else {
            return false;
        };
        self.remove_index(index);
        true
    }

    /// Removes every organelle, last to first.
    pub fn clear(&mut self) {
        while let Some(last) = self.organelles.len().checked_sub(1) {
            self.remove_index(last);
        }
    }

    /// Total number of hexes covered.
    pub fn hex_count(&self) -> usize {
        self.organelles
            .iter()
            .map(|o| o.definition().hexes.len())
            .sum()
    }

    /// All covered hexes, in placement order.
    pub fn occupied_hexes(&self) -> Vec<Hex> {
        self.organelles
            .iter()
            .flat_map(PositionedOrganelle::occupied_hexes)
            .collect()
    }

    /// Mass-weighted centre of the layout. `None` when there is no mass.
    pub fn center_of_mass(&self) -> Option<Hex> {
        let mut total_mass = 0.0;
        let mut weighted = Vec3::ZERO;
        for organelle in &self.organelles {
            let mass = organelle.definition().mass;
            total_mass += mass;
            weighted += organelle.position().to_cartesian() * mass;
        }
        (total_mass > 0.0).then(|| Hex::from_cartesian(weighted / total_mass))
    }

    /// Anchors of organelles not connected to the first placed organelle.
    pub fn island_hexes(&self) -> Vec<Hex> {
        let Some(first) = self.organelles.first() else {
            return Vec::new();
        };
        let occupied: HashSet<Hex> = self.occupied_hexes().into_iter().collect();

        let mut visited = HashSet::from([first.position()]);
        let mut queue = VecDeque::from([first.position()]);
        while let Some(hex) = queue.pop_front() {
            for neighbour in hex.neighbours() {
                if occupied.contains(&neighbour) && visited.insert(neighbour) {
                    queue.push_back(neighbour);
                }
            }
        }

        self.organelles
            .iter()
            .map(PositionedOrganelle::position)
            .filter(|p| !visited.contains(p))
            .collect()
    }

    fn index_at(&self, location: Hex) -> Option<usize> {
        let found = self.organelle_at(location)?;
        self.organelles
            .iter()
            .position(|o| std::ptr::eq(o, found))
    }

    fn remove_index(&mut self, index: usize) {
        let removed = self.organelles.remove(index);
        if let Some(cb) = self.on_removed.as_mut() {
            cb(&removed);
        }
    }
}

impl<T: PositionedOrganelle + PartialEq> OrganelleLayout<T> {
    /// Removes a previously placed organelle. Returns false if it wasn't present.
    pub fn remove(&mut self, organelle: &T) -> bool {
        match self.organelles.iter().position(|o| o == organelle) {
            Some(index) => {
                self.remove_index(index);
                true
            }
            None => false,
        }
    }

    /// True if `organelle` is part of the layout.
    pub fn contains(&self, organelle: &T) -> bool {
        self.organelles.contains(organelle)
    }
}

impl<'a, T> IntoIterator for &'a OrganelleLayout<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.organelles.iter()
    }
}
