//! Sparse multi-floor character plane with hallway landmarks.
//!
//! Every floor is an independent 2D grid of single-byte characters. Unset
//! cells read as a blank (`' '`), and writing a blank deletes the cell.
//! Hallways are `y` rows that act as jump targets; each floor keeps them in
//! strictly descending order so "which hallway am I under" and the
//! next/previous queries are binary searches.

use std::collections::HashMap;

use thiserror::Error;

/// The vacant cell character.
pub const BLANK: char = ' ';

/// A cell address, or a direction vector when used as a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Coord {
    /// Column.
    pub x: i64,
    /// Row. Larger values are "up".
    pub y: i64,
    /// Floor level.
    pub floor: i64,
}

impl Coord {
    /// Creates a coordinate triple.
    #[must_use]
    pub const fn new(x: i64, y: i64, floor: i64) -> Self {
        Self { x, y, floor }
    }

    /// Returns `self + step * times`, wrapping on overflow.
    #[must_use]
    pub const fn offset(self, step: Self, times: i64) -> Self {
        Self {
            x: self.x.wrapping_add(step.x.wrapping_mul(times)),
            y: self.y.wrapping_add(step.y.wrapping_mul(times)),
            floor: self.floor.wrapping_add(step.floor.wrapping_mul(times)),
        }
    }
}

/// Construction errors raised by the memory plane.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomsError {
    /// Name was empty or contained characters outside `[A-Za-z0-9_]`.
    #[error("bad name {0:?}")]
    BadName(String),
    /// Character falls outside the single-byte range.
    #[error("bad character {0:?}")]
    BadCharacter(char),
}

/// Returns `true` when `c` is storable in a cell.
#[must_use]
pub const fn is_character(c: char) -> bool {
    (c as u32) <= 0xFF
}

/// Returns `true` for non-empty names built from `[A-Za-z0-9_]`.
#[must_use]
pub fn is_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn check_name(name: &str) -> Result<(), RoomsError> {
    if is_name(name) {
        Ok(())
    } else {
        Err(RoomsError::BadName(name.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Floor {
    cells: HashMap<(i64, i64), u8>,
    // Strictly descending.
    hallways: Vec<i64>,
    names_by_y: HashMap<i64, String>,
    ys_by_name: HashMap<String, i64>,
}

impl Floor {
    fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.hallways.is_empty()
    }

    /// Index of the nearest hallway at or above `y`.
    fn containing_index(&self, y: i64) -> Option<usize> {
        // Number of hallways with hallway_y >= y; the last of those is the ceiling.
        let above = self.hallways.partition_point(|&hallway| hallway >= y);
        above.checked_sub(1)
    }

    fn remove_hallway(&mut self, y: i64) {
        if let Ok(index) = self.hallways.binary_search_by(|probe| y.cmp(probe)) {
            self.hallways.remove(index);
            if let Some(name) = self.names_by_y.remove(&y) {
                self.ys_by_name.remove(&name);
            }
        }
    }
}

/// The memory plane shared by every execution unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rooms {
    floors: HashMap<i64, Floor>,
    floor_names: HashMap<i64, String>,
    floor_levels: HashMap<String, i64>,
}

impl Rooms {
    /// Creates an empty plane.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the character at `at`, defaulting to [`BLANK`].
    #[must_use]
    pub fn read(&self, at: Coord) -> char {
        self.floors
            .get(&at.floor)
            .and_then(|floor| floor.cells.get(&(at.x, at.y)))
            .map_or(BLANK, |&byte| char::from(byte))
    }

    /// Returns `true` when nothing is stored at `at`.
    #[must_use]
    pub fn is_vacant(&self, at: Coord) -> bool {
        !self
            .floors
            .get(&at.floor)
            .is_some_and(|floor| floor.cells.contains_key(&(at.x, at.y)))
    }

    /// Writes `character` at `at`. Writing [`BLANK`] deletes the cell.
    ///
    /// # Errors
    ///
    /// Returns [`RoomsError::BadCharacter`] for characters above `U+00FF`.
    pub fn write(&mut self, at: Coord, character: char) -> Result<(), RoomsError> {
        let byte = u8::try_from(u32::from(character))
            .map_err(|_| RoomsError::BadCharacter(character))?;
        if character == BLANK {
            if let Some(floor) = self.floors.get_mut(&at.floor) {
                floor.cells.remove(&(at.x, at.y));
            }
        } else {
            self.floors
                .entry(at.floor)
                .or_default()
                .cells
                .insert((at.x, at.y), byte);
        }
        Ok(())
    }

    /// Writes each character of `text` starting at `start`, advancing by `direction`.
    ///
    /// # Errors
    ///
    /// Returns [`RoomsError::BadCharacter`] on the first unstorable character;
    /// characters before it stay written.
    pub fn write_line(
        &mut self,
        start: Coord,
        direction: Coord,
        text: &str,
    ) -> Result<(), RoomsError> {
        let mut at = start;
        for character in text.chars() {
            self.write(at, character)?;
            at = at.offset(direction, 1);
        }
        Ok(())
    }

    /// Creates, renames, or un-names the hallway at `y` on `level`.
    ///
    /// A name already used by another hallway on the same floor moves here;
    /// the old hallway is removed. `None` keeps the hallway but drops its name.
    ///
    /// # Errors
    ///
    /// Returns [`RoomsError::BadName`] for an invalid name.
    pub fn set_hallway_name(
        &mut self,
        y: i64,
        level: i64,
        name: Option<&str>,
    ) -> Result<(), RoomsError> {
        if let Some(name) = name {
            check_name(name)?;
        }
        let floor = self.floors.entry(level).or_default();
        if let Some(name) = name {
            if let Some(&old_y) = floor.ys_by_name.get(name) {
                if old_y != y {
                    floor.remove_hallway(old_y);
                }
            }
        }

        if let Err(index) = floor.hallways.binary_search_by(|probe| y.cmp(probe)) {
            floor.hallways.insert(index, y);
        }
        if let Some(old) = floor.names_by_y.remove(&y) {
            floor.ys_by_name.remove(&old);
        }
        if let Some(name) = name {
            floor.names_by_y.insert(y, name.to_string());
            floor.ys_by_name.insert(name.to_string(), y);
        }
        Ok(())
    }

    /// Removes the hallway at `y` on `level`, if any.
    pub fn remove_hallway(&mut self, y: i64, level: i64) {
        if let Some(floor) = self.floors.get_mut(&level) {
            floor.remove_hallway(y);
        }
    }

    /// Name of the hallway at exactly `y`.
    #[must_use]
    pub fn get_hallway_name(&self, y: i64, level: i64) -> Option<&str> {
        self.floors
            .get(&level)
            .and_then(|floor| floor.names_by_y.get(&y))
            .map(String::as_str)
    }

    /// Row of the hallway called `name` on `level`.
    #[must_use]
    pub fn get_hallway_location_by_name(&self, level: i64, name: &str) -> Option<i64> {
        self.floors
            .get(&level)
            .and_then(|floor| floor.ys_by_name.get(name))
            .copied()
    }

    /// Nearest hallway whose row is at or above `y`.
    #[must_use]
    pub fn find_hallway_containing(&self, y: i64, level: i64) -> Option<i64> {
        let floor = self.floors.get(&level)?;
        floor.containing_index(y).map(|index| floor.hallways[index])
    }

    /// Hallway immediately above the one containing `y`.
    #[must_use]
    pub fn next_hallway(&self, y: i64, level: i64) -> Option<i64> {
        let floor = self.floors.get(&level)?;
        let index = floor.containing_index(y)?.checked_sub(1)?;
        floor.hallways.get(index).copied()
    }

    /// Hallway immediately below the one containing `y`.
    #[must_use]
    pub fn previous_hallway(&self, y: i64, level: i64) -> Option<i64> {
        let floor = self.floors.get(&level)?;
        let index = floor.containing_index(y)? + 1;
        floor.hallways.get(index).copied()
    }

    /// Hallway rows on `level` in descending order.
    pub fn hallways(&self, level: i64) -> impl Iterator<Item = i64> + '_ {
        self.floors
            .get(&level)
            .into_iter()
            .flat_map(|floor| floor.hallways.iter().copied())
    }

    /// Binds `name` to `level`, or clears the binding with `None`.
    ///
    /// Floor names are unique across the plane; rebinding moves the name.
    ///
    /// # Errors
    ///
    /// Returns [`RoomsError::BadName`] for an invalid name.
    pub fn set_floor_name(&mut self, level: i64, name: Option<&str>) -> Result<(), RoomsError> {
        if let Some(name) = name {
            check_name(name)?;
        }
        if let Some(old) = self.floor_names.remove(&level) {
            self.floor_levels.remove(&old);
        }
        if let Some(name) = name {
            if let Some(old_level) = self.floor_levels.remove(name) {
                self.floor_names.remove(&old_level);
            }
            self.floor_names.insert(level, name.to_string());
            self.floor_levels.insert(name.to_string(), level);
        }
        Ok(())
    }

    /// Name bound to `level`.
    #[must_use]
    pub fn get_floor_name(&self, level: i64) -> Option<&str> {
        self.floor_names.get(&level).map(String::as_str)
    }

    /// Level bound to `name`.
    #[must_use]
    pub fn get_floor_level_by_name(&self, name: &str) -> Option<i64> {
        self.floor_levels.get(name).copied()
    }

    /// Drops every cell, hallway and the name of `level`.
    pub fn remove_floor(&mut self, level: i64) {
        self.floors.remove(&level);
        if let Some(name) = self.floor_names.remove(&level) {
            self.floor_levels.remove(&name);
        }
    }

    /// Replaces floor `to` with a copy of the cells and hallways of `from`.
    ///
    /// The floor name of `from` is not copied since floor names are unique.
    pub fn duplicate_floor(&mut self, from: i64, to: i64) {
        if from == to {
            return;
        }
        self.remove_floor(to);
        if let Some(copy) = self
            .floors
            .get(&from)
            .filter(|floor| !floor.is_empty())
            .cloned()
        {
            self.floors.insert(to, copy);
        }
    }

    /// Finds a hallway called `name`, searching floors 0, 1, -1, 2, -2, ...
    #[must_use]
    pub fn find_a_hallway(&self, name: &str) -> Option<(i64, i64)> {
        let mut levels: Vec<i64> = self
            .floors
            .iter()
            .filter(|(_, floor)| floor.ys_by_name.contains_key(name))
            .map(|(&level, _)| level)
            .collect();
        levels.sort_by_key(|&level| (level.unsigned_abs(), level < 0));
        let level = *levels.first()?;
        self.get_hallway_location_by_name(level, name)
            .map(|y| (y, level))
    }
}
