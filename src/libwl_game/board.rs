// Copyright 2020 Karl Sundequist Blomdahl <karl.sundequist.blomdahl@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::team::Team;
use crate::unit::Unit;

/// A cell coordinate on the board. The origin is the top-left corner, `x`
/// grows to the right and `y` grows downward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point {
    pub x: usize,
    pub y: usize
}

impl Point {
    pub fn new(x: usize, y: usize) -> Point {
        Point { x, y }
    }

    /// Returns the row-major index of this point on a board of the given
    /// side length.
    pub fn to_index(self, size: usize) -> usize {
        self.y * size + self.x
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A square grid of cells, each either empty or holding exactly one unit of
/// one team. The `scale` gives the physical distance (in inches) between two
/// horizontally adjacent cells, so that weapon ranges and movement
/// allowances, which are expressed in inches, translate to cell radii.
///
/// Boards are value types: they compare structurally and cloning is the way
/// state transitions derive new boards from old ones.
#[derive(Clone, Debug, PartialEq)]
pub struct Board {
    size: usize,
    scale: f32,
    cells: Vec<Option<(Unit, Team)>>
}

impl Eq for Board {}

impl Hash for Board {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.size.hash(state);
        self.scale.to_bits().hash(state);
        self.cells.hash(state);
    }
}

impl Board {
    /// Returns an empty board.
    ///
    /// # Arguments
    ///
    /// * `size` - the side length of the board, in cells
    /// * `scale` - the distance between two adjacent cells, in inches
    ///
    pub fn new(size: usize, scale: f32) -> Board {
        assert!(size > 0);
        assert!(scale > 0.0);

        Board {
            size,
            scale,
            cells: vec! [None; size * size]
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Returns true if the given cell holds a unit.
    pub fn is_occupied(&self, point: Point) -> bool {
        self.cells[point.to_index(self.size)].is_some()
    }

    /// Returns the unit on the given cell, if any.
    pub fn unit_on(&self, point: Point) -> Option<&Unit> {
        self.cells[point.to_index(self.size)].as_ref().map(|(unit, _)| unit)
    }

    /// Returns the team of the unit on the given cell, if any.
    pub fn team_on(&self, point: Point) -> Option<Team> {
        self.cells[point.to_index(self.size)].as_ref().map(|&(_, team)| team)
    }

    /// Puts the given unit onto the given cell, replacing whatever was
    /// there.
    pub fn set(&mut self, point: Point, unit: Unit, team: Team) {
        self.cells[point.to_index(self.size)] = Some((unit, team));
    }

    /// Empties the given cell.
    pub fn clear(&mut self, point: Point) {
        self.cells[point.to_index(self.size)] = None;
    }

    /// Returns the physical distance between the two given cells, in inches.
    pub fn distance(&self, a: Point, b: Point) -> f32 {
        let dx = a.x as f32 - b.x as f32;
        let dy = a.y as f32 - b.y as f32;

        self.scale * (dx * dx + dy * dy).sqrt()
    }

    /// Returns every cell whose centre lies within the physical radius `r`
    /// (in inches) of the given cell, the cell itself included. The cells
    /// are enumerated in row-major order.
    ///
    /// # Arguments
    ///
    /// * `point` - the centre of the disc
    /// * `r` - the radius of the disc, in inches
    ///
    pub fn squares_within(&self, point: Point, r: f32) -> Vec<Point> {
        let r = r / self.scale;
        if r < 0.0 {
            return vec! [];
        }

        let cr = r.ceil() as usize;
        let left = point.x.saturating_sub(cr);
        let right = (point.x + cr).min(self.size - 1);
        let top = point.y.saturating_sub(cr);
        let bottom = (point.y + cr).min(self.size - 1);
        let r_squared = r * r;
        let mut out = vec! [];

        for y in top..=bottom {
            for x in left..=right {
                let dx = point.x as f32 - x as f32;
                let dy = point.y as f32 - y as f32;

                if dx * dx + dy * dy <= r_squared {
                    out.push(Point::new(x, y));
                }
            }
        }

        out
    }

    /// Returns true if any of the up to eight cells surrounding the given
    /// cell (the cell itself excluded) holds a unit of the opposing team.
    /// Such a unit is _in melee_.
    ///
    /// # Arguments
    ///
    /// * `point` - the cell to check around
    /// * `team` - the friendly team
    ///
    pub fn has_adjacent_enemy(&self, point: Point, team: Team) -> bool {
        let left = point.x.saturating_sub(1);
        let right = (point.x + 1).min(self.size - 1);
        let top = point.y.saturating_sub(1);
        let bottom = (point.y + 1).min(self.size - 1);

        for y in top..=bottom {
            for x in left..=right {
                if x == point.x && y == point.y {
                    continue;
                }

                if let Some(other) = self.team_on(Point::new(x, y)) {
                    if other != team {
                        return true;
                    }
                }
            }
        }

        false
    }

    /// Returns the positions of all units of the given team, in row-major
    /// order.
    pub fn all_units(&self, team: Team) -> Vec<Point> {
        let mut out = vec! [];

        for y in 0..self.size {
            for x in 0..self.size {
                let point = Point::new(x, y);

                if self.team_on(point) == Some(team) {
                    out.push(point);
                }
            }
        }

        out
    }
}
