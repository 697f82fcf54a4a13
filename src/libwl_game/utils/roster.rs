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

//! Loading of the two comma-separated input files: the unit statistics
//! (one squad profile per row, all cells except the name integral) and the
//! placements (which profile starts where, for which team). Columns are
//! resolved by header name so the files can carry them in any order.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use crate::board::{Board, Point};
use crate::state::GameState;
use crate::team::Team;
use crate::unit::Unit;

/// The reasons loading a roster or placement file can fail. These are data
/// integrity errors, they abort the run during startup.
#[derive(Debug)]
pub enum RosterError {
    Io(io::Error),
    MissingColumn(String),
    Malformed { line: usize, reason: String },
    UnknownUnit(String),
    InvalidPlacement(String)
}

impl fmt::Display for RosterError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RosterError::Io(reason) => write!(f, "{}", reason),
            RosterError::MissingColumn(name) => write!(f, "missing column `{}`", name),
            RosterError::Malformed { line, reason } => write!(f, "line {}: {}", line, reason),
            RosterError::UnknownUnit(name) => write!(f, "placement references unknown unit `{}`", name),
            RosterError::InvalidPlacement(reason) => write!(f, "{}", reason)
        }
    }
}

impl From<io::Error> for RosterError {
    fn from(reason: io::Error) -> RosterError {
        RosterError::Io(reason)
    }
}

/// One row of the placement file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    pub name: String,
    pub team: Team,
    pub x: usize,
    pub y: usize
}

/// Parses the unit statistics file at the given path.
pub fn load_units(path: &Path) -> Result<Vec<Unit>, RosterError> {
    parse_units(&fs::read_to_string(path)?)
}

/// Parses the placement file at the given path.
pub fn load_placements(path: &Path) -> Result<Vec<Placement>, RosterError> {
    parse_placements(&fs::read_to_string(path)?)
}

/// Parses the contents of a unit statistics file.
pub fn parse_units(content: &str) -> Result<Vec<Unit>, RosterError> {
    let mut rows = Rows::new(content);
    let header = rows.header()?;
    let mut out = vec! [];

    while let Some((line, cells)) = rows.next()? {
        let row = Row { header: &header, line, cells };
        let count = row.int("count")?;
        let w = row.int("w")?;
        let total_w = row.int("total_w")?;

        if count <= 0 || w <= 0 || total_w <= 0 {
            return Err(RosterError::Malformed {
                line,
                reason: "count, w, and total_w must all be positive".into()
            });
        }

        out.push(Unit {
            name: row.text("name")?,
            count,
            movement: row.int("movement")?,
            ws: row.int("ws")?,
            bs: row.int("bs")?,
            t: row.int("t")?,
            w,
            total_w,
            a: row.int("a")?,
            ld: row.int("ld")?,
            sv: row.int("sv")?,
            inv: row.int("inv")?,
            rg_range: row.int("rg_range")?,
            rg_s: row.int("rg_s")?,
            rg_ap: row.int("rg_ap")?,
            rg_dmg: row.int("rg_dmg")?,
            rg_shots: row.int("rg_shots")?,
            rg_is_rapid: row.flag("rg_is_rapid")?,
            rg_is_heavy: row.flag("rg_is_heavy")?,
            ml_s: row.int("ml_s")?,
            ml_ap: row.int("ml_ap")?,
            ml_dmg: row.int("ml_dmg")?,
            moved: false,
            fired: false,
            attempted_charge: false,
            successful_charge: false,
            fought: false,
            moved_out_of_combat: false,
            models_lost: 0
        });
    }

    Ok(out)
}

/// Parses the contents of a placement file.
pub fn parse_placements(content: &str) -> Result<Vec<Placement>, RosterError> {
    let mut rows = Rows::new(content);
    let header = rows.header()?;
    let mut out = vec! [];

    while let Some((line, cells)) = rows.next()? {
        let row = Row { header: &header, line, cells };
        let team = row.int("team")?;
        let team = Team::from_index(team as usize).ok_or_else(|| RosterError::Malformed {
            line,
            reason: format!("team must be 0 or 1, not {}", team)
        })?;

        out.push(Placement {
            name: row.text("name")?,
            team,
            x: row.int("x")? as usize,
            y: row.int("y")? as usize
        });
    }

    Ok(out)
}

/// Builds the opening state of a game from a roster and its placements.
/// Rejects placements that reference unknown units, fall outside the board,
/// collide with each other, or leave a team without any units.
///
/// # Arguments
///
/// * `units` - the unit profiles
/// * `placements` - which profile starts where
/// * `size` - the side length of the board, in cells
/// * `scale` - the distance between adjacent cells, in inches
/// * `turn_limit` - the half-turn limit of the game
///
pub fn initial_state(
    units: &[Unit],
    placements: &[Placement],
    size: usize,
    scale: f32,
    turn_limit: usize
) -> Result<GameState, RosterError> {
    let by_name: HashMap<&str, &Unit> = units.iter().map(|unit| (unit.name.as_str(), unit)).collect();
    let mut board = Board::new(size, scale);

    for placement in placements {
        let unit = *by_name.get(placement.name.as_str())
            .ok_or_else(|| RosterError::UnknownUnit(placement.name.clone()))?;

        if placement.x >= size || placement.y >= size {
            return Err(RosterError::InvalidPlacement(format!(
                "unit `{}` placed outside the board at ({}, {})",
                placement.name, placement.x, placement.y
            )));
        }

        let point = Point::new(placement.x, placement.y);

        if board.is_occupied(point) {
            return Err(RosterError::InvalidPlacement(format!(
                "two units placed on ({}, {})",
                placement.x, placement.y
            )));
        }

        board.set(point, unit.clone(), placement.team);
    }

    for team in [Team::Red, Team::Blue] {
        if board.all_units(team).is_empty() {
            return Err(RosterError::InvalidPlacement(format!("team {} has no units", team)));
        }
    }

    Ok(GameState::start(board, turn_limit))
}

/// A line-by-line splitter over a comma-separated file, skipping blank
/// lines.
struct Rows<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>
}

impl<'a> Rows<'a> {
    fn new(content: &'a str) -> Rows<'a> {
        Rows { lines: content.lines().enumerate() }
    }

    fn header(&mut self) -> Result<HashMap<String, usize>, RosterError> {
        match self.next()? {
            None => Err(RosterError::Malformed { line: 1, reason: "empty file".into() }),
            Some((_, cells)) => {
                Ok(cells.into_iter().enumerate().map(|(i, name)| (name, i)).collect())
            }
        }
    }

    #[allow(clippy::should_implement_trait)]
    fn next(&mut self) -> Result<Option<(usize, Vec<String>)>, RosterError> {
        for (number, line) in self.lines.by_ref() {
            if line.trim().is_empty() {
                continue;
            }

            return Ok(Some((
                number + 1,
                line.split(',').map(|cell| cell.trim().to_string()).collect()
            )));
        }

        Ok(None)
    }
}

/// One data row, with cells addressed by header name.
struct Row<'a> {
    header: &'a HashMap<String, usize>,
    line: usize,
    cells: Vec<String>
}

impl<'a> Row<'a> {
    fn text(&self, column: &str) -> Result<String, RosterError> {
        let &index = self.header.get(column)
            .ok_or_else(|| RosterError::MissingColumn(column.into()))?;

        self.cells.get(index).cloned().ok_or_else(|| RosterError::Malformed {
            line: self.line,
            reason: format!("missing cell for column `{}`", column)
        })
    }

    fn int(&self, column: &str) -> Result<i32, RosterError> {
        let cell = self.text(column)?;

        cell.parse().map_err(|_| RosterError::Malformed {
            line: self.line,
            reason: format!("`{}` is not an integer (column `{}`)", cell, column)
        })
    }

    fn flag(&self, column: &str) -> Result<bool, RosterError> {
        Ok(self.int(column)? != 0)
    }
}
