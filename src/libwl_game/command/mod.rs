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

mod charge;
mod end_phase;
mod fight;
mod movement;
mod shooting;

pub use self::end_phase::apply as end_phase;

use crate::board::{Board, Point};
use crate::phase::Phase;
use crate::unit::Unit;

/// A finite discrete distribution over successor boards. The probabilities
/// are strictly positive and sum to one.
pub type Outcomes = Vec<(Board, f64)>;

/// An order a unit can be given, or one of the two bookkeeping commands
/// (`EndPhase`, `NoOp`) that advance the game without a unit acting.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    /// Move the unit at `from` to the empty cell `to`.
    Move { from: Point, to: Point },

    /// Fire the ranged weapon of the unit at `from` at the enemy on
    /// `target`. Overwatch reuses this with `override_hit_skill` set (which
    /// leaves the shooter's flags untouched) and `safe_target` set (so a
    /// target that has already been destroyed turns the shot into a no-op).
    Shoot {
        from: Point,
        target: Point,
        override_hit_skill: Option<i32>,
        safe_target: bool
    },

    /// Declare a charge from `from` to the empty cell `to`, resolving
    /// overwatch and the 2d6 distance roll.
    Charge { from: Point, to: Point },

    /// Strike the enemy on `target` in melee with the unit at `from`.
    Fight { from: Point, target: Point },

    /// End the acting team's current phase.
    EndPhase,

    /// Skip the unit currently choosing.
    NoOp
}

impl Command {
    /// Returns the position of the unit carrying out this command, or `None`
    /// for the bookkeeping commands.
    pub fn source(&self) -> Option<Point> {
        match *self {
            Command::Move { from, .. } => Some(from),
            Command::Shoot { from, .. } => Some(from),
            Command::Charge { from, .. } => Some(from),
            Command::Fight { from, .. } => Some(from),
            Command::EndPhase | Command::NoOp => None
        }
    }

    /// Returns the cell this command is directed at, or `None` for the
    /// bookkeeping commands.
    pub fn target(&self) -> Option<Point> {
        match *self {
            Command::Move { to, .. } => Some(to),
            Command::Shoot { target, .. } => Some(target),
            Command::Charge { to, .. } => Some(to),
            Command::Fight { target, .. } => Some(target),
            Command::EndPhase | Command::NoOp => None
        }
    }

    /// Returns true if this command orders a unit around (as opposed to
    /// ending the phase or skipping a unit).
    pub fn is_unit_order(&self) -> bool {
        self.source().is_some()
    }

    /// Returns the distribution of boards that can result from carrying out
    /// this command. The caller is responsible for only applying commands
    /// that are legal on the given board, illegal commands are programmer
    /// errors.
    ///
    /// # Arguments
    ///
    /// * `board` - the board to carry the command out on
    /// * `phase` - the current phase (consumed by `EndPhase`)
    ///
    pub fn apply(&self, board: &Board, phase: Phase) -> Outcomes {
        match *self {
            Command::Move { from, to } => movement::apply(board, from, to),
            Command::Shoot { from, target, override_hit_skill, safe_target } => {
                shooting::apply(board, from, target, override_hit_skill, safe_target)
            },
            Command::Charge { from, to } => charge::apply(board, from, to),
            Command::Fight { from, target } => fight::apply(board, from, target),
            Command::EndPhase => end_phase::apply(board, phase),
            Command::NoOp => vec! [(board.clone(), 1.0)]
        }
    }
}

/// Returns every legal order for the unit on the given cell in the given
/// phase, in the deterministic enumeration order of the destination cells.
/// The bookkeeping commands are not included.
///
/// # Arguments
///
/// * `point` - the position of the unit, which must be occupied
/// * `board` -
/// * `phase` -
///
pub fn unit_commands(point: Point, board: &Board, phase: Phase) -> Vec<Command> {
    match phase {
        Phase::Movement => movement::commands(point, board),
        Phase::Shooting => shooting::commands(point, board),
        Phase::Charge => charge::commands(point, board),
        Phase::Fight => fight::commands(point, board)
    }
}

/// Extends the distribution `outcomes` by resolving `f` on each board in it,
/// multiplying the probabilities along the way. This is the transformer that
/// chains every stochastic resolution in the command library.
///
/// # Arguments
///
/// * `outcomes` - the distribution so far
/// * `f` - the resolution to apply to each board
///
pub fn then<F>(outcomes: Outcomes, f: F) -> Outcomes
    where F: Fn(&Board) -> Outcomes
{
    let mut out = vec! [];

    for (board, p) in outcomes {
        for (next, q) in f(&board) {
            push(&mut out, next, p * q);
        }
    }

    out
}

/// Appends an outcome to a distribution under construction, dropping
/// impossible branches.
pub(crate) fn push(outcomes: &mut Outcomes, board: Board, p: f64) {
    if p > 0.0 {
        outcomes.push((board, p));
    }
}

/// Resolves a volley of `n` independent attacks that each penetrate with
/// probability `p` and deal `dmg` wounds, against the unit on `target`. The
/// attacker at `source` is replaced by `attacker` in every outcome (this is
/// how the per-turn flags of the attacker are recorded).
///
/// # Arguments
///
/// * `board` -
/// * `source` - the position of the attacking unit
/// * `attacker` - the attacking unit, flags already updated
/// * `target` - the position of the defending unit
/// * `p` - the per-attack penetrating-hit probability
/// * `n` - the number of attacks
/// * `dmg` - the wounds dealt per penetrating hit
///
pub(crate) fn resolve_attacks(
    board: &Board,
    source: Point,
    attacker: Unit,
    target: Point,
    p: f64,
    n: usize,
    dmg: i32
) -> Outcomes {
    let attacker_team = board.team_on(source).expect("no unit on the source square");
    let target_team = board.team_on(target).expect("no unit on the target square");
    let defender = board.unit_on(target).expect("no unit on the target square");
    let mut out = vec! [];

    for (hits, weight) in crate::prob::binomial(n, p).into_iter().enumerate() {
        if weight <= 0.0 {
            continue;
        }

        let mut next = board.clone();
        let hurt = defender.with_damage(dmg * hits as i32);

        if hurt.is_destroyed() {
            next.clear(target);
        } else {
            next.set(target, hurt, target_team);
        }
        next.set(source, attacker.clone(), attacker_team);

        push(&mut out, next, weight);
    }

    out
}
