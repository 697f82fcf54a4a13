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

use crate::board::{Board, Point};
use crate::command::{self, Command};
use crate::phase::Phase;
use crate::team::Team;

/// The complete, immutable state of a game in progress: the board, whose
/// turn and phase it is, and the queue of the acting team's units that still
/// have decisions to make this phase. The head of the queue is the unit
/// currently choosing.
///
/// States compare structurally and hash totally, so that a search tree can
/// locate a committed state among the successors it has materialized.
///
/// Externally observable states are always _settled_: either the game is
/// over, or the head of the queue has at least one order beyond skipping.
/// `apply` maintains this by popping option-less units off the queue and
/// rolling through phase boundaries (the auto-forward procedure) before
/// returning successor states.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GameState {
    board: Board,
    team: Team,
    phase: Phase,
    turn: usize,
    turn_limit: usize,
    queue: Vec<Point>
}

impl GameState {
    /// Returns the opening state of a game on the given board: team 0's
    /// movement phase of turn zero, already settled.
    ///
    /// # Arguments
    ///
    /// * `board` - the starting board, with both armies placed
    /// * `turn_limit` - the number of half-turns after which the game is
    ///   scored as it stands (zero means no limit)
    ///
    pub fn start(board: Board, turn_limit: usize) -> GameState {
        let queue = initial_queue(&board, Team::Red);
        let state = GameState {
            board,
            team: Team::Red,
            phase: Phase::Movement,
            turn: 0,
            turn_limit,
            queue
        };

        // no squad has lost models yet so no morale test can fire, which
        // makes settling deterministic
        let mut settled = state.auto_forward();
        assert_eq!(settled.len(), 1);

        settled.pop().unwrap().0
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn acting_team(&self) -> Team {
        self.team
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn turn_number(&self) -> usize {
        self.turn
    }

    /// Returns the position of the unit currently choosing, or `None` when
    /// the game is over.
    pub fn active_unit(&self) -> Option<Point> {
        self.queue.last().copied()
    }

    /// Returns true if either army has been wiped out, or the turn limit
    /// has been reached.
    pub fn is_finished(&self) -> bool {
        self.board.all_units(Team::Red).is_empty()
            || self.board.all_units(Team::Blue).is_empty()
            || (self.turn_limit > 0 && self.turn >= self.turn_limit)
    }

    /// Returns the value of this state for the given team: `1.0` if only
    /// that team still has units on the board, `-1.0` if only its opponent
    /// does, and `0.0` otherwise.
    pub fn game_value(&self, team: Team) -> f64 {
        let ours = !self.board.all_units(team).is_empty();
        let theirs = !self.board.all_units(team.opposite()).is_empty();

        match (ours, theirs) {
            (true, false) => 1.0,
            (false, true) => -1.0,
            _ => 0.0
        }
    }

    /// Returns every command that may be applied to this state: the head
    /// unit's orders followed by `NoOp`, or `EndPhase` alone in the
    /// (transient) case of an empty queue. Finished games have no commands.
    pub fn legal_commands(&self) -> Vec<Command> {
        if self.is_finished() {
            return vec! [];
        }

        match self.queue.last() {
            None => vec! [Command::EndPhase],
            Some(&head) => {
                let mut out = command::unit_commands(head, &self.board, self.phase);
                out.push(Command::NoOp);
                out
            }
        }
    }

    /// Returns the distribution of settled successor states that results
    /// from applying the given command to this state. Applying a command to
    /// a finished state, or a unit order that is not legal here, is a
    /// programmer error.
    pub fn apply(&self, command: &Command) -> Vec<(GameState, f64)> {
        assert!(!self.is_finished(), "cannot apply a command to a finished game");

        match command {
            Command::EndPhase => self.advance_phase(),
            Command::NoOp => {
                let mut next = self.clone();
                next.queue.pop();
                next.auto_forward()
            },
            order => {
                let head = self.queue.last().copied().expect("no unit is choosing");
                debug_assert_eq!(order.source(), Some(head));

                let mut out = vec! [];

                for (board, p) in order.apply(&self.board, self.phase) {
                    let mut next = self.clone();
                    next.board = board;
                    next.queue.pop();

                    for (settled, q) in next.auto_forward() {
                        out.push((settled, p * q));
                    }
                }

                out
            }
        }
    }

    /// Pops leading units that have no orders beyond skipping off the
    /// queue, ending the phase (and recursing) whenever the queue runs dry,
    /// so that every returned state is settled.
    fn auto_forward(mut self) -> Vec<(GameState, f64)> {
        if self.is_finished() {
            return vec! [(self, 1.0)];
        }

        while let Some(&head) = self.queue.last() {
            if !command::unit_commands(head, &self.board, self.phase).is_empty() {
                return vec! [(self, 1.0)];
            }

            self.queue.pop();
        }

        self.advance_phase()
    }

    /// Ends the current phase: runs morale and flag clearing on the board,
    /// steps the phase (handing the turn to the opposite team after the
    /// fight phase), rebuilds the queue, and settles every branch.
    fn advance_phase(&self) -> Vec<(GameState, f64)> {
        let mut out = vec! [];

        for (board, p) in command::end_phase(&self.board, self.phase) {
            let mut next = self.clone();
            next.board = board;

            match self.phase.next() {
                Some(phase) => {
                    next.phase = phase;
                },
                None => {
                    next.phase = Phase::Movement;
                    next.team = self.team.opposite();
                    next.turn = self.turn + 1;
                }
            }
            next.queue = initial_queue(&next.board, next.team);

            for (settled, q) in next.auto_forward() {
                out.push((settled, p * q));
            }
        }

        out
    }
}

/// Returns the full decision queue for the given team, with the unit on the
/// lowest row-major position choosing first (the head lives at the end of
/// the vector).
fn initial_queue(board: &Board, team: Team) -> Vec<Point> {
    let mut queue = board.all_units(team);
    queue.reverse();
    queue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::tests::guardsman;
    use crate::unit::Unit;

    fn melee_only() -> Unit {
        let mut unit = guardsman();
        unit.rg_s = 0;
        unit.rg_range = 0;
        unit.rg_shots = 0;
        unit
    }

    fn two_squad_board() -> Board {
        let mut board = Board::new(10, 1.0);
        board.set(Point::new(1, 1), guardsman(), Team::Red);
        board.set(Point::new(8, 8), guardsman(), Team::Blue);
        board
    }

    #[test]
    fn start_is_settled() {
        let state = GameState::start(two_squad_board(), 6);

        assert_eq!(state.acting_team(), Team::Red);
        assert_eq!(state.phase(), Phase::Movement);
        assert_eq!(state.turn_number(), 0);
        assert_eq!(state.active_unit(), Some(Point::new(1, 1)));
        assert!(!state.is_finished());

        let commands = state.legal_commands();
        assert!(commands.len() > 1);
        assert_eq!(commands.last(), Some(&Command::NoOp));
    }

    #[test]
    fn queue_is_row_major() {
        let mut board = two_squad_board();
        board.set(Point::new(5, 0), guardsman(), Team::Red);

        let state = GameState::start(board, 6);

        // (5, 0) precedes (1, 1) in row-major order
        assert_eq!(state.active_unit(), Some(Point::new(5, 0)));
    }

    #[test]
    fn noop_passes_to_the_next_unit() {
        let mut board = two_squad_board();
        board.set(Point::new(5, 5), guardsman(), Team::Red);

        let state = GameState::start(board, 6);
        assert_eq!(state.active_unit(), Some(Point::new(1, 1)));

        let outcomes = state.apply(&Command::NoOp);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].0.active_unit(), Some(Point::new(5, 5)));
    }

    #[test]
    fn end_phase_cycles_through_the_turn() {
        // a fighting pair and a shooting pair, so that every phase of the
        // red turn offers at least one real order and nothing auto-forwards
        let mut board = Board::new(12, 1.0);
        board.set(Point::new(1, 1), melee_only(), Team::Red);
        board.set(Point::new(2, 2), melee_only(), Team::Blue);
        board.set(Point::new(6, 6), guardsman(), Team::Red);
        board.set(Point::new(8, 8), melee_only(), Team::Blue);

        let state = GameState::start(board, 6);
        assert_eq!(state.phase(), Phase::Movement);

        let mut state = state;
        for expected in [Phase::Shooting, Phase::Charge, Phase::Fight] {
            let outcomes = state.apply(&Command::EndPhase);

            assert_eq!(outcomes.len(), 1);
            state = outcomes[0].0.clone();
            assert_eq!(state.phase(), expected);
            assert_eq!(state.acting_team(), Team::Red);
            assert_eq!(state.turn_number(), 0);
        }

        // ending the fight phase hands the turn over
        let outcomes = state.apply(&Command::EndPhase);
        assert_eq!(outcomes.len(), 1);
        let state = outcomes[0].0.clone();

        assert_eq!(state.acting_team(), Team::Blue);
        assert_eq!(state.phase(), Phase::Movement);
        assert_eq!(state.turn_number(), 1);
    }

    #[test]
    fn elimination_finishes_the_game() {
        let mut board = Board::new(10, 1.0);
        board.set(Point::new(1, 1), guardsman(), Team::Red);
        let state = GameState {
            board,
            team: Team::Red,
            phase: Phase::Movement,
            turn: 0,
            turn_limit: 6,
            queue: vec! []
        };

        assert!(state.is_finished());
        assert_eq!(state.game_value(Team::Red), 1.0);
        assert_eq!(state.game_value(Team::Blue), -1.0);
        assert_eq!(state.legal_commands(), vec! []);
    }

    #[test]
    fn turn_limit_finishes_the_game_as_a_draw() {
        let board = two_squad_board();
        let mut state = GameState::start(board, 1);
        let mut decisions = 0;

        while !state.is_finished() {
            // skipping every decision walks straight to the turn limit
            let outcomes = state.apply(&Command::NoOp);
            state = outcomes[0].0.clone();

            decisions += 1;
            assert!(decisions < 100, "the game never ended");
        }

        // the blue team never got to act
        assert_eq!(state.turn_number(), 1);
        assert_eq!(state.game_value(Team::Red), 0.0);
        assert_eq!(state.game_value(Team::Blue), 0.0);
    }

    #[test]
    fn distributions_sum_to_one() {
        let mut board = Board::new(10, 1.0);
        board.set(Point::new(1, 1), guardsman(), Team::Red);
        board.set(Point::new(4, 1), guardsman(), Team::Blue);

        let state = GameState::start(board, 6);

        for command in state.legal_commands() {
            let outcomes = state.apply(&command);
            let total: f64 = outcomes.iter().map(|&(_, p)| p).sum();

            assert!((total - 1.0).abs() < 1e-6, "{:?}: {}", command, total);
            assert!(outcomes.iter().all(|&(_, p)| p > 0.0));
        }
    }

    #[test]
    fn no_destroyed_units_are_observable() {
        // a lone wounded target: every successor either holds a live unit
        // or an empty cell
        let mut board = Board::new(10, 1.0);
        let mut shooter = guardsman();
        shooter.rg_is_rapid = false;
        let mut target = guardsman();
        target.count = 1;
        target.total_w = 1;
        board.set(Point::new(1, 1), shooter, Team::Red);
        board.set(Point::new(8, 1), target, Team::Blue);

        let mut state = GameState::start(board, 6);

        // skip the movement phase for the shooter
        loop {
            if state.phase() == Phase::Shooting {
                break;
            }
            state = state.apply(&Command::NoOp)[0].0.clone();
        }

        let shoot = state.legal_commands().into_iter()
            .find(|c| matches!(c, Command::Shoot { .. }))
            .expect("no shooting order");

        for (next, _) in state.apply(&shoot) {
            for team in [Team::Red, Team::Blue] {
                for point in next.board().all_units(team) {
                    let unit = next.board().unit_on(point).unwrap();

                    assert!(unit.total_w > 0);
                    assert_eq!(unit.count, (unit.total_w + unit.w - 1) / unit.w);
                }
            }
        }
    }
}
