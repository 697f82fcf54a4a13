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

//! The self-play manager: a fixed pool of independent games, each with its
//! own persistent search tree and private generator, driven by a pool of
//! worker threads that funnel every leaf evaluation through one shared
//! batched predictor call per round.
//!
//! Games are shared-nothing: each lives on exactly one worker thread for
//! its whole life, so the trees need no locks at all. The only
//! synchronization is the batch rendezvous (and a cross-worker prediction
//! cache, which is merely an optimization).

use crossbeam_channel::{unbounded, Sender};
use crossbeam_utils::thread;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};

use wl_game::utils::features::state_to_tensor;
use wl_game::utils::policy::{array_to_policy, policy_to_array};
use wl_game::GameState;
use wl_nn::{Experience, PredictCache, Predictor, PredictResponse};
use wl_utils::config;

use crate::batcher::{Batcher, Served};
use crate::choose::select_randomly;
use crate::game_result::GameResult;
use crate::policy::{deweight_pass, Ucb1Policy, VisitCountPolicy};
use crate::tree::{state_hash, SearchTree};

/// The tunable parameters of a self-play run.
#[derive(Clone, Debug)]
pub struct SelfPlayOptions {
    /// The number of games in the pool.
    pub num_games: usize,

    /// The number of simulations each tree accumulates before a decision is
    /// committed.
    pub search_budget: usize,

    /// The number of worker threads.
    pub num_threads: usize,

    /// The exploration constant of the tree policy.
    pub ucb1_c: f64,

    /// The temperature of the final policy.
    pub tau: f64,

    /// The base seed. Game `i` runs on its own generator seeded with
    /// `seed + i`.
    pub seed: u64
}

impl SelfPlayOptions {
    /// Returns the options given on the command line.
    pub fn from_config() -> SelfPlayOptions {
        SelfPlayOptions {
            num_games: *config::NUM_GAMES,
            search_budget: *config::SEARCH_BUDGET,
            num_threads: *config::NUM_THREADS,
            ucb1_c: *config::UCB1_C,
            tau: *config::TAU,
            seed: *config::SEED
        }
    }
}

/// One game in the pool, pinned to a worker thread.
struct Game {
    index: usize,
    seed: u64,
    state: GameState,
    tree: SearchTree,
    rng: SmallRng,
    experiences: Vec<Experience>,
    finished: bool
}

impl Game {
    fn new(index: usize, state: GameState, options: &SelfPlayOptions) -> Game {
        let seed = options.seed.wrapping_add(index as u64);
        let tree = SearchTree::new(
            state.clone(),
            Ucb1Policy::new(options.ucb1_c),
            VisitCountPolicy::new(options.tau)
        );

        Game {
            index,
            seed,
            state,
            tree,
            rng: SmallRng::seed_from_u64(seed),
            experiences: vec! [],
            finished: false
        }
    }

    fn into_result(self) -> GameResult {
        GameResult {
            index: self.index,
            seed: self.seed,
            experiences: self.experiences,
            final_state: self.state,
            finished: self.finished
        }
    }
}

/// Plays `options.num_games` games of self-play from the given state and
/// returns their records, or `None` if the predictor failed (the iteration
/// is cancelled, nothing is partially returned).
///
/// Setting `stop` cancels cooperatively: workers notice it between their
/// select/commit cycles, pending batches still flush, and the games played
/// so far come back with `finished == false`.
///
/// # Arguments
///
/// * `predictor` - the shared network
/// * `initial` - the state every game starts from
/// * `options` -
/// * `stop` - the cooperative cancellation flag
///
pub fn self_play<P: Predictor>(
    predictor: &P,
    initial: &GameState,
    options: &SelfPlayOptions,
    stop: &AtomicBool
) -> Option<Vec<GameResult>> {
    assert!(options.num_games > 0);
    assert!(options.search_budget > 0);
    assert!(options.num_threads > 0);

    let num_workers = options.num_threads.min(options.num_games);
    let batcher = Batcher::new(num_workers);
    let cache = PredictCache::new();
    let (sender, receiver) = unbounded();
    let mut failed = false;

    thread::scope(|scope| {
        for worker_id in 0..num_workers {
            let batcher = &batcher;
            let cache = &cache;
            let sender: Sender<GameResult> = sender.clone();
            let indices: Vec<usize> = (worker_id..options.num_games)
                .step_by(num_workers)
                .collect();

            // the games (and their trees) are built inside the worker, they
            // never cross a thread boundary
            scope.spawn(move |_| {
                let games = indices.into_iter()
                    .map(|index| Game::new(index, initial.clone(), options))
                    .collect();

                worker(games, batcher, cache, sender, options, stop)
            });
        }

        // the manager thread owns the predictor and serves one vectorized
        // call per round until every worker has deregistered
        loop {
            match batcher.serve(predictor) {
                Served::Round => {},
                Served::Failed => failed = true,
                Served::Done => break
            }
        }
    }).expect("a worker thread panicked");

    drop(sender);

    if failed {
        None
    } else {
        let mut results: Vec<GameResult> = receiver.try_iter().collect();
        results.sort_by_key(|result| result.index);

        Some(results)
    }
}

/// The life of one worker: run every owned game to completion, one decision
/// cycle at a time, exchanging leaf evaluations through the batcher.
fn worker(
    mut games: Vec<Game>,
    batcher: &Batcher,
    cache: &PredictCache,
    sender: Sender<GameResult>,
    options: &SelfPlayOptions,
    stop: &AtomicBool
) {
    games.retain_mut(|game| {
        if game.state.is_finished() {
            game.finished = true;
            sender.send(game_taken(game)).expect("the result channel is closed");
            false
        } else {
            true
        }
    });

    'cycles: while !games.is_empty() {
        if stop.load(Ordering::Acquire) {
            break;
        }

        // search until every tree has its budget
        while games.iter().any(|game| game.tree.sample_count() < options.search_budget) {
            let mut states = vec! [];
            let mut phases = vec! [];
            let mut pending = vec! [];

            for (slot, game) in games.iter_mut().enumerate() {
                if game.tree.sample_count() >= options.search_budget {
                    continue;
                }

                let leaf = game.tree.select(&mut game.rng);
                let leaf_state = leaf.borrow().state().clone();

                if leaf_state.is_finished() {
                    // terminal leaves contribute their exact value and are
                    // never sent to the network
                    let value = leaf_state.game_value(game.tree.search_team());
                    game.tree.backup(&leaf, value);
                } else {
                    let key = state_hash(&leaf_state);

                    if let Some(response) = cache.get(key) {
                        insert_response(game, &leaf, &leaf_state, &response);
                    } else {
                        states.extend_from_slice(&state_to_tensor(&leaf_state));
                        phases.extend_from_slice(&leaf_state.phase().to_vector());
                        pending.push((slot, leaf, leaf_state, key));
                    }
                }
            }

            if !pending.is_empty() {
                let responses = match batcher.exchange(&states, &phases, pending.len()) {
                    Some(responses) => responses,
                    None => break 'cycles  // the predictor failed
                };

                for ((slot, leaf, leaf_state, key), response) in pending.into_iter().zip(responses) {
                    cache.insert(key, response.clone());
                    insert_response(&mut games[slot], &leaf, &leaf_state, &response);
                }
            }
        }

        // commit one decision per game
        games.retain_mut(|game| {
            commit_one(game, options);

            if game.finished {
                sender.send(game_taken(game)).expect("the result channel is closed");
                false
            } else {
                true
            }
        });
    }

    // cancelled games are reported as unfinished
    for game in games {
        sender.send(game.into_result()).expect("the result channel is closed");
    }

    batcher.deregister();
}

/// Expands a leaf with the network's answer and backs its value up. The
/// policy array is projected onto the legal commands and the pass weight is
/// adjusted for the phase, the value is flipped onto the search team's
/// point of view.
fn insert_response(
    game: &mut Game,
    leaf: &crate::tree::NodeRef,
    leaf_state: &GameState,
    response: &PredictResponse
) {
    let commands = leaf_state.legal_commands();
    let mut prior = array_to_policy(response.policy(), &commands, leaf_state.board().size());
    deweight_pass(&mut prior, &commands, leaf_state.phase());

    let value = response.value() as f64;
    let value = if leaf_state.acting_team() == game.tree.search_team() { value } else { -value };

    game.tree.expand(leaf, &prior);
    game.tree.backup(leaf, value);
}

/// Samples the final policy, records the experience, advances the game by
/// the real-game distribution, and re-roots (or resets) the tree.
fn commit_one(game: &mut Game, options: &SelfPlayOptions) {
    let size = game.state.board().size();
    let (commands, distribution) = game.tree.final_distribution();
    let choice = select_randomly(&distribution, &mut game.rng);

    game.experiences.push(Experience {
        state: state_to_tensor(&game.state),
        team: game.state.acting_team(),
        phase: game.state.phase().to_vector(),
        policy: policy_to_array(&distribution, &commands, size)
    });

    let outcomes = game.state.apply(&commands[choice]);
    let probs: Vec<f64> = outcomes.iter().map(|&(_, p)| p).collect();
    let chosen = outcomes.into_iter().nth(select_randomly(&probs, &mut game.rng)).unwrap().0;

    game.tree.commit(&chosen);
    game.state = chosen;

    if game.state.is_finished() {
        game.finished = true;
    } else if game.state.acting_team() != game.tree.search_team() {
        // the tree only persists within a turn, a new team searches afresh
        game.tree = SearchTree::new(
            game.state.clone(),
            Ucb1Policy::new(options.ucb1_c),
            VisitCountPolicy::new(options.tau)
        );
    }
}

/// Builds the result record of a game that just finished, taking its
/// experiences out of the slot.
fn game_taken(game: &mut Game) -> GameResult {
    GameResult {
        index: game.index,
        seed: game.seed,
        experiences: std::mem::take(&mut game.experiences),
        final_state: game.state.clone(),
        finished: game.finished
    }
}
