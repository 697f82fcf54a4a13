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

//! The search tree over a stochastic game. The tree alternates between two
//! kinds of levels: _state nodes_ own the statistics gathered for one
//! reachable game state, _action nodes_ own one legal command of their
//! parent state together with the full distribution of states it can lead
//! to. Action children of a state are created lazily when the state is
//! first expanded, but the state children of an action are materialized
//! eagerly from `GameState::apply` -- this is what lets the search handle
//! stochastic transitions without per-outcome rollout code.
//!
//! Every value stored anywhere in the tree is with respect to the _search
//! team_ fixed at construction. Values backed up from a leaf are weighted
//! by the product of the transition probabilities along the path, so a
//! lucky but unlikely outcome contributes proportionally little.

use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use rand::RngCore;

use wl_game::{Command, GameState, Team};
use crate::choose::select_randomly;
use crate::policy::{ActionStats, Ucb1Policy, VisitCountPolicy};

/// A shared handle to a state node, as handed out by `SearchTree::select`.
pub type NodeRef = Rc<RefCell<StateNode>>;

/// A reachable game state and the statistics gathered for it. The parent
/// reference is weak: the tree is owned root-downward, re-rooting drops
/// every subtree that was not committed into.
pub struct StateNode {
    state: GameState,
    parent: Option<ParentRef>,
    transition_prob: f64,
    children: Vec<ActionNode>,
    num_samples: usize,
    weight_sum: f64,
    mean_value: f64
}

struct ParentRef {
    node: Weak<RefCell<StateNode>>,
    action: usize
}

/// One legal command of a state, its prior, and the eagerly-computed
/// distribution of states it leads to. The `(value, visits)` pair is
/// derived from the child states and cached here for the tree policy.
pub struct ActionNode {
    command: Command,
    prior: f64,
    children: Vec<Rc<RefCell<StateNode>>>,
    probs: Vec<f64>,
    value_estimate: f64,
    visit_count: usize
}

impl StateNode {
    fn new(state: GameState, parent: Option<ParentRef>, transition_prob: f64) -> StateNode {
        StateNode {
            state,
            parent,
            transition_prob,
            children: vec! [],
            num_samples: 0,
            weight_sum: 0.0,
            mean_value: 0.0
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_finished()
    }

    /// Returns true if this state has not had its actions materialized yet.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn sample_count(&self) -> usize {
        self.num_samples
    }

    pub fn mean_value(&self) -> f64 {
        self.mean_value
    }

    /// Folds one weighted value sample into the running mean.
    fn add_statistic(&mut self, value: f64, weight: f64) {
        self.mean_value = (self.weight_sum * self.mean_value + value * weight)
            / (self.weight_sum + weight);
        self.weight_sum += weight;
        self.num_samples += 1;
    }

    fn stats(&self) -> Vec<ActionStats> {
        self.children.iter()
            .map(|action| ActionStats {
                value: action.value_estimate,
                visits: action.visit_count,
                prior: action.prior
            })
            .collect()
    }
}

impl ActionNode {
    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn prior(&self) -> f64 {
        self.prior
    }

    pub fn value_estimate(&self) -> f64 {
        self.value_estimate
    }

    pub fn visit_count(&self) -> usize {
        self.visit_count
    }

    /// Recomputes the cached `(value, visits)` from the child states,
    /// weighting each child's mean by its visit count times its transition
    /// probability.
    fn update_estimate(&mut self) {
        let mut weight_sum = 0.0;
        let mut value_sum = 0.0;
        let mut visits = 0;

        for (child, &p) in self.children.iter().zip(self.probs.iter()) {
            let child = child.borrow();
            let weight = child.num_samples as f64 * p;

            weight_sum += weight;
            value_sum += weight * child.mean_value;
            visits += child.num_samples;
        }

        self.value_estimate = if weight_sum > 0.0 { value_sum / weight_sum } else { 0.0 };
        self.visit_count = visits;
    }
}

/// A search tree rooted at the current state of one game, searching on
/// behalf of the team that is acting there.
pub struct SearchTree {
    root: Rc<RefCell<StateNode>>,
    search_team: Team,
    tree_policy: Ucb1Policy,
    final_policy: VisitCountPolicy
}

impl SearchTree {
    /// Returns a fresh tree over the given state, searching for the team
    /// acting there.
    ///
    /// # Arguments
    ///
    /// * `state` - the state to root the tree at
    /// * `tree_policy` - the in-tree action selection policy
    /// * `final_policy` - the committed-move policy
    ///
    pub fn new(state: GameState, tree_policy: Ucb1Policy, final_policy: VisitCountPolicy) -> SearchTree {
        let search_team = state.acting_team();

        SearchTree {
            root: Rc::new(RefCell::new(StateNode::new(state, None, 1.0))),
            search_team,
            tree_policy,
            final_policy
        }
    }

    pub fn search_team(&self) -> Team {
        self.search_team
    }

    /// Returns the state at the root of the tree.
    pub fn root_state(&self) -> GameState {
        self.root.borrow().state.clone()
    }

    /// Returns the number of value samples at the root.
    pub fn sample_count(&self) -> usize {
        self.root.borrow().num_samples
    }

    /// Descends from the root, selecting actions by the tree policy and
    /// drawing successor states from each action's transition distribution,
    /// until an unexpanded or terminal state node is reached.
    ///
    /// # Arguments
    ///
    /// * `rng` - the source of randomness for the transition draws
    ///
    pub fn select(&self, rng: &mut dyn RngCore) -> Rc<RefCell<StateNode>> {
        let mut node = self.root.clone();

        loop {
            let next = {
                let current = node.borrow();

                if current.is_leaf() || current.is_terminal() {
                    break;
                }

                let index = self.tree_policy.select(
                    &current.stats(),
                    current.num_samples,
                    current.state.acting_team(),
                    self.search_team
                );
                let action = &current.children[index];

                action.children[select_randomly(&action.probs, rng)].clone()
            };

            node = next;
        }

        node
    }

    /// Materializes the actions of the given leaf, one action node per
    /// legal command, each with its full successor distribution.
    ///
    /// # Arguments
    ///
    /// * `leaf` - the node to expand, which must be an unexpanded
    ///   non-terminal node of this tree
    /// * `priors` - the prior probability of each legal command, in
    ///   `legal_commands` order
    ///
    pub fn expand(&self, leaf: &Rc<RefCell<StateNode>>, priors: &[f64]) {
        let commands = leaf.borrow().state.legal_commands();
        assert_eq!(commands.len(), priors.len());
        assert!(leaf.borrow().is_leaf() && !leaf.borrow().is_terminal());

        let children = commands.into_iter().zip(priors.iter()).enumerate()
            .map(|(index, (command, &prior))| {
                let outcomes = leaf.borrow().state.apply(&command);
                let mut probs = Vec::with_capacity(outcomes.len());
                let children = outcomes.into_iter()
                    .map(|(state, p)| {
                        probs.push(p);

                        Rc::new(RefCell::new(StateNode::new(
                            state,
                            Some(ParentRef { node: Rc::downgrade(leaf), action: index }),
                            p
                        )))
                    })
                    .collect();

                debug_assert!(
                    (probs.iter().sum::<f64>() - 1.0).abs() < 1e-6,
                    "successor distribution does not sum to one: {:?}",
                    probs
                );

                ActionNode {
                    command,
                    prior,
                    children,
                    probs,
                    value_estimate: 0.0,
                    visit_count: 0
                }
            })
            .collect();

        leaf.borrow_mut().children = children;
    }

    /// Adds a value sample at the given node and propagates it to the root,
    /// discounting the carried weight by each transition probability
    /// crossed on the way up and refreshing the cached action estimates.
    ///
    /// # Arguments
    ///
    /// * `node` - the node the value was computed for
    /// * `value` - the value, with respect to the search team
    ///
    pub fn backup(&self, node: &Rc<RefCell<StateNode>>, value: f64) {
        let mut current = node.clone();
        let mut weight = 1.0;

        loop {
            let parent = {
                let mut state = current.borrow_mut();
                state.add_statistic(value, weight);
                weight *= state.transition_prob;

                match &state.parent {
                    None => break,
                    Some(parent) => (parent.node.clone(), parent.action)
                }
            };

            let (node, action) = parent;
            let node = node.upgrade().expect("the parent node has been dropped");
            node.borrow_mut().children[action].update_estimate();
            current = node;
        }
    }

    /// Returns the root's commands and the final-policy distribution over
    /// them. The root must have been expanded by at least one simulation.
    pub fn final_distribution(&self) -> (Vec<Command>, Vec<f64>) {
        let root = self.root.borrow();
        assert!(!root.is_leaf(), "the root has not been expanded yet");

        let commands = root.children.iter().map(|action| action.command.clone()).collect();
        let visits: Vec<usize> = root.children.iter().map(|action| action.visit_count).collect();

        (commands, self.final_policy.distribution(&visits))
    }

    /// Re-roots the tree at the child state equal to `chosen`, severing its
    /// parent link so that everything outside the committed subtree is
    /// freed. Not finding the state is a bug in the caller.
    ///
    /// # Arguments
    ///
    /// * `chosen` - the state the game actually advanced to
    ///
    pub fn commit(&mut self, chosen: &GameState) {
        let next = {
            let root = self.root.borrow();

            root.children.iter()
                .flat_map(|action| action.children.iter())
                .find(|child| child.borrow().state == *chosen)
                .cloned()
                .unwrap_or_else(|| panic!(
                    "the committed state is not among the root's successors (turn {}, {} phase)",
                    chosen.turn_number(),
                    chosen.phase()
                ))
        };

        {
            let mut next = next.borrow_mut();
            next.parent = None;
            next.transition_prob = 1.0;
        }

        self.root = next;
    }

    /// Runs `n` simulations: select to a leaf, evaluate it (exactly, for a
    /// terminal leaf, through the estimator otherwise), expand it, and back
    /// the value up. Returns the number of simulations completed, which is
    /// smaller than `n` only if the estimator failed.
    ///
    /// # Arguments
    ///
    /// * `n` - the number of simulations to run
    /// * `estimator` - the value/prior oracle for leaf states
    /// * `rng` - the source of randomness
    ///
    pub fn simulate<E: crate::estimator::Estimator>(
        &self,
        n: usize,
        estimator: &mut E,
        rng: &mut dyn RngCore
    ) -> usize {
        for i in 0..n {
            let leaf = self.select(rng);
            let value = {
                let state = leaf.borrow().state.clone();

                if state.is_finished() {
                    state.game_value(self.search_team)
                } else {
                    let commands = state.legal_commands();

                    match estimator.evaluate(&state, &commands, rng) {
                        None => return i,
                        Some((priors, value)) => {
                            self.expand(&leaf, &priors);

                            // the estimator answers from the point of view
                            // of the team acting at the leaf
                            if state.acting_team() == self.search_team { value } else { -value }
                        }
                    }
                }
            };

            self.backup(&leaf, value);
        }

        n
    }
}

/// Returns the total hash of the given state, used to key the prediction
/// cache.
pub fn state_hash(state: &GameState) -> u64 {
    let mut hasher = DefaultHasher::new();
    state.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use wl_game::{Board, Point, Unit};
    use crate::estimator::{Estimator, UniformRolloutEstimator};

    fn fighter() -> Unit {
        Unit {
            name: "Fighter".into(),
            count: 1,
            movement: 3,
            ws: 4,
            bs: 4,
            t: 3,
            w: 1,
            total_w: 1,
            a: 1,
            ld: 7,
            sv: 7,
            inv: 7,
            rg_range: 0,
            rg_s: 0,
            rg_ap: 0,
            rg_dmg: 0,
            rg_shots: 0,
            rg_is_rapid: false,
            rg_is_heavy: false,
            ml_s: 3,
            ml_ap: 0,
            ml_dmg: 1,
            moved: false,
            fired: false,
            attempted_charge: false,
            successful_charge: false,
            fought: false,
            moved_out_of_combat: false,
            models_lost: 0
        }
    }

    fn small_state() -> GameState {
        let mut board = Board::new(6, 1.0);
        board.set(Point::new(1, 1), fighter(), Team::Red);
        board.set(Point::new(4, 4), fighter(), Team::Blue);

        GameState::start(board, 2)
    }

    fn small_tree() -> SearchTree {
        SearchTree::new(small_state(), Ucb1Policy::new(2.0), VisitCountPolicy::new(1.0))
    }

    #[test]
    fn fresh_tree_is_an_unexpanded_root() {
        let tree = small_tree();

        assert_eq!(tree.sample_count(), 0);
        assert_eq!(tree.search_team(), Team::Red);
        assert_eq!(tree.root_state(), small_state());

        let mut rng = SmallRng::seed_from_u64(1);
        let leaf = tree.select(&mut rng);

        assert!(Rc::ptr_eq(&leaf, &tree.root));
    }

    #[test]
    fn simulations_accumulate_at_the_root() {
        let tree = small_tree();
        let mut estimator = UniformRolloutEstimator::default();
        let mut rng = SmallRng::seed_from_u64(2);

        let completed = tree.simulate(25, &mut estimator, &mut rng);

        assert_eq!(completed, 25);
        assert_eq!(tree.sample_count(), 25);

        // the root's samples split as: one from its own expansion, the rest
        // from its action subtrees
        let root = tree.root.borrow();
        let subtree: usize = root.children.iter().map(|action| action.visit_count).sum();

        assert_eq!(subtree + 1, 25);
    }

    #[test]
    fn expansion_materializes_every_outcome() {
        let tree = small_tree();
        let leaf = tree.root.clone();
        let commands = tree.root_state().legal_commands();
        let priors = vec! [1.0 / commands.len() as f64; commands.len()];

        tree.expand(&leaf, &priors);

        let root = tree.root.borrow();
        assert_eq!(root.children.len(), commands.len());

        for action in root.children.iter() {
            let total: f64 = action.probs.iter().sum();

            assert!((total - 1.0).abs() < 1e-6);
            assert_eq!(action.children.len(), action.probs.len());

            for (child, &p) in action.children.iter().zip(action.probs.iter()) {
                assert_eq!(child.borrow().transition_prob, p);
            }
        }
    }

    #[test]
    fn backup_weights_by_transition_probability() {
        let tree = small_tree();
        let commands = tree.root_state().legal_commands();
        let priors = vec! [1.0 / commands.len() as f64; commands.len()];
        tree.expand(&tree.root.clone(), &priors);

        let (child, p) = {
            let root = tree.root.borrow();
            let action = &root.children[0];

            (action.children[0].clone(), action.probs[0])
        };

        tree.backup(&child, 1.0);

        let root = tree.root.borrow();
        assert_eq!(child.borrow().num_samples, 1);
        assert_eq!(child.borrow().mean_value, 1.0);

        // the root saw the same sample, discounted by the transition
        // probability
        assert_eq!(root.num_samples, 1);
        assert!((root.weight_sum - p).abs() < 1e-12);
        assert_eq!(root.mean_value, 1.0);

        // the action's cached estimate follows its child
        assert_eq!(root.children[0].visit_count, 1);
        assert_eq!(root.children[0].value_estimate, 1.0);
    }

    #[test]
    fn adversary_samples_are_stored_for_the_search_team() {
        // walk to the last red decision of the turn, so that skipping it
        // hands the game to blue
        let mut state = small_state();
        let mut hops = 0;
        loop {
            let handover = state.apply(&Command::NoOp).pop().unwrap().0;

            if handover.acting_team() == Team::Blue {
                break;
            }

            state = handover;
            hops += 1;
            assert!(hops < 50);
        }

        // root a red search there and expand it
        let tree = SearchTree::new(state, Ucb1Policy::new(2.0), VisitCountPolicy::new(1.0));
        assert_eq!(tree.search_team(), Team::Red);

        let commands = tree.root_state().legal_commands();
        let priors = vec! [1.0 / commands.len() as f64; commands.len()];
        tree.expand(&tree.root.clone(), &priors);

        let (noop_index, child) = {
            let root = tree.root.borrow();
            let index = root.children.iter()
                .position(|action| *action.command() == Command::NoOp)
                .expect("no skip action at the root");

            assert_eq!(
                root.children[index].children[0].borrow().state.acting_team(),
                Team::Blue
            );

            (index, root.children[index].children[0].clone())
        };

        // the network answers +0.3 from blue's point of view, which the
        // evaluation sign flip stores as -0.3 for the searching red team
        let stored = -0.3;
        tree.backup(&child, stored);

        let root = tree.root.borrow();
        assert_eq!(root.children[noop_index].value_estimate(), -0.3);
        assert_eq!(root.children[noop_index].visit_count(), 1);
    }

    #[test]
    fn commit_reroots_and_detaches() {
        let tree = small_tree();
        let mut estimator = UniformRolloutEstimator::default();
        let mut rng = SmallRng::seed_from_u64(4);

        tree.simulate(50, &mut estimator, &mut rng);

        let (commands, distribution) = tree.final_distribution();
        let choice = select_randomly(&distribution, &mut rng);
        let outcomes = tree.root_state().apply(&commands[choice]);
        let probs: Vec<f64> = outcomes.iter().map(|&(_, p)| p).collect();
        let chosen = outcomes[select_randomly(&probs, &mut rng)].0.clone();

        let expected_samples = {
            let root = tree.root.borrow();

            root.children.iter()
                .flat_map(|action| action.children.iter())
                .find(|child| child.borrow().state == chosen)
                .map(|child| child.borrow().num_samples)
                .expect("the sampled state is not in the tree")
        };

        let mut tree = tree;
        tree.commit(&chosen);

        assert_eq!(tree.root_state(), chosen);
        assert!(tree.root.borrow().parent.is_none());
        assert_eq!(tree.sample_count(), expected_samples);
    }

    #[test]
    #[should_panic]
    fn committing_an_unknown_state_is_a_bug() {
        let tree = small_tree();
        let mut estimator = UniformRolloutEstimator::default();
        let mut rng = SmallRng::seed_from_u64(5);

        tree.simulate(10, &mut estimator, &mut rng);

        let mut tree = tree;
        let foreign = {
            let mut board = Board::new(6, 1.0);
            board.set(Point::new(0, 0), fighter(), Team::Red);
            board.set(Point::new(5, 5), fighter(), Team::Blue);

            GameState::start(board, 2)
        };

        tree.commit(&foreign);
    }

    #[test]
    fn terminal_roots_are_never_expanded() {
        let mut board = Board::new(6, 1.0);
        board.set(Point::new(1, 1), fighter(), Team::Red);

        let state = GameState::start(board, 2);
        assert!(state.is_finished());

        let tree = SearchTree::new(state, Ucb1Policy::new(2.0), VisitCountPolicy::new(1.0));
        let mut estimator = UniformRolloutEstimator::default();
        let mut rng = SmallRng::seed_from_u64(6);

        tree.simulate(10, &mut estimator, &mut rng);

        // every simulation backed up the exact game value without touching
        // the estimator
        assert_eq!(tree.sample_count(), 10);
        assert!(tree.root.borrow().is_leaf());
        assert_eq!(tree.root.borrow().mean_value, 1.0);
    }
}
