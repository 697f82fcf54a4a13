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

//! The rendezvous between the worker threads and the manager thread that
//! owns the predictor. Each round every registered worker deposits the leaf
//! states it wants evaluated (possibly none) and blocks; once the last one
//! has arrived the manager drains the buffer, runs the one vectorized
//! `predict` call with no lock held, publishes the responses, and wakes
//! everybody for the next round. A worker that runs out of games
//! deregisters so the barrier shrinks with it.

use std::sync::{Condvar, Mutex};

use wl_nn::{Predictor, PredictResponse};

/// What `serve` tells the manager loop after a round.
#[derive(Debug, PartialEq, Eq)]
pub enum Served {
    /// A round was completed, keep serving.
    Round,

    /// The predictor failed, the round was published as failed and the
    /// workers are unwinding.
    Failed,

    /// Every worker has deregistered.
    Done
}

struct BatcherList {
    /// The number of workers that still participate in rounds.
    registered: usize,

    /// The number of workers that have deposited this round.
    arrived: usize,

    /// The flattened board tensors deposited this round.
    states: Vec<f32>,

    /// The flattened phase vectors deposited this round.
    phases: Vec<f32>,

    /// The number of leaves deposited this round.
    count: usize,

    /// The index of the round currently collecting deposits.
    round: u64,

    /// The most recently published round.
    published: u64,

    /// The responses of the published round.
    responses: Vec<PredictResponse>,

    /// Whether the published round failed.
    failed: bool
}

pub struct Batcher {
    list: Mutex<BatcherList>,
    workers_ready: Condvar,
    round_published: Condvar
}

impl Batcher {
    /// Returns a batcher expecting the given number of workers.
    pub fn new(num_workers: usize) -> Batcher {
        assert!(num_workers > 0);

        Batcher {
            list: Mutex::new(BatcherList {
                registered: num_workers,
                arrived: 0,
                states: vec! [],
                phases: vec! [],
                count: 0,
                round: 1,
                published: 0,
                responses: vec! [],
                failed: false
            }),
            workers_ready: Condvar::new(),
            round_published: Condvar::new()
        }
    }

    /// Deposits `count` leaf evaluations and blocks until the round they
    /// joined has been served, returning this worker's slice of the
    /// responses. Returns `None` if the predictor failed, after which the
    /// worker should unwind and deregister.
    ///
    /// # Arguments
    ///
    /// * `states` - `count` flattened board tensors
    /// * `phases` - `count` flattened phase vectors
    /// * `count` - the number of deposited leaves
    ///
    pub fn exchange(&self, states: &[f32], phases: &[f32], count: usize) -> Option<Vec<PredictResponse>> {
        let mut list = self.list.lock().expect("could not acquire the batch list lock");
        let my_round = list.round;
        let offset = list.count;

        list.states.extend_from_slice(states);
        list.phases.extend_from_slice(phases);
        list.count += count;
        list.arrived += 1;

        if list.arrived == list.registered {
            self.workers_ready.notify_one();
        }

        while list.published < my_round {
            list = self.round_published.wait(list).expect("the batch list lock was poisoned");
        }

        if list.failed {
            None
        } else {
            Some(list.responses[offset..offset + count].to_vec())
        }
    }

    /// Removes this worker from the barrier. Called exactly once per
    /// worker, after its last `exchange`.
    pub fn deregister(&self) {
        let mut list = self.list.lock().expect("could not acquire the batch list lock");

        list.registered -= 1;

        if list.arrived == list.registered {
            // the manager may have been waiting for this worker
            self.workers_ready.notify_one();
        }
    }

    /// Waits for every registered worker to deposit, runs the predictor on
    /// the collected batch (with the lock released), and publishes the
    /// responses. Returns `Done` once every worker has deregistered.
    ///
    /// # Arguments
    ///
    /// * `predictor` - the network to evaluate the batch with
    ///
    pub fn serve<P: Predictor + ?Sized>(&self, predictor: &P) -> Served {
        let (states, phases, count) = {
            let mut list = self.list.lock().expect("could not acquire the batch list lock");

            loop {
                if list.registered == 0 {
                    return Served::Done;
                } else if list.arrived == list.registered {
                    break;
                }

                list = self.workers_ready.wait(list).expect("the batch list lock was poisoned");
            }

            let count = list.count;
            list.count = 0;
            list.arrived = 0;

            (
                std::mem::take(&mut list.states),
                std::mem::take(&mut list.phases),
                count
            )
        };

        // no lock is held across the network call
        let responses = if count == 0 {
            Some(vec! [])
        } else {
            predictor.predict(&states, &phases, count)
        };

        let mut list = self.list.lock().expect("could not acquire the batch list lock");

        let failed = responses.is_none();
        list.responses = responses.unwrap_or_default();
        list.failed = failed;
        list.published = list.round;
        list.round += 1;
        self.round_published.notify_all();

        if failed { Served::Failed } else { Served::Round }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_utils::thread;

    use wl_game::utils::features::VECTOR_DIM;
    use wl_nn::UniformPredictor;

    const SQUARES: usize = 4;

    fn tensors(n: usize) -> (Vec<f32>, Vec<f32>) {
        (vec! [0.0; n * SQUARES * VECTOR_DIM], vec! [0.0; n * 4])
    }

    #[test]
    fn single_worker_round_trip() {
        let batcher = Batcher::new(1);
        let predictor = UniformPredictor;

        thread::scope(|scope| {
            scope.spawn(|_| {
                let (states, phases) = tensors(3);
                let responses = batcher.exchange(&states, &phases, 3).unwrap();

                assert_eq!(responses.len(), 3);
                batcher.deregister();
            });

            assert_eq!(batcher.serve(&predictor), Served::Round);
            assert_eq!(batcher.serve(&predictor), Served::Done);
        }).unwrap();
    }

    #[test]
    fn workers_get_their_own_slices() {
        let batcher = Batcher::new(2);
        let predictor = UniformPredictor;

        thread::scope(|scope| {
            for count in [1usize, 2] {
                let batcher = &batcher;

                scope.spawn(move |_| {
                    let (states, phases) = tensors(count);
                    let responses = batcher.exchange(&states, &phases, count).unwrap();

                    assert_eq!(responses.len(), count);
                    batcher.deregister();
                });
            }

            assert_eq!(batcher.serve(&predictor), Served::Round);
            assert_eq!(batcher.serve(&predictor), Served::Done);
        }).unwrap();
    }

    #[test]
    fn empty_deposits_participate() {
        let batcher = Batcher::new(2);
        let predictor = UniformPredictor;

        thread::scope(|scope| {
            {
                let batcher = &batcher;
                scope.spawn(move |_| {
                    let responses = batcher.exchange(&[], &[], 0).unwrap();

                    assert_eq!(responses.len(), 0);
                    batcher.deregister();
                });
            }
            {
                let batcher = &batcher;
                scope.spawn(move |_| {
                    let (states, phases) = tensors(1);
                    let responses = batcher.exchange(&states, &phases, 1).unwrap();

                    assert_eq!(responses.len(), 1);
                    batcher.deregister();
                });
            }

            assert_eq!(batcher.serve(&predictor), Served::Round);
            assert_eq!(batcher.serve(&predictor), Served::Done);
        }).unwrap();
    }

    #[test]
    fn predictor_failure_unwinds_the_workers() {
        struct FailingPredictor;

        impl Predictor for FailingPredictor {
            fn predict(&self, _: &[f32], _: &[f32], _: usize) -> Option<Vec<PredictResponse>> {
                None
            }
        }

        let batcher = Batcher::new(1);

        thread::scope(|scope| {
            scope.spawn(|_| {
                let (states, phases) = tensors(1);

                assert!(batcher.exchange(&states, &phases, 1).is_none());
                batcher.deregister();
            });

            assert_eq!(batcher.serve(&FailingPredictor), Served::Failed);
            assert_eq!(batcher.serve(&FailingPredictor), Served::Done);
        }).unwrap();
    }
}
