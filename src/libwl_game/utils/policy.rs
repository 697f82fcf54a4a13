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

//! Conversion between per-command policies and the flat array the network
//! consumes and produces. The array has `2 * size^2 + 1` entries: source
//! cell probabilities in `[0, size^2)`, target cell probabilities in
//! `[size^2, 2 * size^2)` (both row-major, `index = x + y * size`), and the
//! end-phase / skip probability in the last slot.
//!
//! The forward direction accumulates every unit order's probability into
//! both its source and its target slot, so orders that share a cell
//! interfere; the inverse direction multiplies the source and target
//! probabilities back together. The round-trip is therefore lossy by
//! design, exact only up to this aliasing, and both directions renormalize.

use crate::command::Command;

/// Returns the length of the policy array for a board of the given side.
pub fn policy_array_len(size: usize) -> usize {
    2 * size * size + 1
}

/// Flattens a distribution over the given commands into the policy array
/// consumed by the network trainer.
///
/// # Arguments
///
/// * `policy` - a probability per command
/// * `commands` - the commands, in the same order
/// * `size` - the side length of the board
///
pub fn policy_to_array(policy: &[f64], commands: &[Command], size: usize) -> Vec<f32> {
    assert_eq!(policy.len(), commands.len());

    let squares = size * size;
    let mut out = vec! [0.0f32; policy_array_len(size)];

    for (command, &p) in commands.iter().zip(policy.iter()) {
        match (command.source(), command.target()) {
            (Some(source), Some(target)) => {
                out[source.to_index(size)] += p as f32;
                out[squares + target.to_index(size)] += p as f32;
            },
            _ => {
                out[2 * squares] += p as f32;
            }
        }
    }

    normalize(&mut out);
    out
}

/// Recovers a distribution over the given commands from a policy array
/// produced by the network. Each unit order is scored by the product of its
/// source and target probabilities, the bookkeeping commands by the pass
/// slot, and the result is normalized (uniform if the array gives every
/// command zero mass).
///
/// # Arguments
///
/// * `array` - the policy array
/// * `commands` - the commands to score
/// * `size` - the side length of the board
///
pub fn array_to_policy(array: &[f32], commands: &[Command], size: usize) -> Vec<f64> {
    assert_eq!(array.len(), policy_array_len(size));

    let squares = size * size;
    let mut out: Vec<f64> = commands.iter().map(|command| {
        match (command.source(), command.target()) {
            (Some(source), Some(target)) => {
                array[source.to_index(size)] as f64 * array[squares + target.to_index(size)] as f64
            },
            _ => array[2 * squares] as f64
        }
    }).collect();

    let total: f64 = out.iter().sum();

    if total > 0.0 {
        for p in out.iter_mut() {
            *p /= total;
        }
    } else if !out.is_empty() {
        let uniform = 1.0 / out.len() as f64;

        for p in out.iter_mut() {
            *p = uniform;
        }
    }

    out
}

fn normalize(array: &mut [f32]) {
    let total: f32 = array.iter().sum();

    if total > 0.0 {
        for p in array.iter_mut() {
            *p /= total;
        }
    }
}
