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

/// One of the four phases a team works through during its turn. Phases cycle
/// `Movement -> Shooting -> Charge -> Fight`, after which the opposite team
/// starts its own movement phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Movement,
    Shooting,
    Charge,
    Fight
}

/// All phases, in turn order.
pub const ALL: [Phase; 4] = [Phase::Movement, Phase::Shooting, Phase::Charge, Phase::Fight];

impl Phase {
    /// Returns the phase that follows this one within the same turn, or
    /// `None` at the end of the fight phase (where the turn passes to the
    /// opposite team).
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Movement => Some(Phase::Shooting),
            Phase::Shooting => Some(Phase::Charge),
            Phase::Charge => Some(Phase::Fight),
            Phase::Fight => None
        }
    }

    /// Returns the numeric index of this phase in turn order.
    pub fn to_index(self) -> usize {
        match self {
            Phase::Movement => 0,
            Phase::Shooting => 1,
            Phase::Charge => 2,
            Phase::Fight => 3
        }
    }

    /// Returns the one-hot encoding of this phase, as consumed by the
    /// predictor.
    pub fn to_vector(self) -> [f32; 4] {
        let mut out = [0.0; 4];
        out[self.to_index()] = 1.0;
        out
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Phase::Movement => write!(f, "movement"),
            Phase::Shooting => write!(f, "shooting"),
            Phase::Charge => write!(f, "charge"),
            Phase::Fight => write!(f, "fight")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle() {
        assert_eq!(Phase::Movement.next(), Some(Phase::Shooting));
        assert_eq!(Phase::Shooting.next(), Some(Phase::Charge));
        assert_eq!(Phase::Charge.next(), Some(Phase::Fight));
        assert_eq!(Phase::Fight.next(), None);
    }

    #[test]
    fn one_hot() {
        for (i, &phase) in ALL.iter().enumerate() {
            let vector = phase.to_vector();

            assert_eq!(vector[i], 1.0);
            assert_eq!(vector.iter().sum::<f32>(), 1.0);
        }
    }
}
