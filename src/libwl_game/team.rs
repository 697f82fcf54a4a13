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

/// One of the two armies on the board. Team `Red` is team `0` in file formats
/// and in the experience dataset, team `Blue` is team `1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Team {
    Red,
    Blue
}

impl Team {
    /// Returns the team that this team is fighting against.
    pub fn opposite(self) -> Team {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red
        }
    }

    /// Returns the numeric index of this team, `0` or `1`.
    pub fn to_index(self) -> usize {
        match self {
            Team::Red => 0,
            Team::Blue => 1
        }
    }

    /// Returns the team with the given numeric index, if it is `0` or `1`.
    pub fn from_index(index: usize) -> Option<Team> {
        match index {
            0 => Some(Team::Red),
            1 => Some(Team::Blue),
            _ => None
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_index())
    }
}
