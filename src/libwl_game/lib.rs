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

#[macro_use] extern crate lazy_static;

/* -------- Modules -------- */

pub mod board;
pub mod command;
pub mod phase;
pub mod prob;
pub mod state;
pub mod team;
pub mod unit;
pub mod utils;

/* -------- Exports -------- */

pub use self::board::{Board, Point};
pub use self::command::Command;
pub use self::phase::Phase;
pub use self::state::GameState;
pub use self::team::Team;
pub use self::unit::Unit;
