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

/* -------- Modules -------- */

pub mod batcher;
pub mod choose;
pub mod estimator;
mod game_result;
pub mod play;
pub mod policy;
mod self_play;
pub mod tree;

/* -------- Exports -------- */

pub use self::game_result::*;
pub use self::play::*;
pub use self::self_play::*;
