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

use wl_game::Unit;

/// Returns a unit with every statistic zeroed out except the ones a
/// scenario overrides, so the arithmetic in each test is explicit.
pub fn blank_unit(name: &str) -> Unit {
    Unit {
        name: name.into(),
        count: 1,
        movement: 0,
        ws: 7,
        bs: 7,
        t: 1,
        w: 1,
        total_w: 1,
        a: 0,
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
        ml_s: 0,
        ml_ap: 0,
        ml_dmg: 0,
        moved: false,
        fired: false,
        attempted_charge: false,
        successful_charge: false,
        fought: false,
        moved_out_of_combat: false,
        models_lost: 0
    }
}

/// Returns a small all-round unit for scenarios that just need a playable
/// game rather than specific arithmetic.
pub fn trooper(name: &str) -> Unit {
    let mut unit = blank_unit(name);
    unit.count = 2;
    unit.total_w = 2;
    unit.movement = 2;
    unit.ws = 4;
    unit.bs = 4;
    unit.t = 3;
    unit.a = 1;
    unit.rg_range = 6;
    unit.rg_s = 3;
    unit.rg_dmg = 1;
    unit.rg_shots = 1;
    unit.ml_s = 3;
    unit.ml_dmg = 1;
    unit
}
