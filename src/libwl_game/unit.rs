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

/// The full record of one squad of identical models. Units are value types,
/// every state transition that touches a unit produces a new record. The
/// statistics never change during play except `count`, `total_w`, and the
/// per-turn flags.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Unit {
    /// The display name from the roster file.
    pub name: String,

    /// The number of models remaining in the squad.
    pub count: i32,

    /// The distance (in inches) the squad can cover in one movement phase.
    pub movement: i32,

    /// Weapon skill, the minimum roll to hit in melee.
    pub ws: i32,

    /// Ballistic skill, the minimum roll to hit when shooting.
    pub bs: i32,

    /// Toughness.
    pub t: i32,

    /// Wounds per model. Never updated during play.
    pub w: i32,

    /// Total wounds remaining across the whole squad.
    pub total_w: i32,

    /// Melee attacks per model.
    pub a: i32,

    /// Leadership, used by morale tests.
    pub ld: i32,

    /// Armour save, the minimum roll to ignore a wound.
    pub sv: i32,

    /// Invulnerable save. `7` means the squad has none.
    pub inv: i32,

    /// Ranged weapon statistics.
    pub rg_range: i32,
    pub rg_s: i32,
    pub rg_ap: i32,
    pub rg_dmg: i32,
    pub rg_shots: i32,
    pub rg_is_rapid: bool,
    pub rg_is_heavy: bool,

    /// Melee weapon statistics.
    pub ml_s: i32,
    pub ml_ap: i32,
    pub ml_dmg: i32,

    /// Whether the squad has moved this turn.
    pub moved: bool,

    /// Whether the squad has fired this turn.
    pub fired: bool,

    /// Whether the squad has attempted a charge this turn.
    pub attempted_charge: bool,

    /// Whether the squad has completed a charge this turn.
    pub successful_charge: bool,

    /// Whether the squad has fought in melee this turn.
    pub fought: bool,

    /// Whether the squad fell back out of melee this turn (which forbids
    /// shooting and charging for the rest of the turn).
    pub moved_out_of_combat: bool,

    /// The number of models lost this phase, consumed by the morale test at
    /// the end of the phase.
    pub models_lost: i32
}

impl Unit {
    /// Returns true if the squad carries a usable ranged weapon.
    pub fn has_ranged_weapon(&self) -> bool {
        self.rg_s > 0 && self.rg_range > 0 && self.rg_shots > 0
    }

    /// Returns true if the squad carries a usable melee weapon.
    pub fn has_melee_weapon(&self) -> bool {
        self.ml_s > 0
    }

    /// Returns true if the squad has no wounds left and must be removed from
    /// the board.
    pub fn is_destroyed(&self) -> bool {
        self.total_w <= 0
    }

    /// Returns a copy of this squad after suffering the given number of
    /// wounds. The model count is recomputed from the remaining wounds, and
    /// the models lost are added to the morale bookkeeping.
    ///
    /// # Arguments
    ///
    /// * `wounds` - the total number of wounds inflicted
    ///
    pub fn with_damage(&self, wounds: i32) -> Unit {
        debug_assert!(self.w > 0);

        let mut out = self.clone();
        out.total_w = self.total_w - wounds;
        out.count = count_of(out.total_w, out.w);
        out.models_lost = self.models_lost + (self.count - out.count);
        out
    }

    /// Returns a copy of this squad after the given number of whole models
    /// has fled a failed morale test. Fleeing models take their full wounds
    /// with them, so `count` remains consistent with `total_w`.
    ///
    /// # Arguments
    ///
    /// * `models` - the number of models that flee
    ///
    pub fn with_fled(&self, models: i32) -> Unit {
        debug_assert!(models > 0);

        let mut out = self.clone();
        out.total_w = self.total_w - models * self.w;
        out.count = count_of(out.total_w, out.w);
        out
    }

    /// Returns a copy of this squad with the morale bookkeeping reset, and,
    /// at the end of the fight phase, all of the per-turn flags cleared.
    ///
    /// # Arguments
    ///
    /// * `end_of_turn` - whether the turn (not just the phase) is ending
    ///
    pub fn with_cleared_flags(&self, end_of_turn: bool) -> Unit {
        let mut out = self.clone();
        out.models_lost = 0;

        if end_of_turn {
            out.moved = false;
            out.fired = false;
            out.attempted_charge = false;
            out.successful_charge = false;
            out.fought = false;
            out.moved_out_of_combat = false;
        }

        out
    }
}

/// Returns the number of models in a squad with `total_w` wounds remaining
/// and `w` wounds per model.
fn count_of(total_w: i32, w: i32) -> i32 {
    if total_w <= 0 {
        0
    } else {
        (total_w + w - 1) / w
    }
}
