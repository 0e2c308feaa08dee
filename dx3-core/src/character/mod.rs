//! The [`CharacterRecord`] aggregate and its parts.

pub mod combo;
pub mod equipment;
pub mod lois;

pub use combo::{Combo, ComboVariant, Effect, LocalCombo};
pub use equipment::{Armor, Item, Vehicle, Weapon};
pub use lois::{DLois, Lois, LoisUpsert, Memory, TitusOutcome};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::erosion::{self, ErosionChange};
use crate::error::{Dx3Error, Result};
use crate::types::{Attribute, Skill};

/// Breed keyword that marks an apex character.
pub const APEX_BREED: &str = "기원종";

/// One player character.
///
/// `erosion_rate` and `erosion_d` are private so that the tier can only
/// change together with the rate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterRecord {
    /// Character name.
    pub name: String,
    /// Code name.
    pub code_name: String,
    /// Works.
    pub works: String,
    /// Cover.
    pub cover: String,
    /// Breed (퓨어/크로스/트라이, 기원종 …).
    pub breed: String,
    /// Up to three syndromes.
    pub syndromes: Vec<String>,
    /// Awakening.
    pub awakening: String,
    /// Impulse.
    pub impulse: String,
    /// Current HP.
    pub hp: i32,
    /// Maximum HP.
    pub max_hp: i32,
    /// Initiative (행동치).
    pub initiative: i32,
    /// Movement.
    pub movement: i32,
    /// Stock points (재산점).
    pub stock_points: i32,
    /// Base erosion from awakening + impulse.
    pub base_erosion: i32,
    erosion_rate: i32,
    erosion_d: i32,
    /// Main attributes.
    pub attributes: BTreeMap<Attribute, i32>,
    /// Skill levels.
    pub skills: BTreeMap<Skill, i32>,
    /// Lois, in sheet order.
    pub lois: Vec<Lois>,
    /// D-Lois slot.
    pub d_lois: Option<DLois>,
    /// Memories.
    pub memories: Vec<Memory>,
    /// Weapons.
    pub weapons: Vec<Weapon>,
    /// Armor.
    pub armor: Vec<Armor>,
    /// Vehicles.
    pub vehicles: Vec<Vehicle>,
    /// Items.
    pub items: Vec<Item>,
    /// Effects.
    pub effects: Vec<Effect>,
    /// Combos from the sheet.
    pub combos: Vec<Combo>,
    /// Status conditions (사독, 방심, …).
    pub conditions: Vec<String>,
    /// Last mutation.
    pub updated_at: DateTime<Utc>,
}

impl CharacterRecord {
    /// Create an empty record.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            updated_at: Utc::now(),
            ..Self::default()
        }
    }

    // ------------------------------------------------------------------
    // Erosion
    // ------------------------------------------------------------------

    /// Current erosion rate.
    #[must_use]
    pub fn erosion_rate(&self) -> i32 {
        self.erosion_rate
    }

    /// Current erosion D.
    #[must_use]
    pub fn erosion_d(&self) -> i32 {
        self.erosion_d
    }

    /// Set the erosion rate and recompute erosion D.
    pub fn set_erosion(&mut self, rate: i32) -> ErosionChange {
        let change = ErosionChange {
            old_rate: self.erosion_rate,
            new_rate: rate,
            old_tier: self.erosion_d,
            new_tier: erosion::resolve_tier(rate),
        };
        self.erosion_rate = change.new_rate;
        self.erosion_d = change.new_tier;
        self.touch();
        change
    }

    /// Add `delta` to the erosion rate.
    pub fn adjust_erosion(&mut self, delta: i32) -> ErosionChange {
        self.set_erosion(self.erosion_rate.saturating_add(delta))
    }

    /// Recompute derived fields. Called on every load so a hand-edited
    /// document cannot carry a stale tier.
    pub fn normalize(&mut self) {
        self.erosion_d = erosion::resolve_tier(self.erosion_rate);
    }

    /// Whether effect levels use the apex table.
    #[must_use]
    pub fn is_apex(&self) -> bool {
        self.breed.contains(APEX_BREED)
    }

    // ------------------------------------------------------------------
    // Attributes & skills
    // ------------------------------------------------------------------

    /// Attribute value (0 when unset).
    #[must_use]
    pub fn attribute(&self, attr: Attribute) -> i32 {
        self.attributes.get(&attr).copied().unwrap_or(0)
    }

    /// Skill level (0 when unset).
    #[must_use]
    pub fn skill(&self, skill: Skill) -> i32 {
        self.skills.get(&skill).copied().unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // Lois
    // ------------------------------------------------------------------

    /// Find a Lois by exact name.
    #[must_use]
    pub fn find_lois(&self, name: &str) -> Option<(usize, &Lois)> {
        self.lois.iter().enumerate().find(|(_, l)| l.name == name)
    }

    /// Add a Lois, replacing a same-named entry in place. A burned entry
    /// stays burned and keeps its sheet slot.
    pub fn upsert_lois(&mut self, mut lois: Lois) -> LoisUpsert {
        self.touch();
        if let Some(idx) = self.lois.iter().position(|l| l.name == lois.name) {
            lois.burned |= self.lois[idx].burned;
            lois.sheet_slot = lois.sheet_slot.or(self.lois[idx].sheet_slot);
            self.lois[idx] = lois;
            LoisUpsert::Replaced(idx)
        } else {
            self.lois.push(lois);
            LoisUpsert::Added(self.lois.len() - 1)
        }
    }

    /// Remove a Lois.
    ///
    /// # Errors
    /// Returns [`Dx3Error::LoisNotFound`] if no entry has that name.
    pub fn remove_lois(&mut self, name: &str) -> Result<Lois> {
        let idx = self
            .lois
            .iter()
            .position(|l| l.name == name)
            .ok_or_else(|| Dx3Error::LoisNotFound(name.to_string()))?;
        self.touch();
        Ok(self.lois.remove(idx))
    }

    /// Convert a Lois to Titus. Returns its index and the outcome.
    ///
    /// # Errors
    /// Returns [`Dx3Error::LoisNotFound`] if no entry has that name.
    pub fn titus(&mut self, name: &str) -> Result<(usize, TitusOutcome)> {
        let idx = self
            .lois
            .iter()
            .position(|l| l.name == name)
            .ok_or_else(|| Dx3Error::LoisNotFound(name.to_string()))?;
        let outcome = self.lois[idx].burn();
        if outcome == TitusOutcome::Converted {
            self.touch();
        }
        Ok((idx, outcome))
    }

    // ------------------------------------------------------------------
    // Effects, combos, conditions
    // ------------------------------------------------------------------

    /// Find a sheet combo by name.
    #[must_use]
    pub fn combo(&self, name: &str) -> Option<&Combo> {
        self.combos.iter().find(|c| c.name == name)
    }

    /// Find an effect by name.
    #[must_use]
    pub fn effect(&self, name: &str) -> Option<&Effect> {
        self.effects.iter().find(|e| e.name == name)
    }

    /// Add a status condition. Returns `false` if it was already present.
    pub fn add_condition(&mut self, condition: &str) -> bool {
        if self.conditions.iter().any(|c| c == condition) {
            return false;
        }
        self.conditions.push(condition.to_string());
        self.touch();
        true
    }

    /// Remove a status condition. Returns `false` if it was not present.
    pub fn remove_condition(&mut self, condition: &str) -> bool {
        let before = self.conditions.len();
        self.conditions.retain(|c| c != condition);
        let removed = self.conditions.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Replace everything the sheet owns with `sheet`'s contents, keeping
    /// locally tracked conditions and burned Lois flags.
    ///
    /// Lois added through chat have no sheet row; they survive the merge
    /// after the sheet's entries unless the sheet now holds the same name.
    pub fn merge_from_sheet(&mut self, sheet: CharacterRecord) {
        let conditions = std::mem::take(&mut self.conditions);
        let local = std::mem::take(&mut self.lois);

        *self = sheet;
        self.conditions = conditions;
        for lois in &mut self.lois {
            if local.iter().any(|l| l.burned && l.name == lois.name) {
                lois.burned = true;
            }
        }
        let chat_only: Vec<Lois> = local
            .into_iter()
            .filter(|l| l.sheet_slot.is_none())
            .filter(|l| self.lois.iter().all(|s| s.name != l.name))
            .collect();
        self.lois.extend(chat_only);
        self.normalize();
        self.touch();
    }

    /// Mark the record as modified now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
