//! Sheet → [`CharacterRecord`].
//!
//! Every lookup goes through [`layout::cell_for`], so this module never
//! names a cell directly. Repeating sections stop at the block end and skip
//! rows whose name cell is blank.

use dx3_core::character::combo::DEFAULT_CRITICAL;
use dx3_core::character::{
    Armor, Combo, ComboVariant, DLois, Effect, Item, Lois, Memory, Vehicle, Weapon,
};
use dx3_core::erosion::ErosionBand;
use dx3_core::types::{Attribute, Skill};
use dx3_core::CharacterRecord;

use crate::error::{Result, SheetsError};
use crate::layout::{
    cell_for, ArmorColumn, ComboCell, EffectColumn, FieldKey, ItemColumn, LoisColumn,
    MemoryColumn, ScalarField, VehicleColumn, WeaponColumn, ARMOR_BLOCK, COMBO_BLOCK,
    EFFECT_BLOCK, ITEM_BLOCK, LOIS_BLOCK, MEMORY_BLOCK, VEHICLE_BLOCK, WEAPON_BLOCK,
};
use crate::snapshot::CellSource;

/// Reader bound to one record index of a repeating section.
struct Row<'a, S: ?Sized> {
    source: &'a S,
    index: usize,
}

impl<S: CellSource + ?Sized> Row<'_, S> {
    fn text(&self, key: FieldKey) -> String {
        cell_for(key, self.index)
            .map(|cell| self.source.text(cell))
            .unwrap_or_default()
    }

    fn int(&self, key: FieldKey) -> i32 {
        cell_for(key, self.index)
            .and_then(|cell| self.source.int(cell))
            .unwrap_or(0)
    }

    fn flag(&self, key: FieldKey) -> bool {
        cell_for(key, self.index).is_some_and(|cell| self.source.flag(cell))
    }
}

fn scalar_text<S: CellSource + ?Sized>(source: &S, field: ScalarField) -> String {
    source.text(field.cell())
}

fn scalar_int<S: CellSource + ?Sized>(source: &S, field: ScalarField) -> i32 {
    source.int(field.cell()).unwrap_or(0)
}

/// Walk a section, calling `read` for every record whose `name_key` cell is
/// filled. `read` receives the record's slot index.
fn section<S, T>(
    source: &S,
    capacity: usize,
    name_key: FieldKey,
    read: impl Fn(&Row<'_, S>) -> T,
) -> Vec<T>
where
    S: CellSource + ?Sized,
{
    (0..capacity)
        .map(|index| Row { source, index })
        .filter(|row| !row.text(name_key).is_empty())
        .map(|row| read(&row))
        .collect()
}

/// Decode a full character.
///
/// # Errors
/// Returns [`SheetsError::NotRecognized`] when the name cell is blank,
/// which is how a sheet that does not follow the template shows up.
pub fn decode_character<S: CellSource + ?Sized>(source: &S) -> Result<CharacterRecord> {
    let name = scalar_text(source, ScalarField::Name);
    if name.is_empty() {
        return Err(SheetsError::NotRecognized(format!(
            "character name cell {} is empty",
            ScalarField::Name.cell()
        )));
    }

    let mut record = CharacterRecord::new(name);
    record.code_name = scalar_text(source, ScalarField::CodeName);
    record.works = scalar_text(source, ScalarField::Works);
    record.cover = scalar_text(source, ScalarField::Cover);
    record.breed = scalar_text(source, ScalarField::Breed);
    record.awakening = scalar_text(source, ScalarField::Awakening);
    record.impulse = scalar_text(source, ScalarField::Impulse);
    record.syndromes = (0..3)
        .filter_map(|i| cell_for(FieldKey::Syndrome, i))
        .map(|cell| source.text(cell))
        .filter(|s| !s.is_empty())
        .collect();

    record.hp = scalar_int(source, ScalarField::Hp);
    record.max_hp = scalar_int(source, ScalarField::MaxHp);
    record.base_erosion = scalar_int(source, ScalarField::BaseErosion);
    record.initiative = scalar_int(source, ScalarField::Initiative);
    record.movement = scalar_int(source, ScalarField::Movement);
    record.stock_points = scalar_int(source, ScalarField::StockPoints);
    record.set_erosion(scalar_int(source, ScalarField::Erosion));

    for attr in Attribute::ALL {
        if let Some(value) = source.int(ScalarField::Attribute(attr).cell()) {
            record.attributes.insert(attr, value);
        }
    }
    for skill in Skill::ALL {
        if let Some(value) = source.int(ScalarField::Skill(skill).cell()) {
            record.skills.insert(skill, value);
        }
    }

    let d_number = scalar_text(source, ScalarField::DLoisNumber);
    let d_description = scalar_text(source, ScalarField::DLoisDescription);
    if !d_number.is_empty() || !d_description.is_empty() {
        record.d_lois = Some(DLois {
            number: d_number,
            description: d_description,
        });
    }

    record.lois = decode_lois(source);
    record.memories = section(
        source,
        MEMORY_BLOCK.capacity(),
        FieldKey::Memory(MemoryColumn::Name),
        |row| Memory {
            name: row.text(FieldKey::Memory(MemoryColumn::Name)),
            emotion: row.text(FieldKey::Memory(MemoryColumn::Emotion)),
            description: row.text(FieldKey::Memory(MemoryColumn::Description)),
        },
    );
    record.weapons = section(
        source,
        WEAPON_BLOCK.capacity(),
        FieldKey::Weapon(WeaponColumn::Name),
        |row| Weapon {
            name: row.text(FieldKey::Weapon(WeaponColumn::Name)),
            skill: row.text(FieldKey::Weapon(WeaponColumn::Skill)),
            accuracy: row.text(FieldKey::Weapon(WeaponColumn::Accuracy)),
            attack: row.text(FieldKey::Weapon(WeaponColumn::Attack)),
            guard: row.text(FieldKey::Weapon(WeaponColumn::Guard)),
            range: row.text(FieldKey::Weapon(WeaponColumn::Range)),
            note: row.text(FieldKey::Weapon(WeaponColumn::Note)),
        },
    );
    record.armor = section(
        source,
        ARMOR_BLOCK.capacity(),
        FieldKey::Armor(ArmorColumn::Name),
        |row| Armor {
            name: row.text(FieldKey::Armor(ArmorColumn::Name)),
            dodge: row.text(FieldKey::Armor(ArmorColumn::Dodge)),
            initiative: row.text(FieldKey::Armor(ArmorColumn::Initiative)),
            armor: row.text(FieldKey::Armor(ArmorColumn::Armor)),
            note: row.text(FieldKey::Armor(ArmorColumn::Note)),
        },
    );
    record.vehicles = section(
        source,
        VEHICLE_BLOCK.capacity(),
        FieldKey::Vehicle(VehicleColumn::Name),
        |row| Vehicle {
            name: row.text(FieldKey::Vehicle(VehicleColumn::Name)),
            attack: row.text(FieldKey::Vehicle(VehicleColumn::Attack)),
            initiative: row.text(FieldKey::Vehicle(VehicleColumn::Initiative)),
            armor: row.text(FieldKey::Vehicle(VehicleColumn::Armor)),
            movement: row.text(FieldKey::Vehicle(VehicleColumn::Movement)),
            note: row.text(FieldKey::Vehicle(VehicleColumn::Note)),
        },
    );
    record.items = section(
        source,
        ITEM_BLOCK.capacity(),
        FieldKey::Item(ItemColumn::Name),
        |row| Item {
            name: row.text(FieldKey::Item(ItemColumn::Name)),
            note: row.text(FieldKey::Item(ItemColumn::Note)),
        },
    );
    record.effects = decode_effects(source);
    record.combos = decode_combos(source);
    record.normalize();
    Ok(record)
}

/// Decode the Lois section, remembering each entry's sheet slot.
pub fn decode_lois<S: CellSource + ?Sized>(source: &S) -> Vec<Lois> {
    section(
        source,
        LOIS_BLOCK.capacity(),
        FieldKey::Lois(LoisColumn::Name),
        |row| Lois {
            name: row.text(FieldKey::Lois(LoisColumn::Name)),
            positive: row.text(FieldKey::Lois(LoisColumn::Positive)),
            negative: row.text(FieldKey::Lois(LoisColumn::Negative)),
            description: row.text(FieldKey::Lois(LoisColumn::Description)),
            burned: row.flag(FieldKey::Lois(LoisColumn::Burned)),
            sheet_slot: Some(row.index),
        },
    )
}

/// Decode the effect section.
pub fn decode_effects<S: CellSource + ?Sized>(source: &S) -> Vec<Effect> {
    let key = FieldKey::Effect;
    section(source, EFFECT_BLOCK.capacity(), key(EffectColumn::Name), |row| {
        Effect {
            name: row.text(key(EffectColumn::Name)),
            level: row.int(key(EffectColumn::Level)),
            max_level: row.int(key(EffectColumn::MaxLevel)),
            timing: row.text(key(EffectColumn::Timing)),
            skill: row.text(key(EffectColumn::Skill)),
            difficulty: row.text(key(EffectColumn::Difficulty)),
            target: row.text(key(EffectColumn::Target)),
            range: row.text(key(EffectColumn::Range)),
            erosion_cost: row.text(key(EffectColumn::ErosionCost)),
            restriction: row.text(key(EffectColumn::Restriction)),
            description: row.text(key(EffectColumn::Description)),
        }
    })
}

/// Decode the combo section. Records with a blank name are skipped; a
/// blank critical reads as `10`.
pub fn decode_combos<S: CellSource + ?Sized>(source: &S) -> Vec<Combo> {
    let key = FieldKey::Combo;
    section(source, COMBO_BLOCK.capacity(), key(ComboCell::Name), |row| {
        Combo {
            name: row.text(key(ComboCell::Name)),
            timing: row.text(key(ComboCell::Timing)),
            skill: row.text(key(ComboCell::Skill)),
            difficulty: row.text(key(ComboCell::Difficulty)),
            target: row.text(key(ComboCell::Target)),
            range: row.text(key(ComboCell::Range)),
            restriction: row.text(key(ComboCell::Restriction)),
            erosion_cost: row.text(key(ComboCell::ErosionCost)),
            low: combo_variant(row, ErosionBand::Low),
            high: combo_variant(row, ErosionBand::High),
        }
    })
}

fn combo_variant<S: CellSource + ?Sized>(row: &Row<'_, S>, band: ErosionBand) -> ComboVariant {
    let key = FieldKey::Combo;
    let critical = row.text(key(ComboCell::Critical(band)));
    ComboVariant {
        effects: row.text(key(ComboCell::Effects(band))),
        content: row.text(key(ComboCell::Content(band))),
        dice: row.text(key(ComboCell::Dice(band))),
        critical: if critical.is_empty() {
            DEFAULT_CRITICAL.to_string()
        } else {
            critical
        },
        attack: row.text(key(ComboCell::Attack(band))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::a1;
    use crate::layout::BATCH_RANGES;
    use crate::snapshot::{SheetData, Snapshot};

    fn blank_sheet() -> SheetData {
        SheetData::new(BATCH_RANGES.iter().map(|r| Snapshot::empty(*r)).collect())
    }

    fn put(sheet: &mut SheetData, key: FieldKey, index: usize, value: &str) {
        let cell = cell_for(key, index).expect("cell");
        let snap = sheet
            .snapshots
            .iter_mut()
            .zip(BATCH_RANGES)
            .find(|(_, r)| r.contains(cell))
            .map(|(s, _)| s)
            .expect("range");
        snap.set(cell, value);
    }

    fn scalar(sheet: &mut SheetData, field: ScalarField, value: &str) {
        put(sheet, FieldKey::Scalar(field), 0, value);
    }

    #[test]
    fn blank_name_is_not_recognised() {
        let sheet = blank_sheet();
        assert!(matches!(
            decode_character(&sheet),
            Err(SheetsError::NotRecognized(_))
        ));
    }

    #[test]
    fn scalars_and_tier() {
        let mut sheet = blank_sheet();
        scalar(&mut sheet, ScalarField::Name, "카미야 렌");
        scalar(&mut sheet, ScalarField::Breed, "기원종 크로스");
        scalar(&mut sheet, ScalarField::Hp, "28");
        scalar(&mut sheet, ScalarField::Erosion, "105%");
        scalar(&mut sheet, ScalarField::Attribute(Attribute::Body), "3");
        scalar(&mut sheet, ScalarField::Skill(Skill::Dodge), "2");
        put(&mut sheet, FieldKey::Syndrome, 0, "블랙독");
        put(&mut sheet, FieldKey::Syndrome, 2, "하누만");

        let record = decode_character(&sheet).expect("decode");
        assert_eq!(record.name, "카미야 렌");
        assert!(record.is_apex());
        assert_eq!(record.hp, 28);
        assert_eq!(record.erosion_rate(), 105);
        assert_eq!(record.erosion_d(), 3);
        assert_eq!(record.attribute(Attribute::Body), 3);
        assert_eq!(record.skill(Skill::Dodge), 2);
        assert_eq!(record.syndromes.len(), 2);
        assert!(record.d_lois.is_none());
    }

    #[test]
    fn lois_keep_their_slot_across_gaps() {
        let mut sheet = blank_sheet();
        scalar(&mut sheet, ScalarField::Name, "카미야");
        put(&mut sheet, FieldKey::Lois(LoisColumn::Name), 0, "하루카");
        put(&mut sheet, FieldKey::Lois(LoisColumn::Name), 3, "UGN");
        put(&mut sheet, FieldKey::Lois(LoisColumn::Burned), 3, "TRUE");

        let record = decode_character(&sheet).expect("decode");
        assert_eq!(record.lois.len(), 2);
        assert_eq!(record.lois[0].sheet_slot, Some(0));
        assert!(!record.lois[0].burned);
        assert_eq!(record.lois[1].sheet_slot, Some(3));
        assert!(record.lois[1].burned);
    }

    #[test]
    fn combos_skip_blank_names_and_default_critical() {
        let mut sheet = blank_sheet();
        scalar(&mut sheet, ScalarField::Name, "카미야");
        let combo = |c| FieldKey::Combo(c);
        put(&mut sheet, combo(ComboCell::Name), 0, "흑뢰");
        put(&mut sheet, combo(ComboCell::ErosionCost), 0, "4+2");
        put(&mut sheet, combo(ComboCell::Critical(ErosionBand::High)), 0, "8");
        put(&mut sheet, combo(ComboCell::Content(ErosionBand::Low)), 0, "low text");
        // Data under a blank name is ignored.
        put(&mut sheet, combo(ComboCell::Timing), 1, "메이저");

        let record = decode_character(&sheet).expect("decode");
        assert_eq!(record.combos.len(), 1);
        let combo = &record.combos[0];
        assert_eq!(combo.cost(), 6);
        assert_eq!(combo.low.critical, "10");
        assert_eq!(combo.high.critical, "8");
        assert_eq!(combo.low.content, "low text");
    }

    #[test]
    fn effects_read_levels() {
        let mut sheet = blank_sheet();
        scalar(&mut sheet, ScalarField::Name, "카미야");
        put(&mut sheet, FieldKey::Effect(EffectColumn::Name), 0, "컨센트레이트");
        put(&mut sheet, FieldKey::Effect(EffectColumn::Level), 0, "2");
        put(&mut sheet, FieldKey::Effect(EffectColumn::MaxLevel), 0, "3");

        let record = decode_character(&sheet).expect("decode");
        assert_eq!(record.effects.len(), 1);
        assert_eq!(record.effects[0].level, 2);
        assert_eq!(record.effects[0].level_at(100, false), 3);
    }

    #[test]
    fn single_snapshot_reads_too() {
        let mut snap = Snapshot::empty(BATCH_RANGES[0]);
        snap.set(a1('E', 4), "카미야");
        let record = decode_character(&snap).expect("decode");
        assert!(record.lois.is_empty());
    }
}
