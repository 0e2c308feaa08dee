//! Character sheet template: the cell-mapping table.
//!
//! Scalar fields live at fixed cells. Repeating sections (Lois, weapons,
//! effects, combos …) are [`RowBlock`]s: a row range plus a fixed column
//! per sub-field. Combos span six rows each:
//!
//! ```text
//! +0  name
//! +1  timing · skill · difficulty · target · range · restriction · cost
//! +2  ≤99%  effects · dice · critical · attack
//! +3  ≤99%  content
//! +4  ≥100% effects · dice · critical · attack
//! +5  ≥100% content
//! ```
//!
//! A full read fetches the three [`BATCH_RANGES`]; every cell produced by
//! [`cell_for`] lies inside one of them.

use dx3_core::erosion::ErosionBand;
use dx3_core::types::{Attribute, Skill};

use crate::coord::{a1, CellRef, RangeRef};

// ---------------------------------------------------------------------------
// Batched ranges
// ---------------------------------------------------------------------------

/// Basic info, attributes, skills, D-Lois.
pub const BASIC_RANGE: RangeRef = RangeRef::new(a1('B', 2), a1('R', 22));
/// Lois and memories.
pub const RELATION_RANGE: RangeRef = RangeRef::new(a1('B', 25), a1('M', 35));
/// Equipment, effects, combos.
pub const EQUIPMENT_RANGE: RangeRef = RangeRef::new(a1('B', 38), a1('O', 140));

/// The three ranges fetched per full character read, in snapshot order.
pub const BATCH_RANGES: [RangeRef; 3] = [BASIC_RANGE, RELATION_RANGE, EQUIPMENT_RANGE];

// ---------------------------------------------------------------------------
// Row blocks
// ---------------------------------------------------------------------------

/// A repeating section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowBlock {
    /// First row (one-based, as on the sheet).
    pub start_row: u32,
    /// Last row, inclusive.
    pub end_row: u32,
    /// Rows per record.
    pub interval: u32,
}

impl RowBlock {
    const fn rows(start_row: u32, end_row: u32) -> Self {
        Self {
            start_row,
            end_row,
            interval: 1,
        }
    }

    /// Number of records the block can hold.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        ((self.end_row + 1 - self.start_row) / self.interval) as usize
    }

    /// First sheet row of record `index`, or `None` past the end.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<u32> {
        if index >= self.capacity() {
            return None;
        }
        let index = u32::try_from(index).ok()?;
        Some(self.start_row + index * self.interval)
    }
}

/// Lois rows.
pub const LOIS_BLOCK: RowBlock = RowBlock::rows(25, 31);
/// Memory rows.
pub const MEMORY_BLOCK: RowBlock = RowBlock::rows(33, 35);
/// Weapon rows.
pub const WEAPON_BLOCK: RowBlock = RowBlock::rows(38, 42);
/// Armor rows.
pub const ARMOR_BLOCK: RowBlock = RowBlock::rows(45, 46);
/// Vehicle rows.
pub const VEHICLE_BLOCK: RowBlock = RowBlock::rows(49, 49);
/// Item rows.
pub const ITEM_BLOCK: RowBlock = RowBlock::rows(52, 56);
/// Effect rows.
pub const EFFECT_BLOCK: RowBlock = RowBlock::rows(59, 78);
/// Combo records, six rows each.
pub const COMBO_BLOCK: RowBlock = RowBlock {
    start_row: 81,
    end_row: 140,
    interval: 6,
};

// ---------------------------------------------------------------------------
// Field keys
// ---------------------------------------------------------------------------

/// Fields with one fixed cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarField {
    /// Character name.
    Name,
    /// Code name.
    CodeName,
    /// Works.
    Works,
    /// Cover.
    Cover,
    /// Breed.
    Breed,
    /// Awakening.
    Awakening,
    /// Impulse.
    Impulse,
    /// Current HP.
    Hp,
    /// Maximum HP.
    MaxHp,
    /// Erosion rate.
    Erosion,
    /// Base erosion.
    BaseErosion,
    /// Initiative.
    Initiative,
    /// Movement.
    Movement,
    /// Stock points.
    StockPoints,
    /// D-Lois number.
    DLoisNumber,
    /// D-Lois description.
    DLoisDescription,
    /// Attribute value.
    Attribute(Attribute),
    /// Skill level.
    Skill(Skill),
}

impl ScalarField {
    /// The field's cell.
    #[must_use]
    pub fn cell(self) -> CellRef {
        match self {
            Self::Name => a1('E', 4),
            Self::CodeName => a1('E', 5),
            Self::Works => a1('E', 6),
            Self::Cover => a1('E', 7),
            Self::Breed => a1('E', 8),
            Self::Awakening => a1('E', 10),
            Self::Impulse => a1('E', 11),
            Self::Hp => a1('O', 4),
            Self::MaxHp => a1('O', 5),
            Self::Erosion => a1('O', 6),
            Self::BaseErosion => a1('O', 7),
            Self::Initiative => a1('O', 8),
            Self::Movement => a1('O', 9),
            Self::StockPoints => a1('O', 10),
            Self::DLoisNumber => a1('E', 19),
            Self::DLoisDescription => a1('G', 19),
            Self::Attribute(attr) => attribute_row(attr).with_col('L'),
            Self::Skill(skill) => {
                let row = attribute_row(skill.attribute());
                row.with_col(SKILL_COLUMNS[skill.slot()])
            }
        }
    }
}

const SKILL_COLUMNS: [char; 3] = ['N', 'P', 'R'];
const SYNDROME_CELLS: [CellRef; 3] = [a1('E', 9), a1('G', 9), a1('I', 9)];

fn attribute_row(attr: Attribute) -> CellRef {
    // Body on row 14, one row per attribute.
    a1('A', 14).down(u32::try_from(attr.index()).unwrap_or(0))
}

/// Lois sub-fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoisColumn {
    /// Name.
    Name,
    /// Positive emotion.
    Positive,
    /// Negative emotion.
    Negative,
    /// Description.
    Description,
    /// Titus checkbox.
    Burned,
}

/// Memory sub-fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryColumn {
    /// Name.
    Name,
    /// Emotion.
    Emotion,
    /// Description.
    Description,
}

/// Weapon sub-fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeaponColumn {
    /// Name.
    Name,
    /// Skill.
    Skill,
    /// Accuracy.
    Accuracy,
    /// Attack.
    Attack,
    /// Guard.
    Guard,
    /// Range.
    Range,
    /// Note.
    Note,
}

/// Armor sub-fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArmorColumn {
    /// Name.
    Name,
    /// Dodge.
    Dodge,
    /// Initiative.
    Initiative,
    /// Armor value.
    Armor,
    /// Note.
    Note,
}

/// Vehicle sub-fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleColumn {
    /// Name.
    Name,
    /// Attack.
    Attack,
    /// Initiative.
    Initiative,
    /// Armor value.
    Armor,
    /// Movement.
    Movement,
    /// Note.
    Note,
}

/// Item sub-fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemColumn {
    /// Name.
    Name,
    /// Note.
    Note,
}

/// Effect sub-fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectColumn {
    /// Name.
    Name,
    /// Level.
    Level,
    /// Max level.
    MaxLevel,
    /// Timing.
    Timing,
    /// Skill.
    Skill,
    /// Difficulty.
    Difficulty,
    /// Target.
    Target,
    /// Range.
    Range,
    /// Erosion cost.
    ErosionCost,
    /// Restriction.
    Restriction,
    /// Effect text.
    Description,
}

/// Cells within one combo record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComboCell {
    /// Name (+0).
    Name,
    /// Timing (+1).
    Timing,
    /// Skill (+1).
    Skill,
    /// Difficulty (+1).
    Difficulty,
    /// Target (+1).
    Target,
    /// Range (+1).
    Range,
    /// Restriction (+1).
    Restriction,
    /// Erosion cost (+1).
    ErosionCost,
    /// Effect list (+2 low / +4 high).
    Effects(ErosionBand),
    /// Dice modifier (+2 / +4).
    Dice(ErosionBand),
    /// Critical value (+2 / +4).
    Critical(ErosionBand),
    /// Attack modifier (+2 / +4).
    Attack(ErosionBand),
    /// Free-text content (+3 / +5).
    Content(ErosionBand),
}

impl ComboCell {
    /// `(row offset, column)` within the combo record.
    #[must_use]
    pub fn position(self) -> (u32, char) {
        let band_row = |band: ErosionBand| match band {
            ErosionBand::Low => 2,
            ErosionBand::High => 4,
        };
        match self {
            Self::Name => (0, 'B'),
            Self::Timing => (1, 'C'),
            Self::Skill => (1, 'E'),
            Self::Difficulty => (1, 'G'),
            Self::Target => (1, 'I'),
            Self::Range => (1, 'K'),
            Self::Restriction => (1, 'M'),
            Self::ErosionCost => (1, 'O'),
            Self::Effects(band) => (band_row(band), 'C'),
            Self::Dice(band) => (band_row(band), 'K'),
            Self::Critical(band) => (band_row(band), 'L'),
            Self::Attack(band) => (band_row(band), 'M'),
            Self::Content(band) => (band_row(band) + 1, 'C'),
        }
    }
}

/// Any addressable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    /// Fixed cell; the index is ignored.
    Scalar(ScalarField),
    /// Syndrome slot 0..3.
    Syndrome,
    /// Lois row.
    Lois(LoisColumn),
    /// Memory row.
    Memory(MemoryColumn),
    /// Weapon row.
    Weapon(WeaponColumn),
    /// Armor row.
    Armor(ArmorColumn),
    /// Vehicle row.
    Vehicle(VehicleColumn),
    /// Item row.
    Item(ItemColumn),
    /// Effect row.
    Effect(EffectColumn),
    /// Combo record.
    Combo(ComboCell),
}

/// Resolve a field (and record index for repeating sections) to its cell.
///
/// Returns `None` when `index` is past the end of the section.
#[must_use]
pub fn cell_for(key: FieldKey, index: usize) -> Option<CellRef> {
    let in_block = |block: RowBlock, column: char| {
        block.row(index).map(|row| a1(column, row))
    };
    match key {
        FieldKey::Scalar(field) => Some(field.cell()),
        FieldKey::Syndrome => SYNDROME_CELLS.get(index).copied(),
        FieldKey::Lois(col) => in_block(
            LOIS_BLOCK,
            match col {
                LoisColumn::Name => 'B',
                LoisColumn::Positive => 'E',
                LoisColumn::Negative => 'G',
                LoisColumn::Description => 'I',
                LoisColumn::Burned => 'M',
            },
        ),
        FieldKey::Memory(col) => in_block(
            MEMORY_BLOCK,
            match col {
                MemoryColumn::Name => 'B',
                MemoryColumn::Emotion => 'E',
                MemoryColumn::Description => 'I',
            },
        ),
        FieldKey::Weapon(col) => in_block(
            WEAPON_BLOCK,
            match col {
                WeaponColumn::Name => 'B',
                WeaponColumn::Skill => 'F',
                WeaponColumn::Accuracy => 'G',
                WeaponColumn::Attack => 'H',
                WeaponColumn::Guard => 'I',
                WeaponColumn::Range => 'J',
                WeaponColumn::Note => 'K',
            },
        ),
        FieldKey::Armor(col) => in_block(
            ARMOR_BLOCK,
            match col {
                ArmorColumn::Name => 'B',
                ArmorColumn::Dodge => 'G',
                ArmorColumn::Initiative => 'H',
                ArmorColumn::Armor => 'I',
                ArmorColumn::Note => 'K',
            },
        ),
        FieldKey::Vehicle(col) => in_block(
            VEHICLE_BLOCK,
            match col {
                VehicleColumn::Name => 'B',
                VehicleColumn::Attack => 'H',
                VehicleColumn::Initiative => 'I',
                VehicleColumn::Armor => 'J',
                VehicleColumn::Movement => 'K',
                VehicleColumn::Note => 'L',
            },
        ),
        FieldKey::Item(col) => in_block(
            ITEM_BLOCK,
            match col {
                ItemColumn::Name => 'B',
                ItemColumn::Note => 'K',
            },
        ),
        FieldKey::Effect(col) => in_block(
            EFFECT_BLOCK,
            match col {
                EffectColumn::Name => 'B',
                EffectColumn::Level => 'E',
                EffectColumn::MaxLevel => 'F',
                EffectColumn::Timing => 'G',
                EffectColumn::Skill => 'H',
                EffectColumn::Difficulty => 'I',
                EffectColumn::Target => 'J',
                EffectColumn::Range => 'K',
                EffectColumn::ErosionCost => 'L',
                EffectColumn::Restriction => 'M',
                EffectColumn::Description => 'N',
            },
        ),
        FieldKey::Combo(cell) => {
            let (offset, column) = cell.position();
            COMBO_BLOCK.row(index).map(|row| a1(column, row + offset))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_keys() -> Vec<(FieldKey, usize)> {
        use FieldKey as K;
        let mut keys: Vec<FieldKey> = vec![
            K::Scalar(ScalarField::Name),
            K::Scalar(ScalarField::CodeName),
            K::Scalar(ScalarField::Works),
            K::Scalar(ScalarField::Cover),
            K::Scalar(ScalarField::Breed),
            K::Scalar(ScalarField::Awakening),
            K::Scalar(ScalarField::Impulse),
            K::Scalar(ScalarField::Hp),
            K::Scalar(ScalarField::MaxHp),
            K::Scalar(ScalarField::Erosion),
            K::Scalar(ScalarField::BaseErosion),
            K::Scalar(ScalarField::Initiative),
            K::Scalar(ScalarField::Movement),
            K::Scalar(ScalarField::StockPoints),
            K::Scalar(ScalarField::DLoisNumber),
            K::Scalar(ScalarField::DLoisDescription),
            K::Syndrome,
            K::Lois(LoisColumn::Burned),
            K::Memory(MemoryColumn::Description),
            K::Weapon(WeaponColumn::Note),
            K::Armor(ArmorColumn::Note),
            K::Vehicle(VehicleColumn::Note),
            K::Item(ItemColumn::Note),
            K::Effect(EffectColumn::Description),
            K::Combo(ComboCell::ErosionCost),
            K::Combo(ComboCell::Content(ErosionBand::High)),
        ];
        keys.extend(Attribute::ALL.map(|a| K::Scalar(ScalarField::Attribute(a))));
        keys.extend(Skill::ALL.map(|s| K::Scalar(ScalarField::Skill(s))));
        keys.into_iter()
            .flat_map(|k| (0..25).map(move |i| (k, i)))
            .collect()
    }

    #[test]
    fn every_cell_is_inside_a_batch_range() {
        for (key, index) in all_keys() {
            if let Some(cell) = cell_for(key, index) {
                assert!(
                    BATCH_RANGES.iter().any(|r| r.contains(cell)),
                    "{key:?}[{index}] → {cell} outside batch ranges"
                );
            }
        }
    }

    #[test]
    fn scalar_cells_match_template() {
        assert_eq!(ScalarField::Name.cell().to_string(), "E4");
        assert_eq!(ScalarField::Hp.cell().to_string(), "O4");
        assert_eq!(ScalarField::Erosion.cell().to_string(), "O6");
        assert_eq!(ScalarField::Attribute(Attribute::Social).cell().to_string(), "L17");
        assert_eq!(ScalarField::Skill(Skill::Melee).cell().to_string(), "N14");
        assert_eq!(ScalarField::Skill(Skill::Info).cell().to_string(), "R17");
        assert_eq!(ScalarField::Skill(Skill::Will).cell().to_string(), "P16");
    }

    #[test]
    fn repeating_blocks_bound_their_index() {
        assert_eq!(LOIS_BLOCK.capacity(), 7);
        assert_eq!(
            cell_for(FieldKey::Lois(LoisColumn::Burned), 6).map(|c| c.to_string()),
            Some("M31".to_string())
        );
        assert_eq!(cell_for(FieldKey::Lois(LoisColumn::Burned), 7), None);
        assert_eq!(cell_for(FieldKey::Syndrome, 3), None);
    }

    #[test]
    fn combo_records_are_six_rows_apart() {
        assert_eq!(COMBO_BLOCK.capacity(), 10);
        let name = |i| cell_for(FieldKey::Combo(ComboCell::Name), i).map(|c| c.to_string());
        assert_eq!(name(0), Some("B81".to_string()));
        assert_eq!(name(1), Some("B87".to_string()));
        assert_eq!(name(9), Some("B135".to_string()));
        assert_eq!(name(10), None);

        let high_content = cell_for(FieldKey::Combo(ComboCell::Content(ErosionBand::High)), 9)
            .map(|c| c.to_string());
        assert_eq!(high_content, Some("C140".to_string()));
        let low_critical = cell_for(FieldKey::Combo(ComboCell::Critical(ErosionBand::Low)), 0)
            .map(|c| c.to_string());
        assert_eq!(low_critical, Some("L83".to_string()));
    }

    #[test]
    fn batch_ranges_do_not_overlap() {
        for (i, a) in BATCH_RANGES.iter().enumerate() {
            for b in &BATCH_RANGES[i + 1..] {
                assert!(a.end.row < b.start.row);
            }
        }
    }
}
