//! Record layouts of the Sun/Moon data archives.
//!
//! | Schema | GARC | Record size |
//! |--------|------|-------------|
//! | [`personal`] | `a/0/1/7` - per-species stats | 0x54 |
//! | [`moves`] | `a/0/1/1` record 0 - one mini-archive sub-record per move | 0x28 |
//!
//! The personal archive ends with one record of a different size; filter
//! with [`RecordSchema::matches`] before decoding.

use super::{FieldDescriptor, FieldValue, Primitive, RecordSchema, Transform};
use crate::Result;

/// Size of one personal record.
pub const PERSONAL_SIZE: usize = 0x54;
/// Size of one move record.
pub const MOVE_SIZE: usize = 0x28;

/// Per-species base stats, typing, abilities and breeding data.
///
/// The TM, tutor and Z-move compatibility bit fields are padding here; read
/// them from the raw record with [`super::bit_flags`].
pub fn personal() -> Result<RecordSchema> {
    use Primitive::{Bytes, U8, U16, U32};

    let byte = |name, offset| FieldDescriptor::new(name, offset, U8);
    RecordSchema::new(
        PERSONAL_SIZE,
        vec![
            byte("hp", 0x00),
            byte("atk", 0x01),
            byte("def", 0x02),
            byte("spe", 0x03),
            byte("spa", 0x04),
            byte("spd", 0x05),
            byte("type1", 0x06),
            byte("type2", 0x07),
            byte("capture_rate", 0x08),
            byte("stage", 0x09),
            FieldDescriptor::packed(
                [
                    Some("ev_hp"),
                    Some("ev_atk"),
                    Some("ev_def"),
                    Some("ev_spe"),
                    Some("ev_spa"),
                    Some("ev_spd"),
                    None,
                    None,
                ],
                0x0A,
                U16,
                Transform::SplitBits(2),
            ),
            FieldDescriptor::new("item1", 0x0C, U16).with(Transform::ZeroAsNone),
            FieldDescriptor::new("item2", 0x0E, U16).with(Transform::ZeroAsNone),
            FieldDescriptor::new("item3", 0x10, U16).with(Transform::ZeroAsNone),
            byte("gender_rate", 0x12),
            byte("hatch_cycles", 0x13),
            byte("base_happiness", 0x14),
            byte("exp_group", 0x15).with(Transform::replace([
                (0, "Medium Fast"),
                (1, "Erratic"),
                (2, "Fluctuating"),
                (3, "Medium Slow"),
                (4, "Fast"),
                (5, "Slow"),
            ])),
            byte("egg_group1", 0x16),
            byte("egg_group2", 0x17),
            byte("ability1", 0x18),
            byte("ability2", 0x19),
            byte("ability_hidden", 0x1A),
            byte("escape_rate", 0x1B),
            FieldDescriptor::new("alt_id", 0x1C, U32).with(Transform::ZeroAsNone),
            byte("multiplicity", 0x20),
            byte("color", 0x21).with(Transform::replace([
                (0, "Red"),
                (1, "Blue"),
                (2, "Yellow"),
                (3, "Green"),
                (4, "Black"),
                (5, "Brown"),
                (6, "Purple"),
                (7, "Gray"),
                (8, "White"),
                (9, "Pink"),
            ])),
            FieldDescriptor::new("base_exp", 0x22, U16),
            // Height in metres, weight in kilograms.
            FieldDescriptor::new("height", 0x24, U16).with(Transform::Scale(100.0)),
            FieldDescriptor::new("weight", 0x26, U16).with(Transform::Scale(10.0)),
            FieldDescriptor::padding(0x28, Bytes(16)), // TMs
            FieldDescriptor::padding(0x38, Bytes(4)),  // special tutors
            FieldDescriptor::padding(0x3C, Bytes(16)), // move tutors
            FieldDescriptor::padding(0x4C, Bytes(6)),
            byte("local_variant", 0x52).with(Transform::BoolFlag(1)),
            FieldDescriptor::padding(0x53, U8),
        ],
    )
}

/// Byte range of the TM compatibility bit field in a personal record.
///
/// [`super::bit_flags`] yields zero-based bit indices; bit `k` is TM `k + 1`.
pub const PERSONAL_TM_FLAGS: std::ops::Range<usize> = 0x28..0x38;
/// Byte range of the move tutor compatibility bit field in a personal record.
pub const PERSONAL_TUTOR_FLAGS: std::ops::Range<usize> = 0x3C..0x4C;

/// Move type, power, accuracy, secondary effects and stat changes.
pub fn moves() -> Result<RecordSchema> {
    use Primitive::{I8, U8, U16};

    let byte = |name, offset| FieldDescriptor::new(name, offset, U8);
    RecordSchema::new(
        MOVE_SIZE,
        vec![
            byte("type", 0x00),
            byte("category", 0x02).with(Transform::replace([
                (0, "Status"),
                (1, "Physical"),
                (2, "Special"),
            ])),
            byte("power", 0x03).with(Transform::replace([(0, FieldValue::Absent)])),
            byte("accuracy", 0x04).with(Transform::replace([(101, FieldValue::Absent)])),
            byte("pp", 0x05),
            FieldDescriptor::new("priority", 0x06, I8),
            FieldDescriptor::new("effect", 0x08, U16),
            byte("effect_chance", 0x0A),
            byte("effect_min_turns", 0x0B),
            byte("effect_max_turns", 0x0C),
            FieldDescriptor::padding(0x0D, U8),
            byte("crit_chance", 0x0E),
            byte("flinch_chance", 0x0F),
            FieldDescriptor::packed(
                [Some("drain"), Some("recoil")],
                0x12,
                I8,
                Transform::SignSplit,
            ),
            FieldDescriptor::packed(
                [Some("heal"), Some("damage")],
                0x13,
                I8,
                Transform::SignSplit,
            ),
            byte("stat1", 0x15),
            byte("stat2", 0x16),
            byte("stat3", 0x17),
            byte("stat1_num", 0x18),
            byte("stat2_num", 0x19),
            byte("stat3_num", 0x1A),
            byte("stat1_chance", 0x1B),
            byte("stat2_chance", 0x1C),
            byte("stat3_chance", 0x1D),
            byte("dance", 0x26).with(Transform::BoolFlag(1)),
            FieldDescriptor::padding(0x27, U8),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::bit_flags;

    #[test]
    fn personal_decodes_stats_and_evs() {
        let schema = personal().unwrap();
        let mut raw = [0u8; PERSONAL_SIZE];
        raw[..6].copy_from_slice(&[45, 49, 49, 45, 65, 65]);
        raw[0x06] = 11;
        raw[0x07] = 3;
        // ev_spa = 1 (bits 8-9)
        raw[0x0A..0x0C].copy_from_slice(&0x0100u16.to_le_bytes());
        raw[0x15] = 3;
        raw[0x21] = 3;
        raw[0x24..0x26].copy_from_slice(&70u16.to_le_bytes());
        raw[0x26..0x28].copy_from_slice(&69u16.to_le_bytes());
        raw[0x28] = 0b0000_0110;
        raw[0x52] = 1;

        let record = schema.decode(&raw).unwrap();
        assert_eq!(record["hp"], FieldValue::Int(45));
        assert_eq!(record["spd"], FieldValue::Int(65));
        assert_eq!(record["ev_spa"], FieldValue::Int(1));
        assert_eq!(record["ev_hp"], FieldValue::Int(0));
        assert!(record["item1"].is_absent());
        assert!(record["alt_id"].is_absent());
        assert_eq!(record["exp_group"], FieldValue::from("Medium Slow"));
        assert_eq!(record["color"], FieldValue::from("Green"));
        assert_eq!(record["height"], FieldValue::Float(0.7));
        assert_eq!(record["weight"], FieldValue::Float(6.9));
        assert_eq!(record["local_variant"], FieldValue::Bool(true));
        assert!(!record.contains_key("tm"));
        // 30 scalars + 6 named EV slots
        assert_eq!(record.len(), 36);

        let tms: Vec<usize> = bit_flags(&raw[PERSONAL_TM_FLAGS], 100)
            .into_iter()
            .map(|k| k + 1)
            .collect();
        assert_eq!(tms, vec![2, 3]);
    }

    #[test]
    fn personal_rejects_trailing_odd_record() {
        let schema = personal().unwrap();
        assert!(!schema.matches(&[0u8; 0x50]));
    }

    #[test]
    fn moves_decodes_absent_power_and_recoil() {
        let schema = moves().unwrap();
        let mut raw = [0u8; MOVE_SIZE];
        raw[0x02] = 0;
        raw[0x03] = 0;
        raw[0x04] = 101;
        raw[0x05] = 20;
        raw[0x06] = (-3i8) as u8;
        raw[0x12] = (-33i8) as u8;
        raw[0x13] = 50;
        raw[0x26] = 0;

        let record = schema.decode(&raw).unwrap();
        assert_eq!(record["category"], FieldValue::from("Status"));
        assert!(record["power"].is_absent());
        assert!(record["accuracy"].is_absent());
        assert_eq!(record["pp"], FieldValue::Int(20));
        assert_eq!(record["priority"], FieldValue::Int(-3));
        assert_eq!(record["drain"], FieldValue::Int(0));
        assert_eq!(record["recoil"], FieldValue::Int(33));
        assert_eq!(record["heal"], FieldValue::Int(50));
        assert_eq!(record["damage"], FieldValue::Int(0));
        assert_eq!(record["dance"], FieldValue::Bool(false));
    }
}
