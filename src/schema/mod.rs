//! Declarative decoding of fixed-layout records.
//!
//! A [`RecordSchema`] lists the fields of a fixed-size record by byte offset.
//! [`decode`] walks the fields in offset order and produces a [`Record`]
//! mapping each field name to a [`FieldValue`]. Bytes not covered by any
//! field are padding and never surface.
//!
//! Fields come in three shapes, selected by their [`Identifier`]:
//!
//! * **Named** - one value, optionally passed through a scalar [`Transform`].
//! * **Packed** - one primitive split into several named sub-values by a
//!   packing transform ([`Transform::SplitBits`], [`Transform::SignSplit`]).
//!   Unnamed slots are dropped.
//! * **Padding** - kept in the schema only to document the layout; the value
//!   is read and discarded.
//!
//! ```
//! use garckit::schema::{FieldDescriptor, FieldValue, Primitive, RecordSchema};
//!
//! let schema = RecordSchema::new(4, vec![
//!     FieldDescriptor::new("a", 0, Primitive::U8),
//!     FieldDescriptor::new("b", 2, Primitive::U8),
//! ])?;
//! let record = schema.decode(&[0x05, 0xFF, 0x00, 0x2A])?;
//! assert_eq!(record["a"], FieldValue::Int(5));
//! assert_eq!(record["b"], FieldValue::Int(0));
//! # Ok::<(), garckit::Error>(())
//! ```

pub mod presets;

use std::collections::BTreeMap;

use tracing::trace;

use crate::{Error, Result};

/// Decoded record: field name to value.
pub type Record = BTreeMap<String, FieldValue>;

/// Width and signedness of a field's on-disk value. All integers are
/// little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    /// Opaque byte string of the given length.
    Bytes(usize),
}

impl Primitive {
    /// Size in bytes.
    pub const fn size(self) -> usize {
        match self {
            Primitive::U8 | Primitive::I8 => 1,
            Primitive::U16 | Primitive::I16 => 2,
            Primitive::U32 | Primitive::I32 => 4,
            Primitive::Bytes(n) => n,
        }
    }

    /// Whether the primitive is an integer.
    pub const fn is_integer(self) -> bool {
        !matches!(self, Primitive::Bytes(_))
    }

    /// Read the primitive from the start of `b`, which must hold at least
    /// [`Primitive::size`] bytes.
    fn read(self, b: &[u8]) -> FieldValue {
        let int = match self {
            Primitive::U8 => b[0] as i64,
            Primitive::I8 => b[0] as i8 as i64,
            Primitive::U16 => u16::from_le_bytes([b[0], b[1]]) as i64,
            Primitive::I16 => i16::from_le_bytes([b[0], b[1]]) as i64,
            Primitive::U32 => u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64,
            Primitive::I32 => i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64,
            Primitive::Bytes(n) => return FieldValue::Bytes(b[..n].to_vec()),
        };
        FieldValue::Int(int)
    }
}

/// A decoded value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(untagged))]
pub enum FieldValue {
    /// No value (a zero or sentinel normalized away).
    Absent,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl FieldValue {
    /// The integer payload, if this is an [`FieldValue::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether this is [`FieldValue::Absent`].
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

/// How a field's raw value becomes its decoded value(s).
///
/// Scalar transforms never fail: anything they do not apply to passes
/// through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// Raw value unchanged.
    Identity,
    /// Table lookup; keys missing from the table pass through.
    Replace(BTreeMap<i64, FieldValue>),
    /// Divide by the factor, yielding a float (e.g. centimetres to metres
    /// with `Scale(100.0)`).
    Scale(f64),
    /// `true` exactly when the raw value equals the sentinel.
    BoolFlag(i64),
    /// Zero becomes [`FieldValue::Absent`].
    ZeroAsNone,
    /// Packed: split the primitive's bits into equal groups of this width,
    /// least significant group first. See [`split_field`].
    SplitBits(u32),
    /// Packed: split a signed value into `(positive part, magnitude of the
    /// negative part)`. See [`sign_split`].
    SignSplit,
}

impl Transform {
    /// Build a [`Transform::Replace`] from `(raw, value)` pairs.
    pub fn replace<I, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (i64, V)>,
        V: Into<FieldValue>,
    {
        Transform::Replace(pairs.into_iter().map(|(k, v)| (k, v.into())).collect())
    }

    /// Whether this transform turns one value into several.
    pub fn is_packing(&self) -> bool {
        matches!(self, Transform::SplitBits(_) | Transform::SignSplit)
    }

    /// Apply a scalar transform. Packing transforms return `raw` unchanged.
    pub fn apply(&self, raw: FieldValue) -> FieldValue {
        let Some(v) = raw.as_int() else {
            return raw;
        };
        match self {
            Transform::Replace(table) => table.get(&v).cloned().unwrap_or(raw),
            Transform::Scale(factor) => FieldValue::Float(v as f64 / factor),
            Transform::BoolFlag(sentinel) => FieldValue::Bool(v == *sentinel),
            Transform::ZeroAsNone if v == 0 => FieldValue::Absent,
            _ => raw,
        }
    }

    /// Apply a packing transform to an integer read as `primitive`.
    ///
    /// Scalar transforms yield the raw value alone.
    fn unpack(&self, raw: i64, primitive: Primitive) -> Vec<i64> {
        match self {
            Transform::SplitBits(width) => {
                let bits = primitive.size() as u32 * 8;
                split_field(raw as u64, bits, *width)
                    .into_iter()
                    .map(|v| v as i64)
                    .collect()
            }
            Transform::SignSplit => sign_split(raw).to_vec(),
            _ => vec![raw],
        }
    }

    /// Number of values a packing transform yields for `primitive`.
    fn arity(&self, primitive: Primitive) -> Option<usize> {
        match self {
            Transform::SplitBits(width) => {
                let bits = primitive.size() as u32 * 8;
                (*width > 0 && *width <= bits).then(|| (bits / width) as usize)
            }
            Transform::SignSplit => Some(2),
            _ => None,
        }
    }
}

/// Name(s) a field decodes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// Read and discarded; the field only documents the layout.
    Padding,
    /// A single named value.
    Name(String),
    /// One name per packed sub-value; `None` slots are dropped.
    Packed(Vec<Option<String>>),
}

/// One field of a [`RecordSchema`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub identifier: Identifier,
    /// Byte offset within the record.
    pub offset: usize,
    pub primitive: Primitive,
    pub transform: Transform,
}

impl FieldDescriptor {
    /// A named field with no transform.
    pub fn new(name: &str, offset: usize, primitive: Primitive) -> Self {
        Self {
            identifier: Identifier::Name(name.to_owned()),
            offset,
            primitive,
            transform: Transform::Identity,
        }
    }

    /// A padding field.
    pub fn padding(offset: usize, primitive: Primitive) -> Self {
        Self {
            identifier: Identifier::Padding,
            offset,
            primitive,
            transform: Transform::Identity,
        }
    }

    /// A packed field; `transform` must be a packing transform yielding at
    /// least as many values as there are `names`. Values past the last name
    /// are dropped.
    pub fn packed<'n, I>(
        names: I,
        offset: usize,
        primitive: Primitive,
        transform: Transform,
    ) -> Self
    where
        I: IntoIterator<Item = Option<&'n str>>,
    {
        Self {
            identifier: Identifier::Packed(
                names.into_iter().map(|n| n.map(str::to_owned)).collect(),
            ),
            offset,
            primitive,
            transform,
        }
    }

    /// Set the field's transform.
    pub fn with(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Whether the field decodes into several sub-values.
    pub fn is_packed(&self) -> bool {
        matches!(self.identifier, Identifier::Packed(_))
    }

    /// Offset one past the field's last byte.
    pub fn end(&self) -> usize {
        self.offset + self.primitive.size()
    }

    /// Empty names become padding, empty packed names become unnamed slots.
    fn normalize(&mut self) {
        if matches!(&self.identifier, Identifier::Name(name) if name.is_empty()) {
            self.identifier = Identifier::Padding;
        }
        if let Identifier::Packed(names) = &mut self.identifier {
            for slot in names.iter_mut().filter(|n| n.as_deref() == Some("")) {
                *slot = None;
            }
        }
    }

    fn validate(&self) -> Result<()> {
        match &self.identifier {
            Identifier::Packed(names) => {
                if !self.primitive.is_integer() {
                    return Err(Error::InvalidSchema("packed field must be an integer"));
                }
                let arity = self
                    .transform
                    .arity(self.primitive)
                    .ok_or(Error::InvalidSchema("packed field needs a packing transform"))?;
                if names.len() > arity {
                    return Err(Error::InvalidSchema("more packed names than transform values"));
                }
            }
            _ if self.transform.is_packing() => {
                return Err(Error::InvalidSchema("packing transform on an unpacked field"));
            }
            _ => {}
        }
        Ok(())
    }
}

/// Ordered, non-overlapping field layout of a fixed-size record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    size: usize,
    fields: Vec<FieldDescriptor>,
}

impl RecordSchema {
    /// Build a schema for records of exactly `size` bytes.
    ///
    /// Fields are sorted by offset and empty names are treated as padding.
    /// Overlapping fields, fields past `size` and mismatched packing
    /// transforms are rejected.
    pub fn new(size: usize, mut fields: Vec<FieldDescriptor>) -> Result<Self> {
        fields.sort_by_key(|f| f.offset);
        fields.iter_mut().for_each(FieldDescriptor::normalize);

        let mut cursor = 0;
        for field in &fields {
            if field.offset < cursor {
                return Err(Error::InvalidSchema("overlapping fields"));
            }
            field.validate()?;
            cursor = field.end();
        }
        if cursor > size {
            return Err(Error::InvalidSchema("field extends past record size"));
        }

        Ok(Self { size, fields })
    }

    /// Record size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Fields in offset order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Whether `raw` has the size this schema decodes.
    ///
    /// Use to drop records of unexpected size before decoding.
    pub fn matches(&self, raw: &[u8]) -> bool {
        raw.len() == self.size
    }

    /// Decode one record. Shorthand for [`decode`].
    pub fn decode(&self, raw: &[u8]) -> Result<Record> {
        decode(self, raw)
    }
}

/// Decode `raw` according to `schema`.
///
/// Fails with [`Error::SizeMismatch`] unless `raw` is exactly
/// [`RecordSchema::size`] bytes long.
pub fn decode(schema: &RecordSchema, raw: &[u8]) -> Result<Record> {
    if !schema.matches(raw) {
        return Err(Error::SizeMismatch {
            expected: schema.size,
            found: raw.len(),
        });
    }

    let mut record = Record::new();
    let mut cursor = 0;
    for field in &schema.fields {
        if field.offset > cursor {
            trace!(at = cursor, len = field.offset - cursor, "skipping padding");
        }
        let value = field.primitive.read(&raw[field.offset..field.end()]);
        cursor = field.end();

        match &field.identifier {
            Identifier::Padding => {}
            Identifier::Name(name) => {
                record.insert(name.clone(), field.transform.apply(value));
            }
            Identifier::Packed(names) => {
                let Some(bits) = value.as_int() else {
                    continue;
                };
                let parts = field.transform.unpack(bits, field.primitive);
                for (name, part) in names.iter().zip(parts) {
                    if let Some(name) = name {
                        record.insert(name.clone(), FieldValue::Int(part));
                    }
                }
            }
        }
    }
    Ok(record)
}

/// Split the low `bits` bits of `value` into groups of `width` bits, least
/// significant group first.
///
/// Returns `bits / width` values; a zero `width` yields nothing.
pub fn split_field(value: u64, bits: u32, width: u32) -> Vec<u64> {
    if width == 0 {
        return Vec::new();
    }
    let mask = if width >= 64 { u64::MAX } else { (1u64 << width) - 1 };
    (0..bits / width)
        .map(|i| (value >> (i * width)) & mask)
        .collect()
}

/// Split a signed value into `[positive part, magnitude of negative part]`.
///
/// `5` becomes `[5, 0]`, `-25` becomes `[0, 25]`.
pub fn sign_split(value: i64) -> [i64; 2] {
    if value > 0 { [value, 0] } else { [0, -value] }
}

/// Zero-based indices of the set bits among the first `count` bits of a
/// little-endian bit field (bit 0 is the lowest bit of byte 0).
///
/// Bits past the end of `bytes` count as clear. Machine numbers are
/// one-based: bit `k` of the TM field is TM `k + 1`.
pub fn bit_flags(bytes: &[u8], count: usize) -> Vec<usize> {
    (0..count)
        .filter(|&k| bytes.get(k / 8).is_some_and(|b| b & (1 << (k % 8)) != 0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_padding_between_and_after_fields() {
        let schema = RecordSchema::new(
            4,
            vec![
                FieldDescriptor::new("a", 0, Primitive::U8),
                FieldDescriptor::new("b", 2, Primitive::U8),
            ],
        )
        .unwrap();
        let record = decode(&schema, &[0x05, 0xFF, 0x00, 0x2A]).unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(record["a"], FieldValue::Int(5));
        assert_eq!(record["b"], FieldValue::Int(0));
    }

    #[test]
    fn splits_packed_field_low_bits_first() {
        assert_eq!(split_field(0x000B, 16, 2), vec![3, 2, 0, 0, 0, 0, 0, 0]);

        let schema = RecordSchema::new(
            2,
            vec![FieldDescriptor::packed(
                [Some("p0"), Some("p1"), Some("p2"), Some("p3"), None, None, None, None],
                0,
                Primitive::U16,
                Transform::SplitBits(2),
            )],
        )
        .unwrap();
        let record = schema.decode(&0x000Bu16.to_le_bytes()).unwrap();
        assert_eq!(record.len(), 4);
        assert_eq!(record["p0"], FieldValue::Int(3));
        assert_eq!(record["p1"], FieldValue::Int(2));
        assert_eq!(record["p2"], FieldValue::Int(0));
        assert_eq!(record["p3"], FieldValue::Int(0));
    }

    #[test]
    fn packed_names_shorter_than_split_drop_the_rest() {
        let schema = RecordSchema::new(
            2,
            vec![FieldDescriptor::packed(
                [Some("p0"), Some("p1"), Some("p2"), Some("p3")],
                0,
                Primitive::U16,
                Transform::SplitBits(2),
            )],
        )
        .unwrap();
        let record = schema.decode(&0x000Bu16.to_le_bytes()).unwrap();
        assert_eq!(record.len(), 4);
        assert_eq!(record["p0"], FieldValue::Int(3));
        assert_eq!(record["p1"], FieldValue::Int(2));
        assert_eq!(record["p2"], FieldValue::Int(0));
        assert_eq!(record["p3"], FieldValue::Int(0));
    }

    #[test]
    fn empty_names_are_discarded() {
        let schema = RecordSchema::new(
            2,
            vec![
                FieldDescriptor::new("", 0, Primitive::U8),
                FieldDescriptor::packed(
                    [Some("lo"), Some("")],
                    1,
                    Primitive::U8,
                    Transform::SplitBits(4),
                ),
            ],
        )
        .unwrap();
        assert_eq!(schema.fields()[0].identifier, Identifier::Padding);

        let record = schema.decode(&[1, 0x2A]).unwrap();
        assert_eq!(record.len(), 1);
        assert_eq!(record["lo"], FieldValue::Int(0xA));
        assert!(!record.contains_key(""));
    }

    #[test]
    fn split_of_signed_value_uses_bit_pattern() {
        let schema = RecordSchema::new(
            1,
            vec![FieldDescriptor::packed(
                [Some("lo"), Some("hi")],
                0,
                Primitive::I8,
                Transform::SplitBits(4),
            )],
        )
        .unwrap();
        let record = schema.decode(&[0xA5]).unwrap();
        assert_eq!(record["lo"], FieldValue::Int(5));
        assert_eq!(record["hi"], FieldValue::Int(0xA));
    }

    #[test]
    fn sign_split_separates_positive_and_negative() {
        assert_eq!(sign_split(33), [33, 0]);
        assert_eq!(sign_split(-50), [0, 50]);
        assert_eq!(sign_split(0), [0, 0]);

        let schema = RecordSchema::new(
            2,
            vec![
                FieldDescriptor::packed(
                    [Some("drain"), Some("recoil")],
                    0,
                    Primitive::I8,
                    Transform::SignSplit,
                ),
                FieldDescriptor::packed(
                    [Some("heal"), Some("damage")],
                    1,
                    Primitive::I8,
                    Transform::SignSplit,
                ),
            ],
        )
        .unwrap();
        let record = schema.decode(&[(-33i8) as u8, 25]).unwrap();
        assert_eq!(record["drain"], FieldValue::Int(0));
        assert_eq!(record["recoil"], FieldValue::Int(33));
        assert_eq!(record["heal"], FieldValue::Int(25));
        assert_eq!(record["damage"], FieldValue::Int(0));
    }

    #[test]
    fn scalar_transforms() {
        let labels = Transform::replace([(0, "Status"), (1, "Physical")]);
        assert_eq!(labels.apply(FieldValue::Int(1)), FieldValue::from("Physical"));
        assert_eq!(labels.apply(FieldValue::Int(7)), FieldValue::Int(7));

        let absent = Transform::replace([(101, FieldValue::Absent)]);
        assert!(absent.apply(FieldValue::Int(101)).is_absent());

        assert_eq!(Transform::Scale(10.0).apply(FieldValue::Int(69)), FieldValue::Float(6.9));
        assert_eq!(Transform::BoolFlag(1).apply(FieldValue::Int(1)), FieldValue::Bool(true));
        assert_eq!(Transform::BoolFlag(1).apply(FieldValue::Int(2)), FieldValue::Bool(false));
        assert!(Transform::ZeroAsNone.apply(FieldValue::Int(0)).is_absent());
        assert_eq!(Transform::ZeroAsNone.apply(FieldValue::Int(4)), FieldValue::Int(4));
        assert_eq!(
            Transform::Scale(2.0).apply(FieldValue::Bytes(vec![1])),
            FieldValue::Bytes(vec![1])
        );
    }

    #[test]
    fn signed_and_wide_primitives() {
        let schema = RecordSchema::new(
            8,
            vec![
                FieldDescriptor::new("prio", 0, Primitive::I8),
                FieldDescriptor::new("id", 2, Primitive::I16),
                FieldDescriptor::new("alt", 4, Primitive::U32),
            ],
        )
        .unwrap();
        let record = schema
            .decode(&[0xFF, 0, 0xFE, 0xFF, 0x78, 0x56, 0x34, 0x12])
            .unwrap();
        assert_eq!(record["prio"], FieldValue::Int(-1));
        assert_eq!(record["id"], FieldValue::Int(-2));
        assert_eq!(record["alt"], FieldValue::Int(0x12345678));
    }

    #[test]
    fn padding_fields_never_surface() {
        let schema = RecordSchema::new(
            6,
            vec![
                FieldDescriptor::padding(0, Primitive::Bytes(4)),
                FieldDescriptor::new("tail", 4, Primitive::U16),
            ],
        )
        .unwrap();
        let record = schema.decode(&[1, 2, 3, 4, 0x34, 0x12]).unwrap();
        assert_eq!(record.len(), 1);
        assert_eq!(record["tail"], FieldValue::Int(0x1234));
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let schema =
            RecordSchema::new(4, vec![FieldDescriptor::new("a", 0, Primitive::U8)]).unwrap();
        assert!(matches!(
            decode(&schema, &[1, 2, 3]),
            Err(Error::SizeMismatch { expected: 4, found: 3 })
        ));
        assert!(matches!(
            decode(&schema, &[1, 2, 3, 4, 5]),
            Err(Error::SizeMismatch { expected: 4, found: 5 })
        ));
    }

    #[test]
    fn fields_are_sorted_by_offset() {
        let schema = RecordSchema::new(
            2,
            vec![
                FieldDescriptor::new("second", 1, Primitive::U8),
                FieldDescriptor::new("first", 0, Primitive::U8),
            ],
        )
        .unwrap();
        assert_eq!(schema.fields()[0].offset, 0);
        let record = schema.decode(&[7, 9]).unwrap();
        assert_eq!(record["first"], FieldValue::Int(7));
        assert_eq!(record["second"], FieldValue::Int(9));
    }

    #[test]
    fn invalid_schemas_are_rejected() {
        let overlap = RecordSchema::new(
            4,
            vec![
                FieldDescriptor::new("a", 0, Primitive::U16),
                FieldDescriptor::new("b", 1, Primitive::U8),
            ],
        );
        assert!(matches!(overlap, Err(Error::InvalidSchema(_))));

        let too_long = RecordSchema::new(2, vec![FieldDescriptor::new("a", 1, Primitive::U16)]);
        assert!(matches!(too_long, Err(Error::InvalidSchema(_))));

        let too_many_names = RecordSchema::new(
            1,
            vec![FieldDescriptor::packed(
                [Some("a"), Some("b"), Some("c")],
                0,
                Primitive::U8,
                Transform::SplitBits(4),
            )],
        );
        assert!(matches!(too_many_names, Err(Error::InvalidSchema(_))));

        let zero_width = RecordSchema::new(
            1,
            vec![FieldDescriptor::packed(
                Vec::<Option<&str>>::new(),
                0,
                Primitive::U8,
                Transform::SplitBits(0),
            )],
        );
        assert!(matches!(zero_width, Err(Error::InvalidSchema(_))));

        let unpacked_split = RecordSchema::new(
            1,
            vec![FieldDescriptor::new("a", 0, Primitive::U8).with(Transform::SplitBits(4))],
        );
        assert!(matches!(unpacked_split, Err(Error::InvalidSchema(_))));
    }

    #[test]
    fn bit_flags_lists_set_bits() {
        assert_eq!(bit_flags(&[0b0000_0101, 0b1000_0000], 16), vec![0, 2, 15]);
        assert_eq!(bit_flags(&[0xFF], 3), vec![0, 1, 2]);
        assert_eq!(bit_flags(&[0x01], 20), vec![0]);
    }
}
