//! The typed value: a tagged union of numeric kinds, fixed-width character
//! strings, and composite references, carrying its own dimensionality and
//! per-dimension extent.
//!
//! Grounded on `original_source/Source/Core/BareMetal/L0Types/BitSet.cpp`
//! and `Vector.h`: element storage is a flat buffer with a fixed element
//! stride, not nested per-element containers, so that a copy descriptor
//! over a `TypedValue`'s storage is a single contiguous byte range.

use std::fmt;

use crate::error::{ModelError, Result};

/// Declared element kind of a typed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 16-bit integer.
    I16,
    /// Unsigned 16-bit integer.
    U16,
    /// Signed 32-bit integer.
    I32,
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 64-bit integer.
    I64,
    /// Unsigned 64-bit integer.
    U64,
    /// IEEE single precision.
    F32,
    /// IEEE double precision.
    F64,
    /// Fixed-width character string, width in bytes.
    Char(u16),
    /// A reference to another composite, stored as an opaque 64-bit handle.
    Reference,
}

impl ElementType {
    /// Byte size of a single element of this type.
    pub fn byte_size(&self) -> usize {
        match self {
            ElementType::I8 | ElementType::U8 => 1,
            ElementType::I16 | ElementType::U16 => 2,
            ElementType::I32 | ElementType::U32 | ElementType::F32 => 4,
            ElementType::I64 | ElementType::U64 | ElementType::F64 | ElementType::Reference => 8,
            ElementType::Char(width) => *width as usize,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::I8 => write!(f, "int8"),
            ElementType::U8 => write!(f, "uint8"),
            ElementType::I16 => write!(f, "int16"),
            ElementType::U16 => write!(f, "uint16"),
            ElementType::I32 => write!(f, "int32"),
            ElementType::U32 => write!(f, "uint32"),
            ElementType::I64 => write!(f, "int64"),
            ElementType::U64 => write!(f, "uint64"),
            ElementType::F32 => write!(f, "float32"),
            ElementType::F64 => write!(f, "float64"),
            ElementType::Char(width) => write!(f, "char[{width}]"),
            ElementType::Reference => write!(f, "reference"),
        }
    }
}

/// The number of dimensions carried by a typed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimensionality {
    /// A single element.
    Scalar,
    /// A one-dimensional array.
    Vector,
    /// A two-dimensional array, stored row-major.
    Matrix,
}

impl Dimensionality {
    /// The numeric tag used on the wire / in configuration (`0|1|2`).
    pub fn as_u8(&self) -> u8 {
        match self {
            Dimensionality::Scalar => 0,
            Dimensionality::Vector => 1,
            Dimensionality::Matrix => 2,
        }
    }
}

/// Byte order used when serializing to/from a raw buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    /// Little-endian.
    Little,
    /// Big-endian.
    Big,
}

/// A single scalar element.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Signed 8-bit integer.
    I8(i8),
    /// Unsigned 8-bit integer.
    U8(u8),
    /// Signed 16-bit integer.
    I16(i16),
    /// Unsigned 16-bit integer.
    U16(u16),
    /// Signed 32-bit integer.
    I32(i32),
    /// Unsigned 32-bit integer.
    U32(u32),
    /// Signed 64-bit integer.
    I64(i64),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// IEEE single precision.
    F32(f32),
    /// IEEE double precision.
    F64(f64),
    /// Fixed-width character string, raw bytes (unpadded length may be
    /// shorter than the declared width; padding is applied on encode).
    Char(Vec<u8>),
    /// Opaque handle to another composite.
    Reference(u64),
}

impl Scalar {
    fn element_type(&self) -> ElementType {
        match self {
            Scalar::I8(_) => ElementType::I8,
            Scalar::U8(_) => ElementType::U8,
            Scalar::I16(_) => ElementType::I16,
            Scalar::U16(_) => ElementType::U16,
            Scalar::I32(_) => ElementType::I32,
            Scalar::U32(_) => ElementType::U32,
            Scalar::I64(_) => ElementType::I64,
            Scalar::U64(_) => ElementType::U64,
            Scalar::F32(_) => ElementType::F32,
            Scalar::F64(_) => ElementType::F64,
            Scalar::Char(bytes) => ElementType::Char(bytes.len() as u16),
            Scalar::Reference(_) => ElementType::Reference,
        }
    }

    fn to_bytes(&self, endianness: Endianness, declared: ElementType) -> Vec<u8> {
        macro_rules! enc {
            ($v:expr) => {
                match endianness {
                    Endianness::Little => $v.to_le_bytes().to_vec(),
                    Endianness::Big => $v.to_be_bytes().to_vec(),
                }
            };
        }
        match self {
            Scalar::I8(v) => enc!(v),
            Scalar::U8(v) => enc!(v),
            Scalar::I16(v) => enc!(v),
            Scalar::U16(v) => enc!(v),
            Scalar::I32(v) => enc!(v),
            Scalar::U32(v) => enc!(v),
            Scalar::I64(v) => enc!(v),
            Scalar::U64(v) => enc!(v),
            Scalar::F32(v) => enc!(v),
            Scalar::F64(v) => enc!(v),
            Scalar::Reference(v) => enc!(v),
            Scalar::Char(bytes) => {
                let width = declared.byte_size();
                let mut out = vec![0u8; width];
                let n = bytes.len().min(width);
                out[..n].copy_from_slice(&bytes[..n]);
                out
            }
        }
    }

    fn from_bytes(element_type: ElementType, endianness: Endianness, bytes: &[u8]) -> Result<Self> {
        macro_rules! dec {
            ($ty:ty, $variant:ident) => {{
                let arr: [u8; std::mem::size_of::<$ty>()] = bytes
                    .try_into()
                    .map_err(|_| ModelError::BadByteLength {
                        expected: std::mem::size_of::<$ty>(),
                        actual: bytes.len(),
                    })?;
                let v = match endianness {
                    Endianness::Little => <$ty>::from_le_bytes(arr),
                    Endianness::Big => <$ty>::from_be_bytes(arr),
                };
                Ok(Scalar::$variant(v))
            }};
        }
        match element_type {
            ElementType::I8 => dec!(i8, I8),
            ElementType::U8 => dec!(u8, U8),
            ElementType::I16 => dec!(i16, I16),
            ElementType::U16 => dec!(u16, U16),
            ElementType::I32 => dec!(i32, I32),
            ElementType::U32 => dec!(u32, U32),
            ElementType::I64 => dec!(i64, I64),
            ElementType::U64 => dec!(u64, U64),
            ElementType::F32 => dec!(f32, F32),
            ElementType::F64 => dec!(f64, F64),
            ElementType::Reference => dec!(u64, Reference),
            ElementType::Char(width) => {
                if bytes.len() != width as usize {
                    return Err(ModelError::BadByteLength { expected: width as usize, actual: bytes.len() });
                }
                Ok(Scalar::Char(bytes.to_vec()))
            }
        }
    }

    /// Losslessly convert this scalar to `target`, failing rather than
    /// truncating when the value does not fit.
    fn try_convert(&self, target: ElementType) -> Result<Scalar> {
        if self.element_type() == target {
            return Ok(self.clone());
        }
        let mismatch = || ModelError::TypeMismatch {
            from: self.element_type().to_string(),
            to: target.to_string(),
        };
        // Integer-to-integer: always attempt via i128 and check round-trip.
        let as_i128: Option<i128> = match self {
            Scalar::I8(v) => Some(*v as i128),
            Scalar::U8(v) => Some(*v as i128),
            Scalar::I16(v) => Some(*v as i128),
            Scalar::U16(v) => Some(*v as i128),
            Scalar::I32(v) => Some(*v as i128),
            Scalar::U32(v) => Some(*v as i128),
            Scalar::I64(v) => Some(*v as i128),
            Scalar::U64(v) => Some(*v as i128),
            _ => None,
        };
        if let Some(v) = as_i128 {
            return match target {
                ElementType::I8 => i8::try_from(v).map(Scalar::I8).map_err(|_| ModelError::NumericOverflow),
                ElementType::U8 => u8::try_from(v).map(Scalar::U8).map_err(|_| ModelError::NumericOverflow),
                ElementType::I16 => i16::try_from(v).map(Scalar::I16).map_err(|_| ModelError::NumericOverflow),
                ElementType::U16 => u16::try_from(v).map(Scalar::U16).map_err(|_| ModelError::NumericOverflow),
                ElementType::I32 => i32::try_from(v).map(Scalar::I32).map_err(|_| ModelError::NumericOverflow),
                ElementType::U32 => u32::try_from(v).map(Scalar::U32).map_err(|_| ModelError::NumericOverflow),
                ElementType::I64 => i64::try_from(v).map(Scalar::I64).map_err(|_| ModelError::NumericOverflow),
                ElementType::U64 => u64::try_from(v).map(Scalar::U64).map_err(|_| ModelError::NumericOverflow),
                _ => Err(mismatch()),
            };
        }
        match (self, target) {
            // Widening float conversion is always lossless.
            (Scalar::F32(v), ElementType::F64) => Ok(Scalar::F64(*v as f64)),
            // Narrowing float conversion only if it round-trips exactly.
            (Scalar::F64(v), ElementType::F32) => {
                let narrowed = *v as f32;
                if (narrowed as f64) == *v {
                    Ok(Scalar::F32(narrowed))
                } else {
                    Err(ModelError::NumericOverflow)
                }
            }
            (Scalar::Char(bytes), ElementType::Char(width)) => {
                if bytes.iter().skip(width as usize).any(|b| *b != 0) {
                    Err(ModelError::NumericOverflow)
                } else {
                    let mut out = bytes.clone();
                    out.resize(width as usize, 0);
                    Ok(Scalar::Char(out))
                }
            }
            _ => Err(mismatch()),
        }
    }

    fn to_text(&self) -> String {
        match self {
            Scalar::I8(v) => v.to_string(),
            Scalar::U8(v) => v.to_string(),
            Scalar::I16(v) => v.to_string(),
            Scalar::U16(v) => v.to_string(),
            Scalar::I32(v) => v.to_string(),
            Scalar::U32(v) => v.to_string(),
            Scalar::I64(v) => v.to_string(),
            Scalar::U64(v) => v.to_string(),
            Scalar::F32(v) => v.to_string(),
            Scalar::F64(v) => v.to_string(),
            Scalar::Char(bytes) => String::from_utf8_lossy(bytes).to_string(),
            Scalar::Reference(v) => v.to_string(),
        }
    }

    fn from_text(element_type: ElementType, text: &str) -> Result<Scalar> {
        let bad = || ModelError::BadLiteral { text: text.to_string(), element_type: element_type.to_string() };
        Ok(match element_type {
            ElementType::I8 => Scalar::I8(text.parse().map_err(|_| bad())?),
            ElementType::U8 => Scalar::U8(text.parse().map_err(|_| bad())?),
            ElementType::I16 => Scalar::I16(text.parse().map_err(|_| bad())?),
            ElementType::U16 => Scalar::U16(text.parse().map_err(|_| bad())?),
            ElementType::I32 => Scalar::I32(text.parse().map_err(|_| bad())?),
            ElementType::U32 => Scalar::U32(text.parse().map_err(|_| bad())?),
            ElementType::I64 => Scalar::I64(text.parse().map_err(|_| bad())?),
            ElementType::U64 => Scalar::U64(text.parse().map_err(|_| bad())?),
            ElementType::F32 => Scalar::F32(text.parse().map_err(|_| bad())?),
            ElementType::F64 => Scalar::F64(text.parse().map_err(|_| bad())?),
            ElementType::Reference => Scalar::Reference(text.parse().map_err(|_| bad())?),
            ElementType::Char(_) => Scalar::Char(text.as_bytes().to_vec()),
        })
    }
}

/// A fully-typed, dimensioned value: the unit the configuration tree and
/// the broker copy descriptors operate on.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    element_type: ElementType,
    dimensionality: Dimensionality,
    extents: Vec<usize>,
    elements: Vec<Scalar>,
}

impl TypedValue {
    /// Construct a scalar value.
    pub fn scalar(element_type: ElementType, value: Scalar) -> Self {
        Self { element_type, dimensionality: Dimensionality::Scalar, extents: Vec::new(), elements: vec![value] }
    }

    /// Construct a vector value from elements in order.
    pub fn vector(element_type: ElementType, elements: Vec<Scalar>) -> Self {
        let len = elements.len();
        Self { element_type, dimensionality: Dimensionality::Vector, extents: vec![len], elements }
    }

    /// Construct a row-major matrix value.
    pub fn matrix(element_type: ElementType, rows: usize, cols: usize, elements: Vec<Scalar>) -> Result<Self> {
        if elements.len() != rows * cols {
            return Err(ModelError::DimensionMismatch { expected: rows * cols, actual: elements.len() });
        }
        Ok(Self { element_type, dimensionality: Dimensionality::Matrix, extents: vec![rows, cols], elements })
    }

    /// Declared element type.
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Declared dimensionality.
    pub fn dimensionality(&self) -> Dimensionality {
        self.dimensionality
    }

    /// Per-dimension extent (empty for scalars).
    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    /// Total element count.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Read-only view of the elements, in storage order.
    pub fn elements(&self) -> &[Scalar] {
        &self.elements
    }

    /// Total byte size this value occupies when serialized.
    pub fn byte_len(&self) -> usize {
        self.element_count() * self.element_type.byte_size()
    }

    /// Serialize to a flat byte buffer at the declared endianness.
    pub fn to_bytes(&self, endianness: Endianness) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_len());
        for element in &self.elements {
            out.extend(element.to_bytes(endianness, self.element_type));
        }
        out
    }

    /// Deserialize from a flat byte buffer with the declared shape.
    pub fn from_bytes(
        element_type: ElementType,
        dimensionality: Dimensionality,
        extents: Vec<usize>,
        endianness: Endianness,
        bytes: &[u8],
    ) -> Result<Self> {
        let stride = element_type.byte_size();
        let count: usize = if extents.is_empty() { 1 } else { extents.iter().product() };
        let expected = count * stride;
        if bytes.len() != expected {
            return Err(ModelError::BadByteLength { expected, actual: bytes.len() });
        }
        let mut elements = Vec::with_capacity(count);
        for chunk in bytes.chunks_exact(stride) {
            elements.push(Scalar::from_bytes(element_type, endianness, chunk)?);
        }
        Ok(Self { element_type, dimensionality, extents, elements })
    }

    /// Losslessly convert every element to `target`. Fails if any element
    /// does not fit.
    pub fn try_convert(&self, target: ElementType) -> Result<TypedValue> {
        let elements =
            self.elements.iter().map(|e| e.try_convert(target)).collect::<Result<Vec<_>>>()?;
        Ok(TypedValue {
            element_type: target,
            dimensionality: self.dimensionality,
            extents: self.extents.clone(),
            elements,
        })
    }

    /// Render as textual literals, comma-separated for non-scalars.
    pub fn to_text(&self) -> String {
        self.elements.iter().map(Scalar::to_text).collect::<Vec<_>>().join(",")
    }

    /// Parse a scalar literal of the given type.
    pub fn from_text_scalar(element_type: ElementType, text: &str) -> Result<TypedValue> {
        Ok(TypedValue::scalar(element_type, Scalar::from_text(element_type, text)?))
    }

    /// Parse a vector of comma-separated literals of the given type.
    pub fn from_text_vector(element_type: ElementType, text: &str) -> Result<TypedValue> {
        let elements = text
            .split(',')
            .map(|s| Scalar::from_text(element_type, s.trim()))
            .collect::<Result<Vec<_>>>()?;
        Ok(TypedValue::vector(element_type, elements))
    }

    /// Extract a contiguous element-index subrange `[lo, hi]` inclusive as
    /// a new vector-shaped value.
    pub fn slice_elements(&self, lo: usize, hi: usize) -> Result<TypedValue> {
        if hi >= self.elements.len() {
            return Err(ModelError::DimensionMismatch { expected: self.elements.len(), actual: hi + 1 });
        }
        let elements = self.elements[lo..=hi].to_vec();
        Ok(TypedValue::vector(self.element_type, elements))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_round_trip_is_lossless() {
        let v = TypedValue::scalar(ElementType::I32, Scalar::I32(-12345));
        let bytes = v.to_bytes(Endianness::Little);
        let back = TypedValue::from_bytes(ElementType::I32, Dimensionality::Scalar, vec![], Endianness::Little, &bytes).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn endianness_round_trip_both_orders() {
        let v = TypedValue::scalar(ElementType::U32, Scalar::U32(0xDEADBEEF));
        for endianness in [Endianness::Little, Endianness::Big] {
            let bytes = v.to_bytes(endianness);
            let back =
                TypedValue::from_bytes(ElementType::U32, Dimensionality::Scalar, vec![], endianness, &bytes).unwrap();
            assert_eq!(v, back);
        }
    }

    #[test]
    fn widening_conversion_succeeds() {
        let v = TypedValue::scalar(ElementType::U8, Scalar::U8(200));
        let converted = v.try_convert(ElementType::U32).unwrap();
        assert_eq!(converted.elements()[0], Scalar::U32(200));
    }

    #[test]
    fn narrowing_out_of_range_conversion_fails_rather_than_truncates() {
        let v = TypedValue::scalar(ElementType::I32, Scalar::I32(1000));
        let err = v.try_convert(ElementType::I8).unwrap_err();
        assert_eq!(err, ModelError::NumericOverflow);
    }

    #[test]
    fn narrowing_in_range_conversion_succeeds() {
        let v = TypedValue::scalar(ElementType::I32, Scalar::I32(100));
        let converted = v.try_convert(ElementType::I8).unwrap();
        assert_eq!(converted.elements()[0], Scalar::I8(100));
    }

    #[test]
    fn text_round_trip_for_vector() {
        let v = TypedValue::from_text_vector(ElementType::U32, "10, 11, 12").unwrap();
        assert_eq!(v.element_count(), 3);
        assert_eq!(v.to_text(), "10,11,12");
    }

    #[test]
    fn slice_elements_extracts_contiguous_range() {
        let v = TypedValue::vector(
            ElementType::U32,
            (10u32..20).map(Scalar::U32).collect(),
        );
        let sliced = v.slice_elements(2, 5).unwrap();
        assert_eq!(sliced.to_text(), "12,13,14,15");
    }
}
