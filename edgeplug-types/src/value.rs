use std::string::FromUtf8Error;

use chrono::{Local, TimeZone, Utc};
use paste::paste;
use thiserror::Error;

use crate::payload::{metric, DataType};

/// A Sparkplug B datetime: milliseconds since the Unix epoch, UTC.
///
/// Naive [chrono::NaiveDateTime] values are interpreted as local time and
/// converted to UTC on the way in; aware values are normalized to UTC.
/// Conversion back always yields a UTC-aware datetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime {
    pub date_time: u64,
}

impl DateTime {
    pub fn new(date_time: u64) -> Self {
        Self { date_time }
    }

    pub fn now() -> Self {
        Self::new(crate::utils::timestamp())
    }

    #[allow(clippy::wrong_self_convention)]
    fn to_le_bytes(self) -> [u8; 8] {
        self.date_time.to_le_bytes()
    }

    fn from_le_bytes(bytes: [u8; 8]) -> Self {
        Self::new(u64::from_le_bytes(bytes))
    }
}

impl<Tz: TimeZone> From<chrono::DateTime<Tz>> for DateTime {
    fn from(value: chrono::DateTime<Tz>) -> Self {
        Self::new(value.timestamp_millis().max(0) as u64)
    }
}

impl From<chrono::NaiveDateTime> for DateTime {
    /// A naive datetime carries no timezone, so it is read as local wall-clock
    /// time. Ambiguous or nonexistent local times (DST folds) resolve to the
    /// earliest candidate, falling back to a UTC reading.
    fn from(value: chrono::NaiveDateTime) -> Self {
        match Local.from_local_datetime(&value).earliest() {
            Some(local) => local.into(),
            None => value.and_utc().into(),
        }
    }
}

impl From<DateTime> for chrono::DateTime<Utc> {
    fn from(value: DateTime) -> Self {
        chrono::DateTime::from_timestamp_millis(value.date_time as i64).unwrap_or_default()
    }
}

/* Scalar wire conversions.

   Sparkplug stores signed integers by reinterpreting the two's-complement bit
   pattern of the signed N-bit value as an unsigned N-bit value inside
   int_value (8/16/32-bit) or long_value (64-bit). Decoding checks the wire
   value fits N bits before reinterpreting back. */

fn i8_to_proto(val: i8) -> u32 {
    let b = val.to_le_bytes();
    u32::from_le_bytes([b[0], 0, 0, 0])
}
fn i16_to_proto(val: i16) -> u32 {
    let b = val.to_le_bytes();
    u32::from_le_bytes([b[0], b[1], 0, 0])
}
fn i32_to_proto(val: i32) -> u32 {
    u32::from_le_bytes(val.to_le_bytes())
}
fn i64_to_proto(val: i64) -> u64 {
    u64::from_le_bytes(val.to_le_bytes())
}

fn proto_to_u8(datatype: DataType, val: u32) -> Result<u8, FromValueError> {
    u8::try_from(val).map_err(|_| FromValueError::OutOfRange {
        datatype,
        value: val as u64,
    })
}
fn proto_to_u16(datatype: DataType, val: u32) -> Result<u16, FromValueError> {
    u16::try_from(val).map_err(|_| FromValueError::OutOfRange {
        datatype,
        value: val as u64,
    })
}
fn proto_to_i8(datatype: DataType, val: u32) -> Result<i8, FromValueError> {
    if val > u8::MAX as u32 {
        return Err(FromValueError::OutOfRange {
            datatype,
            value: val as u64,
        });
    }
    Ok(i8::from_le_bytes([val as u8]))
}
fn proto_to_i16(datatype: DataType, val: u32) -> Result<i16, FromValueError> {
    if val > u16::MAX as u32 {
        return Err(FromValueError::OutOfRange {
            datatype,
            value: val as u64,
        });
    }
    let bytes = val.to_le_bytes();
    Ok(i16::from_le_bytes([bytes[0], bytes[1]]))
}
fn proto_to_i32(val: u32) -> i32 {
    i32::from_le_bytes(val.to_le_bytes())
}
fn proto_to_i64(val: u64) -> i64 {
    i64::from_le_bytes(val.to_le_bytes())
}

/* Array wire conversions */

#[derive(Debug, Error, PartialEq)]
pub enum FromBytesError {
    #[error("Invalid format")]
    InvalidFormat,
    #[error("Invalid bytes size")]
    InvalidSize,
    #[error("StringArray string decoding error {0}")]
    BadStringElement(#[from] FromUtf8Error),
}

macro_rules! define_array_proto_conversions {
  ($ty:ty) => {
    paste! {
      fn [<$ty:lower _vec_to_proto>](vec: Vec<$ty>) -> Vec<u8> {
        let mut out = Vec::with_capacity(vec.len() * std::mem::size_of::<$ty>());
        vec.into_iter().for_each(|x| out.extend(x.to_le_bytes()));
        out
      }

      fn [<proto_to_$ty:lower _vec>](vec: Vec<u8>) -> Result<Vec<$ty>, FromBytesError> {
        let div = std::mem::size_of::<$ty>();
        let len = vec.len();
        if len % div != 0 { return Err(FromBytesError::InvalidFormat) }
        let mut out = Vec::with_capacity(len / div);
        vec.chunks_exact(div).for_each(|x| { out.push(<$ty>::from_le_bytes(x.try_into().unwrap())); });
        Ok(out)
      }
    }
  };
}

define_array_proto_conversions!(i8);
define_array_proto_conversions!(i16);
define_array_proto_conversions!(i32);
define_array_proto_conversions!(i64);
define_array_proto_conversions!(u16);
define_array_proto_conversions!(u32);
define_array_proto_conversions!(u64);
define_array_proto_conversions!(f32);
define_array_proto_conversions!(f64);
define_array_proto_conversions!(DateTime);

fn pack_byte_with_bools(bools: &[bool]) -> u8 {
    /* LSB-first: element i of the chunk lands in bit i */
    bools
        .iter()
        .enumerate()
        .fold(0u8, |acc, (i, b)| acc | ((*b as u8) << i))
}

fn bool_vec_to_proto(vec: Vec<bool>) -> Vec<u8> {
    /* BooleanArray is an array of bit-packed bytes preceded by a 4-byte
    little-endian integer holding the total number of boolean values */
    let count = vec.len() as u32;
    let bool_bytes_len = count.div_ceil(8) as usize;
    let mut out = Vec::<u8>::with_capacity(std::mem::size_of::<u32>() + bool_bytes_len);
    out.extend(count.to_le_bytes());
    let chunks = vec.chunks_exact(8);
    let remainder = chunks.remainder();
    chunks
        .into_iter()
        .for_each(|chunk| out.push(pack_byte_with_bools(chunk)));
    if !remainder.is_empty() {
        out.push(pack_byte_with_bools(remainder))
    }
    out
}

fn proto_to_bool_vec(bytes: Vec<u8>) -> Result<Vec<bool>, FromBytesError> {
    let len = bytes.len();
    if len < 4 {
        return Err(FromBytesError::InvalidSize);
    }
    let bool_count = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if bool_count == 0 {
        return Ok(Vec::new());
    }

    let needed_bytes = bool_count.div_ceil(8) as usize;
    if len - 4 < needed_bytes {
        return Err(FromBytesError::InvalidFormat);
    }

    let bools_data = &bytes.as_slice()[4..];
    let mut bools_out = Vec::with_capacity(bool_count as usize);
    for i in 0..bool_count as usize {
        bools_out.push(((bools_data[i / 8] >> (i % 8)) & 1) == 1);
    }
    Ok(bools_out)
}

fn string_vec_to_proto(vec: Vec<String>) -> Vec<u8> {
    /* StringArray is an array of null terminated strings */
    let buffer_len = vec.iter().fold(0usize, |len, string| len + string.len()) + vec.len();
    let mut out = Vec::with_capacity(buffer_len);
    vec.into_iter().for_each(|string| {
        out.extend(string.into_bytes());
        out.push(0x0);
    });
    out
}

fn proto_to_string_vec(vec: Vec<u8>) -> Result<Vec<String>, FromBytesError> {
    if let Some(last) = vec.last() {
        if *last != 0 {
            return Err(FromBytesError::InvalidFormat);
        }
    } else {
        return Ok(Vec::new());
    }

    let mut res = Vec::new();
    let mut split = vec.split(|x| *x == 0).peekable();
    while let Some(string_data) = split.next() {
        if split.peek().is_none() {
            break;
        }
        res.push(String::from_utf8(string_data.into())?)
    }
    Ok(res)
}

#[derive(Debug, Error, PartialEq)]
pub enum FromValueError {
    #[error("Bytes decoding error: {0}")]
    ArrayDecode(#[from] FromBytesError),
    #[error("Value variant does not match datatype {0:?}")]
    VariantMismatch(DataType),
    #[error("Value {value} out of range for {datatype:?}")]
    OutOfRange { datatype: DataType, value: u64 },
    #[error("StringArray element contains a NUL byte")]
    EmbeddedNul,
    #[error("Datatype {0:?} is not supported")]
    UnsupportedDataType(DataType),
}

/// The runtime value of a metric, tagged by its Sparkplug datatype.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
    DateTime(DateTime),
    Text(String),
    Uuid(String),
    Bytes(Vec<u8>),
    File(Vec<u8>),
    Int8Array(Vec<i8>),
    Int16Array(Vec<i16>),
    Int32Array(Vec<i32>),
    Int64Array(Vec<i64>),
    UInt8Array(Vec<u8>),
    UInt16Array(Vec<u16>),
    UInt32Array(Vec<u32>),
    UInt64Array(Vec<u64>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    BooleanArray(Vec<bool>),
    StringArray(Vec<String>),
    DateTimeArray(Vec<DateTime>),
}

impl MetricValue {
    /// The datatype this value is admissible for.
    pub fn datatype(&self) -> DataType {
        match self {
            MetricValue::Int8(_) => DataType::Int8,
            MetricValue::Int16(_) => DataType::Int16,
            MetricValue::Int32(_) => DataType::Int32,
            MetricValue::Int64(_) => DataType::Int64,
            MetricValue::UInt8(_) => DataType::UInt8,
            MetricValue::UInt16(_) => DataType::UInt16,
            MetricValue::UInt32(_) => DataType::UInt32,
            MetricValue::UInt64(_) => DataType::UInt64,
            MetricValue::Float(_) => DataType::Float,
            MetricValue::Double(_) => DataType::Double,
            MetricValue::Boolean(_) => DataType::Boolean,
            MetricValue::String(_) => DataType::String,
            MetricValue::DateTime(_) => DataType::DateTime,
            MetricValue::Text(_) => DataType::Text,
            MetricValue::Uuid(_) => DataType::Uuid,
            MetricValue::Bytes(_) => DataType::Bytes,
            MetricValue::File(_) => DataType::File,
            MetricValue::Int8Array(_) => DataType::Int8Array,
            MetricValue::Int16Array(_) => DataType::Int16Array,
            MetricValue::Int32Array(_) => DataType::Int32Array,
            MetricValue::Int64Array(_) => DataType::Int64Array,
            MetricValue::UInt8Array(_) => DataType::UInt8Array,
            MetricValue::UInt16Array(_) => DataType::UInt16Array,
            MetricValue::UInt32Array(_) => DataType::UInt32Array,
            MetricValue::UInt64Array(_) => DataType::UInt64Array,
            MetricValue::FloatArray(_) => DataType::FloatArray,
            MetricValue::DoubleArray(_) => DataType::DoubleArray,
            MetricValue::BooleanArray(_) => DataType::BooleanArray,
            MetricValue::StringArray(_) => DataType::StringArray,
            MetricValue::DateTimeArray(_) => DataType::DateTimeArray,
        }
    }

    /// Encode into the protobuf value slot for this datatype.
    pub fn into_proto(self) -> Result<metric::Value, FromValueError> {
        let value = match self {
            MetricValue::Int8(v) => metric::Value::IntValue(i8_to_proto(v)),
            MetricValue::Int16(v) => metric::Value::IntValue(i16_to_proto(v)),
            MetricValue::Int32(v) => metric::Value::IntValue(i32_to_proto(v)),
            MetricValue::Int64(v) => metric::Value::LongValue(i64_to_proto(v)),
            MetricValue::UInt8(v) => metric::Value::IntValue(v as u32),
            MetricValue::UInt16(v) => metric::Value::IntValue(v as u32),
            MetricValue::UInt32(v) => metric::Value::IntValue(v),
            MetricValue::UInt64(v) => metric::Value::LongValue(v),
            MetricValue::Float(v) => metric::Value::FloatValue(v),
            MetricValue::Double(v) => metric::Value::DoubleValue(v),
            MetricValue::Boolean(v) => metric::Value::BooleanValue(v),
            MetricValue::String(v) | MetricValue::Text(v) | MetricValue::Uuid(v) => {
                metric::Value::StringValue(v)
            }
            MetricValue::DateTime(v) => metric::Value::LongValue(v.date_time),
            MetricValue::Bytes(v) | MetricValue::File(v) => metric::Value::BytesValue(v),
            MetricValue::Int8Array(v) => metric::Value::BytesValue(i8_vec_to_proto(v)),
            MetricValue::Int16Array(v) => metric::Value::BytesValue(i16_vec_to_proto(v)),
            MetricValue::Int32Array(v) => metric::Value::BytesValue(i32_vec_to_proto(v)),
            MetricValue::Int64Array(v) => metric::Value::BytesValue(i64_vec_to_proto(v)),
            MetricValue::UInt8Array(v) => metric::Value::BytesValue(v),
            MetricValue::UInt16Array(v) => metric::Value::BytesValue(u16_vec_to_proto(v)),
            MetricValue::UInt32Array(v) => metric::Value::BytesValue(u32_vec_to_proto(v)),
            MetricValue::UInt64Array(v) => metric::Value::BytesValue(u64_vec_to_proto(v)),
            MetricValue::FloatArray(v) => metric::Value::BytesValue(f32_vec_to_proto(v)),
            MetricValue::DoubleArray(v) => metric::Value::BytesValue(f64_vec_to_proto(v)),
            MetricValue::BooleanArray(v) => metric::Value::BytesValue(bool_vec_to_proto(v)),
            MetricValue::StringArray(v) => {
                if v.iter().any(|s| s.as_bytes().contains(&0)) {
                    return Err(FromValueError::EmbeddedNul);
                }
                metric::Value::BytesValue(string_vec_to_proto(v))
            }
            MetricValue::DateTimeArray(v) => metric::Value::BytesValue(datetime_vec_to_proto(v)),
        };
        Ok(value)
    }

    /// Decode a protobuf value slot into the runtime value for `datatype`.
    pub fn from_proto(datatype: DataType, value: metric::Value) -> Result<Self, FromValueError> {
        use metric::Value;

        let mismatch = || FromValueError::VariantMismatch(datatype);
        let out = match (datatype, value) {
            (DataType::Int8, Value::IntValue(v)) => {
                MetricValue::Int8(proto_to_i8(datatype, v)?)
            }
            (DataType::Int16, Value::IntValue(v)) => {
                MetricValue::Int16(proto_to_i16(datatype, v)?)
            }
            (DataType::Int32, Value::IntValue(v)) => MetricValue::Int32(proto_to_i32(v)),
            (DataType::Int64, Value::LongValue(v)) => MetricValue::Int64(proto_to_i64(v)),
            (DataType::UInt8, Value::IntValue(v)) => {
                MetricValue::UInt8(proto_to_u8(datatype, v)?)
            }
            (DataType::UInt16, Value::IntValue(v)) => {
                MetricValue::UInt16(proto_to_u16(datatype, v)?)
            }
            (DataType::UInt32, Value::IntValue(v)) => MetricValue::UInt32(v),
            (DataType::UInt64, Value::LongValue(v)) => MetricValue::UInt64(v),
            (DataType::Float, Value::FloatValue(v)) => MetricValue::Float(v),
            (DataType::Double, Value::DoubleValue(v)) => MetricValue::Double(v),
            (DataType::Boolean, Value::BooleanValue(v)) => MetricValue::Boolean(v),
            (DataType::String, Value::StringValue(v)) => MetricValue::String(v),
            (DataType::DateTime, Value::LongValue(v)) => MetricValue::DateTime(DateTime::new(v)),
            (DataType::Text, Value::StringValue(v)) => MetricValue::Text(v),
            (DataType::Uuid, Value::StringValue(v)) => MetricValue::Uuid(v),
            (DataType::Bytes, Value::BytesValue(v)) => MetricValue::Bytes(v),
            (DataType::File, Value::BytesValue(v)) => MetricValue::File(v),
            (DataType::Int8Array, Value::BytesValue(v)) => {
                MetricValue::Int8Array(proto_to_i8_vec(v)?)
            }
            (DataType::Int16Array, Value::BytesValue(v)) => {
                MetricValue::Int16Array(proto_to_i16_vec(v)?)
            }
            (DataType::Int32Array, Value::BytesValue(v)) => {
                MetricValue::Int32Array(proto_to_i32_vec(v)?)
            }
            (DataType::Int64Array, Value::BytesValue(v)) => {
                MetricValue::Int64Array(proto_to_i64_vec(v)?)
            }
            (DataType::UInt8Array, Value::BytesValue(v)) => MetricValue::UInt8Array(v),
            (DataType::UInt16Array, Value::BytesValue(v)) => {
                MetricValue::UInt16Array(proto_to_u16_vec(v)?)
            }
            (DataType::UInt32Array, Value::BytesValue(v)) => {
                MetricValue::UInt32Array(proto_to_u32_vec(v)?)
            }
            (DataType::UInt64Array, Value::BytesValue(v)) => {
                MetricValue::UInt64Array(proto_to_u64_vec(v)?)
            }
            (DataType::FloatArray, Value::BytesValue(v)) => {
                MetricValue::FloatArray(proto_to_f32_vec(v)?)
            }
            (DataType::DoubleArray, Value::BytesValue(v)) => {
                MetricValue::DoubleArray(proto_to_f64_vec(v)?)
            }
            (DataType::BooleanArray, Value::BytesValue(v)) => {
                MetricValue::BooleanArray(proto_to_bool_vec(v)?)
            }
            (DataType::StringArray, Value::BytesValue(v)) => {
                MetricValue::StringArray(proto_to_string_vec(v)?)
            }
            (DataType::DateTimeArray, Value::BytesValue(v)) => {
                MetricValue::DateTimeArray(proto_to_datetime_vec(v)?)
            }
            (
                DataType::Unknown
                | DataType::DataSet
                | DataType::Template
                | DataType::PropertySet
                | DataType::PropertySetList,
                _,
            ) => return Err(FromValueError::UnsupportedDataType(datatype)),
            _ => return Err(mismatch()),
        };
        Ok(out)
    }
}

macro_rules! impl_from_for_metric_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for MetricValue {
                fn from(value: $ty) -> Self {
                    MetricValue::$variant(value)
                }
            }
        )*
    };
}

impl_from_for_metric_value!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    bool => Boolean,
    String => String,
    DateTime => DateTime,
    Vec<i8> => Int8Array,
    Vec<i16> => Int16Array,
    Vec<i32> => Int32Array,
    Vec<i64> => Int64Array,
    Vec<u16> => UInt16Array,
    Vec<u32> => UInt32Array,
    Vec<u64> => UInt64Array,
    Vec<f32> => FloatArray,
    Vec<f64> => DoubleArray,
    Vec<bool> => BooleanArray,
    Vec<String> => StringArray,
    Vec<DateTime> => DateTimeArray,
);

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        MetricValue::String(value.to_string())
    }
}

impl From<Vec<u8>> for MetricValue {
    fn from(value: Vec<u8>) -> Self {
        MetricValue::Bytes(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /*
      Test a value round-trips through its wire slot for the given datatype.
    */
    macro_rules! test_value_round_trip {
        ($datatype:expr, $metric_value:expr, $proto_variant:ident) => {
            let start = $metric_value;
            let proto = start.clone().into_proto().unwrap();
            assert!(matches!(proto, metric::Value::$proto_variant(_)));
            let back = MetricValue::from_proto($datatype, proto).unwrap();
            assert_eq!(start, back);
        };
    }

    macro_rules! test_numeric_min_max_round_trip {
        ($ty:ty, $datatype:expr, $variant:ident, $proto_variant:ident) => {
            test_value_round_trip!($datatype, MetricValue::$variant(<$ty>::MIN), $proto_variant);
            test_value_round_trip!($datatype, MetricValue::$variant(<$ty>::MAX), $proto_variant);
        };
    }

    mod scalars {
        use super::*;

        #[test]
        fn signed_integers() {
            test_numeric_min_max_round_trip!(i8, DataType::Int8, Int8, IntValue);
            test_numeric_min_max_round_trip!(i16, DataType::Int16, Int16, IntValue);
            test_numeric_min_max_round_trip!(i32, DataType::Int32, Int32, IntValue);
            test_numeric_min_max_round_trip!(i64, DataType::Int64, Int64, LongValue);
        }

        #[test]
        fn unsigned_integers() {
            test_numeric_min_max_round_trip!(u8, DataType::UInt8, UInt8, IntValue);
            test_numeric_min_max_round_trip!(u16, DataType::UInt16, UInt16, IntValue);
            test_numeric_min_max_round_trip!(u32, DataType::UInt32, UInt32, IntValue);
            test_numeric_min_max_round_trip!(u64, DataType::UInt64, UInt64, LongValue);
        }

        #[test]
        fn floats() {
            test_numeric_min_max_round_trip!(f32, DataType::Float, Float, FloatValue);
            test_numeric_min_max_round_trip!(f64, DataType::Double, Double, DoubleValue);
        }

        #[test]
        fn negative_integers_use_twos_complement_bit_pattern() {
            assert_eq!(
                MetricValue::Int8(-1).into_proto().unwrap(),
                metric::Value::IntValue(0xFF)
            );
            assert_eq!(
                MetricValue::Int16(-3).into_proto().unwrap(),
                metric::Value::IntValue(0xFFFD)
            );
            assert_eq!(
                MetricValue::Int32(-1).into_proto().unwrap(),
                metric::Value::IntValue(u32::MAX)
            );
            assert_eq!(
                MetricValue::Int64(-1).into_proto().unwrap(),
                metric::Value::LongValue(u64::MAX)
            );
        }

        #[test]
        fn bool_string_datetime() {
            test_value_round_trip!(DataType::Boolean, MetricValue::Boolean(true), BooleanValue);
            test_value_round_trip!(
                DataType::String,
                MetricValue::String("test".into()),
                StringValue
            );
            test_value_round_trip!(DataType::Text, MetricValue::Text("test".into()), StringValue);
            test_value_round_trip!(
                DataType::Uuid,
                MetricValue::Uuid("c9d9b832-5400-4bbd-96b3-ae66d29c0e9b".into()),
                StringValue
            );
            test_value_round_trip!(
                DataType::DateTime,
                MetricValue::DateTime(DateTime::new(1_700_000_000_000)),
                LongValue
            );
            test_value_round_trip!(
                DataType::Bytes,
                MetricValue::Bytes(vec![0x01, 0x02]),
                BytesValue
            );
        }

        #[test]
        fn out_of_range_wire_values_are_rejected() {
            assert!(matches!(
                MetricValue::from_proto(DataType::UInt8, metric::Value::IntValue(256)),
                Err(FromValueError::OutOfRange { .. })
            ));
            assert!(matches!(
                MetricValue::from_proto(DataType::UInt16, metric::Value::IntValue(65536)),
                Err(FromValueError::OutOfRange { .. })
            ));
            assert!(matches!(
                MetricValue::from_proto(DataType::Int8, metric::Value::IntValue(0x1FF)),
                Err(FromValueError::OutOfRange { .. })
            ));
            assert!(matches!(
                MetricValue::from_proto(DataType::Int16, metric::Value::IntValue(0x1FFFF)),
                Err(FromValueError::OutOfRange { .. })
            ));
        }

        #[test]
        fn variant_mismatch_is_rejected() {
            assert_eq!(
                MetricValue::from_proto(DataType::UInt8, metric::Value::LongValue(1)),
                Err(FromValueError::VariantMismatch(DataType::UInt8))
            );
            assert_eq!(
                MetricValue::from_proto(DataType::Boolean, metric::Value::IntValue(1)),
                Err(FromValueError::VariantMismatch(DataType::Boolean))
            );
        }

        #[test]
        fn unsupported_datatypes_are_rejected() {
            assert_eq!(
                MetricValue::from_proto(DataType::Template, metric::Value::BytesValue(vec![])),
                Err(FromValueError::UnsupportedDataType(DataType::Template))
            );
            assert_eq!(
                MetricValue::from_proto(DataType::DataSet, metric::Value::BytesValue(vec![])),
                Err(FromValueError::UnsupportedDataType(DataType::DataSet))
            );
        }
    }

    mod datetime {
        use super::*;
        use chrono::NaiveDate;

        #[test]
        fn aware_datetimes_normalize_to_utc() {
            let utc = chrono::DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
            assert_eq!(DateTime::from(utc).date_time, 1_700_000_000_000);
            let back: chrono::DateTime<Utc> = DateTime::new(1_700_000_000_000).into();
            assert_eq!(back, utc);
        }

        #[test]
        fn naive_datetimes_are_read_as_local_time() {
            let naive = NaiveDate::from_ymd_opt(2023, 11, 14)
                .unwrap()
                .and_hms_opt(22, 13, 20)
                .unwrap();
            let expected = match Local.from_local_datetime(&naive).earliest() {
                Some(local) => local.with_timezone(&Utc).timestamp_millis() as u64,
                None => naive.and_utc().timestamp_millis() as u64,
            };
            assert_eq!(DateTime::from(naive).date_time, expected);
        }
    }

    mod arrays {
        use super::*;

        fn bool_array_bytes(count: u32, packed: Vec<u8>) -> Vec<u8> {
            let mut vec = count.to_le_bytes().to_vec();
            vec.extend(packed);
            vec
        }

        #[test]
        fn bool_array_packs_lsb_first() {
            let start = vec![true];
            let bytes = bool_vec_to_proto(start.clone());
            assert_eq!(bytes, bool_array_bytes(1, vec![0b0000_0001]));
            assert_eq!(proto_to_bool_vec(bytes).unwrap(), start);

            let start = vec![true, false, true, true, false, false, false, false, true];
            let bytes = bool_vec_to_proto(start.clone());
            assert_eq!(
                bytes,
                vec![0x09, 0x00, 0x00, 0x00, 0x0D, 0x01],
            );
            assert_eq!(proto_to_bool_vec(bytes).unwrap(), start);
        }

        #[test]
        fn bool_array_invalid_buffers() {
            /* too short for the count prefix */
            assert!(proto_to_bool_vec(vec![0, 0, 0]).is_err());

            /* valid prefix but not enough packed bytes */
            for (count, total_len) in [(1u32, 4usize), (8, 4), (9, 5)] {
                let mut bytes = count.to_le_bytes().to_vec();
                bytes.resize(total_len, 0);
                assert!(proto_to_bool_vec(bytes).is_err());
            }
        }

        #[test]
        fn string_array_null_terminated() {
            let start = vec!["test".to_string()];
            let bytes = string_vec_to_proto(start.clone());
            assert_eq!(bytes, b"test\x00".to_vec());
            assert_eq!(proto_to_string_vec(bytes).unwrap(), start);

            let start = vec!["abc".to_string(), "".to_string(), "cba".to_string()];
            let bytes = string_vec_to_proto(start.clone());
            assert_eq!(bytes, b"abc\x00\x00cba\x00".to_vec());
            assert_eq!(proto_to_string_vec(bytes).unwrap(), start);
        }

        #[test]
        fn string_array_invalid_buffers() {
            /* non terminated string */
            assert!(proto_to_string_vec(vec![0x1]).is_err());
            /* invalid utf8 string */
            assert!(proto_to_string_vec(b"Hello \xF0\x90\x80World\x00".to_vec()).is_err());
        }

        #[test]
        fn string_array_element_with_nul_is_rejected_on_encode() {
            let value = MetricValue::StringArray(vec!["a\0b".to_string()]);
            assert_eq!(value.into_proto(), Err(FromValueError::EmbeddedNul));
        }

        #[test]
        fn numeric_array_invalid_sizes() {
            let data = vec![0x00_u8, 0x01, 0x02, 0x03, 0x04];
            assert!(proto_to_u16_vec(data.clone()).is_err());
            assert!(proto_to_u32_vec(data.clone()).is_err());
            assert!(proto_to_u64_vec(data).is_err());
        }

        macro_rules! test_numeric_vec_round_trip {
            ($($t:ty), *) => {
                paste! {
                    $(
                        let vec = vec![0 as $t, <$t>::MIN, <$t>::MAX];
                        assert_eq!(vec, [<proto_to_$t:lower _vec>]([<$t:lower _vec_to_proto>](vec.clone())).unwrap());
                    )*
                }
            };
        }

        #[test]
        fn numeric_arrays_round_trip() {
            test_numeric_vec_round_trip!(u16, u32, u64, i8, i16, i32, i64, f32, f64);
            let vec = vec![
                DateTime::new(0),
                DateTime::new(u64::MIN),
                DateTime::new(u64::MAX),
            ];
            assert_eq!(
                vec,
                proto_to_datetime_vec(datetime_vec_to_proto(vec.clone())).unwrap()
            );
        }

        #[test]
        fn typed_array_values_round_trip() {
            test_value_round_trip!(
                DataType::BooleanArray,
                MetricValue::BooleanArray(vec![false, true, true, false, true]),
                BytesValue
            );
            test_value_round_trip!(
                DataType::Int16Array,
                MetricValue::Int16Array(vec![-3, 0, 12]),
                BytesValue
            );
            test_value_round_trip!(
                DataType::StringArray,
                MetricValue::StringArray(vec!["abc".into(), "123".into()]),
                BytesValue
            );
            test_value_round_trip!(
                DataType::DateTimeArray,
                MetricValue::DateTimeArray(vec![DateTime::new(1), DateTime::new(42)]),
                BytesValue
            );
            test_value_round_trip!(
                DataType::UInt8Array,
                MetricValue::UInt8Array(vec![0, 127, 255]),
                BytesValue
            );
        }
    }
}
