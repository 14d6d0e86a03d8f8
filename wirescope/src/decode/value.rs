//! Typed metric values and their static descriptors

use serde::Deserialize;
use std::fmt;

use crate::cursor::ByteCursor;
use crate::domain::DecodeError;

/// Declared numeric type of a metric key or value buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    /// Used by the kernel side only; never exported
    Internal,
}

impl MetricType {
    /// Width in bytes the buffer must provide
    #[must_use]
    pub fn width(self) -> usize {
        match self {
            MetricType::Internal => 0,
            MetricType::U8 | MetricType::I8 => 1,
            MetricType::U16 | MetricType::I16 => 2,
            MetricType::U32 | MetricType::I32 | MetricType::F32 => 4,
            MetricType::U64 | MetricType::I64 | MetricType::F64 => 8,
        }
    }

    /// Decode the leading `width()` bytes of `buf`
    ///
    /// # Errors
    /// Returns [`DecodeError::Truncated`] if `buf` is shorter than the type's width.
    pub fn decode(self, buf: &[u8]) -> Result<MetricValue, DecodeError> {
        let mut cursor = ByteCursor::new(buf);
        Ok(match self {
            MetricType::U8 => MetricValue::U8(cursor.read_u8()?),
            MetricType::U16 => MetricValue::U16(cursor.read_u16()?),
            MetricType::U32 => MetricValue::U32(cursor.read_u32()?),
            MetricType::U64 => MetricValue::U64(cursor.read_u64()?),
            MetricType::I8 => MetricValue::I8(cursor.read_i8()?),
            MetricType::I16 => MetricValue::I16(cursor.read_i16()?),
            MetricType::I32 => MetricValue::I32(cursor.read_i32()?),
            MetricType::I64 => MetricValue::I64(cursor.read_i64()?),
            MetricType::F32 => MetricValue::F32(cursor.read_f32()?),
            MetricType::F64 => MetricValue::F64(cursor.read_f64()?),
            MetricType::Internal => MetricValue::Internal,
        })
    }
}

/// A decoded metric key or value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Internal,
}

impl MetricValue {
    /// Signed 64-bit view for sinks that only accept INT64
    ///
    /// `u64` values above `i64::MAX` wrap, floats truncate toward zero, and
    /// `Internal` is 0.
    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    pub fn as_i64(self) -> i64 {
        match self {
            MetricValue::U8(v) => i64::from(v),
            MetricValue::U16(v) => i64::from(v),
            MetricValue::U32(v) => i64::from(v),
            MetricValue::U64(v) => v as i64,
            MetricValue::I8(v) => i64::from(v),
            MetricValue::I16(v) => i64::from(v),
            MetricValue::I32(v) => i64::from(v),
            MetricValue::I64(v) => v,
            MetricValue::F32(v) => v as i64,
            MetricValue::F64(v) => v as i64,
            MetricValue::Internal => 0,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::U8(v) => write!(f, "{v}"),
            MetricValue::U16(v) => write!(f, "{v}"),
            MetricValue::U32(v) => write!(f, "{v}"),
            MetricValue::U64(v) => write!(f, "{v}"),
            MetricValue::I8(v) => write!(f, "{v}"),
            MetricValue::I16(v) => write!(f, "{v}"),
            MetricValue::I32(v) => write!(f, "{v}"),
            MetricValue::I64(v) => write!(f, "{v}"),
            MetricValue::F32(v) => write!(f, "{v:.6}"),
            MetricValue::F64(v) => write!(f, "{v:.6}"),
            MetricValue::Internal => Ok(()),
        }
    }
}

/// How a downstream time-series system should interpret the value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Gauge,
    Cumulative,
    Distribution,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataUnit {
    Bits,
    Bytes,
    Kilobytes,
    Megabytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
}

/// Unit attached to a metric's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricUnit {
    #[default]
    None,
    Data(DataUnit),
    Time(TimeUnit),
}

impl MetricUnit {
    /// Suffix appended after the value in exported metric lines
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            MetricUnit::None => "",
            MetricUnit::Data(DataUnit::Bits) => "b",
            MetricUnit::Data(DataUnit::Bytes) => "By",
            MetricUnit::Data(DataUnit::Kilobytes) => "kBy",
            MetricUnit::Data(DataUnit::Megabytes) => "MBy",
            MetricUnit::Time(TimeUnit::Nanoseconds) => "ns",
            MetricUnit::Time(TimeUnit::Microseconds) => "us",
            MetricUnit::Time(TimeUnit::Milliseconds) => "ms",
            MetricUnit::Time(TimeUnit::Seconds) => "s",
        }
    }
}

/// Static descriptor registered once per metric name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MetricDesc {
    pub key_type: MetricType,
    pub value_type: MetricType,
    pub kind: MetricKind,
    #[serde(default)]
    pub unit: MetricUnit,
}

impl MetricDesc {
    #[must_use]
    pub fn new(key_type: MetricType, value_type: MetricType, kind: MetricKind, unit: MetricUnit) -> Self {
        Self { key_type, value_type, kind, unit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsigned_boundaries() {
        assert_eq!(MetricType::U8.decode(&[u8::MAX]).unwrap().to_string(), "255");
        let buf = u16::MAX.to_ne_bytes();
        assert_eq!(MetricType::U16.decode(&buf).unwrap(), MetricValue::U16(u16::MAX));
        let buf = u32::MAX.to_ne_bytes();
        assert_eq!(MetricType::U32.decode(&buf).unwrap().to_string(), "4294967295");
        let buf = u64::MAX.to_ne_bytes();
        assert_eq!(MetricType::U64.decode(&buf).unwrap().to_string(), "18446744073709551615");
    }

    #[test]
    fn test_signed_boundaries() {
        let buf = i8::MIN.to_ne_bytes();
        assert_eq!(MetricType::I8.decode(&buf).unwrap().as_i64(), -128);
        let buf = i16::MIN.to_ne_bytes();
        assert_eq!(MetricType::I16.decode(&buf).unwrap().to_string(), "-32768");
        let buf = i32::MIN.to_ne_bytes();
        assert_eq!(MetricType::I32.decode(&buf).unwrap().as_i64(), i64::from(i32::MIN));
        let buf = i64::MAX.to_ne_bytes();
        assert_eq!(MetricType::I64.decode(&buf).unwrap().as_i64(), i64::MAX);
        let buf = i64::MIN.to_ne_bytes();
        assert_eq!(MetricType::I64.decode(&buf).unwrap().to_string(), i64::MIN.to_string());
    }

    #[test]
    fn test_floats() {
        let buf = 1.5f32.to_ne_bytes();
        assert_eq!(MetricType::F32.decode(&buf).unwrap().to_string(), "1.500000");
        let buf = (-2.25f64).to_ne_bytes();
        let value = MetricType::F64.decode(&buf).unwrap();
        assert_eq!(value.to_string(), "-2.250000");
        assert_eq!(value.as_i64(), -2);
    }

    #[test]
    fn test_wider_buffer_uses_leading_bytes() {
        // Metric maps store every value in a u64 slot
        let buf = 513u64.to_ne_bytes();
        let expected = u16::from_ne_bytes([buf[0], buf[1]]);
        assert_eq!(MetricType::U16.decode(&buf).unwrap(), MetricValue::U16(expected));
    }

    #[test]
    fn test_internal_is_empty() {
        let value = MetricType::Internal.decode(&[]).unwrap();
        assert_eq!(value.to_string(), "");
        assert_eq!(value.as_i64(), 0);
        assert_eq!(MetricType::Internal.decode(&[1, 2, 3]).unwrap().as_i64(), 0);
    }

    #[test]
    fn test_short_buffer_fails() {
        let err = MetricType::U32.decode(&[1, 2]).unwrap_err();
        assert_eq!(err, DecodeError::Truncated { needed: 4, available: 2 });
    }

    #[test]
    fn test_unit_suffix() {
        assert_eq!(MetricUnit::None.suffix(), "");
        assert_eq!(MetricUnit::Data(DataUnit::Bytes).suffix(), "By");
        assert_eq!(MetricUnit::Time(TimeUnit::Microseconds).suffix(), "us");
    }

    #[test]
    fn test_desc_from_json() {
        let desc: MetricDesc = serde_json::from_str(
            r#"{"key_type":"u64","value_type":"u32","kind":"cumulative","unit":{"data":"bytes"}}"#,
        )
        .unwrap();
        assert_eq!(desc.value_type, MetricType::U32);
        assert_eq!(desc.unit, MetricUnit::Data(DataUnit::Bytes));
    }
}
