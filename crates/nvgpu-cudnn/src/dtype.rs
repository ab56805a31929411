use std::fmt;

use crate::error::CudnnError;

/// cuDNN element data types (`cudnnDataType_t`).
///
/// Discriminants are the native codes; validity is the closed contiguous
/// range `Float..=FastFloatForFp8`. Codes arriving from the VM must pass
/// `from_code` before any native use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum DataType {
    Float = 0,
    Double = 1,
    Half = 2,
    Int8 = 3,
    Int32 = 4,
    Int8x4 = 5,
    Uint8 = 6,
    Uint8x4 = 7,
    Int8x32 = 8,
    BFloat16 = 9,
    Int64 = 10,
    Boolean = 11,
    Fp8E4M3 = 12,
    Fp8E5M2 = 13,
    FastFloatForFp8 = 14,
}

impl DataType {
    /// Validate a VM-supplied code and convert it to a data type.
    pub fn from_code(code: i64) -> Result<Self, CudnnError> {
        let dtype = match code {
            0 => DataType::Float,
            1 => DataType::Double,
            2 => DataType::Half,
            3 => DataType::Int8,
            4 => DataType::Int32,
            5 => DataType::Int8x4,
            6 => DataType::Uint8,
            7 => DataType::Uint8x4,
            8 => DataType::Int8x32,
            9 => DataType::BFloat16,
            10 => DataType::Int64,
            11 => DataType::Boolean,
            12 => DataType::Fp8E4M3,
            13 => DataType::Fp8E5M2,
            14 => DataType::FastFloatForFp8,
            _ => return Err(CudnnError::UnsupportedDataType(code)),
        };
        Ok(dtype)
    }

    /// The native `cudnnDataType_t` value.
    pub fn code(self) -> i64 {
        self as i64
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Half => "half",
            DataType::Int8 => "int8",
            DataType::Int32 => "int32",
            DataType::Int8x4 => "int8x4",
            DataType::Uint8 => "uint8",
            DataType::Uint8x4 => "uint8x4",
            DataType::Int8x32 => "int8x32",
            DataType::BFloat16 => "bfloat16",
            DataType::Int64 => "int64",
            DataType::Boolean => "boolean",
            DataType::Fp8E4M3 => "fp8_e4m3",
            DataType::Fp8E5M2 => "fp8_e5m2",
            DataType::FastFloatForFp8 => "fast_float_for_fp8",
        };
        write!(f, "{name}")
    }
}
