//! The external array codec: decoding `.npy` bytes into the shape/dtype/range
//! summary the schema checks need.

use bioimg_rdf::ArraySummary;
use ndarray::ArrayD;
use ndarray_npy::ReadNpyExt;

#[derive(thiserror::Error, Debug)]
pub enum NpyDecodeError {
    #[error("Not a readable npy array ({0})")]
    Unreadable(String),
}

macro_rules! try_numeric_dtype {
    ($bytes:expr, $element:ty, $name:literal) => {
        if let Ok(array) = ArrayD::<$element>::read_npy(std::io::Cursor::new($bytes)) {
            let shape = array.shape().to_vec();
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for value in array.iter() {
                let value = *value as f64;
                min = min.min(value);
                max = max.max(value);
            }
            if array.is_empty() {
                min = 0.0;
                max = 0.0;
            }
            return Ok(ArraySummary {
                dtype: $name.into(),
                shape,
                min,
                max,
            });
        }
    };
}

pub fn read_array_summary(bytes: &[u8]) -> Result<ArraySummary, NpyDecodeError> {
    try_numeric_dtype!(bytes, f32, "float32");
    try_numeric_dtype!(bytes, f64, "float64");
    try_numeric_dtype!(bytes, u8, "uint8");
    try_numeric_dtype!(bytes, i8, "int8");
    try_numeric_dtype!(bytes, u16, "uint16");
    try_numeric_dtype!(bytes, i16, "int16");
    try_numeric_dtype!(bytes, u32, "uint32");
    try_numeric_dtype!(bytes, i32, "int32");
    try_numeric_dtype!(bytes, u64, "uint64");
    try_numeric_dtype!(bytes, i64, "int64");

    if let Ok(array) = ArrayD::<bool>::read_npy(std::io::Cursor::new(bytes)) {
        let shape = array.shape().to_vec();
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for value in array.iter() {
            let value = if *value { 1.0 } else { 0.0 };
            min = min.min(value);
            max = max.max(value);
        }
        if array.is_empty() {
            min = 0.0;
            max = 0.0;
        }
        return Ok(ArraySummary {
            dtype: "bool".into(),
            shape,
            min,
            max,
        });
    }

    Err(NpyDecodeError::Unreadable(
        "no supported dtype matches the npy header".into(),
    ))
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray_npy::WriteNpyExt;

    #[test]
    fn test_roundtrip_f32() {
        let array = ndarray::Array3::<f32>::from_shape_fn((1, 2, 3), |(_, y, x)| (y * 3 + x) as f32);
        let mut bytes = Vec::new();
        array.write_npy(&mut bytes).unwrap();

        let summary = read_array_summary(&bytes).unwrap();
        assert_eq!(summary.dtype, "float32");
        assert_eq!(summary.shape, vec![1, 2, 3]);
        assert_eq!(summary.min, 0.0);
        assert_eq!(summary.max, 5.0);
    }

    #[test]
    fn test_uint8_dtype_detection() {
        let array = ndarray::Array1::<u8>::from_vec(vec![3, 250]);
        let mut bytes = Vec::new();
        array.write_npy(&mut bytes).unwrap();

        let summary = read_array_summary(&bytes).unwrap();
        assert_eq!(summary.dtype, "uint8");
        assert_eq!(summary.max, 250.0);
    }
}
