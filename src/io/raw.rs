//! Read / write `f32` arrays as raw little-endian binary

use std::fs::File;
use std::io::{Write, Read, BufWriter, BufReader};
use std::path::Path;

use ndarray::{Array, Dimension};
use thiserror::Error;

type IORes<T> = std::io::Result<T>;

pub fn write(data: impl Iterator<Item = f32>, path: &Path) -> IORes<()> {
    let file = File::create(path)?;
    let mut buf = BufWriter::new(file);
    for datum in data {
        buf.write_all(&datum.to_le_bytes())?;
    }
    buf.flush()
}

pub fn read<'a>(path: &Path) -> IORes<impl Iterator<Item = IORes<f32>> + 'a> {
    let file = File::open(path)?;
    let mut buf = BufReader::new(file);
    let mut buffer = [0; 4];

    Ok(std::iter::from_fn(move || {
        use std::io::ErrorKind::UnexpectedEof;
        match buf.read_exact(&mut buffer) {
            Ok(()) => Some(Ok(f32::from_le_bytes(buffer))),
            Err(e) if e.kind() == UnexpectedEof => None,
            Err(e) => Some(Err(e)),
        }
    }))
}

#[derive(Error, Debug)]
pub enum RawError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("`{path}` holds {found} values, expected {expected}")]
    Length { path: String, expected: usize, found: usize },
}

/// Read a whole file into a standard-layout array of the given shape
pub fn read_array<D: Dimension>(path: &Path, shape: D) -> Result<Array<f32, D>, RawError> {
    let values = read(path)?.collect::<IORes<Vec<_>>>()?;
    let expected = shape.size();
    if values.len() != expected {
        return Err(RawError::Length { path: path.display().to_string(), expected, found: values.len() })
    }
    Array::from_shape_vec(shape, values)
        .map_err(|_| RawError::Length { path: path.display().to_string(), expected, found: 0 })
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::{Ix2, array};
    use tempfile::tempdir;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn raw_io_roundtrip() -> IORes<()> {
        // Harmless temporary location for output file
        let dir = tempdir()?;
        let file_path = dir.path().join("test.bin");

        let original_data = vec![1.23, 4.56, 7.89];
        write(original_data.iter().copied(), &file_path)?;
        let reloaded_data: Vec<_> = read(&file_path)?
            .collect::<Result<_, _>>()?;
        assert_eq!(original_data, reloaded_data);
        Ok(())
    }

    #[test]
    fn array_is_read_in_row_major_order() -> Result<(), RawError> {
        let dir = tempdir()?;
        let file_path = dir.path().join("image.raw");
        let image = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0_f32]];
        write(image.iter().copied(), &file_path)?;
        let reloaded = read_array(&file_path, Ix2(2, 3))?;
        assert_eq!(reloaded, image);
        Ok(())
    }

    #[test]
    fn wrong_length_is_reported() -> IORes<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("short.raw");
        write([1.0, 2.0, 3.0].into_iter(), &file_path)?;
        match read_array(&file_path, Ix2(2, 2)) {
            Err(RawError::Length { expected: 4, found: 3, .. }) => {}
            other => panic!("expected length mismatch, got {other:?}"),
        }
        Ok(())
    }
}
