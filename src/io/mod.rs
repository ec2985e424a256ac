//! Whitespace-delimited text matrices.
//!
//! Input files hold one observation per line. They are loaded transposed, as a
//! features × observations matrix, which is the layout every callback in
//! [`crate::callbacks`] expects. Embeddings are written one dimension per line.

use crate::error::{EmbeddingError, Result};
use ndarray::Array2;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Parses observation rows into a features × observations matrix.
///
/// Blank lines are skipped. Every other line must hold the same, non-zero number
/// of finite floating point tokens.
pub fn parse_matrix(text: &str) -> Result<Array2<f64>> {
    let mut rows: Vec<Vec<f64>> = Vec::new();

    for (number, line) in text.lines().enumerate() {
        let line_number = number + 1;
        if line.trim().is_empty() {
            continue;
        }

        let row = line
            .split_whitespace()
            .map(|token| match token.parse::<f64>() {
                Ok(value) if value.is_finite() => Ok(value),
                Ok(_) => Err(EmbeddingError::DataFormat(format!(
                    "line {}: '{}' is not a finite number",
                    line_number, token
                ))),
                Err(_) => Err(EmbeddingError::DataFormat(format!(
                    "line {}: '{}' is not a number",
                    line_number, token
                ))),
            })
            .collect::<Result<Vec<f64>>>()?;

        if let Some(first) = rows.first() {
            if row.len() != first.len() {
                return Err(EmbeddingError::DataFormat(format!(
                    "line {}: expected {} values, found {}",
                    line_number,
                    first.len(),
                    row.len()
                )));
            }
        }
        rows.push(row);
    }

    let dimension = match rows.first() {
        Some(first) => first.len(),
        None => return Err(EmbeddingError::DataFormat("input contains no observations".to_string())),
    };

    Ok(Array2::from_shape_fn((dimension, rows.len()), |(feature, observation)| {
        rows[observation][feature]
    }))
}

/// Reads a data file; see [`parse_matrix`].
pub fn read_matrix(path: impl AsRef<Path>) -> Result<Array2<f64>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|e| EmbeddingError::DataFormat(format!("failed to read {}: {}", path.display(), e)))?;
    parse_matrix(&text)
}

/// One line per embedding dimension, coordinates separated by single spaces.
pub fn format_embedding(coordinates: &Array2<f64>) -> String {
    let mut out = String::new();
    for row in coordinates.rows() {
        let mut first = true;
        for value in row.iter() {
            if !first {
                out.push(' ');
            }
            first = false;
            let _ = write!(out, "{}", value);
        }
        out.push('\n');
    }
    out
}

pub fn write_embedding(path: impl AsRef<Path>, coordinates: &Array2<f64>) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, format_embedding(coordinates))
        .map_err(|e| EmbeddingError::DataFormat(format!("failed to write {}: {}", path.display(), e)))
}
