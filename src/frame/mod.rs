pub mod error;
pub mod value;

pub use error::FrameError;
pub use value::{ColumnType, Value};

use std::collections::{HashMap, HashSet};

/// A small in-memory table: named columns over rows of typed values.
/// Row order is significant (surrogate keys encode it) and every operation
/// here is deterministic for identical input.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Frame {
    pub fn new(columns: Vec<String>) -> Self {
        Frame {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, FrameError> {
        let want = columns.len();
        for (i, row) in rows.iter().enumerate() {
            if row.len() != want {
                return Err(FrameError::RaggedRow {
                    row: i,
                    got: row.len(),
                    want,
                });
            }
        }
        Ok(Frame { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), FrameError> {
        if row.len() != self.columns.len() {
            return Err(FrameError::RaggedRow {
                row: self.rows.len(),
                got: row.len(),
                want: self.columns.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn column_index(&self, name: &str) -> Result<usize, FrameError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| FrameError::MissingColumn {
                column: name.to_string(),
            })
    }

    pub fn column_values(&self, name: &str) -> Result<Vec<&Value>, FrameError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Project onto a subset of columns, cloning values in the given order.
    pub fn select(&self, names: &[&str]) -> Result<Frame, FrameError> {
        let idxs = names
            .iter()
            .map(|n| self.column_index(n))
            .collect::<Result<Vec<_>, _>>()?;
        let columns = names.iter().map(|n| n.to_string()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| idxs.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(Frame { columns, rows })
    }

    /// Stable ascending sort on one column; nulls order last.
    pub fn sort_by(&mut self, name: &str) -> Result<(), FrameError> {
        let idx = self.column_index(name)?;
        self.rows.sort_by(|a, b| a[idx].cmp(&b[idx]));
        Ok(())
    }

    /// Drop duplicate rows by full-row equality, keeping the first occurrence.
    pub fn dedup(&mut self) {
        let mut seen = HashSet::with_capacity(self.rows.len());
        self.rows.retain(|row| seen.insert(row.clone()));
    }

    /// Insert a surrogate key column at position 0, holding each row's
    /// current ordinal. Must run after sort + dedup so keys are stable.
    pub fn insert_key(&mut self, name: &str) -> Result<(), FrameError> {
        if self.rows.len() > i16::MAX as usize + 1 {
            return Err(FrameError::KeyOverflow {
                rows: self.rows.len(),
            });
        }
        self.columns.insert(0, name.to_string());
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.insert(0, Value::Key(i as i16));
        }
        Ok(())
    }

    /// Replace placeholder string tokens across every column.
    pub fn replace_str(&mut self, tokens: &[&str], replacement: &str) {
        for row in &mut self.rows {
            for v in row.iter_mut() {
                if let Value::Str(s) = v {
                    if tokens.contains(&s.as_str()) {
                        *v = Value::Str(replacement.to_string());
                    }
                }
            }
        }
    }

    /// Append a column holding the concatenation of two string columns.
    /// Null on either side propagates.
    pub fn concat_str(&mut self, name: &str, left: &str, right: &str) -> Result<(), FrameError> {
        let li = self.column_index(left)?;
        let ri = self.column_index(right)?;
        let mut values = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let v = match (&row[li], &row[ri]) {
                (Value::Null, _) | (_, Value::Null) => Value::Null,
                (Value::Str(a), Value::Str(b)) => Value::Str(format!("{}{}", a, b)),
                (Value::Str(_), other) => {
                    return Err(FrameError::TypeMismatch {
                        column: right.to_string(),
                        expected: "string",
                        found: other.kind(),
                    })
                }
                (other, _) => {
                    return Err(FrameError::TypeMismatch {
                        column: left.to_string(),
                        expected: "string",
                        found: other.kind(),
                    })
                }
            };
            values.push(v);
        }
        self.columns.push(name.to_string());
        for (row, v) in self.rows.iter_mut().zip(values) {
            row.push(v);
        }
        Ok(())
    }

    pub fn drop_columns(&mut self, names: &[&str]) -> Result<(), FrameError> {
        let mut idxs = names
            .iter()
            .map(|n| self.column_index(n))
            .collect::<Result<Vec<_>, _>>()?;
        idxs.sort_unstable();
        for &i in idxs.iter().rev() {
            self.columns.remove(i);
            for row in &mut self.rows {
                row.remove(i);
            }
        }
        Ok(())
    }

    /// Left join against a dimension frame on the named columns. Every left
    /// row survives; unmatched rows get nulls for the right-side payload.
    /// Non-key column names shared by both sides are reconciled with `_x`
    /// (left) / `_y` (right) suffixes. The right side must be unique on the
    /// join columns; a duplicate key tuple is reported as fan-out.
    pub fn left_join(&self, right: &Frame, on: &[&str]) -> Result<Frame, FrameError> {
        let left_on = on
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Result<Vec<_>, _>>()?;
        let right_on = on
            .iter()
            .map(|c| right.column_index(c))
            .collect::<Result<Vec<_>, _>>()?;

        let right_payload: Vec<usize> = (0..right.columns.len())
            .filter(|i| !right_on.contains(i))
            .collect();

        let overlap: HashSet<&str> = right_payload
            .iter()
            .map(|&i| right.columns[i].as_str())
            .filter(|name| self.columns.iter().any(|c| c == name))
            .collect();

        let mut columns = Vec::with_capacity(self.columns.len() + right_payload.len());
        for (i, name) in self.columns.iter().enumerate() {
            if !left_on.contains(&i) && overlap.contains(name.as_str()) {
                columns.push(format!("{}_x", name));
            } else {
                columns.push(name.clone());
            }
        }
        for &i in &right_payload {
            let name = right.columns[i].as_str();
            if overlap.contains(name) {
                columns.push(format!("{}_y", name));
            } else {
                columns.push(name.to_string());
            }
        }

        let mut index: HashMap<Vec<&Value>, &Vec<Value>> =
            HashMap::with_capacity(right.rows.len());
        for row in &right.rows {
            let key: Vec<&Value> = right_on.iter().map(|&i| &row[i]).collect();
            if index.insert(key, row).is_some() {
                let shown = right_on
                    .iter()
                    .map(|&i| row[i].to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(FrameError::JoinFanOut {
                    on: on.join(", "),
                    key: shown,
                });
            }
        }

        let mut rows = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let key: Vec<&Value> = left_on.iter().map(|&i| &row[i]).collect();
            let mut out = row.clone();
            match index.get(&key) {
                Some(matched) => out.extend(right_payload.iter().map(|&i| matched[i].clone())),
                None => out.extend(std::iter::repeat(Value::Null).take(right_payload.len())),
            }
            rows.push(out);
        }

        Ok(Frame { columns, rows })
    }

    /// Verify a surrogate-key column after the joins: every value must be a
    /// key, with nulls tolerated only where the key is declared nullable.
    pub fn require_key(&self, name: &str, nullable: bool) -> Result<(), FrameError> {
        let idx = self.column_index(name)?;
        for row in &self.rows {
            match &row[idx] {
                Value::Key(_) => {}
                Value::Null if nullable => {}
                Value::Null => {
                    return Err(FrameError::NullKey {
                        column: name.to_string(),
                    })
                }
                other => {
                    return Err(FrameError::TypeMismatch {
                        column: name.to_string(),
                        expected: "key",
                        found: other.kind(),
                    })
                }
            }
        }
        Ok(())
    }
}
