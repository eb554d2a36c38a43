use crate::error::{ProcessingError, Result};
use crate::utils::constants::{COMPARE_ABS_TOLERANCE, COMPARE_REL_TOLERANCE, EXECUTION_TIME_KEY};
use serde_json::{Map, Value};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub enum Difference {
    Keys {
        path: String,
        only_in_reference: Vec<String>,
        only_in_candidate: Vec<String>,
    },
    ListLength {
        path: String,
        reference: usize,
        candidate: usize,
    },
    Value {
        path: String,
        reference: Value,
        candidate: Value,
    },
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difference::Keys {
                path,
                only_in_reference,
                only_in_candidate,
            } => {
                write!(f, "key mismatch at '{}'", path)?;
                if !only_in_reference.is_empty() {
                    write!(f, "; only in reference: {:?}", only_in_reference)?;
                }
                if !only_in_candidate.is_empty() {
                    write!(f, "; only in candidate: {:?}", only_in_candidate)?;
                }
                Ok(())
            }
            Difference::ListLength {
                path,
                reference,
                candidate,
            } => write!(f, "list length at '{}': {} != {}", path, reference, candidate),
            Difference::Value {
                path,
                reference,
                candidate,
            } => write!(f, "value at '{}': {} != {}", path, reference, candidate),
        }
    }
}

/// Compares two result documents, ignoring execution time and
/// tolerating float noise.
pub struct ResultComparator {
    rel_tolerance: f64,
    abs_tolerance: f64,
}

impl ResultComparator {
    pub fn new() -> Self {
        Self {
            rel_tolerance: COMPARE_REL_TOLERANCE,
            abs_tolerance: COMPARE_ABS_TOLERANCE,
        }
    }

    pub fn compare_files(&self, reference: &Path, candidate: &Path) -> Result<Vec<Difference>> {
        let reference = Self::load(reference)?;
        let candidate = Self::load(candidate)?;
        Ok(self.compare(&reference, &candidate))
    }

    fn load(path: &Path) -> Result<Value> {
        let file = File::open(path)?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            ProcessingError::InvalidFormat(format!("{} is not valid JSON: {}", path.display(), e))
        })
    }

    pub fn compare(&self, reference: &Value, candidate: &Value) -> Vec<Difference> {
        let mut differences = Vec::new();
        self.compare_at("", reference, candidate, &mut differences);
        differences
    }

    fn compare_at(&self, path: &str, reference: &Value, candidate: &Value, out: &mut Vec<Difference>) {
        match (reference, candidate) {
            (Value::Object(a), Value::Object(b)) => self.compare_objects(path, a, b, out),
            (Value::Array(a), Value::Array(b)) => {
                if a.len() != b.len() {
                    out.push(Difference::ListLength {
                        path: path.to_string(),
                        reference: a.len(),
                        candidate: b.len(),
                    });
                    return;
                }
                for (index, (x, y)) in a.iter().zip(b).enumerate() {
                    self.compare_at(&format!("{}[{}]", path, index), x, y, out);
                }
            }
            (Value::Number(_), Value::Number(_)) => {
                if !self.numbers_match(reference, candidate) {
                    out.push(Self::value_difference(path, reference, candidate));
                }
            }
            _ => {
                if reference != candidate {
                    out.push(Self::value_difference(path, reference, candidate));
                }
            }
        }
    }

    fn compare_objects(&self, path: &str, a: &Map<String, Value>, b: &Map<String, Value>, out: &mut Vec<Difference>) {
        let mut only_in_reference: Vec<String> = a.keys().filter(|k| !b.contains_key(*k)).cloned().collect();
        let mut only_in_candidate: Vec<String> = b.keys().filter(|k| !a.contains_key(*k)).cloned().collect();

        if !only_in_reference.is_empty() || !only_in_candidate.is_empty() {
            only_in_reference.sort();
            only_in_candidate.sort();
            out.push(Difference::Keys {
                path: path.to_string(),
                only_in_reference,
                only_in_candidate,
            });
            return;
        }

        let mut keys: Vec<&String> = a.keys().collect();
        keys.sort();
        for key in keys {
            if key == EXECUTION_TIME_KEY {
                continue;
            }
            let child = if path.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", path, key)
            };
            self.compare_at(&child, &a[key], &b[key], out);
        }
    }

    fn numbers_match(&self, reference: &Value, candidate: &Value) -> bool {
        let both_integers = (reference.is_i64() || reference.is_u64()) && (candidate.is_i64() || candidate.is_u64());
        if both_integers {
            return reference == candidate;
        }

        match (reference.as_f64(), candidate.as_f64()) {
            (Some(x), Some(y)) => {
                let tolerance = (self.rel_tolerance * x.abs().max(y.abs())).max(self.abs_tolerance);
                x == y || (x - y).abs() <= tolerance
            }
            _ => false,
        }
    }

    fn value_difference(path: &str, reference: &Value, candidate: &Value) -> Difference {
        Difference::Value {
            path: path.to_string(),
            reference: reference.clone(),
            candidate: candidate.clone(),
        }
    }
}

impl Default for ResultComparator {
    fn default() -> Self {
        Self::new()
    }
}
