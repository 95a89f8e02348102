use crate::value::Value;
use std::fmt;
use std::ops::{Index, IndexMut};

/// An ordered sequence of [`Value`]s.
///
/// Field names are not required to be unique. Name lookups are
/// case-insensitive and return the first match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    pub fn insert(&mut self, index: usize, value: Value) {
        self.values.insert(index, value);
    }

    pub fn remove(&mut self, index: usize) -> Value {
        self.values.remove(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.values.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Value> {
        self.values.iter_mut()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Position of the first field named `name`, ignoring case.
    pub fn search_index(&self, name: &str) -> Option<usize> {
        self.values
            .iter()
            .position(|v| v.name().eq_ignore_ascii_case(name))
    }

    /// First field named `name`, ignoring case.
    pub fn search_value(&self, name: &str) -> Option<&Value> {
        self.search_index(name).map(|i| &self.values[i])
    }

    pub fn search_value_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.search_index(name).map(move |i| &mut self.values[i])
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.values.iter().map(|v| v.name()).collect()
    }

    /// Rename the first field named `from`. Returns false when absent.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        match self.search_value_mut(from) {
            Some(v) => {
                v.set_name(to);
                true
            }
            None => false,
        }
    }

    /// Append the fields of `other` whose names are not yet present.
    pub fn merge(&mut self, other: &Row) {
        for value in other.iter() {
            if self.search_index(value.name()).is_none() {
                self.values.push(value.clone());
            }
        }
    }

    /// Project the fields at `indexes`, in order. `None` if any index is out of range.
    pub fn select(&self, indexes: &[usize]) -> Option<Row> {
        indexes
            .iter()
            .map(|&i| self.values.get(i).cloned())
            .collect::<Option<Vec<_>>>()
            .map(|values| Row { values })
    }
}

impl Index<usize> for Row {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.values[index]
    }
}

impl IndexMut<usize> for Row {
    fn index_mut(&mut self, index: usize) -> &mut Value {
        &mut self.values[index]
    }
}

impl FromIterator<Value> for Row {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self { values }
    }
}

impl IntoIterator for Row {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", v.name(), v)?;
        }
        f.write_str("]")
    }
}
