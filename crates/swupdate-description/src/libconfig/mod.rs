//! libconfig documents: setting tree, path lookup and typed access.
//!
//! The grammar follows libconfig: a document is a list of
//! `name = value;` settings, where a value is a scalar, an array
//! `[ ... ]`, a list `( ... )` or a group `{ ... }`.

mod lexer;
mod parser;

use crate::ParseError;

/// Value held by a [`Setting`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Int64(i64),
    Float(f64),
    Bool(bool),
    String(String),
    /// Scalars of a single type
    Array(Vec<Setting>),
    /// Values of any type
    List(Vec<Setting>),
    /// Named settings
    Group(Vec<Setting>),
}

/// Discriminant of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingType {
    Int,
    Int64,
    Float,
    Bool,
    String,
    Array,
    List,
    Group,
}

/// Scalar read out of a setting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Int(i32),
    Int64(i64),
    Float(f64),
    Bool(bool),
    Str(&'a str),
}

/// A node of the configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Setting {
    /// Member name; `None` for array and list elements and the root
    pub name: Option<String>,
    pub value: Value,
    /// Line the setting starts on (1-indexed)
    pub line: usize,
}

impl Setting {
    pub fn new(name: Option<String>, value: Value, line: usize) -> Self {
        Self { name, value, line }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn setting_type(&self) -> SettingType {
        match self.value {
            Value::Int(_) => SettingType::Int,
            Value::Int64(_) => SettingType::Int64,
            Value::Float(_) => SettingType::Float,
            Value::Bool(_) => SettingType::Bool,
            Value::String(_) => SettingType::String,
            Value::Array(_) => SettingType::Array,
            Value::List(_) => SettingType::List,
            Value::Group(_) => SettingType::Group,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.value, Value::Group(_))
    }

    /// Child settings of an aggregate; empty for scalars.
    pub fn elements(&self) -> &[Setting] {
        match &self.value {
            Value::Array(v) | Value::List(v) | Value::Group(v) => v,
            _ => &[],
        }
    }

    /// Number of children (0 for scalars).
    pub fn len(&self) -> usize {
        self.elements().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn elem(&self, index: usize) -> Option<&Setting> {
        self.elements().get(index)
    }

    /// Direct member of a group.
    pub fn member(&self, name: &str) -> Option<&Setting> {
        match &self.value {
            Value::Group(members) => members.iter().find(|s| s.name() == Some(name)),
            _ => None,
        }
    }

    /// Look up a dotted path below this setting.
    ///
    /// Segments are member names; `[n]` or a bare integer selects the
    /// n-th element of an array, list or group. An empty path returns
    /// the setting itself.
    pub fn lookup(&self, path: &str) -> Option<&Setting> {
        let mut current = self;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            current = match parse_index(segment) {
                Some(index) => current.elem(index)?,
                None => current.member(segment)?,
            };
        }
        Some(current)
    }

    pub fn as_int(&self) -> Option<i32> {
        match self.value {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Integer value, widening 32-bit integers.
    pub fn as_int64(&self) -> Option<i64> {
        match self.value {
            Value::Int(v) => Some(i64::from(v)),
            Value::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self.value {
            Value::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Scalar value of this setting; `None` for aggregates.
    pub fn scalar(&self) -> Option<FieldValue<'_>> {
        match &self.value {
            Value::Int(v) => Some(FieldValue::Int(*v)),
            Value::Int64(v) => Some(FieldValue::Int64(*v)),
            Value::Float(v) => Some(FieldValue::Float(*v)),
            Value::Bool(v) => Some(FieldValue::Bool(*v)),
            Value::String(s) => Some(FieldValue::Str(s)),
            _ => None,
        }
    }

    /// Scalar at `path`, or of this setting when `path` is `None`.
    pub fn field(&self, path: Option<&str>) -> Option<FieldValue<'_>> {
        match path {
            Some(p) => self.lookup(p)?.scalar(),
            None => self.scalar(),
        }
    }

    /// String at `path`; `None` if absent or not a string.
    pub fn field_str(&self, path: Option<&str>) -> Option<&str> {
        match path {
            Some(p) => self.lookup(p)?.as_str(),
            None => self.as_str(),
        }
    }

    /// Boolean at `path`, falling back to `default` when absent or not a bool.
    pub fn field_bool(&self, path: &str, default: bool) -> bool {
        self.lookup(path)
            .and_then(Setting::as_bool)
            .unwrap_or(default)
    }

    /// Walk the children as `name -> string` pairs.
    ///
    /// A scalar child yields one call with its own value. An aggregate
    /// child yields one call per element, all under the child's name.
    /// Non-string values are passed as `None`.
    pub fn iterate_fields<F>(&self, mut cb: F)
    where
        F: FnMut(&str, Option<&str>),
    {
        for entry in self.elements() {
            let name = entry.name().unwrap_or("");
            if entry.is_empty() {
                cb(name, entry.as_str());
            } else {
                for elem in entry.elements() {
                    cb(name, elem.as_str());
                }
            }
        }
    }
}

fn parse_index(segment: &str) -> Option<usize> {
    let inner = segment
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(segment);
    if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    inner.parse().ok()
}

/// Join node names into a lookup path.
pub fn join_path<S: AsRef<str>>(nodes: &[S]) -> String {
    nodes
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(".")
}

/// A parsed libconfig document.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Unnamed top-level group
    pub root: Setting,
}

impl Config {
    /// Parse a libconfig document.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let settings = parser::parse(text)?;
        Ok(Self {
            root: Setting::new(None, Value::Group(settings), 1),
        })
    }

    pub fn lookup(&self, path: &str) -> Option<&Setting> {
        self.root.lookup(path)
    }

    /// Setting at the path formed by `nodes`.
    pub fn node<S: AsRef<str>>(&self, nodes: &[S]) -> Option<&Setting> {
        self.lookup(&join_path(nodes))
    }
}

impl std::str::FromStr for Config {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Config::parse(s)
    }
}
