/// One row of the raw table, keyed by column name in header order.
///
/// Values are looked up by name so no code path depends on two components
/// agreeing on column positions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRecord {
    fields: Vec<(String, String)>,
}

impl RawRecord {
    /// Pair each header column with the value at the same position.
    ///
    /// Extra values are dropped and missing values leave the column absent.
    pub fn from_columns(columns: &[String], values: impl IntoIterator<Item = String>) -> Self {
        let fields = columns.iter().cloned().zip(values).collect();
        Self { fields }
    }

    /// Raw string value for `column`, if present.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Column names in record order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

/// Feature columns plus the records that carry them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<RawRecord>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<RawRecord>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
