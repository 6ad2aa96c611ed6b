use rusqlite::types::ToSql;

/// An ordered list of (column, value) constraints rendered into `?N`
/// placeholder fragments for WHERE or SET assembly.
///
/// Column names are `&'static str` literals at every call site, so the set
/// of filterable and updatable fields is enumerated in code and never
/// derived from request data.
pub(crate) struct FieldBindings {
    columns: Vec<&'static str>,
    values: Vec<Box<dyn ToSql>>,
}

impl FieldBindings {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn push(&mut self, column: &'static str, value: impl ToSql + 'static) {
        self.columns.push(column);
        self.values.push(Box::new(value));
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Render `col1 = ?1<sep>col2 = ?2...`, numbering placeholders from 1
    /// in push order. Call before adding tail values.
    pub fn fragment(&self, separator: &str) -> String {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{col} = ?{}", i + 1))
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Append a bare value with no column of its own (e.g. the id in an
    /// UPDATE's WHERE), returning its placeholder index.
    pub fn push_tail(&mut self, value: impl ToSql + 'static) -> usize {
        self.values.push(Box::new(value));
        self.values.len()
    }

    pub fn params(&self) -> Vec<&dyn ToSql> {
        self.values.iter().map(|v| v.as_ref()).collect()
    }
}
