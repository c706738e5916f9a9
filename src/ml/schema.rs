//! Fitted column layout shared by every encoded vector.

/// How one raw column maps onto the encoded vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureField {
    /// Parsed as a float and copied into a single slot.
    Numeric { column: String },
    /// Expanded into one slot per known value, in `values` order.
    Categorical { column: String, values: Vec<String> },
}

impl FeatureField {
    pub fn column(&self) -> &str {
        match self {
            Self::Numeric { column } | Self::Categorical { column, .. } => column,
        }
    }

    /// Number of encoded slots this field occupies.
    pub fn width(&self) -> usize {
        match self {
            Self::Numeric { .. } => 1,
            Self::Categorical { values, .. } => values.len(),
        }
    }

    /// Encoded slot names: the column itself, or `column_value` per category.
    pub fn feature_names(&self) -> Vec<String> {
        match self {
            Self::Numeric { column } => vec![column.clone()],
            Self::Categorical { column, values } => values
                .iter()
                .map(|value| format!("{column}_{value}"))
                .collect(),
        }
    }
}

/// Ordered sequence of fitted fields.
///
/// Immutable after fitting: field order and per-field value order determine
/// the offset of every slot in the encoded vector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeatureSchema {
    fields: Vec<FeatureField>,
}

impl FeatureSchema {
    pub fn new(fields: Vec<FeatureField>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FeatureField] {
        &self.fields
    }

    /// Total encoded vector length.
    pub fn width(&self) -> usize {
        self.fields.iter().map(FeatureField::width).sum()
    }

    /// Names of every encoded slot, in vector order.
    pub fn feature_names(&self) -> Vec<String> {
        self.fields
            .iter()
            .flat_map(FeatureField::feature_names)
            .collect()
    }
}
