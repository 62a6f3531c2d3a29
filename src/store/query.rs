//! Store-level query description: conditions, ordering, limit, projection.

use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// Field equals value.
    Eq(String, Value),
    /// Case-insensitive substring match on the field's text.
    Contains(String, String),
    /// Field is one of the values.
    In(String, Vec<Value>),
}

impl Condition {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Eq(field.into(), value.into())
    }

    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Condition::Contains(field.into(), needle.into())
    }

    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Condition::In(field.into(), values)
    }

    pub fn field(&self) -> &str {
        match self {
            Condition::Eq(f, _) | Condition::Contains(f, _) | Condition::In(f, _) => f,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    pub field: String,
    pub descending: bool,
}

impl Order {
    pub fn asc(field: impl Into<String>) -> Self {
        Order {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Order {
            field: field.into(),
            descending: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    pub conditions: Vec<Condition>,
    pub order: Option<Order>,
    pub limit: Option<u32>,
    /// Columns to return; None returns every column.
    pub columns: Option<Vec<String>>,
}

impl Query {
    pub fn new() -> Self {
        Query::default()
    }

    pub fn filter(mut self, c: Condition) -> Self {
        self.conditions.push(c);
        self
    }

    pub fn filters(mut self, cs: impl IntoIterator<Item = Condition>) -> Self {
        self.conditions.extend(cs);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn columns<I, S>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(cols.into_iter().map(Into::into).collect());
        self
    }
}
