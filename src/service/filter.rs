//! Caller-facing filters: equality by default, partial match when flagged. Blank values are ignored.

use crate::record::is_blank;
use crate::store::Condition;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
    /// Case-insensitive substring match instead of equality.
    pub partial: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filters(Vec<Filter>);

impl Filters {
    pub fn new() -> Self {
        Filters::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(field, value, false);
        self
    }

    pub fn partial(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(field, value, true);
        self
    }

    pub fn push(&mut self, field: impl Into<String>, value: impl Into<Value>, partial: bool) {
        self.0.push(Filter {
            field: field.into(),
            value: value.into(),
            partial,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Store conditions for the non-blank filters.
    pub fn to_conditions(&self) -> Vec<Condition> {
        self.0
            .iter()
            .filter(|f| !is_blank(Some(&f.value)))
            .map(|f| {
                if f.partial {
                    let needle = match &f.value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    Condition::Contains(f.field.clone(), needle)
                } else {
                    Condition::Eq(f.field.clone(), f.value.clone())
                }
            })
            .collect()
    }
}
