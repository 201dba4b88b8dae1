//! Result ordering.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Ascending,
    #[default]
    Descending,
}

impl Direction {
    /// Sort order keyword of the store DSL.
    pub fn as_order(&self) -> &'static str {
        match self {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_order())
    }
}

/// One sort key. Sorters apply in the order given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Sorter {
    Score {
        #[serde(default)]
        direction: Direction,
    },
    Keyword {
        #[serde(rename = "fieldName")]
        field_name: String,
        #[serde(default)]
        direction: Direction,
    },
    Text {
        #[serde(rename = "fieldName")]
        field_name: String,
        #[serde(default)]
        direction: Direction,
    },
    Integer {
        #[serde(rename = "fieldName")]
        field_name: String,
        #[serde(default)]
        direction: Direction,
    },
    Decimal {
        #[serde(rename = "fieldName")]
        field_name: String,
        #[serde(default)]
        direction: Direction,
    },
    DateTime {
        #[serde(rename = "fieldName")]
        field_name: String,
        #[serde(default)]
        direction: Direction,
    },
}

impl Sorter {
    pub fn score(direction: Direction) -> Self {
        Sorter::Score { direction }
    }

    pub fn keyword<S: Into<String>>(field_name: S, direction: Direction) -> Self {
        Sorter::Keyword {
            field_name: field_name.into(),
            direction,
        }
    }

    pub fn text<S: Into<String>>(field_name: S, direction: Direction) -> Self {
        Sorter::Text {
            field_name: field_name.into(),
            direction,
        }
    }

    pub fn integer<S: Into<String>>(field_name: S, direction: Direction) -> Self {
        Sorter::Integer {
            field_name: field_name.into(),
            direction,
        }
    }

    pub fn decimal<S: Into<String>>(field_name: S, direction: Direction) -> Self {
        Sorter::Decimal {
            field_name: field_name.into(),
            direction,
        }
    }

    pub fn date_time<S: Into<String>>(field_name: S, direction: Direction) -> Self {
        Sorter::DateTime {
            field_name: field_name.into(),
            direction,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Sorter::Score { direction }
            | Sorter::Keyword { direction, .. }
            | Sorter::Text { direction, .. }
            | Sorter::Integer { direction, .. }
            | Sorter::Decimal { direction, .. }
            | Sorter::DateTime { direction, .. } => *direction,
        }
    }
}
