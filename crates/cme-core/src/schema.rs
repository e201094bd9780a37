//! Raw table schema shared by the scraper and the entity factories.
//!
//! Column order is the contract with the exchange page: cells are read
//! positionally and mapped onto these names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Settlements table columns, in page order.
pub const SETTLEMENT_COLUMNS: [&str; 9] = [
    "month",
    "open",
    "high",
    "low",
    "last",
    "change",
    "settle",
    "est_volume",
    "prior_day_oi",
];

/// Volume and open interest table columns, in page order.
pub const VOLUME_OI_COLUMNS: [&str; 12] = [
    "month",
    "globex",
    "open_outcry",
    "clear_port",
    "total_volume",
    "block_trades",
    "efp",
    "efr",
    "tas",
    "deliveries",
    "at_close",
    "change",
];

/// Which of the two published tables a page carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Settlements,
    VolumeAndOpenInterest,
}

impl TableKind {
    pub const ALL: [TableKind; 2] = [TableKind::Settlements, TableKind::VolumeAndOpenInterest];

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            TableKind::Settlements => &SETTLEMENT_COLUMNS,
            TableKind::VolumeAndOpenInterest => &VOLUME_OI_COLUMNS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Settlements => "settlements",
            TableKind::VolumeAndOpenInterest => "volume_and_open_interest",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted table row, keyed by the fixed column schema.
///
/// Blank cells and cells missing from a short row are `None`. The null
/// sentinel `"-"` is kept as text; the entity factories interpret it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    kind: TableKind,
    cells: Vec<Option<String>>,
}

impl RawRow {
    /// Map positional cell texts onto the schema of `kind`.
    ///
    /// Cells beyond the schema width are dropped.
    pub fn from_cells<I, S>(kind: TableKind, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let width = kind.columns().len();
        let mut values: Vec<Option<String>> = cells
            .into_iter()
            .take(width)
            .map(|cell| {
                let text = cell.as_ref().trim();
                (!text.is_empty()).then(|| text.to_string())
            })
            .collect();
        values.resize(width, None);
        Self {
            kind,
            cells: values,
        }
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    /// Cell text for a column name. Unknown names yield `None`.
    pub fn get(&self, column: &str) -> Option<&str> {
        let index = self.kind.columns().iter().position(|c| *c == column)?;
        self.cells.get(index)?.as_deref()
    }

    /// Iterate `(column, value)` pairs in page order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<&str>)> + '_ {
        self.kind
            .columns()
            .iter()
            .copied()
            .zip(self.cells.iter().map(|c| c.as_deref()))
    }

    /// Number of non-empty cells.
    pub fn filled(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}
