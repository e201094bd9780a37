//! Structural locators of the exchange table pages.

use crate::browser::Locator;
use cme_core::TableKind;
use serde::{Deserialize, Serialize};

/// Page locators (`[page]` section). Every field can be overridden when the
/// site markup changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLayout {
    /// Control that opens the trade-date menu.
    #[serde(default = "default_date_toggle")]
    pub date_toggle: Locator,
    /// Entries of the trade-date menu; their text is the date label.
    #[serde(default = "default_date_options")]
    pub date_options: Locator,
    /// Settlements: "Last Updated" timestamp label.
    #[serde(default = "default_last_updated_label")]
    pub last_updated_label: Locator,
    /// Volume/OI: preliminary/final data-type label.
    #[serde(default = "default_final_label")]
    pub final_label: Locator,
    /// Optional control that reveals the remaining contract months.
    #[serde(default = "default_load_all")]
    pub load_all: Locator,
    /// Table body rows.
    #[serde(default = "default_table_rows")]
    pub table_rows: Locator,
    /// Cells within a row, in column order.
    #[serde(default = "default_row_cells")]
    pub row_cells: Locator,
}

fn default_date_toggle() -> Locator {
    Locator::css(".trade-date-row .dropdown-toggle")
}

fn default_date_options() -> Locator {
    Locator::css(".trade-date-row .dropdown-menu .dropdown-item")
}

fn default_last_updated_label() -> Locator {
    Locator::css(".timestamp .last-updated")
}

fn default_final_label() -> Locator {
    Locator::xpath("//div[contains(@class,'trade-date-row')]//span[starts-with(normalize-space(.),'DATA TYPE')]")
}

fn default_load_all() -> Locator {
    Locator::css(".load-all")
}

fn default_table_rows() -> Locator {
    Locator::css(".main-table-wrapper tbody > tr")
}

fn default_row_cells() -> Locator {
    Locator::css("td")
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            date_toggle: default_date_toggle(),
            date_options: default_date_options(),
            last_updated_label: default_last_updated_label(),
            final_label: default_final_label(),
            load_all: default_load_all(),
            table_rows: default_table_rows(),
            row_cells: default_row_cells(),
        }
    }
}

impl PageLayout {
    /// Label carrying the freshness signal for a table kind.
    pub fn signal_label(&self, kind: TableKind) -> &Locator {
        match kind {
            TableKind::Settlements => &self.last_updated_label,
            TableKind::VolumeAndOpenInterest => &self.final_label,
        }
    }
}
