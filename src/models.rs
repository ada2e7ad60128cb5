use std::fmt;

// Header literals of the World Bank export. Matched exactly, no trimming.
pub(crate) const COUNTRY_NAME: &str = "Country Name";
pub(crate) const TIME: &str = "Time";
pub(crate) const CENTRAL_GOVERNMENT_DEBT: &str =
    "Central government debt, total (% of GDP) [GC.DOD.TOTL.GD.ZS]";
pub(crate) const INTEREST_PAYMENTS_EXPENSE: &str = "Interest payments (% of expense)";
pub(crate) const INTEREST_PAYMENTS_REVENUE: &str = "Interest payments (% of revenue)";
pub(crate) const COMPENSATION_OF_EMPLOYEES: &str =
    "Compensation of employees (% of expense) [GC.XPN.COMP.ZS]";
pub(crate) const GOODS_AND_SERVICES_EXPENSE: &str =
    "Goods and services expense (% of expense) [GC.XPN.GSRV.ZS]";
pub(crate) const GRANTS_AND_OTHER_REVENUE: &str =
    "Grants and other revenue (% of revenue) [GC.REV.GOTR.ZS]";

/// Every column the charts and statistics read as numbers.
pub(crate) const NUMERIC_COLUMNS: [&str; 7] = [
    TIME,
    CENTRAL_GOVERNMENT_DEBT,
    INTEREST_PAYMENTS_EXPENSE,
    INTEREST_PAYMENTS_REVENUE,
    COMPENSATION_OF_EMPLOYEES,
    GOODS_AND_SERVICES_EXPENSE,
    GRANTS_AND_OTHER_REVENUE,
];

pub(crate) const INTERESTED_COUNTRIES: [&str; 7] = [
    "Canada",
    "India",
    "Switzerland",
    "Sweden",
    "Spain",
    "Finland",
    "France",
];

/// A single table value: raw text as read, a coerced number, or nothing.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Cell {
    Text(String),
    Number(f64),
    Missing,
}

impl Cell {
    /// Empty fields load as missing, everything else stays text until coerced.
    pub(crate) fn from_field(field: &str) -> Self {
        if field.is_empty() {
            Cell::Missing
        } else {
            Cell::Text(field.to_string())
        }
    }

    pub(crate) fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub(crate) fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(text) => write!(f, "{}", text),
            Cell::Number(value) => write!(f, "{}", value),
            Cell::Missing => write!(f, "NaN"),
        }
    }
}
