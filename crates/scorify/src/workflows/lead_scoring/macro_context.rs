use std::collections::HashMap;

use serde::Serialize;

use super::domain::MacroRecord;

/// Economic indicators for one period. Every field is `None` when the
/// period is unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MacroContext {
    pub emp_var_rate: Option<f64>,
    pub cons_price_idx: Option<f64>,
    pub cons_conf_idx: Option<f64>,
    pub euribor3m: Option<f64>,
    pub nr_employed: Option<f64>,
}

impl MacroContext {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<&MacroRecord> for MacroContext {
    fn from(record: &MacroRecord) -> Self {
        Self {
            emp_var_rate: record.emp_var_rate,
            cons_price_idx: record.cons_price_idx,
            cons_conf_idx: record.cons_conf_idx,
            euribor3m: record.euribor3m,
            nr_employed: record.nr_employed,
        }
    }
}

/// Period label -> indicators, built once per run.
#[derive(Debug, Clone, Default)]
pub struct MacroContextResolver {
    by_period: HashMap<String, MacroContext>,
}

impl MacroContextResolver {
    /// Rows without a period label are ignored; a repeated label keeps the
    /// last row.
    pub fn from_records(records: &[MacroRecord]) -> Self {
        let by_period = records
            .iter()
            .filter_map(|record| {
                record
                    .month
                    .as_ref()
                    .map(|month| (month.clone(), MacroContext::from(record)))
            })
            .collect();

        Self { by_period }
    }

    pub fn resolve(&self, period: Option<&str>) -> MacroContext {
        period
            .and_then(|label| self.by_period.get(label))
            .copied()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_period.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_period.is_empty()
    }
}
