use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{Campaign, Customer};
use super::macro_context::MacroContext;

/// Feature names in the order the model was trained on.
pub const FEATURE_NAMES: [&str; 19] = [
    "age",
    "job",
    "marital",
    "education",
    "default",
    "housing",
    "loan",
    "contact",
    "month",
    "day_of_week",
    "campaign",
    "pdays",
    "previous",
    "poutcome",
    "emp.var.rate",
    "cons.price.idx",
    "cons.conf.idx",
    "euribor3m",
    "nr.employed",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Null,
    Integer(i64),
    Number(f64),
    Text(String),
}

impl FeatureValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Number(value) => Some(*value),
            Self::Null | Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<Option<String>> for FeatureValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Text)
    }
}

impl From<Option<i64>> for FeatureValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Self::Null, Self::Integer)
    }
}

impl From<Option<f64>> for FeatureValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Null, Self::Number)
    }
}

/// Named inputs for one (customer, campaign) pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeaturePayload(BTreeMap<String, FeatureValue>);

impl FeaturePayload {
    /// Customer attributes, campaign attributes, then the macro indicators
    /// for the campaign's period. Missing values stay `Null`.
    pub fn assemble(customer: &Customer, campaign: &Campaign, context: &MacroContext) -> Self {
        let mut payload = Self::default();
        payload
            .set("age", customer.age.map(i64::from))
            .set("job", customer.job.clone())
            .set("marital", customer.marital.clone())
            .set("education", customer.education.clone())
            .set("default", customer.default.clone())
            .set("housing", customer.housing.clone())
            .set("loan", customer.loan.clone())
            .set("contact", campaign.contact.clone())
            .set("month", campaign.month.clone())
            .set("day_of_week", campaign.day_of_week.clone())
            .set("campaign", campaign.campaign)
            .set("pdays", campaign.pdays)
            .set("previous", campaign.previous)
            .set("poutcome", campaign.poutcome.clone())
            .set("emp.var.rate", context.emp_var_rate)
            .set("cons.price.idx", context.cons_price_idx)
            .set("cons.conf.idx", context.cons_conf_idx)
            .set("euribor3m", context.euribor3m)
            .set("nr.employed", context.nr_employed);
        payload
    }

    pub fn set(&mut self, name: &str, value: impl Into<FeatureValue>) -> &mut Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
