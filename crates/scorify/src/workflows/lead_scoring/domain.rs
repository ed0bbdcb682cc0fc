use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for customers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerKey(pub String);

/// Identifier wrapper for campaigns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampaignKey(pub String);

impl fmt::Display for CustomerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for CampaignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The natural key of a score: one record per pair, ever.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    pub customer_key: CustomerKey,
    pub campaign_key: CampaignKey,
}

impl PairKey {
    pub fn new(customer_key: CustomerKey, campaign_key: CampaignKey) -> Self {
        Self {
            customer_key,
            campaign_key,
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.customer_key, self.campaign_key)
    }
}

/// Customer demographics and finances. Only the attributes after `address`
/// feed the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub key: CustomerKey,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub age: Option<u32>,
    pub job: Option<String>,
    pub marital: Option<String>,
    pub education: Option<String>,
    pub default: Option<String>,
    pub balance: Option<f64>,
    pub housing: Option<String>,
    pub loan: Option<String>,
}

/// Marketing contact owned by exactly one customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub key: CampaignKey,
    pub customer_key: CustomerKey,
    pub contact: Option<String>,
    pub day_of_week: Option<String>,
    pub month: Option<String>,
    pub campaign: Option<i64>,
    pub previous: Option<i64>,
    pub pdays: Option<i64>,
    pub poutcome: Option<String>,
}

/// One row of the macro-economic dataset, keyed by period label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroRecord {
    pub month: Option<String>,
    pub emp_var_rate: Option<f64>,
    pub cons_price_idx: Option<f64>,
    pub cons_conf_idx: Option<f64>,
    pub euribor3m: Option<f64>,
    pub nr_employed: Option<f64>,
}

/// Binary outcome attached to every score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictedLabel {
    Yes,
    No,
}

impl PredictedLabel {
    /// `score >= threshold` is a yes, including the boundary itself.
    pub fn from_score(score: f64, threshold: f64) -> Self {
        if score >= threshold {
            Self::Yes
        } else {
            Self::No
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }
}

/// Identifier stamped on every record produced by one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub Uuid);

impl BatchId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Durable result of scoring one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub id: Uuid,
    pub customer_key: CustomerKey,
    pub campaign_key: CampaignKey,
    pub predicted_label: PredictedLabel,
    pub score: f64,
    pub threshold: f64,
    pub model_version: String,
    pub batch_id: BatchId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScoreRecord {
    pub fn pair_key(&self) -> PairKey {
        PairKey::new(self.customer_key.clone(), self.campaign_key.clone())
    }
}

/// Settings fixed for the whole run plus its running tallies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRun {
    pub batch_id: BatchId,
    pub model_version: String,
    pub threshold: f64,
    pub started_at: DateTime<Utc>,
    pub created: usize,
    pub skipped: usize,
}

impl BatchRun {
    pub fn begin(model_version: impl Into<String>, threshold: f64) -> Self {
        Self {
            batch_id: BatchId::generate(),
            model_version: model_version.into(),
            threshold,
            started_at: Utc::now(),
            created: 0,
            skipped: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    NoNewData,
    Error,
}

impl RunStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NoNewData => "no_new_data",
            Self::Error => "error",
        }
    }
}

/// What a caller of `run_batch` gets back, whatever the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub status: RunStatus,
    pub batch_id: BatchId,
    pub model_version: String,
    pub created: usize,
    pub skipped: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RunResult {
    pub fn is_error(&self) -> bool {
        self.status == RunStatus::Error
    }
}

/// Yes/no tally over committed records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelSummary {
    pub total: usize,
    pub yes: usize,
    pub no: usize,
}

pub fn summarize_labels<'a, I>(records: I) -> LabelSummary
where
    I: IntoIterator<Item = &'a ScoreRecord>,
{
    records
        .into_iter()
        .fold(LabelSummary::default(), |mut summary, record| {
            summary.total += 1;
            match record.predicted_label {
                PredictedLabel::Yes => summary.yes += 1,
                PredictedLabel::No => summary.no += 1,
            }
            summary
        })
}
