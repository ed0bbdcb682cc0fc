use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::config::ScoringConfig;
use crate::workflows::lead_scoring::{
    BatchId, BatchOrchestrator, Campaign, CampaignKey, Customer, CustomerKey, FeaturePayload,
    InMemoryScoreStore, InferenceError, MacroRecord, MetricsError, MetricsSink, PairKey,
    RepositoryError, ScoreRecord, ScoreRepository, ScoringModel,
};

pub(super) fn customer(key: &str) -> Customer {
    Customer {
        key: CustomerKey(key.to_string()),
        name: format!("Customer {key}"),
        email: Some(format!("{key}@example.com")),
        phone: None,
        address: None,
        age: Some(41),
        job: Some("technician".to_string()),
        marital: Some("married".to_string()),
        education: Some("high.school".to_string()),
        default: Some("no".to_string()),
        balance: Some(820.0),
        housing: Some("yes".to_string()),
        loan: Some("no".to_string()),
    }
}

pub(super) fn campaign(key: &str, customer: &str) -> Campaign {
    Campaign {
        key: CampaignKey(key.to_string()),
        customer_key: CustomerKey(customer.to_string()),
        contact: Some("cellular".to_string()),
        day_of_week: Some("mon".to_string()),
        month: Some("may".to_string()),
        campaign: Some(1),
        previous: Some(0),
        pdays: Some(999),
        poutcome: Some("nonexistent".to_string()),
    }
}

pub(super) fn macro_row(month: &str, euribor3m: f64) -> MacroRecord {
    MacroRecord {
        month: Some(month.to_string()),
        emp_var_rate: Some(-1.8),
        cons_price_idx: Some(92.893),
        cons_conf_idx: Some(-46.2),
        euribor3m: Some(euribor3m),
        nr_employed: Some(5099.1),
    }
}

pub(super) fn pair(customer: &str, campaign: &str) -> PairKey {
    PairKey::new(
        CustomerKey(customer.to_string()),
        CampaignKey(campaign.to_string()),
    )
}

/// Store with customers `c1..=cN`, each owning campaign `kN`.
pub(super) fn seeded_store(count: usize) -> Arc<InMemoryScoreStore> {
    let customers = (1..=count).map(|i| customer(&format!("c{i}"))).collect();
    let campaigns = (1..=count)
        .map(|i| campaign(&format!("k{i}"), &format!("c{i}")))
        .collect();
    Arc::new(InMemoryScoreStore::new(
        customers,
        campaigns,
        vec![macro_row("may", 1.313)],
    ))
}

pub(super) fn scoring_config() -> ScoringConfig {
    ScoringConfig {
        model_version: "v1.0".to_string(),
        threshold: 0.5,
        parallel: false,
    }
}

pub(super) struct FixedModel(pub f64);

impl ScoringModel for FixedModel {
    fn score(&self, _features: &FeaturePayload) -> Result<f64, InferenceError> {
        Ok(self.0)
    }
}

/// Scores with a closure over the assembled features.
pub(super) struct FnModel<F>(pub F);

impl<F> ScoringModel for FnModel<F>
where
    F: Fn(&FeaturePayload) -> Result<f64, InferenceError> + Send + Sync,
{
    fn score(&self, features: &FeaturePayload) -> Result<f64, InferenceError> {
        (self.0)(features)
    }
}

#[derive(Default)]
pub(super) struct RecordingSink {
    points: Mutex<Vec<(String, f64)>>,
}

impl RecordingSink {
    pub(super) fn points(&self) -> Vec<(String, f64)> {
        self.points.lock().expect("metrics mutex poisoned").clone()
    }

    pub(super) fn last(&self, name: &str) -> Option<f64> {
        self.points()
            .into_iter()
            .rev()
            .find(|(metric, _)| metric == name)
            .map(|(_, value)| value)
    }
}

impl MetricsSink for RecordingSink {
    fn emit(&self, name: &str, value: f64) -> Result<(), MetricsError> {
        self.points
            .lock()
            .expect("metrics mutex poisoned")
            .push((name.to_string(), value));
        Ok(())
    }
}

pub(super) struct DownSink;

impl MetricsSink for DownSink {
    fn emit(&self, _name: &str, _value: f64) -> Result<(), MetricsError> {
        Err(MetricsError::Unavailable("monitoring endpoint down".to_string()))
    }
}

pub(super) fn orchestrator<R>(
    repository: Arc<R>,
    model: Arc<dyn ScoringModel>,
) -> (Arc<BatchOrchestrator<R, RecordingSink>>, Arc<RecordingSink>)
where
    R: ScoreRepository + 'static,
{
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = Arc::new(BatchOrchestrator::new(
        repository,
        model,
        Arc::clone(&sink),
        scoring_config(),
    ));
    (orchestrator, sink)
}

/// Delegates to an in-memory store, failing the selected operation.
pub(super) struct FaultyRepository {
    pub(super) inner: Arc<InMemoryScoreStore>,
    pub(super) fail_campaigns: bool,
    pub(super) fail_commit: bool,
}

impl FaultyRepository {
    pub(super) fn failing_campaigns(inner: Arc<InMemoryScoreStore>) -> Self {
        Self {
            inner,
            fail_campaigns: true,
            fail_commit: false,
        }
    }

    pub(super) fn failing_commit(inner: Arc<InMemoryScoreStore>) -> Self {
        Self {
            inner,
            fail_campaigns: false,
            fail_commit: true,
        }
    }
}

impl ScoreRepository for FaultyRepository {
    fn load_customers(&self) -> Result<Vec<Customer>, RepositoryError> {
        self.inner.load_customers()
    }

    fn load_campaigns(&self) -> Result<Vec<Campaign>, RepositoryError> {
        if self.fail_campaigns {
            return Err(RepositoryError::Unavailable("campaign table offline".to_string()));
        }
        self.inner.load_campaigns()
    }

    fn load_macro_records(&self) -> Result<Vec<MacroRecord>, RepositoryError> {
        self.inner.load_macro_records()
    }

    fn load_scored_pairs(&self) -> Result<Vec<PairKey>, RepositoryError> {
        self.inner.load_scored_pairs()
    }

    fn commit_scores(&self, records: Vec<ScoreRecord>) -> Result<usize, RepositoryError> {
        if self.fail_commit {
            return Err(RepositoryError::Unavailable("connection lost mid-commit".to_string()));
        }
        self.inner.commit_scores(records)
    }

    fn scores(&self, batch_id: Option<&BatchId>) -> Result<Vec<ScoreRecord>, RepositoryError> {
        self.inner.scores(batch_id)
    }
}

/// Parks the first load until the test releases it, so a run can be held
/// open while a second trigger arrives.
pub(super) struct GatedRepository {
    inner: Arc<InMemoryScoreStore>,
    entered: Mutex<Option<Sender<()>>>,
    release: Mutex<Receiver<()>>,
}

pub(super) struct Gate {
    pub(super) entered: Receiver<()>,
    pub(super) release: Sender<()>,
}

impl GatedRepository {
    pub(super) fn new(inner: Arc<InMemoryScoreStore>) -> (Self, Gate) {
        let (entered_tx, entered_rx) = channel();
        let (release_tx, release_rx) = channel();
        let repository = Self {
            inner,
            entered: Mutex::new(Some(entered_tx)),
            release: Mutex::new(release_rx),
        };
        let gate = Gate {
            entered: entered_rx,
            release: release_tx,
        };
        (repository, gate)
    }
}

impl ScoreRepository for GatedRepository {
    fn load_customers(&self) -> Result<Vec<Customer>, RepositoryError> {
        let signal = self.entered.lock().expect("gate mutex poisoned").take();
        if let Some(entered) = signal {
            entered.send(()).expect("test waits for entry");
            self.release
                .lock()
                .expect("gate mutex poisoned")
                .recv()
                .expect("test releases the gate");
        }
        self.inner.load_customers()
    }

    fn load_campaigns(&self) -> Result<Vec<Campaign>, RepositoryError> {
        self.inner.load_campaigns()
    }

    fn load_macro_records(&self) -> Result<Vec<MacroRecord>, RepositoryError> {
        self.inner.load_macro_records()
    }

    fn load_scored_pairs(&self) -> Result<Vec<PairKey>, RepositoryError> {
        self.inner.load_scored_pairs()
    }

    fn commit_scores(&self, records: Vec<ScoreRecord>) -> Result<usize, RepositoryError> {
        self.inner.commit_scores(records)
    }

    fn scores(&self, batch_id: Option<&BatchId>) -> Result<Vec<ScoreRecord>, RepositoryError> {
        self.inner.scores(batch_id)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body readable");
    serde_json::from_slice(&body).expect("body is json")
}
