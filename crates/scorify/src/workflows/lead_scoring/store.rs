use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, RwLock};

use chrono::Utc;

use super::domain::{BatchId, Campaign, Customer, MacroRecord, PairKey, ScoreRecord};
use super::repository::{RepositoryError, ScoreRepository};

/// Process-local store backing the service and the tests.
///
/// Score writes go through a single mutex, so a commit either lands whole
/// or not at all, and the pair set acts as the uniqueness constraint.
#[derive(Debug, Default)]
pub struct InMemoryScoreStore {
    customers: RwLock<Vec<Customer>>,
    campaigns: RwLock<Vec<Campaign>>,
    macro_records: RwLock<Vec<MacroRecord>>,
    scores: Mutex<ScoreTable>,
}

#[derive(Debug, Default)]
struct ScoreTable {
    rows: Vec<ScoreRecord>,
    pairs: HashSet<PairKey>,
}

impl InMemoryScoreStore {
    pub fn new(
        customers: Vec<Customer>,
        campaigns: Vec<Campaign>,
        macro_records: Vec<MacroRecord>,
    ) -> Self {
        Self {
            customers: RwLock::new(customers),
            campaigns: RwLock::new(campaigns),
            macro_records: RwLock::new(macro_records),
            scores: Mutex::default(),
        }
    }

    pub fn add_customers(
        &self,
        customers: impl IntoIterator<Item = Customer>,
    ) -> Result<(), RepositoryError> {
        self.customers
            .write()
            .map_err(|_| poisoned("customers"))?
            .extend(customers);
        Ok(())
    }

    pub fn add_campaigns(
        &self,
        campaigns: impl IntoIterator<Item = Campaign>,
    ) -> Result<(), RepositoryError> {
        self.campaigns
            .write()
            .map_err(|_| poisoned("campaigns"))?
            .extend(campaigns);
        Ok(())
    }

    pub fn add_macro_records(
        &self,
        records: impl IntoIterator<Item = MacroRecord>,
    ) -> Result<(), RepositoryError> {
        self.macro_records
            .write()
            .map_err(|_| poisoned("macro data"))?
            .extend(records);
        Ok(())
    }

    pub fn score_count(&self) -> Result<usize, RepositoryError> {
        Ok(self.table()?.rows.len())
    }

    fn table(&self) -> Result<MutexGuard<'_, ScoreTable>, RepositoryError> {
        self.scores.lock().map_err(|_| poisoned("scores"))
    }
}

fn poisoned(table: &str) -> RepositoryError {
    RepositoryError::Unavailable(format!("{table} table lock poisoned"))
}

impl ScoreRepository for InMemoryScoreStore {
    fn load_customers(&self) -> Result<Vec<Customer>, RepositoryError> {
        Ok(self
            .customers
            .read()
            .map_err(|_| poisoned("customers"))?
            .clone())
    }

    fn load_campaigns(&self) -> Result<Vec<Campaign>, RepositoryError> {
        Ok(self
            .campaigns
            .read()
            .map_err(|_| poisoned("campaigns"))?
            .clone())
    }

    fn load_macro_records(&self) -> Result<Vec<MacroRecord>, RepositoryError> {
        Ok(self
            .macro_records
            .read()
            .map_err(|_| poisoned("macro data"))?
            .clone())
    }

    fn load_scored_pairs(&self) -> Result<Vec<PairKey>, RepositoryError> {
        Ok(self.table()?.pairs.iter().cloned().collect())
    }

    fn commit_scores(&self, records: Vec<ScoreRecord>) -> Result<usize, RepositoryError> {
        let mut table = self.table()?;

        // Validate the whole batch before the first insert.
        let mut incoming = HashSet::with_capacity(records.len());
        for record in &records {
            let key = record.pair_key();
            if table.pairs.contains(&key) || !incoming.insert(key.clone()) {
                return Err(RepositoryError::Conflict(key));
            }
        }

        let committed_at = Utc::now();
        let count = records.len();
        for mut record in records {
            record.updated_at = record.updated_at.max(committed_at);
            table.rows.push(record);
        }
        table.pairs.extend(incoming);

        Ok(count)
    }

    fn scores(&self, batch_id: Option<&BatchId>) -> Result<Vec<ScoreRecord>, RepositoryError> {
        let table = self.table()?;
        Ok(table
            .rows
            .iter()
            .filter(|record| batch_id.map_or(true, |id| record.batch_id == *id))
            .cloned()
            .collect())
    }
}
