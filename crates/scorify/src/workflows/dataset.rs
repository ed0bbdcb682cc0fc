//! CSV seed data for the scoring store.
//!
//! Column names follow the upstream export (`id`, `customerId`, ...). Empty
//! cells read as missing values.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use tracing::info;

use crate::workflows::lead_scoring::{
    Campaign, CampaignKey, Customer, CustomerKey, InMemoryScoreStore, MacroRecord,
};

pub const CUSTOMERS_FILE: &str = "customers.csv";
pub const CAMPAIGNS_FILE: &str = "campaigns.csv";
pub const MACRO_FILE: &str = "macro.csv";

#[derive(Debug)]
pub enum DatasetError {
    Io { path: PathBuf, source: std::io::Error },
    Csv { file: &'static str, source: csv::Error },
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            DatasetError::Csv { file, source } => write!(f, "invalid {} data: {}", file, source),
        }
    }
}

impl std::error::Error for DatasetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DatasetError::Io { source, .. } => Some(source),
            DatasetError::Csv { source, .. } => Some(source),
        }
    }
}

/// Customers, campaigns, and macro rows loaded together.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub customers: Vec<Customer>,
    pub campaigns: Vec<Campaign>,
    pub macro_records: Vec<MacroRecord>,
}

impl Dataset {
    /// Reads `customers.csv`, `campaigns.csv`, and the optional `macro.csv`
    /// from `dir`.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, DatasetError> {
        let dir = dir.as_ref();
        let customers = open(dir.join(CUSTOMERS_FILE))?;
        let campaigns = open(dir.join(CAMPAIGNS_FILE))?;

        let macro_path = dir.join(MACRO_FILE);
        let macro_data = if macro_path.exists() {
            Some(open(macro_path)?)
        } else {
            None
        };

        let dataset = Self::from_readers(customers, campaigns, macro_data)?;
        info!(
            dir = %dir.display(),
            customers = dataset.customers.len(),
            campaigns = dataset.campaigns.len(),
            macro_rows = dataset.macro_records.len(),
            "seed dataset loaded"
        );
        Ok(dataset)
    }

    pub fn from_readers<A, B, C>(
        customers: A,
        campaigns: B,
        macro_data: Option<C>,
    ) -> Result<Self, DatasetError>
    where
        A: Read,
        B: Read,
        C: Read,
    {
        let customers = parse_rows::<_, CustomerRow>(customers, CUSTOMERS_FILE)?
            .into_iter()
            .map(Customer::from)
            .collect();
        let campaigns = parse_rows::<_, CampaignRow>(campaigns, CAMPAIGNS_FILE)?
            .into_iter()
            .map(Campaign::from)
            .collect();
        let macro_records = match macro_data {
            Some(reader) => parse_rows::<_, MacroRow>(reader, MACRO_FILE)?
                .into_iter()
                .map(MacroRecord::from)
                .collect(),
            None => Vec::new(),
        };

        Ok(Self {
            customers,
            campaigns,
            macro_records,
        })
    }

    pub fn into_store(self) -> InMemoryScoreStore {
        InMemoryScoreStore::new(self.customers, self.campaigns, self.macro_records)
    }
}

fn open(path: PathBuf) -> Result<std::fs::File, DatasetError> {
    std::fs::File::open(&path).map_err(|source| DatasetError::Io { path, source })
}

fn parse_rows<R, T>(reader: R, file: &'static str) -> Result<Vec<T>, DatasetError>
where
    R: Read,
    T: for<'de> Deserialize<'de>,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader
        .deserialize::<T>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| DatasetError::Csv { file, source })
}

#[derive(Debug, Deserialize)]
struct CustomerRow {
    id: String,
    name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    email: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    phone: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    address: Option<String>,
    #[serde(default)]
    age: Option<u32>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    job: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    marital: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    education: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    default: Option<String>,
    #[serde(default)]
    balance: Option<f64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    housing: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    loan: Option<String>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Self {
            key: CustomerKey(row.id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            age: row.age,
            job: row.job,
            marital: row.marital,
            education: row.education,
            default: row.default,
            balance: row.balance,
            housing: row.housing,
            loan: row.loan,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CampaignRow {
    id: String,
    #[serde(rename = "customerId")]
    customer_id: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    contact: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    day_of_week: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    month: Option<String>,
    #[serde(default)]
    campaign: Option<i64>,
    #[serde(default)]
    previous: Option<i64>,
    #[serde(default)]
    pdays: Option<i64>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    poutcome: Option<String>,
}

impl From<CampaignRow> for Campaign {
    fn from(row: CampaignRow) -> Self {
        Self {
            key: CampaignKey(row.id),
            customer_key: CustomerKey(row.customer_id),
            contact: row.contact,
            day_of_week: row.day_of_week,
            month: row.month,
            campaign: row.campaign,
            previous: row.previous,
            pdays: row.pdays,
            poutcome: row.poutcome,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MacroRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    month: Option<String>,
    #[serde(default)]
    emp_var_rate: Option<f64>,
    #[serde(default)]
    cons_price_idx: Option<f64>,
    #[serde(default)]
    cons_conf_idx: Option<f64>,
    #[serde(default)]
    euribor3m: Option<f64>,
    #[serde(default)]
    nr_employed: Option<f64>,
}

impl From<MacroRow> for MacroRecord {
    fn from(row: MacroRow) -> Self {
        Self {
            month: row.month,
            emp_var_rate: row.emp_var_rate,
            cons_price_idx: row.cons_price_idx,
            cons_conf_idx: row.cons_conf_idx,
            euribor3m: row.euribor3m,
            nr_employed: row.nr_employed,
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::lead_scoring::ScoreRepository;
    use std::io::Cursor;

    const CUSTOMERS: &str = "id,name,email,phone,address,age,job,marital,education,default,balance,housing,loan\n\
c1,Ana,ana@example.com,,,35,admin.,married,university.degree,no,1200.5,yes,no\n\
c2,Budi,,,,,,,,,,,\n";

    const CAMPAIGNS: &str = "id,contact,day_of_week,month,campaign,previous,pdays,poutcome,customerId\n\
k1,cellular,thu,may,2,0,999,nonexistent,c1\n\
k2,,,,,,,,c2\n";

    const MACRO: &str = "month,emp_var_rate,cons_price_idx,cons_conf_idx,euribor3m,nr_employed\n\
may,-1.8,92.893,-46.2,1.313,5099.1\n";

    #[test]
    fn parses_all_three_files() {
        let dataset = Dataset::from_readers(
            Cursor::new(CUSTOMERS),
            Cursor::new(CAMPAIGNS),
            Some(Cursor::new(MACRO)),
        )
        .expect("dataset parses");

        assert_eq!(dataset.customers.len(), 2);
        assert_eq!(dataset.customers[0].age, Some(35));
        assert_eq!(dataset.customers[0].balance, Some(1200.5));
        assert_eq!(dataset.campaigns[0].customer_key, CustomerKey("c1".to_string()));
        assert_eq!(dataset.campaigns[0].pdays, Some(999));
        assert_eq!(dataset.macro_records[0].euribor3m, Some(1.313));
    }

    #[test]
    fn empty_cells_become_none() {
        let dataset = Dataset::from_readers(
            Cursor::new(CUSTOMERS),
            Cursor::new(CAMPAIGNS),
            None::<Cursor<&str>>,
        )
        .expect("dataset parses");

        let sparse = &dataset.customers[1];
        assert_eq!(sparse.email, None);
        assert_eq!(sparse.age, None);
        assert_eq!(sparse.job, None);
        let campaign = &dataset.campaigns[1];
        assert_eq!(campaign.month, None);
        assert_eq!(campaign.campaign, None);
        assert!(dataset.macro_records.is_empty());
    }

    #[test]
    fn malformed_numbers_are_reported_with_file_name() {
        let customers = "id,name,age\nc1,Ana,thirty\n";
        let error = Dataset::from_readers(
            Cursor::new(customers),
            Cursor::new(CAMPAIGNS),
            None::<Cursor<&str>>,
        )
        .expect_err("bad age rejected");

        match error {
            DatasetError::Csv { file, .. } => assert_eq!(file, CUSTOMERS_FILE),
            other => panic!("expected csv error, got {other:?}"),
        }
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let error = Dataset::from_dir("./does-not-exist").expect_err("missing dir");
        assert!(matches!(error, DatasetError::Io { .. }));
    }

    #[test]
    fn dataset_seeds_the_store() {
        let store = Dataset::from_readers(
            Cursor::new(CUSTOMERS),
            Cursor::new(CAMPAIGNS),
            Some(Cursor::new(MACRO)),
        )
        .expect("dataset parses")
        .into_store();

        assert_eq!(store.load_customers().expect("customers").len(), 2);
        assert_eq!(store.load_campaigns().expect("campaigns").len(), 2);
        assert_eq!(store.load_macro_records().expect("macro").len(), 1);
    }
}
