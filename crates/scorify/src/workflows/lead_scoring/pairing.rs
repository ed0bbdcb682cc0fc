use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::domain::{Campaign, Customer, CustomerKey, PairKey};

/// A campaign joined to the customer that owns it.
#[derive(Debug, Clone, Copy)]
pub struct CandidatePair<'a> {
    pub customer: &'a Customer,
    pub campaign: &'a Campaign,
}

impl CandidatePair<'_> {
    pub fn key(&self) -> PairKey {
        PairKey::new(self.customer.key.clone(), self.campaign.key.clone())
    }
}

/// Hash join of campaigns onto their owning customers.
#[derive(Debug, Default)]
pub struct CandidatePairIndex<'a> {
    pairs: Vec<CandidatePair<'a>>,
    orphaned: usize,
    duplicates: usize,
}

impl<'a> CandidatePairIndex<'a> {
    /// Indexes customers by key, then walks the campaigns once. Campaigns
    /// whose owner is not loaded are dropped; a campaign key seen twice for
    /// the same owner yields one pair.
    pub fn build(customers: &'a [Customer], campaigns: &'a [Campaign]) -> Self {
        let mut owners: HashMap<&'a CustomerKey, &'a Customer> =
            HashMap::with_capacity(customers.len());
        for customer in customers {
            owners.entry(&customer.key).or_insert(customer);
        }

        let mut index = Self {
            pairs: Vec::with_capacity(campaigns.len()),
            ..Self::default()
        };
        let mut seen = HashSet::with_capacity(campaigns.len());

        for campaign in campaigns {
            let Some(customer) = owners.get(&campaign.customer_key).copied() else {
                debug!(
                    campaign = %campaign.key,
                    customer = %campaign.customer_key,
                    "campaign owner not loaded; excluded from pairing"
                );
                index.orphaned += 1;
                continue;
            };

            if !seen.insert((&campaign.customer_key, &campaign.key)) {
                index.duplicates += 1;
                continue;
            }

            index.pairs.push(CandidatePair { customer, campaign });
        }

        index
    }

    pub fn pairs(&self) -> &[CandidatePair<'a>] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Campaigns whose owner was missing.
    pub fn orphaned(&self) -> usize {
        self.orphaned
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn into_pairs(self) -> Vec<CandidatePair<'a>> {
        self.pairs
    }
}
