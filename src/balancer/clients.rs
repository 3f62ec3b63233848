use crate::error::{BalancerError, Result};

/// Remaining request budget per client, indexed by client id.
#[derive(Debug, Default)]
pub struct ClientLedger {
    remaining: Vec<u64>,
}

impl ClientLedger {
    pub fn new(clients: usize, requests_per_client: u64) -> Self {
        Self {
            remaining: vec![requests_per_client; clients],
        }
    }

    /// Check that `client_id` exists and still has budget, without spending it.
    pub fn check(&self, client_id: u64) -> Result<()> {
        match self.remaining(client_id) {
            None => Err(BalancerError::UnknownClient(client_id)),
            Some(0) => Err(BalancerError::ClientQuotaExhausted(client_id)),
            Some(_) => Ok(()),
        }
    }

    /// Spend one request from the client's budget.
    pub fn consume(&mut self, client_id: u64) -> Result<()> {
        self.check(client_id)?;
        if let Some(budget) = usize::try_from(client_id)
            .ok()
            .and_then(|idx| self.remaining.get_mut(idx))
        {
            *budget -= 1;
        }
        Ok(())
    }

    pub fn remaining(&self, client_id: u64) -> Option<u64> {
        usize::try_from(client_id)
            .ok()
            .and_then(|idx| self.remaining.get(idx))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }
}
