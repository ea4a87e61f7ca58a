use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value as JsonValue;

use shopkeeper_accounting::{AccountId, AccountMoveEvent};
use shopkeeper_core::CompanyId;
use shopkeeper_events::EventEnvelope;

use super::{ProjectionError, StreamCursors, check_company};
use crate::read_model::{CompanyStore, InMemoryCompanyStore};
use crate::streams::aggregate_types;

/// Running debit/credit totals of one account over posted moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountBalance {
    pub account_id: AccountId,
    pub debit: Decimal,
    pub credit: Decimal,
    /// Number of posted lines that touched the account.
    pub lines: u64,
}

impl AccountBalance {
    /// Debit-positive balance.
    pub fn balance(&self) -> Decimal {
        self.debit - self.credit
    }
}

/// Projection: posted account moves → balances per account.
///
/// Draft moves never count; only `AccountMovePosted` carries lines here.
#[derive(Debug)]
pub struct AccountBalancesProjection<S = InMemoryCompanyStore<AccountId, AccountBalance>>
where
    S: CompanyStore<AccountId, AccountBalance>,
{
    store: S,
    cursors: StreamCursors,
}

impl Default for AccountBalancesProjection {
    fn default() -> Self {
        Self::new(InMemoryCompanyStore::new())
    }
}

impl<S> AccountBalancesProjection<S>
where
    S: CompanyStore<AccountId, AccountBalance>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, company_id: CompanyId, account_id: AccountId) -> Option<AccountBalance> {
        self.store.get(company_id, &account_id)
    }

    pub fn list(&self, company_id: CompanyId) -> Vec<AccountBalance> {
        self.store.list(company_id)
    }

    pub fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != aggregate_types::ACCOUNT_MOVE {
            return Ok(());
        }
        if !self.cursors.accept(envelope)? {
            return Ok(());
        }

        let ev: AccountMoveEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        if let AccountMoveEvent::Posted(posted) = &ev {
            check_company(envelope, posted.company_id)?;
            let company_id = envelope.company_id();
            // Totals are staged so an overflow leaves every balance untouched.
            let mut staged: Vec<AccountBalance> = Vec::with_capacity(posted.lines.len());
            for line in &posted.lines {
                let idx = match staged.iter().position(|b| b.account_id == line.account) {
                    Some(idx) => idx,
                    None => {
                        staged.push(self.store.get(company_id, &line.account).unwrap_or(AccountBalance {
                            account_id: line.account,
                            debit: Decimal::ZERO,
                            credit: Decimal::ZERO,
                            lines: 0,
                        }));
                        staged.len() - 1
                    }
                };
                let balance = &mut staged[idx];
                balance.debit = balance
                    .debit
                    .checked_add(line.debit)
                    .ok_or_else(|| overflow(line.account))?;
                balance.credit = balance
                    .credit
                    .checked_add(line.credit)
                    .ok_or_else(|| overflow(line.account))?;
                balance.lines += 1;
            }
            for balance in staged {
                self.store.upsert(company_id, balance.account_id, balance);
            }
        }

        self.cursors.advance(envelope);
        Ok(())
    }

    pub fn reset(&self) {
        self.cursors.clear();
        self.store.clear();
    }
}

fn overflow(account: AccountId) -> ProjectionError {
    ProjectionError::Overflow(format!("balance of account {account}"))
}
