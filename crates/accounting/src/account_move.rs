//! Account moves: double-entry transactions, drafted then posted.
//!
//! Invariants:
//! - each line carries a debit or a credit, never both, and neither is negative;
//! - a move can only be posted when its debits equal its credits;
//! - posting needs an open period containing the move date and a number
//!   issued from the fiscal year's post-move sequence;
//! - posted moves are immutable.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopkeeper_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError, checked_sum};
use shopkeeper_events::Event;
use shopkeeper_parties::PartyId;
use shopkeeper_stock::StockMoveId;

use crate::account::AccountId;
use crate::fiscal_year::{FiscalYearId, Period};
use crate::journal::JournalId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountMoveId(pub AggregateId);

impl AccountMoveId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for AccountMoveId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// What caused an account move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "model", content = "id", rename_all = "snake_case")]
pub enum MoveOrigin {
    StockMove(StockMoveId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveLine {
    pub account: AccountId,
    pub debit: Decimal,
    pub credit: Decimal,
    pub party: Option<PartyId>,
}

impl MoveLine {
    pub fn debit(account: AccountId, amount: Decimal, party: Option<PartyId>) -> Self {
        Self {
            account,
            debit: amount,
            credit: Decimal::ZERO,
            party,
        }
    }

    pub fn credit(account: AccountId, amount: Decimal, party: Option<PartyId>) -> Self {
        Self {
            account,
            debit: Decimal::ZERO,
            credit: amount,
            party,
        }
    }

    /// Signed amount, debit positive.
    pub fn balance(&self) -> Decimal {
        self.debit - self.credit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountMoveState {
    Draft,
    Posted,
}

/// Aggregate root: AccountMove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMove {
    id: AccountMoveId,
    company_id: Option<CompanyId>,
    journal: Option<JournalId>,
    date: Option<NaiveDate>,
    origin: Option<MoveOrigin>,
    lines: Vec<MoveLine>,
    state: AccountMoveState,
    number: Option<String>,
    period: Option<String>,
    version: u64,
    created: bool,
}

impl AccountMove {
    pub fn empty(id: AccountMoveId) -> Self {
        Self {
            id,
            company_id: None,
            journal: None,
            date: None,
            origin: None,
            lines: Vec::new(),
            state: AccountMoveState::Draft,
            number: None,
            period: None,
            version: 0,
            created: false,
        }
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn journal(&self) -> Option<JournalId> {
        self.journal
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn origin(&self) -> Option<MoveOrigin> {
        self.origin
    }

    pub fn lines(&self) -> &[MoveLine] {
        &self.lines
    }

    pub fn state(&self) -> AccountMoveState {
        self.state
    }

    pub fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    pub fn period(&self) -> Option<&str> {
        self.period.as_deref()
    }

    pub fn is_balanced(&self) -> bool {
        is_balanced(&self.lines)
    }
}

/// Debits equal credits. Totals outside the `Decimal` range never balance.
pub fn is_balanced(lines: &[MoveLine]) -> bool {
    let debit = checked_sum(lines.iter().map(|l| l.debit));
    let credit = checked_sum(lines.iter().map(|l| l.credit));
    matches!((debit, credit), (Some(d), Some(c)) if d == c)
}

impl AggregateRoot for AccountMove {
    type Id = AccountMoveId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccountMove {
    pub company_id: CompanyId,
    pub move_id: AccountMoveId,
    pub journal: JournalId,
    pub date: NaiveDate,
    pub origin: Option<MoveOrigin>,
    pub lines: Vec<MoveLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: PostAccountMove.
///
/// `period` is the fiscal year period the caller found for the move date;
/// `number` was issued from that fiscal year's post-move sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostAccountMove {
    pub company_id: CompanyId,
    pub move_id: AccountMoveId,
    pub fiscal_year: FiscalYearId,
    pub period: Period,
    pub number: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountMoveCommand {
    Create(CreateAccountMove),
    Post(PostAccountMove),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMoveCreated {
    pub company_id: CompanyId,
    pub move_id: AccountMoveId,
    pub journal: JournalId,
    pub date: NaiveDate,
    pub origin: Option<MoveOrigin>,
    pub lines: Vec<MoveLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Carries the lines so balance projections need no other stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMovePosted {
    pub company_id: CompanyId,
    pub move_id: AccountMoveId,
    pub fiscal_year: FiscalYearId,
    pub period: String,
    pub number: String,
    pub date: NaiveDate,
    pub lines: Vec<MoveLine>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountMoveEvent {
    Created(AccountMoveCreated),
    Posted(AccountMovePosted),
}

impl Event for AccountMoveEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AccountMoveEvent::Created(_) => "accounting.move.created",
            AccountMoveEvent::Posted(_) => "accounting.move.posted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AccountMoveEvent::Created(e) => e.occurred_at,
            AccountMoveEvent::Posted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for AccountMove {
    type Command = AccountMoveCommand;
    type Event = AccountMoveEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AccountMoveEvent::Created(e) => {
                self.id = e.move_id;
                self.company_id = Some(e.company_id);
                self.journal = Some(e.journal);
                self.date = Some(e.date);
                self.origin = e.origin;
                self.lines = e.lines.clone();
                self.state = AccountMoveState::Draft;
                self.created = true;
            }
            AccountMoveEvent::Posted(e) => {
                self.number = Some(e.number.clone());
                self.period = Some(e.period.clone());
                self.state = AccountMoveState::Posted;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AccountMoveCommand::Create(cmd) => self.handle_create(cmd),
            AccountMoveCommand::Post(cmd) => self.handle_post(cmd),
        }
    }
}

impl AccountMove {
    fn handle_create(&self, cmd: &CreateAccountMove) -> Result<Vec<AccountMoveEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("account move already exists"));
        }
        if cmd.lines.is_empty() {
            return Err(DomainError::validation("account move must have lines"));
        }
        for line in &cmd.lines {
            if line.debit < Decimal::ZERO || line.credit < Decimal::ZERO {
                return Err(DomainError::validation("debit and credit cannot be negative"));
            }
            if line.debit != Decimal::ZERO && line.credit != Decimal::ZERO {
                return Err(DomainError::validation(
                    "a line cannot carry both a debit and a credit",
                ));
            }
        }

        Ok(vec![AccountMoveEvent::Created(AccountMoveCreated {
            company_id: cmd.company_id,
            move_id: cmd.move_id,
            journal: cmd.journal,
            date: cmd.date,
            origin: cmd.origin,
            lines: cmd.lines.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_post(&self, cmd: &PostAccountMove) -> Result<Vec<AccountMoveEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.company_id != Some(cmd.company_id) {
            return Err(DomainError::invariant("company mismatch"));
        }
        if self.state == AccountMoveState::Posted {
            return Err(DomainError::transition("account move is already posted"));
        }
        if !self.is_balanced() {
            return Err(DomainError::invariant("debits must equal credits"));
        }
        let date = self
            .date
            .ok_or_else(|| DomainError::invariant("account move has no date"))?;
        if !cmd.period.contains(date) {
            return Err(DomainError::validation(format!(
                "period {} does not contain {date}",
                cmd.period.name
            )));
        }
        if !cmd.period.is_open() {
            return Err(DomainError::transition(format!(
                "period {} is closed",
                cmd.period.name
            )));
        }
        if cmd.number.trim().is_empty() {
            return Err(DomainError::validation("posted moves must be numbered"));
        }

        Ok(vec![AccountMoveEvent::Posted(AccountMovePosted {
            company_id: cmd.company_id,
            move_id: cmd.move_id,
            fiscal_year: cmd.fiscal_year,
            period: cmd.period.name.clone(),
            number: cmd.number.clone(),
            date,
            lines: self.lines.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiscal_year::{PeriodState, monthly_periods};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use shopkeeper_core::aggregate::execute;

    fn account() -> AccountId {
        AccountId::new(AggregateId::new())
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 12).unwrap()
    }

    fn april() -> Period {
        monthly_periods(date(), date()).remove(0)
    }

    fn create(company_id: CompanyId, id: AccountMoveId, lines: Vec<MoveLine>) -> AccountMoveCommand {
        AccountMoveCommand::Create(CreateAccountMove {
            company_id,
            move_id: id,
            journal: JournalId::new(AggregateId::new()),
            date: date(),
            origin: Some(MoveOrigin::StockMove(StockMoveId::generate())),
            lines,
            occurred_at: Utc::now(),
        })
    }

    fn post(company_id: CompanyId, id: AccountMoveId, period: Period) -> AccountMoveCommand {
        AccountMoveCommand::Post(PostAccountMove {
            company_id,
            move_id: id,
            fiscal_year: FiscalYearId::new(AggregateId::new()),
            period,
            number: "1".to_string(),
            occurred_at: Utc::now(),
        })
    }

    fn pair(amount: Decimal) -> Vec<MoveLine> {
        vec![
            MoveLine::debit(account(), amount, None),
            MoveLine::credit(account(), amount, Some(PartyId::new(AggregateId::new()))),
        ]
    }

    #[test]
    fn balanced_move_posts_with_number_and_period() {
        let company_id = CompanyId::new();
        let id = AccountMoveId::new(AggregateId::new());
        let mut mv = AccountMove::empty(id);

        execute(&mut mv, &create(company_id, id, pair(dec!(30.00)))).unwrap();
        assert_eq!(mv.state(), AccountMoveState::Draft);

        let events = execute(&mut mv, &post(company_id, id, april())).unwrap();
        assert_eq!(mv.state(), AccountMoveState::Posted);
        assert_eq!(mv.number(), Some("1"));
        assert_eq!(mv.period(), Some("2025-04"));
        match &events[0] {
            AccountMoveEvent::Posted(e) => assert_eq!(e.lines.len(), 2),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn zero_amount_move_is_accepted() {
        let company_id = CompanyId::new();
        let id = AccountMoveId::new(AggregateId::new());
        let mut mv = AccountMove::empty(id);
        execute(&mut mv, &create(company_id, id, pair(dec!(0)))).unwrap();
        execute(&mut mv, &post(company_id, id, april())).unwrap();
    }

    #[test]
    fn unbalanced_move_cannot_be_posted() {
        let company_id = CompanyId::new();
        let id = AccountMoveId::new(AggregateId::new());
        let mut mv = AccountMove::empty(id);
        let lines = vec![
            MoveLine::debit(account(), dec!(100), None),
            MoveLine::credit(account(), dec!(90), None),
        ];
        execute(&mut mv, &create(company_id, id, lines)).unwrap();

        let err = mv.handle(&post(company_id, id, april())).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(msg) if msg.contains("debits must equal credits")));
    }

    #[test]
    fn move_whose_totals_overflow_is_not_balanced() {
        let company_id = CompanyId::new();
        let id = AccountMoveId::new(AggregateId::new());
        let mut mv = AccountMove::empty(id);
        let mut lines = pair(Decimal::MAX);
        lines.extend(pair(Decimal::MAX));
        execute(&mut mv, &create(company_id, id, lines)).unwrap();

        assert!(!mv.is_balanced());
        let err = mv.handle(&post(company_id, id, april())).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn line_with_debit_and_credit_is_rejected() {
        let id = AccountMoveId::new(AggregateId::new());
        let line = MoveLine {
            account: account(),
            debit: dec!(1),
            credit: dec!(1),
            party: None,
        };
        let err = AccountMove::empty(id)
            .handle(&create(CompanyId::new(), id, vec![line]))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn posting_needs_an_open_period_containing_the_date() {
        let company_id = CompanyId::new();
        let id = AccountMoveId::new(AggregateId::new());
        let mut mv = AccountMove::empty(id);
        execute(&mut mv, &create(company_id, id, pair(dec!(5)))).unwrap();

        let mut closed = april();
        closed.state = PeriodState::Closed;
        let err = mv.handle(&post(company_id, id, closed)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));

        let may = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let err = mv
            .handle(&post(company_id, id, monthly_periods(may, may).remove(0)))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn posted_move_cannot_be_posted_again() {
        let company_id = CompanyId::new();
        let id = AccountMoveId::new(AggregateId::new());
        let mut mv = AccountMove::empty(id);
        execute(&mut mv, &create(company_id, id, pair(dec!(5)))).unwrap();
        execute(&mut mv, &post(company_id, id, april())).unwrap();

        let err = mv.handle(&post(company_id, id, april())).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Every posted move nets to zero across its lines.
        #[test]
        fn posted_moves_net_to_zero(cents in prop::collection::vec(0i64..10_000_000i64, 1..10)) {
            let company_id = CompanyId::new();
            for amount in cents {
                let id = AccountMoveId::new(AggregateId::new());
                let mut mv = AccountMove::empty(id);
                execute(&mut mv, &create(company_id, id, pair(Decimal::new(amount, 2)))).unwrap();
                let events = execute(&mut mv, &post(company_id, id, april())).unwrap();

                let AccountMoveEvent::Posted(posted) = &events[0] else {
                    panic!("expected a posted event");
                };
                let net: Decimal = posted.lines.iter().map(MoveLine::balance).sum();
                prop_assert_eq!(net, Decimal::ZERO);
            }
        }
    }
}
