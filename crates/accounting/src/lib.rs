//! Accounting module: chart of accounts, journals, fiscal years, sequences and
//! double-entry account moves (event-sourced).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns. Balances are
//! derived by projections over `AccountMovePosted` events, never stored here.

pub mod account;
pub mod account_move;
pub mod chart;
pub mod fiscal_year;
pub mod journal;
pub mod sequence;

pub use account::{Account, AccountCommand, AccountCreated, AccountEvent, AccountId, AccountKind, CreateAccount};
pub use account_move::{
    AccountMove, AccountMoveCommand, AccountMoveCreated, AccountMoveEvent, AccountMoveId,
    AccountMovePosted, AccountMoveState, CreateAccountMove, MoveLine, MoveOrigin, PostAccountMove,
    is_balanced,
};
pub use chart::{
    AccountTemplate, ChartTemplate, ChartTemplateCommand, ChartTemplateCreated, ChartTemplateEvent,
    ChartTemplateId, CreateChartTemplate, MINIMAL_CHART_NAME, minimal_chart, plan_accounts,
};
pub use fiscal_year::{
    ClosePeriod, CreateFiscalYear, FiscalYear, FiscalYearCommand, FiscalYearCreated,
    FiscalYearEvent, FiscalYearId, Period, PeriodClosed, PeriodState, monthly_periods,
};
pub use journal::{CreateJournal, Journal, JournalCommand, JournalCreated, JournalEvent, JournalId, JournalKind};
pub use sequence::{
    ACCOUNT_MOVE_SEQUENCE_CODE, CreateSequence, IssueNumber, NumberIssued, Sequence,
    SequenceCommand, SequenceCreated, SequenceEvent, SequenceId,
};
