//! Fiscal years and their monthly periods.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use shopkeeper_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError};
use shopkeeper_events::Event;

use crate::sequence::SequenceId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FiscalYearId(pub AggregateId);

impl FiscalYearId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for FiscalYearId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodState {
    Open,
    Closed,
}

/// A period of a fiscal year (one calendar month, or the tail of one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub state: PeriodState,
}

impl Period {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_open(&self) -> bool {
        self.state == PeriodState::Open
    }
}

/// Split `[start, end]` into monthly periods named `YYYY-MM`.
pub fn monthly_periods(start: NaiveDate, end: NaiveDate) -> Vec<Period> {
    let mut periods = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        let next = cursor
            .with_day(1)
            .and_then(|first| first.checked_add_months(Months::new(1)))
            .unwrap_or(NaiveDate::MAX);
        let period_end = next.pred_opt().unwrap_or(next).min(end);
        periods.push(Period {
            name: cursor.format("%Y-%m").to_string(),
            start: cursor,
            end: period_end,
            state: PeriodState::Open,
        });
        if next == NaiveDate::MAX {
            break;
        }
        cursor = next;
    }
    periods
}

/// Aggregate root: FiscalYear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiscalYear {
    id: FiscalYearId,
    company_id: Option<CompanyId>,
    name: String,
    start: NaiveDate,
    end: NaiveDate,
    post_move_sequence: Option<SequenceId>,
    periods: Vec<Period>,
    version: u64,
    created: bool,
}

impl FiscalYear {
    pub fn empty(id: FiscalYearId) -> Self {
        Self {
            id,
            company_id: None,
            name: String::new(),
            start: NaiveDate::MIN,
            end: NaiveDate::MIN,
            post_move_sequence: None,
            periods: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn post_move_sequence(&self) -> Option<SequenceId> {
        self.post_move_sequence
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.created && self.start <= date && date <= self.end
    }

    /// The open period a move dated `date` can be posted into.
    pub fn open_period_for(&self, date: NaiveDate) -> Option<&Period> {
        self.periods.iter().find(|p| p.contains(date) && p.is_open())
    }
}

impl AggregateRoot for FiscalYear {
    type Id = FiscalYearId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateFiscalYear. Monthly periods are generated with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFiscalYear {
    pub company_id: CompanyId,
    pub fiscal_year_id: FiscalYearId,
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub post_move_sequence: SequenceId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosePeriod {
    pub company_id: CompanyId,
    pub fiscal_year_id: FiscalYearId,
    pub period_name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FiscalYearCommand {
    Create(CreateFiscalYear),
    ClosePeriod(ClosePeriod),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalYearCreated {
    pub company_id: CompanyId,
    pub fiscal_year_id: FiscalYearId,
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub post_move_sequence: SequenceId,
    pub periods: Vec<Period>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodClosed {
    pub company_id: CompanyId,
    pub fiscal_year_id: FiscalYearId,
    pub period_name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FiscalYearEvent {
    Created(FiscalYearCreated),
    PeriodClosed(PeriodClosed),
}

impl Event for FiscalYearEvent {
    fn event_type(&self) -> &'static str {
        match self {
            FiscalYearEvent::Created(_) => "accounting.fiscal_year.created",
            FiscalYearEvent::PeriodClosed(_) => "accounting.fiscal_year.period_closed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            FiscalYearEvent::Created(e) => e.occurred_at,
            FiscalYearEvent::PeriodClosed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for FiscalYear {
    type Command = FiscalYearCommand;
    type Event = FiscalYearEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            FiscalYearEvent::Created(e) => {
                self.id = e.fiscal_year_id;
                self.company_id = Some(e.company_id);
                self.name = e.name.clone();
                self.start = e.start;
                self.end = e.end;
                self.post_move_sequence = Some(e.post_move_sequence);
                self.periods = e.periods.clone();
                self.created = true;
            }
            FiscalYearEvent::PeriodClosed(e) => {
                if let Some(p) = self.periods.iter_mut().find(|p| p.name == e.period_name) {
                    p.state = PeriodState::Closed;
                }
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            FiscalYearCommand::Create(cmd) => {
                if self.created {
                    return Err(DomainError::conflict("fiscal year already exists"));
                }
                if cmd.end < cmd.start {
                    return Err(DomainError::validation("fiscal year ends before it starts"));
                }
                Ok(vec![FiscalYearEvent::Created(FiscalYearCreated {
                    company_id: cmd.company_id,
                    fiscal_year_id: cmd.fiscal_year_id,
                    name: cmd.name.clone(),
                    start: cmd.start,
                    end: cmd.end,
                    post_move_sequence: cmd.post_move_sequence,
                    periods: monthly_periods(cmd.start, cmd.end),
                    occurred_at: cmd.occurred_at,
                })])
            }
            FiscalYearCommand::ClosePeriod(cmd) => {
                if !self.created {
                    return Err(DomainError::not_found());
                }
                if self.company_id != Some(cmd.company_id) {
                    return Err(DomainError::invariant("company mismatch"));
                }
                let period = self
                    .periods
                    .iter()
                    .find(|p| p.name == cmd.period_name)
                    .ok_or_else(DomainError::not_found)?;
                if !period.is_open() {
                    return Err(DomainError::transition(format!(
                        "period {} is already closed",
                        period.name
                    )));
                }
                Ok(vec![FiscalYearEvent::PeriodClosed(PeriodClosed {
                    company_id: cmd.company_id,
                    fiscal_year_id: cmd.fiscal_year_id,
                    period_name: cmd.period_name.clone(),
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopkeeper_core::aggregate::execute;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calendar_year(company_id: CompanyId, year: i32) -> FiscalYear {
        let id = FiscalYearId::new(AggregateId::new());
        let mut fy = FiscalYear::empty(id);
        execute(
            &mut fy,
            &FiscalYearCommand::Create(CreateFiscalYear {
                company_id,
                fiscal_year_id: id,
                name: year.to_string(),
                start: date(year, 1, 1),
                end: date(year, 12, 31),
                post_move_sequence: SequenceId::new(AggregateId::new()),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        fy
    }

    #[test]
    fn calendar_year_has_twelve_monthly_periods() {
        let fy = calendar_year(CompanyId::new(), 2024);
        let periods = fy.periods();
        assert_eq!(periods.len(), 12);
        assert_eq!(periods[0].name, "2024-01");
        assert_eq!(periods[1].end, date(2024, 2, 29));
        assert_eq!(periods[11].start, date(2024, 12, 1));
        assert_eq!(periods[11].end, date(2024, 12, 31));
        for pair in periods.windows(2) {
            assert_eq!(pair[0].end.succ_opt().unwrap(), pair[1].start);
        }
    }

    #[test]
    fn partial_year_periods_are_clipped() {
        let periods = monthly_periods(date(2025, 3, 15), date(2025, 5, 10));
        let names: Vec<&str> = periods.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["2025-03", "2025-04", "2025-05"]);
        assert_eq!(periods[0].start, date(2025, 3, 15));
        assert_eq!(periods[2].end, date(2025, 5, 10));
    }

    #[test]
    fn closed_period_is_not_offered_for_posting() {
        let company_id = CompanyId::new();
        let mut fy = calendar_year(company_id, 2025);
        assert!(fy.open_period_for(date(2025, 6, 30)).is_some());

        let fiscal_year_id = *fy.id();
        execute(
            &mut fy,
            &FiscalYearCommand::ClosePeriod(ClosePeriod {
                company_id,
                fiscal_year_id,
                period_name: "2025-06".to_string(),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        assert!(fy.open_period_for(date(2025, 6, 30)).is_none());
        assert!(fy.open_period_for(date(2025, 7, 1)).is_some());
        assert!(fy.open_period_for(date(2026, 1, 1)).is_none());
    }
}
