//! Company signup: parties, company, owner user, chart of accounts and the
//! current fiscal year, all in one unit of work.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{info, info_span, warn};

use shopkeeper_accounting::{
    ACCOUNT_MOVE_SEQUENCE_CODE, Account, AccountCommand, AccountId, AccountKind, ChartTemplate,
    CreateAccount, CreateFiscalYear, CreateSequence, FiscalYear, FiscalYearCommand, FiscalYearId,
    Sequence, SequenceCommand, SequenceId, plan_accounts,
};
use shopkeeper_auth::{CreateUser, PasswordHash, Permission, Role, User, UserCommand};
use shopkeeper_company::{
    Company, CompanyCommand, ConfigureDefaultAccounts, RegisterCompany, SignupRequest,
};
use shopkeeper_core::{AggregateId, CompanyId, UserId};
use shopkeeper_parties::{Party, PartyCommand, PartyId, PartyKind, RegisterParty};

use crate::command_dispatcher::CommandDispatcher;
use crate::config::ShopkeeperConfig;
use crate::error::ServiceError;
use crate::lookup::{LookupError, ReferenceLookup};
use crate::projections::{ReadModels, ReferenceKind};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignupReceipt {
    pub company_id: CompanyId,
    pub user_id: UserId,
}

pub struct CompanyProvisioning<'a> {
    read_models: &'a ReadModels,
    config: &'a ShopkeeperConfig,
}

impl<'a> CompanyProvisioning<'a> {
    pub fn new(read_models: &'a ReadModels, config: &'a ShopkeeperConfig) -> Self {
        Self { read_models, config }
    }

    /// `session` supplies the clock; signup itself runs unscoped and then as
    /// root inside the new company.
    pub fn signup<D: CommandDispatcher>(
        &self,
        uow: &mut D,
        session: &Session,
        request: &SignupRequest,
    ) -> Result<SignupReceipt, ServiceError> {
        let span = info_span!("signup", shop = %request.shop.trim());
        let _enter = span.enter();

        let result = self.provision(uow, session, request);
        match &result {
            Ok(receipt) => info!(company = %receipt.company_id, user = %receipt.user_id, "company provisioned"),
            Err(e) => warn!(error = %e, "signup aborted"),
        }
        result
    }

    fn provision<D: CommandDispatcher>(
        &self,
        uow: &mut D,
        session: &Session,
        request: &SignupRequest,
    ) -> Result<SignupReceipt, ServiceError> {
        request.validate()?;

        let login = request.login().to_lowercase();
        if self.read_models.directory.find_login(&login).is_some() {
            return Err(ServiceError::Validation(format!("login '{login}' is already in use")));
        }

        let shared = CompanyId::shared();
        let now = session.now;
        let (currency, _) =
            ReferenceLookup::new(&self.read_models.directory, shared).currency(&self.config.default_currency)?;

        let shop = request.shop.trim().to_string();
        let owner = register_party(uow, shared, PartyKind::Company, shop.clone(), Some(login.clone()), session)?;
        let customer = register_party(uow, shared, PartyKind::Customer, request.customer_party_name(), None, session)?;
        let supplier = register_party(uow, shared, PartyKind::Supplier, request.supplier_party_name(), None, session)?;

        let company_id = CompanyId::new();
        uow.dispatch::<Company>(
            shared,
            company_id,
            CompanyCommand::Register(RegisterCompany {
                company_id,
                party: owner,
                currency,
                customer,
                supplier,
                occurred_at: now,
            }),
        )?;

        let password_hash = PasswordHash::generate(&request.password)
            .map_err(|e| ServiceError::Validation(e.to_string()))?;
        let user_id = UserId::new();
        uow.dispatch::<User>(
            shared,
            user_id,
            UserCommand::Create(CreateUser {
                user_id,
                login,
                name: shop,
                password_hash,
                main_company: company_id,
                roles: Role::shop_owner(),
                occurred_at: now,
            }),
        )?;

        let root = session.elevate_to(company_id);
        self.create_chart(uow, &root)?;
        create_fiscal_year(uow, &root)?;

        Ok(SignupReceipt { company_id, user_id })
    }

    /// Instantiate the root chart template and point the company's defaults
    /// at its receivable and payable accounts.
    fn create_chart<D: CommandDispatcher>(&self, uow: &mut D, root: &Session) -> Result<(), ServiceError> {
        root.require(Permission::ACCOUNT_CHART_WRITE)?;
        let company_id = root.company_id;

        let template_id = ReferenceLookup::new(&self.read_models.directory, company_id).root_chart_template()?;
        let template: ChartTemplate = uow.load(CompanyId::shared(), template_id)?;

        let mut by_code: HashMap<String, AccountId> = HashMap::new();
        let mut created: Vec<(AccountId, AccountKind)> = Vec::new();
        for entry in plan_accounts(template.accounts())? {
            let account_id = AccountId::new(AggregateId::new());
            let parent = entry.parent_code.as_ref().and_then(|code| by_code.get(code).copied());
            uow.dispatch::<Account>(
                company_id,
                account_id,
                AccountCommand::CreateAccount(CreateAccount {
                    company_id,
                    account_id,
                    code: entry.code.clone(),
                    name: entry.name.clone(),
                    kind: entry.kind,
                    parent,
                    occurred_at: root.now,
                }),
            )?;
            by_code.insert(entry.code, account_id);
            created.push((account_id, entry.kind));
        }

        let receivable = single_of_kind(&created, AccountKind::Receivable)?;
        let payable = single_of_kind(&created, AccountKind::Payable)?;
        uow.dispatch::<Company>(
            CompanyId::shared(),
            company_id,
            CompanyCommand::ConfigureDefaultAccounts(ConfigureDefaultAccounts {
                company_id,
                receivable,
                payable,
                occurred_at: root.now,
            }),
        )?;
        Ok(())
    }
}

fn register_party<D: CommandDispatcher>(
    uow: &mut D,
    scope: CompanyId,
    kind: PartyKind,
    name: String,
    email: Option<String>,
    session: &Session,
) -> Result<PartyId, ServiceError> {
    let party_id = PartyId::new(AggregateId::new());
    uow.dispatch::<Party>(
        scope,
        party_id,
        PartyCommand::RegisterParty(RegisterParty {
            scope,
            party_id,
            kind,
            name,
            email,
            occurred_at: session.now,
        }),
    )?;
    Ok(party_id)
}

fn single_of_kind(accounts: &[(AccountId, AccountKind)], kind: AccountKind) -> Result<AccountId, LookupError> {
    let matching: Vec<AccountId> = accounts
        .iter()
        .filter(|(_, k)| *k == kind)
        .map(|(id, _)| *id)
        .collect();
    match matching.as_slice() {
        [one] => Ok(*one),
        other => Err(LookupError::NotUnique {
            kind: ReferenceKind::Account,
            criterion: format!("{kind:?} account"),
            count: other.len(),
        }),
    }
}

/// Sequence and fiscal year named after the current year, 1 Jan to 31 Dec.
fn create_fiscal_year<D: CommandDispatcher>(uow: &mut D, root: &Session) -> Result<(), ServiceError> {
    let company_id = root.company_id;
    let year = root.today().year();
    let (start, end) = match (NaiveDate::from_ymd_opt(year, 1, 1), NaiveDate::from_ymd_opt(year, 12, 31)) {
        (Some(start), Some(end)) => (start, end),
        _ => return Err(ServiceError::Validation(format!("year {year} is out of range"))),
    };

    let sequence_id = SequenceId::new(AggregateId::new());
    uow.dispatch::<Sequence>(
        company_id,
        sequence_id,
        SequenceCommand::Create(CreateSequence {
            company_id,
            sequence_id,
            name: year.to_string(),
            code: ACCOUNT_MOVE_SEQUENCE_CODE.to_string(),
            prefix: String::new(),
            padding: 0,
            occurred_at: root.now,
        }),
    )?;

    let fiscal_year_id = FiscalYearId::new(AggregateId::new());
    uow.dispatch::<FiscalYear>(
        company_id,
        fiscal_year_id,
        FiscalYearCommand::Create(CreateFiscalYear {
            company_id,
            fiscal_year_id,
            name: year.to_string(),
            start,
            end,
            post_move_sequence: sequence_id,
            occurred_at: root.now,
        }),
    )?;
    Ok(())
}
