//! Integration tests for the full pipeline.
//!
//! Tests: Workflow → UnitOfWork → EventStore → EventBus / ReadModels
//!
//! Verifies:
//! - purchases and sales produce done shipments and posted, numbered moves
//! - failed calls leave the store, bus and read models untouched
//! - reference installation is idempotent and lookups reject duplicates
//! - permission checks guard the posting operations
//! - committed payloads carry the parties, roles and shipment steps callers rely on

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use shopkeeper_accounting::{AccountMoveEvent, MoveLine};
    use shopkeeper_auth::{Principal, Role, UserEvent};
    use shopkeeper_company::{Company, SignupRequest};
    use shopkeeper_core::{AggregateId, CompanyId};
    use shopkeeper_parties::{PartyEvent, PartyKind};
    use shopkeeper_products::{ProductId, ProductKind, Uom};
    use shopkeeper_stock::{CreateLocation, Location, LocationCommand, LocationId, LocationKind};

    use crate::command_dispatcher::CommandDispatcher;
    use crate::event_store::{EventStore, UnitOfWork};
    use crate::lookup::{LookupError, ReferenceLookup};
    use crate::projections::ShipmentDirection;
    use crate::streams::aggregate_types;
    use crate::workflows::{LineItem, NewProduct, SignupReceipt};
    use crate::{ServiceError, Session, Shopkeeper, ShopkeeperConfig};

    const EMAIL: &str = "owner@corner.example";
    const PASSWORD: &str = "s3cret";

    fn signup_request(email: &str) -> SignupRequest {
        SignupRequest {
            shop: "Corner Store".to_string(),
            email: email.to_string(),
            password: PASSWORD.to_string(),
        }
    }

    fn owner_session(receipt: &SignupReceipt) -> Session {
        Session::for_principal(
            Principal {
                user_id: receipt.user_id,
                company_id: receipt.company_id,
                roles: Role::shop_owner(),
            },
            Utc::now(),
        )
    }

    fn setup() -> (Shopkeeper, SignupReceipt, Session) {
        let shopkeeper = Shopkeeper::in_memory(ShopkeeperConfig::default());
        shopkeeper.install_defaults().unwrap();
        let receipt = shopkeeper.signup(&signup_request(EMAIL)).unwrap();
        let session = owner_session(&receipt);
        (shopkeeper, receipt, session)
    }

    fn product(shopkeeper: &Shopkeeper, session: &Session, name: &str, kind: ProductKind) -> ProductId {
        shopkeeper
            .create_product(
                session,
                &NewProduct {
                    name: name.to_string(),
                    kind,
                    uom: Uom::Unit,
                },
            )
            .unwrap()
    }

    fn item(product: ProductId, quantity: Decimal, unit_price: Decimal) -> LineItem {
        LineItem {
            product,
            quantity,
            unit_price,
        }
    }

    fn location(shopkeeper: &Shopkeeper, company_id: CompanyId, name: &str) -> LocationId {
        ReferenceLookup::new(&shopkeeper.read_models().directory, company_id)
            .location(name)
            .unwrap()
    }

    fn event_count(shopkeeper: &Shopkeeper) -> usize {
        shopkeeper.store().load_all().unwrap().len()
    }

    fn company(shopkeeper: &Shopkeeper, company_id: CompanyId) -> Company {
        UnitOfWork::begin(shopkeeper.store())
            .load::<Company>(CompanyId::shared(), company_id)
            .unwrap()
    }

    fn created_move_lines(shopkeeper: &Shopkeeper) -> Vec<Vec<MoveLine>> {
        shopkeeper
            .store()
            .load_all()
            .unwrap()
            .into_iter()
            .filter(|e| e.aggregate_type == aggregate_types::ACCOUNT_MOVE)
            .filter_map(|e| match serde_json::from_value::<AccountMoveEvent>(e.payload).unwrap() {
                AccountMoveEvent::Created(c) => Some(c.lines),
                AccountMoveEvent::Posted(_) => None,
            })
            .collect()
    }

    fn posted_numbers(shopkeeper: &Shopkeeper) -> Vec<String> {
        shopkeeper
            .store()
            .load_all()
            .unwrap()
            .into_iter()
            .filter(|e| e.aggregate_type == aggregate_types::ACCOUNT_MOVE)
            .filter_map(|e| match serde_json::from_value::<AccountMoveEvent>(e.payload).unwrap() {
                AccountMoveEvent::Posted(p) => Some(p.number),
                AccountMoveEvent::Created(_) => None,
            })
            .collect()
    }

    #[test]
    fn signup_provisions_company_chart_and_fiscal_year() {
        let (shopkeeper, receipt, _) = setup();
        let lookup = ReferenceLookup::new(&shopkeeper.read_models().directory, receipt.company_id);

        for name in ["Main Receivable", "Main Payable", "Main Revenue", "Main Expense", "Main Cash"] {
            assert!(lookup.account(name).is_ok(), "missing account {name}");
        }
        assert!(lookup.fiscal_year_for(Utc::now().date_naive()).is_ok());

        let user = shopkeeper.read_models().directory.find_login(EMAIL).unwrap();
        assert_eq!(user.name, "Corner Store");

        // Other companies do not see this company's chart.
        let stranger = ReferenceLookup::new(&shopkeeper.read_models().directory, CompanyId::new());
        assert!(matches!(stranger.account("Main Revenue"), Err(LookupError::Missing { .. })));
    }

    #[test]
    fn signup_registers_three_shared_parties_and_an_owner_with_shop_roles() {
        let (shopkeeper, receipt, _) = setup();
        let events = shopkeeper.store().load_all().unwrap();

        let parties: Vec<_> = events
            .iter()
            .filter(|e| e.aggregate_type == aggregate_types::PARTY)
            .map(|e| {
                assert_eq!(e.company_id, CompanyId::shared());
                match serde_json::from_value::<PartyEvent>(e.payload.clone()).unwrap() {
                    PartyEvent::PartyRegistered(r) => (r.kind, r.name, r.email),
                }
            })
            .collect();
        assert_eq!(
            parties,
            vec![
                (PartyKind::Company, "Corner Store".to_string(), Some(EMAIL.to_string())),
                (PartyKind::Customer, format!("Customer [{EMAIL}]"), None),
                (PartyKind::Supplier, format!("Supplier [{EMAIL}]"), None),
            ]
        );

        let users: Vec<UserEvent> = events
            .iter()
            .filter(|e| e.aggregate_type == aggregate_types::USER)
            .map(|e| serde_json::from_value(e.payload.clone()).unwrap())
            .collect();
        assert_eq!(users.len(), 1);
        let UserEvent::Created(user) = &users[0];
        assert_eq!(user.user_id, receipt.user_id);
        assert_eq!(user.main_company, receipt.company_id);
        assert_eq!(
            user.roles.iter().map(Role::as_str).collect::<Vec<_>>(),
            vec!["account_admin", "stock_admin", "stock_force_assignment", "stock"]
        );

        let company = company(&shopkeeper, receipt.company_id);
        assert!(company.customer().is_some() && company.supplier().is_some());
        assert_ne!(company.customer(), company.supplier());
    }

    #[test]
    fn signup_with_invalid_email_creates_nothing() {
        let shopkeeper = Shopkeeper::in_memory(ShopkeeperConfig::default());
        shopkeeper.install_defaults().unwrap();
        let before = event_count(&shopkeeper);

        let err = shopkeeper.signup(&signup_request("not an email")).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidEmail(_)));
        assert_eq!(event_count(&shopkeeper), before);
    }

    #[test]
    fn signup_rejects_a_login_already_in_use() {
        let (shopkeeper, _, _) = setup();
        let err = shopkeeper.signup(&signup_request("Owner@Corner.example")).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn signup_without_reference_data_is_a_lookup_error() {
        let shopkeeper = Shopkeeper::in_memory(ShopkeeperConfig::default());
        let err = shopkeeper.signup(&signup_request(EMAIL)).unwrap_err();
        assert!(matches!(err, ServiceError::Lookup(LookupError::Missing { .. })));
        assert_eq!(event_count(&shopkeeper), 0);
    }

    #[test]
    fn installing_defaults_twice_creates_nothing_new() {
        let shopkeeper = Shopkeeper::in_memory(ShopkeeperConfig::default());
        let first = shopkeeper.install_defaults().unwrap();
        assert!(first.created > 0);
        let count = event_count(&shopkeeper);

        let second = shopkeeper.install_defaults().unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(event_count(&shopkeeper), count);
    }

    #[test]
    fn purchase_stocks_storage_and_posts_balanced_moves() {
        let (shopkeeper, receipt, session) = setup();
        let company_id = receipt.company_id;
        let soap = product(&shopkeeper, &session, "Soap", ProductKind::Goods);
        let rice = product(&shopkeeper, &session, "Rice", ProductKind::Goods);

        let posting = shopkeeper
            .mark_bought(&session, &[item(soap, dec!(3), dec!(10)), item(rice, dec!(2), dec!(4.505))])
            .unwrap();
        assert_eq!(posting.account_moves.len(), 2);

        let storage = location(&shopkeeper, company_id, "Storage Zone");
        let levels = &shopkeeper.read_models().stock_levels;
        assert_eq!(levels.on_hand(company_id, storage, soap), dec!(3));
        assert_eq!(levels.on_hand(company_id, storage, rice), dec!(2));

        // 2 × 4.505 = 9.01; 30 + 9.01 on both sides.
        let lookup = ReferenceLookup::new(&shopkeeper.read_models().directory, company_id);
        let balances = &shopkeeper.read_models().account_balances;
        let revenue = balances.get(company_id, lookup.account("Main Revenue").unwrap()).unwrap();
        let payable = balances.get(company_id, lookup.account("Main Payable").unwrap()).unwrap();
        assert_eq!(revenue.debit, dec!(39.01));
        assert_eq!(payable.credit, dec!(39.01));
        assert_eq!(revenue.balance() + payable.balance(), Decimal::ZERO);

        let shipments = shopkeeper.shipments(&session).unwrap();
        assert_eq!(shipments.len(), 1);
        assert_eq!(shipments[0].direction, ShipmentDirection::Inbound);
        assert_eq!(shipments[0].state, "done");
        assert_eq!(shipments[0].move_count, 2);
    }

    #[test]
    fn payable_credit_names_the_supplier_and_receivable_debit_names_the_customer() {
        let (shopkeeper, receipt, session) = setup();
        let company_id = receipt.company_id;
        let parties = company(&shopkeeper, company_id);
        let lookup = ReferenceLookup::new(&shopkeeper.read_models().directory, company_id);
        let payable = lookup.account("Main Payable").unwrap();
        let receivable = lookup.account("Main Receivable").unwrap();
        let soap = product(&shopkeeper, &session, "Soap", ProductKind::Goods);

        shopkeeper.mark_bought(&session, &[item(soap, dec!(2), dec!(10))]).unwrap();
        shopkeeper.mark_sold(&session, &[item(soap, dec!(1), dec!(15))]).unwrap();

        let moves = created_move_lines(&shopkeeper);
        assert_eq!(moves.len(), 2);

        let purchase = &moves[0];
        let credit = purchase.iter().find(|l| l.credit > Decimal::ZERO).unwrap();
        assert_eq!(credit.account, payable);
        assert_eq!(credit.party, parties.supplier());
        assert!(purchase.iter().filter(|l| l.debit > Decimal::ZERO).all(|l| l.party.is_none()));

        let sale = &moves[1];
        let debit = sale.iter().find(|l| l.debit > Decimal::ZERO).unwrap();
        assert_eq!(debit.account, receivable);
        assert_eq!(debit.party, parties.customer());
        assert!(sale.iter().filter(|l| l.credit > Decimal::ZERO).all(|l| l.party.is_none()));
    }

    #[test]
    fn oversized_line_amount_is_rejected_without_a_trace() {
        let (shopkeeper, _, session) = setup();
        let soap = product(&shopkeeper, &session, "Soap", ProductKind::Goods);
        let before = event_count(&shopkeeper);
        let subscription = shopkeeper.subscribe();

        let err = shopkeeper
            .mark_bought(&session, &[item(soap, Decimal::MAX, dec!(2))])
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(msg) if msg.contains("overflows")));

        assert_eq!(event_count(&shopkeeper), before);
        assert!(subscription.drain().is_empty());
        assert!(shopkeeper.shipments(&session).unwrap().is_empty());
    }

    #[test]
    fn identical_purchases_create_separate_shipments() {
        let (shopkeeper, _, session) = setup();
        let soap = product(&shopkeeper, &session, "Soap", ProductKind::Goods);
        let items = [item(soap, dec!(1), dec!(5))];

        let first = shopkeeper.mark_bought(&session, &items).unwrap();
        let second = shopkeeper.mark_bought(&session, &items).unwrap();
        assert_ne!(first.shipment_id, second.shipment_id);

        let shipments = shopkeeper.shipments(&session).unwrap();
        assert_eq!(shipments.len(), 2);
        assert!(shipments.iter().all(|s| s.state == "done"));
        assert_eq!(posted_numbers(&shopkeeper), vec!["1", "2"]);
    }

    #[test]
    fn posting_numbers_are_sequential_across_calls() {
        let (shopkeeper, _, session) = setup();
        let soap = product(&shopkeeper, &session, "Soap", ProductKind::Goods);

        shopkeeper
            .mark_bought(&session, &[item(soap, dec!(1), dec!(5)), item(soap, dec!(1), dec!(6))])
            .unwrap();
        shopkeeper.mark_bought(&session, &[item(soap, dec!(4), dec!(5))]).unwrap();

        assert_eq!(posted_numbers(&shopkeeper), vec!["1", "2", "3"]);
    }

    #[test]
    fn sale_after_purchase_moves_stock_out_and_debits_receivable() {
        let (shopkeeper, receipt, session) = setup();
        let company_id = receipt.company_id;
        let soap = product(&shopkeeper, &session, "Soap", ProductKind::Goods);
        shopkeeper.mark_bought(&session, &[item(soap, dec!(3), dec!(10))]).unwrap();

        let subscription = shopkeeper.subscribe();
        shopkeeper.mark_sold(&session, &[item(soap, dec!(2), dec!(15))]).unwrap();

        let storage = location(&shopkeeper, company_id, "Storage Zone");
        assert_eq!(shopkeeper.read_models().stock_levels.on_hand(company_id, storage, soap), dec!(1));

        let lookup = ReferenceLookup::new(&shopkeeper.read_models().directory, company_id);
        let receivable = shopkeeper
            .read_models()
            .account_balances
            .get(company_id, lookup.account("Main Receivable").unwrap())
            .unwrap();
        assert_eq!(receivable.debit, dec!(30));

        // Every shipment event is published before the first account move event.
        let published = subscription.drain();
        let last_shipment = published
            .iter()
            .rposition(|e| e.aggregate_type() == aggregate_types::SHIPMENT_OUT)
            .unwrap();
        let first_move = published
            .iter()
            .position(|e| e.aggregate_type() == aggregate_types::ACCOUNT_MOVE)
            .unwrap();
        assert!(last_shipment < first_move);

        let shipment_steps: Vec<&str> = published
            .iter()
            .filter(|e| e.aggregate_type() == aggregate_types::SHIPMENT_OUT)
            .map(|e| e.event_type())
            .collect();
        assert_eq!(
            shipment_steps,
            vec![
                "stock.shipment_out.created",
                "stock.shipment_out.waiting",
                "stock.shipment_out.assigned",
                "stock.shipment_out.packed",
                "stock.shipment_out.done",
            ]
        );
    }

    #[test]
    fn sale_without_stock_leaves_no_trace() {
        let (shopkeeper, _, session) = setup();
        let soap = product(&shopkeeper, &session, "Soap", ProductKind::Goods);
        let before = event_count(&shopkeeper);
        let subscription = shopkeeper.subscribe();

        let err = shopkeeper.mark_sold(&session, &[item(soap, dec!(1), dec!(15))]).unwrap_err();
        assert!(matches!(err, ServiceError::StateTransition(_)));

        assert_eq!(event_count(&shopkeeper), before);
        assert!(subscription.drain().is_empty());
        assert!(shopkeeper.shipments(&session).unwrap().is_empty());
        assert!(shopkeeper.account_balances(&session).unwrap().is_empty());
    }

    #[test]
    fn empty_purchase_walks_an_empty_shipment_to_done() {
        let (shopkeeper, _, session) = setup();

        let posting = shopkeeper.mark_bought(&session, &[]).unwrap();
        assert!(posting.account_moves.is_empty());

        let shipments = shopkeeper.shipments(&session).unwrap();
        assert_eq!(shipments.len(), 1);
        assert_eq!(shipments[0].state, "done");
        assert_eq!(shipments[0].move_count, 0);
        assert!(posted_numbers(&shopkeeper).is_empty());
    }

    #[test]
    fn service_products_and_bad_quantities_are_rejected() {
        let (shopkeeper, _, session) = setup();
        let delivery = product(&shopkeeper, &session, "Delivery", ProductKind::Service);
        let soap = product(&shopkeeper, &session, "Soap", ProductKind::Goods);
        let before = event_count(&shopkeeper);

        let err = shopkeeper.mark_bought(&session, &[item(delivery, dec!(1), dec!(5))]).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = shopkeeper.mark_bought(&session, &[item(soap, dec!(0), dec!(5))]).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = shopkeeper
            .mark_bought(&session, &[item(ProductId::new(AggregateId::new()), dec!(1), dec!(5))])
            .unwrap_err();
        assert!(matches!(err, ServiceError::Lookup(LookupError::Unknown { .. })));

        assert_eq!(event_count(&shopkeeper), before);
    }

    #[test]
    fn duplicate_reference_names_are_ambiguous() {
        let (shopkeeper, receipt, session) = setup();
        let company_id = receipt.company_id;

        let location_id = LocationId::new(AggregateId::new());
        let mut uow = UnitOfWork::begin(shopkeeper.store());
        uow.dispatch::<Location>(
            company_id,
            location_id,
            LocationCommand::CreateLocation(CreateLocation {
                scope: company_id,
                location_id,
                code: "IN2".to_string(),
                name: "Input Zone".to_string(),
                kind: LocationKind::Storage,
                parent: None,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        uow.commit().unwrap();
        shopkeeper.rebuild_read_models().unwrap();

        let err = shopkeeper.mark_bought(&session, &[]).unwrap_err();
        assert!(matches!(err, ServiceError::Lookup(LookupError::Ambiguous { count: 2, .. })));
    }

    #[test]
    fn posting_requires_stock_and_account_permissions() {
        let (shopkeeper, receipt, _) = setup();
        let clerk = Session::for_principal(
            Principal {
                user_id: receipt.user_id,
                company_id: receipt.company_id,
                roles: vec![Role::new(Role::STOCK)],
            },
            Utc::now(),
        );
        let err = shopkeeper.mark_bought(&clerk, &[]).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        assert!(shopkeeper.mark_bought(&Session::root(receipt.company_id), &[]).is_ok());
    }

    #[test]
    fn login_issues_claims_for_the_main_company() {
        let (shopkeeper, receipt, _) = setup();

        let claims = shopkeeper.login("OWNER@corner.example", PASSWORD).unwrap();
        assert_eq!(claims.sub, receipt.user_id);
        assert_eq!(claims.company_id, receipt.company_id);
        assert!(claims.exp > claims.iat);

        assert!(matches!(
            shopkeeper.login(EMAIL, "wrong"),
            Err(ServiceError::InvalidCredentials)
        ));
        assert!(matches!(
            shopkeeper.login("nobody@corner.example", PASSWORD),
            Err(ServiceError::InvalidCredentials)
        ));
    }

    #[test]
    fn rebuilt_read_models_match_live_ones() {
        let (shopkeeper, _, session) = setup();
        let soap = product(&shopkeeper, &session, "Soap", ProductKind::Goods);
        shopkeeper.mark_bought(&session, &[item(soap, dec!(5), dec!(2))]).unwrap();
        shopkeeper.mark_sold(&session, &[item(soap, dec!(2), dec!(3))]).unwrap();

        let live_levels = shopkeeper.stock_levels(&session, None).unwrap();
        let live_balances = shopkeeper.account_balances(&session).unwrap();

        shopkeeper.rebuild_read_models().unwrap();
        assert_eq!(shopkeeper.stock_levels(&session, None).unwrap(), live_levels);
        assert_eq!(shopkeeper.account_balances(&session).unwrap(), live_balances);

        let storage = shopkeeper.stock_levels(&session, Some("Storage Zone")).unwrap();
        assert_eq!(storage.len(), 1);
        assert_eq!(storage[0].quantity, dec!(3));
    }
}
