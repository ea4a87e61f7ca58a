use serde::Deserialize;
use tracing::info;

use shopkeeper_auth::Permission;
use shopkeeper_core::AggregateId;
use shopkeeper_products::{CreateProduct, Product, ProductCommand, ProductId, ProductKind, Uom};

use crate::command_dispatcher::CommandDispatcher;
use crate::error::ServiceError;
use crate::session::Session;

/// Input of `create_product`; kind and unit default to goods counted in units.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub kind: ProductKind,
    #[serde(default)]
    pub uom: Uom,
}

pub fn create_product<D: CommandDispatcher>(
    uow: &mut D,
    session: &Session,
    product: &NewProduct,
) -> Result<ProductId, ServiceError> {
    session.require(Permission::PRODUCT_WRITE)?;

    let company_id = session.company_id;
    let product_id = ProductId::new(AggregateId::new());
    uow.dispatch::<Product>(
        company_id,
        product_id,
        ProductCommand::CreateProduct(CreateProduct {
            company_id,
            product_id,
            name: product.name.clone(),
            kind: product.kind,
            default_uom: product.uom,
            occurred_at: session.now,
        }),
    )?;

    info!(company = %company_id, product = %product_id.0, "product created");
    Ok(product_id)
}
