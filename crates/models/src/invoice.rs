use chrono::{NaiveDate, Utc};
use sea_orm::{entity::prelude::*, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};

use crate::errors;
use crate::{customer, workspace};

pub const TYPE_INCOME: &str = "income";
pub const TYPE_EXPENSE: &str = "expense";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub workspace_id: i32,
    pub customer_id: i32,
    #[sea_orm(unique)]
    pub invoice_number: String,
    pub date: Date,
    pub invoice_type: String,
    pub amount_incl_vat: f64,
    pub amount_excl_vat: f64,
    pub vat_rate: f64,
    pub vat_amount: f64,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Workspace, Customer }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Workspace => Entity::belongs_to(workspace::Entity).from(Column::WorkspaceId).to(workspace::Column::Id).into(),
            Relation::Customer => Entity::belongs_to(customer::Entity).from(Column::CustomerId).to(customer::Column::Id).into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Split a VAT-inclusive amount into `(excl_vat, vat)` for a percentage rate.
pub fn split_vat(amount_incl_vat: f64, vat_rate: f64) -> (f64, f64) {
    let excl = amount_incl_vat / (1.0 + vat_rate / 100.0);
    (excl, amount_incl_vat - excl)
}

pub async fn create(
    db: &DatabaseConnection,
    workspace_id: i32,
    customer_id: i32,
    invoice_number: &str,
    date: NaiveDate,
    invoice_type: &str,
    amount_incl_vat: f64,
    vat_rate: f64,
) -> Result<Model, errors::ModelError> {
    if invoice_type != TYPE_INCOME && invoice_type != TYPE_EXPENSE {
        return Err(errors::ModelError::Validation(format!("unknown invoice type `{invoice_type}`")));
    }
    if invoice_number.trim().is_empty() { return Err(errors::ModelError::Validation("invoice number required".into())); }
    let (amount_excl_vat, vat_amount) = split_vat(amount_incl_vat, vat_rate);
    let am = ActiveModel {
        workspace_id: Set(workspace_id),
        customer_id: Set(customer_id),
        invoice_number: Set(invoice_number.to_string()),
        date: Set(date),
        invoice_type: Set(invoice_type.to_string()),
        amount_incl_vat: Set(amount_incl_vat),
        amount_excl_vat: Set(amount_excl_vat),
        vat_rate: Set(vat_rate),
        vat_amount: Set(vat_amount),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}
