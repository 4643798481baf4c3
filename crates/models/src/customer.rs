use chrono::Utc;
use sea_orm::{entity::prelude::*, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};

use crate::errors;
use crate::workspace;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub workspace_id: i32,
    pub name: String,
    pub address: Option<String>,
    pub vat_number: Option<String>,
    pub email: Option<String>,
    pub public_id: Option<Uuid>,
    pub created_at: DateTime,
    pub updated_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Workspace,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self { Relation::Workspace => Entity::belongs_to(workspace::Entity).from(Column::WorkspaceId).to(workspace::Column::Id).into() }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub async fn create(
    db: &DatabaseConnection,
    workspace_id: i32,
    name: &str,
    vat_number: Option<&str>,
    email: Option<&str>,
) -> Result<Model, errors::ModelError> {
    if name.trim().is_empty() { return Err(errors::ModelError::Validation("name required".into())); }
    if let Some(e) = email {
        if !e.contains('@') { return Err(errors::ModelError::Validation("invalid email".into())); }
    }
    let am = ActiveModel {
        workspace_id: Set(workspace_id),
        name: Set(name.to_string()),
        address: Set(None),
        vat_number: Set(vat_number.map(str::to_string)),
        email: Set(email.map(str::to_string)),
        public_id: Set(None),
        created_at: Set(Utc::now().naive_utc()),
        updated_at: Set(None),
        ..Default::default()
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}
