use chrono::Utc;
use sea_orm::{entity::prelude::*, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};

use crate::errors;
use crate::workspace;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "email_templates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub workspace_id: i32,
    pub name: String,
    pub subject: String,
    #[sea_orm(column_type = "Text")]
    pub body_html: String,
    pub template_type: String,
    pub is_default: bool,
    pub created_at: DateTime,
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
    subject: &str,
    body_html: &str,
    template_type: &str,
) -> Result<Model, errors::ModelError> {
    if name.trim().is_empty() { return Err(errors::ModelError::Validation("name required".into())); }
    let am = ActiveModel {
        workspace_id: Set(workspace_id),
        name: Set(name.to_string()),
        subject: Set(subject.to_string()),
        body_html: Set(body_html.to_string()),
        template_type: Set(template_type.to_string()),
        is_default: Set(false),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}
