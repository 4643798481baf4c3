//! Versioned description of the tables that take part in a snapshot.
//!
//! The dump and restore code only ever touches tables and columns listed
//! here. Tables are kept in foreign-key order: parents before children.

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    BigInteger,
    Double,
    Boolean,
    Text,
    Date,
    DateTime,
    Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: &'static str,
    pub kind: ColumnKind,
}

/// How a table relates to tenants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableScope {
    /// The tenants table itself; the column holds the tenant id.
    /// Restored insert-if-absent, never deleted or remapped.
    Root(&'static str),
    /// Partitioned by the named tenant column.
    Tenant(&'static str),
    /// Not partitioned. Dumped whole, restored insert-if-absent.
    Shared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: &'static str,
    pub primary_key: &'static str,
    pub scope: TableScope,
    /// Login identities; left untouched when restoring into a specific tenant.
    pub identity: bool,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column remapped and filtered on during restore.
    pub fn tenant_column(&self) -> Option<&'static str> {
        match self.scope {
            TableScope::Tenant(col) => Some(col),
            _ => None,
        }
    }

    /// Key column of the tenants table itself.
    pub fn root_column(&self) -> Option<&'static str> {
        match self.scope {
            TableScope::Root(col) => Some(col),
            _ => None,
        }
    }

    /// Column used to narrow a dump to one tenant.
    pub fn filter_column(&self) -> Option<&'static str> {
        match self.scope {
            TableScope::Root(col) | TableScope::Tenant(col) => Some(col),
            TableScope::Shared => None,
        }
    }

    /// Rows are inserted only when their primary key is not taken yet.
    pub fn insert_if_absent(&self) -> bool {
        !matches!(self.scope, TableScope::Tenant(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptor {
    pub version: u32,
    pub tables: Vec<TableDescriptor>,
}

const fn col(name: &'static str, kind: ColumnKind) -> ColumnDescriptor {
    ColumnDescriptor { name, kind }
}

impl SchemaDescriptor {
    /// Tables created by the `m20240101_*` migrations. Backup bookkeeping
    /// (`backup_settings`, `backup_jobs`) is not part of a snapshot.
    pub fn v1() -> Self {
        use ColumnKind::*;
        Self {
            version: 1,
            tables: vec![
                TableDescriptor {
                    name: "workspaces",
                    primary_key: "id",
                    scope: TableScope::Root("id"),
                    identity: false,
                    columns: vec![
                        col("id", Integer),
                        col("name", Text),
                        col("description", Text),
                        col("created_at", DateTime),
                    ],
                },
                TableDescriptor {
                    name: "users",
                    primary_key: "id",
                    scope: TableScope::Tenant("workspace_id"),
                    identity: true,
                    columns: vec![
                        col("id", Integer),
                        col("workspace_id", Integer),
                        col("username", Text),
                        col("email", Text),
                        col("password_hash", Text),
                        col("is_admin", Boolean),
                        col("is_super_admin", Boolean),
                        col("created_at", DateTime),
                    ],
                },
                TableDescriptor {
                    name: "customers",
                    primary_key: "id",
                    scope: TableScope::Tenant("workspace_id"),
                    identity: false,
                    columns: vec![
                        col("id", Integer),
                        col("workspace_id", Integer),
                        col("name", Text),
                        col("address", Text),
                        col("vat_number", Text),
                        col("email", Text),
                        col("public_id", Uuid),
                        col("created_at", DateTime),
                        col("updated_at", DateTime),
                    ],
                },
                TableDescriptor {
                    name: "invoices",
                    primary_key: "id",
                    scope: TableScope::Tenant("workspace_id"),
                    identity: false,
                    columns: vec![
                        col("id", Integer),
                        col("workspace_id", Integer),
                        col("customer_id", Integer),
                        col("invoice_number", Text),
                        col("date", Date),
                        col("invoice_type", Text),
                        col("amount_incl_vat", Double),
                        col("amount_excl_vat", Double),
                        col("vat_rate", Double),
                        col("vat_amount", Double),
                        col("created_at", DateTime),
                    ],
                },
                TableDescriptor {
                    name: "email_templates",
                    primary_key: "id",
                    scope: TableScope::Tenant("workspace_id"),
                    identity: false,
                    columns: vec![
                        col("id", Integer),
                        col("workspace_id", Integer),
                        col("name", Text),
                        col("subject", Text),
                        col("body_html", Text),
                        col("template_type", Text),
                        col("is_default", Boolean),
                        col("created_at", DateTime),
                    ],
                },
            ],
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Tables to act on, in descriptor order. `None` selects everything;
    /// requested names that are not described are logged and ignored.
    pub fn select(&self, requested: Option<&[String]>) -> Vec<&TableDescriptor> {
        let Some(requested) = requested else {
            return self.tables.iter().collect();
        };
        for name in requested {
            if self.table(name).is_none() {
                warn!(table = %name, "requested table is not part of the backup schema, ignored");
            }
        }
        self.tables
            .iter()
            .filter(|t| requested.iter().any(|r| r == t.name))
            .collect()
    }
}
