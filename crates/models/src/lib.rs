//! sea-orm entities of the invoicing application plus connection helpers.
//!
//! Every tenant-owned table carries a `workspace_id`; `workspaces` is the
//! tenant root.

pub mod errors;
pub mod db;
pub mod workspace;
pub mod user;
pub mod customer;
pub mod invoice;
pub mod email_template;
pub mod backup_settings;
pub mod backup_job;

/// Tenant identifier (`workspaces.id`).
pub type WorkspaceId = i32;
