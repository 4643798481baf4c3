//! Service layer for the invoicing backend.
//! - `backup`: archive writer, catalog, restorer and deleter over an explicit
//!   schema descriptor.
//! - `backup_settings_service` / `backup_job_service`: per-workspace plan
//!   limits and tracked backup jobs on top of `backup`.

pub mod errors;
pub mod backup;
pub mod backup_settings_service;
pub mod backup_job_service;
#[cfg(test)]
pub mod test_support;
