//! Read-only projections of the application: no lifecycle, one remote call
//! per read, the whole result or an error.

pub mod devices;
pub mod organizations;
pub mod role;

use serde::Serialize;

pub use devices::DevicesDataSource;
pub use organizations::OrganizationsDataSource;
pub use role::{RoleDataSource, RoleQuery, RoleState};

/// Query of the list projections, which take no arguments
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ListAll {}
