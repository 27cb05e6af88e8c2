//! Read-only projections of remote data.
//!
//! A data source has no lifecycle and keeps no state of its own: every read
//! is one remote call whose result is returned whole, or an error with no
//! partial result.

use crate::error::{Error, Operation, Result};
use crate::schema::Schema;
use serde::Serialize;

pub trait DataSource: Send + Sync {
    /// Arguments of a read, validated against [`DataSource::schema`].
    type Query: Serialize;
    type Output;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Data source type name, e.g. `iotcentral_devices`.
    const TYPE_NAME: &'static str;

    /// Schema of the query arguments.
    fn schema(&self) -> Schema;

    /// Short description of a query for error labels.
    fn describe(&self, _query: &Self::Query) -> String {
        "all".to_string()
    }

    fn fetch(&self, query: &Self::Query) -> std::result::Result<Self::Output, Self::Error>;
}

/// Validate the query and read the data source.
pub fn read<D: DataSource>(source: &D, query: &D::Query) -> Result<D::Output> {
    let label = source.describe(query);
    let diagnostics = source.schema().validate(&serde_json::to_value(query)?);
    if !diagnostics.is_empty() {
        return Err(Error::config(D::TYPE_NAME, label, diagnostics));
    }

    log::debug!("reading {} {label}", D::TYPE_NAME);
    source.fetch(query).map_err(|e| {
        log::warn!("read {} {label} failed: {e}", D::TYPE_NAME);
        Error::remote(D::TYPE_NAME, Operation::Read, label, e)
    })
}
