//! The reconciliation lifecycle shared by every resource kind.
//!
//! ```text
//! absent --create--> created --read*--> [--update--> read*]* --delete--> absent
//! ```
//!
//! Each operation makes exactly one remote call and blocks until it returns.
//! Canonical state always comes from the remote response; nothing computed is
//! fabricated locally. Failures are labelled with the resource type,
//! operation and ID and returned unchanged otherwise: no retries, no
//! compensation.

use crate::error::{Error, Operation, Result};
use crate::resource::ManagedResource;
use crate::types::MissingPolicy;

fn remote_failure<R: ManagedResource>(operation: Operation, id: &str, err: R::Error) -> Error {
    log::warn!("{operation} {} {id} failed: {err}", R::TYPE_NAME);
    Error::remote(R::TYPE_NAME, operation, id, err)
}

fn require_id<R: ManagedResource>(state: &R::Model) -> Result<&str> {
    R::id_of(state).ok_or_else(|| Error::State(format!("{} state has no id", R::TYPE_NAME)))
}

/// Create the entity from fully planned attributes.
///
/// On failure nothing is returned, so the declaration stays absent.
pub fn create<R: ManagedResource>(resource: &R, planned: &R::Model) -> Result<R::Model> {
    let label = R::id_of(planned).unwrap_or("(new)");
    log::debug!("creating {} {label}", R::TYPE_NAME);

    let request = resource.plan_to_request(planned);
    let record = resource
        .remote_create(planned, &request)
        .map_err(|e| remote_failure::<R>(Operation::Create, label, e))?;
    let state = resource.response_to_state(record);

    log::debug!(
        "created {} {}",
        R::TYPE_NAME,
        R::id_of(&state).unwrap_or(label)
    );
    Ok(state)
}

/// Re-read the entity behind `state`, overwriting everything local.
///
/// Returns `None` only when the entity is gone and `policy` is
/// [`MissingPolicy::Remove`].
pub fn read<R: ManagedResource>(
    resource: &R,
    state: &R::Model,
    policy: MissingPolicy,
) -> Result<Option<R::Model>> {
    let id = require_id::<R>(state)?;
    log::debug!("reading {} {id}", R::TYPE_NAME);

    match resource.remote_read(id) {
        Ok(record) => Ok(Some(resource.response_to_state(record))),
        Err(e) if R::is_not_found(&e) => match policy {
            MissingPolicy::Error => Err(Error::NotFound {
                resource_type: R::TYPE_NAME.to_string(),
                id: id.to_string(),
            }),
            MissingPolicy::Remove => {
                log::warn!(
                    "{} {id} no longer exists; dropping it from state",
                    R::TYPE_NAME
                );
                Ok(None)
            }
        },
        Err(e) => Err(remote_failure::<R>(Operation::Read, id, e)),
    }
}

/// Update the entity in place with the full planned declaration.
///
/// Refuses to run when a replace-trigger attribute would change; that calls
/// for delete then create instead.
pub fn update<R: ManagedResource>(
    resource: &R,
    prior: &R::Model,
    planned: &R::Model,
) -> Result<R::Model> {
    let id = require_id::<R>(prior)?;

    let triggers = resource.schema().replace_triggers(
        &serde_json::to_value(prior)?,
        &serde_json::to_value(planned)?,
    );
    if !triggers.is_empty() {
        return Err(Error::State(format!(
            "{} {id}: {} cannot change in place; replace it instead",
            R::TYPE_NAME,
            triggers.join(", ")
        )));
    }

    log::debug!("updating {} {id}", R::TYPE_NAME);
    let request = resource.plan_to_request(planned);
    let record = resource
        .remote_update(id, &request)
        .map_err(|e| remote_failure::<R>(Operation::Update, id, e))?;
    Ok(resource.response_to_state(record))
}

/// Delete the entity. On failure the prior state stays valid.
pub fn delete<R: ManagedResource>(resource: &R, state: &R::Model) -> Result<()> {
    let id = require_id::<R>(state)?;
    log::debug!("deleting {} {id}", R::TYPE_NAME);
    resource
        .remote_delete(id)
        .map_err(|e| remote_failure::<R>(Operation::Delete, id, e))
}

/// Bind an existing remote entity to a new declaration.
pub fn import<R: ManagedResource>(resource: &R, id: &str) -> Result<R::Model> {
    log::debug!("importing {} {id}", R::TYPE_NAME);
    let bound = R::with_id(id);
    read(resource, &bound, MissingPolicy::Error)?.ok_or_else(|| Error::NotFound {
        resource_type: R::TYPE_NAME.to_string(),
        id: id.to_string(),
    })
}
