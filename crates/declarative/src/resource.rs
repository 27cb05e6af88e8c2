//! Resource traits for declarative state management
//!
//! A resource kind implements [`ManagedResource`]: its schema, the two pure
//! translators between canonical state and the remote API, and the four
//! remote calls. The lifecycle in [`crate::lifecycle`] is written once
//! against this trait.
//!
//! The orchestration layer works with many kinds at once, so each kind is
//! also reachable through the object-safe [`Resource`] trait, which speaks
//! `serde_json::Value` and is implemented for every `ManagedResource` by a
//! private adapter. A [`Registry`] maps resource type names to them.

use crate::diff::{ResourceDiff, compute_diff};
use crate::error::{Error, Result, chain};
use crate::lifecycle;
use crate::schema::Schema;
use crate::types::{Action, ApplyResult, MissingPolicy, StateUpdate};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// A kind of remote entity managed through create/read/update/delete.
///
/// # Example
///
/// ```ignore
/// impl ManagedResource for OrganizationResource {
///     type Model = OrganizationModel;
///     type Request = OrganizationRequest;
///     type Record = Organization;
///     type Error = iotcentral_client::Error;
///
///     const TYPE_NAME: &'static str = "iotcentral_organization";
///
///     fn schema(&self) -> Schema {
///         Schema::new()
///             .with_attribute("id", Attribute::required_string().requires_replace())
///             .with_attribute("display_name", Attribute::required_string())
///     }
///     // translators and remote calls...
/// }
/// ```
pub trait ManagedResource: Send + Sync {
    /// Canonical local state. Every attribute is an `Option` so that unset
    /// and not-yet-known values can be represented.
    type Model: Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug + Send + Sync;
    /// Request body sent on create and update.
    type Request;
    /// Record returned by the remote system.
    type Record;
    /// Error returned by the remote calls.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Resource type name, e.g. `iotcentral_device`.
    const TYPE_NAME: &'static str;

    /// Position in the apply order; kinds that reference others go later.
    const STAGE: u32 = 0;

    fn schema(&self) -> Schema;

    /// Translate planned attributes into a request body.
    fn plan_to_request(&self, planned: &Self::Model) -> Self::Request;

    /// Translate a remote record into canonical state.
    fn response_to_state(&self, record: Self::Record) -> Self::Model;

    /// Remote ID held by a model, if known.
    fn id_of(model: &Self::Model) -> Option<&str>;

    /// A model with only the ID bound, used to import an existing entity.
    fn with_id(id: &str) -> Self::Model;

    /// IDs of entities of the same kind that must exist before this one.
    fn references(&self, _model: &Self::Model) -> Vec<String> {
        Vec::new()
    }

    /// Whether a remote error means the entity does not exist.
    fn is_not_found(error: &Self::Error) -> bool;

    fn remote_create(
        &self,
        planned: &Self::Model,
        request: &Self::Request,
    ) -> std::result::Result<Self::Record, Self::Error>;

    fn remote_read(&self, id: &str) -> std::result::Result<Self::Record, Self::Error>;

    fn remote_update(
        &self,
        id: &str,
        request: &Self::Request,
    ) -> std::result::Result<Self::Record, Self::Error>;

    fn remote_delete(&self, id: &str) -> std::result::Result<(), Self::Error>;
}

/// Type-erased view of a [`ManagedResource`].
pub trait Resource: Send + Sync {
    fn resource_type(&self) -> &'static str;

    fn schema(&self) -> Schema;

    /// Plan one declaration against its prior state.
    fn diff(
        &self,
        address: &str,
        config: Option<&Value>,
        prior: Option<&Value>,
    ) -> Result<ResourceDiff>;

    /// Carry out a planned change.
    ///
    /// Never fails outright: failures are reported in the [`ApplyResult`]
    /// together with what happened to the state entry. A replacement whose
    /// delete succeeded but whose create failed removes the entry.
    fn apply(&self, diff: &ResourceDiff) -> (ApplyResult, StateUpdate);

    /// Re-read the remote entity behind a state entry.
    fn refresh(&self, state: &Value, policy: MissingPolicy) -> Result<Option<Value>>;

    /// Read an existing remote entity into new canonical state.
    fn import(&self, id: &str) -> Result<Value>;
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

struct Adapter<R>(R);

impl<R: ManagedResource> Adapter<R> {
    fn decode(address: &str, value: &Value) -> Result<R::Model> {
        serde_json::from_value(value.clone()).map_err(|e| Error::State(format!("{address}: {e}")))
    }

    fn planned(diff: &ResourceDiff) -> Result<R::Model> {
        let planned = diff
            .planned
            .as_ref()
            .ok_or_else(|| Error::State(format!("{}: nothing planned", diff.address)))?;
        Self::decode(&diff.address, planned)
    }

    fn prior(diff: &ResourceDiff) -> Result<R::Model> {
        let prior = diff
            .prior
            .as_ref()
            .ok_or_else(|| Error::State(format!("{}: no prior state", diff.address)))?;
        Self::decode(&diff.address, prior)
    }

    fn create(&self, diff: &ResourceDiff) -> Result<Value> {
        let state = lifecycle::create(&self.0, &Self::planned(diff)?)?;
        Ok(serde_json::to_value(state)?)
    }

    fn update(&self, diff: &ResourceDiff) -> Result<Value> {
        let state = lifecycle::update(&self.0, &Self::prior(diff)?, &Self::planned(diff)?)?;
        Ok(serde_json::to_value(state)?)
    }

    fn delete(&self, diff: &ResourceDiff) -> Result<()> {
        lifecycle::delete(&self.0, &Self::prior(diff)?)
    }
}

fn failed(error: &Error, state: StateUpdate) -> (ApplyResult, StateUpdate) {
    (
        ApplyResult::Failed {
            error: chain(error),
        },
        state,
    )
}

impl<R: ManagedResource> Resource for Adapter<R> {
    fn resource_type(&self) -> &'static str {
        R::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        self.0.schema()
    }

    fn diff(
        &self,
        address: &str,
        config: Option<&Value>,
        prior: Option<&Value>,
    ) -> Result<ResourceDiff> {
        let planned = compute_diff(&self.0.schema(), config, prior)
            .map_err(|diagnostics| Error::config(R::TYPE_NAME, address, diagnostics))?;

        let planned_model = planned
            .planned
            .as_ref()
            .map(|v| Self::decode(address, v))
            .transpose()?;
        let prior_model = prior.map(|v| Self::decode(address, v)).transpose()?;

        let id = planned_model
            .as_ref()
            .and_then(R::id_of)
            .or_else(|| prior_model.as_ref().and_then(R::id_of))
            .map(str::to_string);
        let references = match (&planned_model, &prior_model) {
            (Some(model), _) | (None, Some(model)) => self.0.references(model),
            (None, None) => Vec::new(),
        };

        Ok(ResourceDiff {
            address: address.to_string(),
            resource_type: R::TYPE_NAME.to_string(),
            action: planned.action,
            prior: prior.cloned(),
            planned: planned.planned,
            unknown: planned.unknown,
            changes: planned.changes,
            replace_triggers: planned.replace_triggers,
            id,
            references,
            stage: R::STAGE,
        })
    }

    fn apply(&self, diff: &ResourceDiff) -> (ApplyResult, StateUpdate) {
        let outcome = match diff.action {
            Action::NoOp => return (ApplyResult::NoChange, StateUpdate::Unchanged),
            Action::Create => self
                .create(diff)
                .map(|state| (ApplyResult::Created, StateUpdate::Set(state))),
            Action::Update => self
                .update(diff)
                .map(|state| (ApplyResult::Modified, StateUpdate::Set(state))),
            Action::Delete => self
                .delete(diff)
                .map(|()| (ApplyResult::Removed, StateUpdate::Remove)),
            Action::Replace => {
                if let Err(e) = self.delete(diff) {
                    return failed(&e, StateUpdate::Unchanged);
                }
                match self.create(diff) {
                    Ok(state) => Ok((ApplyResult::Replaced, StateUpdate::Set(state))),
                    Err(e) => return failed(&e, StateUpdate::Remove),
                }
            }
        };

        match outcome {
            Ok(done) => done,
            Err(e) => failed(&e, StateUpdate::Unchanged),
        }
    }

    fn refresh(&self, state: &Value, policy: MissingPolicy) -> Result<Option<Value>> {
        let model = Self::decode(R::TYPE_NAME, state)?;
        match lifecycle::read(&self.0, &model, policy)? {
            Some(fresh) => Ok(Some(serde_json::to_value(fresh)?)),
            None => Ok(None),
        }
    }

    fn import(&self, id: &str) -> Result<Value> {
        let state = lifecycle::import(&self.0, id)?;
        Ok(serde_json::to_value(state)?)
    }
}

/// Box a managed resource behind the type-erased [`Resource`] trait.
pub fn boxed<R: ManagedResource + 'static>(resource: R) -> BoxedResource {
    Box::new(Adapter(resource))
}

/// Resource kinds by type name.
#[derive(Default)]
pub struct Registry {
    resources: Vec<BoxedResource>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource kind, replacing any earlier one of the same type.
    pub fn with<R: ManagedResource + 'static>(mut self, resource: R) -> Self {
        self.resources.retain(|r| r.resource_type() != R::TYPE_NAME);
        self.resources.push(boxed(resource));
        self
    }

    pub fn get(&self, resource_type: &str) -> Option<&dyn Resource> {
        self.resources
            .iter()
            .find(|r| r.resource_type() == resource_type)
            .map(|r| r.as_ref())
    }

    pub fn require(&self, resource_type: &str) -> Result<&dyn Resource> {
        self.get(resource_type)
            .ok_or_else(|| Error::UnknownResourceType(resource_type.to_string()))
    }

    /// Registered type names, in registration order.
    pub fn resource_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resources.iter().map(|r| r.resource_type())
    }

    /// Plan one declaration of the given type.
    pub fn diff(
        &self,
        address: &str,
        resource_type: &str,
        config: Option<&Value>,
        prior: Option<&Value>,
    ) -> Result<ResourceDiff> {
        self.require(resource_type)?.diff(address, config, prior)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.resource_types()).finish()
    }
}
