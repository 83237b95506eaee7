//! Differ - Compare desired state with current state
//!
//! Compares the desired resource with the state fetched from the Provider and
//! decides whether it needs creating, updating in place, or replacing.

use std::collections::HashMap;

use crate::resource::{Resource, ResourceId, State, Value};
use crate::schema::ResourceSchema;

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences that can be applied in place
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// A force-new attribute changed -> delete and create
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
    /// Resource exists but not in desired state -> needs deletion
    Delete(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare desired state with current state to compute a Diff
pub fn diff(desired: &Resource, current: &State, schema: &ResourceSchema) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let mut desired_attrs = desired.attributes.clone();
    schema.apply_defaults(&mut desired_attrs);

    let changed = find_changed_attributes(&desired_attrs, &current.attributes, schema);

    if changed.is_empty() {
        return Diff::NoChange(desired.id.clone());
    }

    let forces_replacement = changed.iter().any(|name| {
        schema
            .attributes
            .get(name)
            .is_some_and(|attr| attr.force_new)
    });

    if forces_replacement {
        Diff::Replace {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Find changed attributes between desired and current state
fn find_changed_attributes(
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
    schema: &ResourceSchema,
) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, desired_value) in desired {
        // Skip internal attributes (starting with _)
        if key.starts_with('_') {
            continue;
        }
        if schema.attributes.get(key).is_some_and(|a| a.computed) {
            continue;
        }

        match current.get(key) {
            Some(current_value) if values_equal(current_value, desired_value) => {}
            _ => changed.push(key.clone()),
        }
    }

    changed.sort();
    changed
}

/// Equality that treats Int and Float with the same numeric value as equal.
/// Inside maps an absent key equals an empty list.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            a.as_float() == b.as_float()
        }
        (Value::List(x), Value::List(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b))
        }
        (Value::Map(x), Value::Map(y)) => x.keys().chain(y.keys()).all(|k| {
            match (x.get(k), y.get(k)) {
                (Some(v), Some(other)) => values_equal(v, other),
                (Some(v), None) | (None, Some(v)) => is_empty_list(v),
                (None, None) => true,
            }
        }),
        _ => a == b,
    }
}

fn is_empty_list(value: &Value) -> bool {
    matches!(value, Value::List(items) if items.is_empty())
}

/// Compute Diffs for desired resources, plus deletions for states that are no
/// longer desired
pub fn diff_all(
    desired: &[Resource],
    current_states: &HashMap<ResourceId, State>,
    schemas: &HashMap<String, ResourceSchema>,
) -> Vec<Diff> {
    let mut diffs = Vec::new();

    for resource in desired {
        let current = current_states
            .get(&resource.id)
            .cloned()
            .unwrap_or_else(|| State::not_found(resource.id.clone()));
        let schema = schemas
            .get(&resource.id.resource_type)
            .cloned()
            .unwrap_or_else(|| ResourceSchema::new(resource.id.resource_type.clone()));

        diffs.push(diff(resource, &current, &schema));
    }

    let mut orphaned: Vec<&ResourceId> = current_states
        .iter()
        .filter(|(id, state)| state.exists && !desired.iter().any(|r| &r.id == *id))
        .map(|(id, _)| id)
        .collect();
    orphaned.sort_by(|a, b| (&a.resource_type, &a.name).cmp(&(&b.resource_type, &b.name)));
    diffs.extend(orphaned.into_iter().cloned().map(Diff::Delete));

    diffs
}
