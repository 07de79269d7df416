use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::DeploymentSpec;
use serde_json::Value;

use crate::model::error::Error;
use crate::policy::quantity::same_quantity;

/// True when the observed spec no longer satisfies the desired one.
///
/// Only fields set on the desired side are compared, so values defaulted by the
/// API server (strategy, revisionHistoryLimit, terminationMessagePath, ...) do
/// not count as drift. Resource quantities compare by value, the server stores
/// them in canonical form ("0.5" comes back as "500m").
pub fn spec_drifted(observed: Option<&DeploymentSpec>, desired: &DeploymentSpec) -> Result<bool, Error> {
    let Some(observed) = observed else {
        return Ok(true);
    };
    let observed = serde_json::to_value(observed)
        .map_err(|err| Error::InvalidSpec(format!("cannot serialize observed spec - {err}")))?;
    let desired = serde_json::to_value(desired)
        .map_err(|err| Error::InvalidSpec(format!("cannot serialize desired spec - {err}")))?;
    Ok(!is_satisfied(&desired, &observed))
}

/// True when any desired label is missing or has another value.
pub fn labels_drifted(observed: Option<&BTreeMap<String, String>>, desired: &BTreeMap<String, String>) -> bool {
    desired.iter()
        .any(|(key, value)| observed.and_then(|labels| labels.get(key)) != Some(value))
}

/// Fields whose values (or map entries) are resource quantities.
static QUANTITY_FIELDS: [&str; 4] = ["limits", "requests", "overhead", "sizeLimit"];

fn is_satisfied(desired: &Value, observed: &Value) -> bool {
    satisfies(desired, observed, false)
}

fn satisfies(desired: &Value, observed: &Value, quantity: bool) -> bool {
    match (desired, observed) {
        (Value::Object(desired), Value::Object(observed)) => desired.iter()
            .all(|(key, desired_value)| match observed.get(key) {
                Some(observed_value) => satisfies(desired_value, observed_value, quantity || QUANTITY_FIELDS.contains(&key.as_str())),
                None => is_unset(desired_value),
            }),
        (Value::Array(desired), Value::Array(observed)) => desired.len() == observed.len()
            && desired.iter().zip(observed).all(|(d, o)| satisfies(d, o, quantity)),
        (desired, Value::Null) => is_unset(desired),
        (Value::Null, _) => true,
        (Value::String(desired), Value::String(observed)) if quantity => same_quantity(desired, observed),
        (desired, observed) => desired == observed,
    }
}

fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.values().all(is_unset),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
