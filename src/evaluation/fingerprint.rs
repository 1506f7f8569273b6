//! Fingerprints used by the incremental sync protocol.
//!
//! A fingerprint is a stable (cross-process, cross-release) hash rendered as
//! a decimal string. SDKs echo it back, so the encoding must not change.
//! Inputs are canonicalised before hashing: features by id, user attributes
//! by key. Every field is followed by a NUL separator so adjacent fields
//! cannot run together.

use std::collections::HashMap;

use xxhash_rust::xxh3::Xxh3;

use crate::types::Feature;

/// Fingerprint returned when an environment has no candidate features.
pub const NO_EVALUATIONS: &str = "no_evaluations";

/// Fingerprint of a user's evaluation inputs.
pub fn user_evaluations_id(
    user_id: &str,
    user_data: &HashMap<String, String>,
    features: &[Feature],
) -> String {
    let mut hasher = Xxh3::new();
    write_field(&mut hasher, user_id);

    let mut keys: Vec<&String> = user_data.keys().collect();
    keys.sort();
    for key in keys {
        write_field(&mut hasher, key);
        write_field(&mut hasher, &user_data[key]);
    }

    write_features(&mut hasher, features);
    hasher.digest().to_string()
}

/// Fingerprint of a feature set, independent of any user.
pub fn features_id(features: &[Feature]) -> String {
    let mut hasher = Xxh3::new();
    write_features(&mut hasher, features);
    hasher.digest().to_string()
}

fn write_features(hasher: &mut Xxh3, features: &[Feature]) {
    let mut sorted: Vec<&Feature> = features.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));
    for feature in sorted {
        write_field(hasher, &format!("{}:{}", feature.id, feature.version));
    }
}

fn write_field(hasher: &mut Xxh3, value: &str) {
    hasher.update(value.as_bytes());
    hasher.update(&[0]);
}
