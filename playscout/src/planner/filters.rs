//! Filter sets and their two evaluation surfaces.
//!
//! A `FilterSet` is applied twice per fetch: serialized into Overpass QL
//! clauses server-side, and re-evaluated against each element's tags
//! client-side. The upstream query language cannot express everything
//! (synonym tag keys, ratings defined by the local backend), so the two
//! surfaces must agree on semantics — both live here.

use std::collections::BTreeMap;

/// Tag values that count as "active" for boolean-style feature tags.
///
/// OSM data is inconsistent here: `yes`, `true`, and `1` all occur in the
/// wild, and backend records may carry JSON booleans or numbers that were
/// stringified upstream.
pub fn tag_value_active(value: &str) -> bool {
    matches!(value, "yes" | "true" | "1")
}

/// Active tag filters for a playground query.
///
/// Feature tags are order-insensitive; clause order is deterministic
/// (sorted by key) so plans compare equal regardless of insertion order.
/// Empty values are treated as inactive and ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    features: BTreeMap<String, String>,
    surface: Option<String>,
    theme: Option<String>,
    min_age: Option<u32>,
    max_age: Option<u32>,
    min_rating: Option<f64>,
}

impl FilterSet {
    /// Sets a feature tag requirement, e.g. `playground:slide` = `yes`.
    ///
    /// An empty value deactivates the filter.
    pub fn set_feature(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        if value.is_empty() {
            self.features.remove(&key);
        } else {
            self.features.insert(key, value);
        }
        self
    }

    /// Requires a specific `surface` tag value.
    pub fn set_surface(&mut self, surface: impl Into<String>) -> &mut Self {
        let s = surface.into();
        self.surface = (!s.is_empty()).then_some(s);
        self
    }

    /// Requires a specific `theme` tag value.
    pub fn set_theme(&mut self, theme: impl Into<String>) -> &mut Self {
        let t = theme.into();
        self.theme = (!t.is_empty()).then_some(t);
        self
    }

    /// Requires the playground's advertised age range to admit children of
    /// at least this age.
    pub fn set_min_age(&mut self, age: u32) -> &mut Self {
        self.min_age = Some(age);
        self
    }

    /// Requires the playground's advertised age range to admit children of
    /// at most this age.
    pub fn set_max_age(&mut self, age: u32) -> &mut Self {
        self.max_age = Some(age);
        self
    }

    /// Requires a minimum rating. Values outside `[1, 5]` are ignored.
    pub fn set_min_rating(&mut self, rating: f64) -> &mut Self {
        self.min_rating = (1.0..=5.0).contains(&rating).then_some(rating);
        self
    }

    /// Active feature tag requirements, sorted by key.
    pub fn features(&self) -> impl Iterator<Item = (&str, &str)> {
        self.features.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The active surface requirement, if any.
    pub fn surface(&self) -> Option<&str> {
        self.surface.as_deref()
    }

    /// The active theme requirement, if any.
    pub fn theme(&self) -> Option<&str> {
        self.theme.as_deref()
    }

    /// The active minimum-age requirement, if any.
    pub fn min_age(&self) -> Option<u32> {
        self.min_age
    }

    /// The active maximum-age requirement, if any.
    pub fn max_age(&self) -> Option<u32> {
        self.max_age
    }

    /// The active minimum-rating requirement, if any.
    pub fn min_rating(&self) -> Option<f64> {
        self.min_rating
    }

    /// True when no filter is active.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
            && self.surface.is_none()
            && self.theme.is_none()
            && self.min_age.is_none()
            && self.max_age.is_none()
            && self.min_rating.is_none()
    }

    /// Serializes the active filters into Overpass QL clauses, one clause
    /// per active entry, in deterministic order.
    pub fn clauses(&self) -> Vec<String> {
        let mut clauses = Vec::new();
        for (key, value) in &self.features {
            clauses.push(format!("[\"{key}\"=\"{value}\"]"));
        }
        if let Some(surface) = &self.surface {
            clauses.push(format!("[\"surface\"=\"{surface}\"]"));
        }
        if let Some(theme) = &self.theme {
            clauses.push(format!("[\"theme\"=\"{theme}\"]"));
        }
        // Age filters are range-overlap checks; untagged elements pass
        // (missing data is not an exclusion).
        if let Some(min_age) = self.min_age {
            clauses.push(format!(
                "(if:!is_tag(\"max_age\")||number(t[\"max_age\"])>={min_age})"
            ));
        }
        if let Some(max_age) = self.max_age {
            clauses.push(format!(
                "(if:!is_tag(\"min_age\")||number(t[\"min_age\"])<={max_age})"
            ));
        }
        if let Some(rating) = self.min_rating {
            clauses.push(format!(
                "(if:number(t[\"rating\"])>={rating}||number(t[\"stars\"])>={rating})"
            ));
        }
        clauses
    }

    /// Client-side re-evaluation of this filter set against an element's
    /// tags, with an optional externally-resolved rating (backend records
    /// carry their rating outside the tag map).
    pub fn matches(&self, tags: &BTreeMap<String, String>, rating: Option<f64>) -> bool {
        for (key, value) in &self.features {
            if !feature_matches(tags, key, value) {
                return false;
            }
        }
        if let Some(surface) = &self.surface {
            if tags.get("surface") != Some(surface) {
                return false;
            }
        }
        if let Some(theme) = &self.theme {
            if tags.get("theme") != Some(theme) {
                return false;
            }
        }
        if let Some(min_age) = self.min_age {
            if let Some(max_tag) = numeric_tag(tags, "max_age") {
                if max_tag < min_age as f64 {
                    return false;
                }
            }
        }
        if let Some(max_age) = self.max_age {
            if let Some(min_tag) = numeric_tag(tags, "min_age") {
                if min_tag > max_age as f64 {
                    return false;
                }
            }
        }
        if let Some(min_rating) = self.min_rating {
            let resolved = rating
                .or_else(|| numeric_tag(tags, "rating"))
                .or_else(|| numeric_tag(tags, "stars"));
            match resolved {
                Some(r) if r >= min_rating => {}
                _ => return false,
            }
        }
        true
    }
}

/// Checks one feature requirement against the tag map, including recognized
/// key synonyms: `playground:slide` and bare `slide` describe the same
/// equipment in the wild.
fn feature_matches(tags: &BTreeMap<String, String>, key: &str, wanted: &str) -> bool {
    for candidate in synonym_keys(key) {
        if let Some(actual) = tags.get(&candidate) {
            if tag_value_active(wanted) {
                if tag_value_active(actual) {
                    return true;
                }
            } else if actual == wanted {
                return true;
            }
        }
    }
    false
}

fn synonym_keys(key: &str) -> Vec<String> {
    match key.strip_prefix("playground:") {
        Some(bare) => vec![key.to_string(), bare.to_string()],
        None => vec![key.to_string(), format!("playground:{key}")],
    }
}

fn numeric_tag(tags: &BTreeMap<String, String>, key: &str) -> Option<f64> {
    tags.get(key).and_then(|v| v.parse().ok())
}
