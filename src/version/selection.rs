//! Extraction and ranking of catalog entries per selection rule

use std::cmp::Ordering;

use crate::version::types::{SelectionRule, VersionCatalog, VersionDescriptor};

/// Extracts the entries selected by a single rule.
///
/// - `TopPrs(n)`: pull-request builds ordered newest first, at most `n` of
///   them. The list is sorted ascending (stable) and then reversed, so entries
///   sharing a timestamp come out in reverse of their catalog order. Entries
///   without a timestamp rank oldest.
/// - `Branch(name)`: branch builds whose `branch` equals `name`, in catalog
///   order.
pub fn extract_versions(rule: &SelectionRule, catalog: &VersionCatalog) -> Vec<VersionDescriptor> {
    match rule {
        SelectionRule::TopPrs(count) => {
            let mut prs = catalog.prs.clone();
            prs.sort_by(compare_timestamps);
            prs.reverse();
            prs.truncate(*count);
            prs
        }
        SelectionRule::Branch(name) => catalog
            .branches
            .iter()
            .filter(|entry| entry.branch.as_deref() == Some(name.as_str()))
            .cloned()
            .collect(),
    }
}

/// Applies every rule to the full catalog and concatenates the results in
/// rule order.
pub fn merge_versions(rules: &[SelectionRule], catalog: &VersionCatalog) -> Vec<VersionDescriptor> {
    rules
        .iter()
        .flat_map(|rule| extract_versions(rule, catalog))
        .collect()
}

fn compare_timestamps(a: &VersionDescriptor, b: &VersionDescriptor) -> Ordering {
    match (a.timestamp_value(), b.timestamp_value()) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
