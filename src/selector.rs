//! Qualified-path resolution: filters and the depth bound against the unit tree.

use crate::types::{PathWarning, Selection, SourceUnit};

/// Collect every unit within the depth bound, in document order.
/// Recursion prunes once a subtree can no longer contain selectable units.
fn collect_within_depth<'a>(unit: &'a SourceUnit, depth: u32, out: &mut Vec<&'a SourceUnit>) {
    for child in &unit.children {
        if child.depth <= depth {
            out.push(child);
        }
        if child.depth < depth {
            collect_within_depth(child, depth, out);
        }
    }
    return;
}

/// Resolve one dot-separated filter by exact, case-sensitive segment
/// matching from the root. Among same-named siblings the first declared
/// wins.
fn resolve_filter<'a>(root: &'a SourceUnit, filter: &str) -> Option<&'a SourceUnit> {
    let mut current = root;
    for segment in filter.split('.') {
        current = current.children.iter().find(|c| return c.name == segment)?;
    }
    return Some(current);
}

/// Resolve filters against the tree, bounded by `depth`.
///
/// With no filters, every unit within the depth bound is selected
/// (whole-file mode). Each filter resolves to at most one unit; filters
/// naming nothing or naming a unit beyond the bound produce a warning
/// instead. The result is deduplicated and ordered by span start, so
/// reports iterate in document order regardless of filter order.
pub fn select<'a>(root: &'a SourceUnit, filters: &[String], depth: u32) -> Selection<'a> {
    let mut units: Vec<&'a SourceUnit> = Vec::new();
    let mut warnings = Vec::new();

    if filters.is_empty() {
        collect_within_depth(root, depth, &mut units);
        return Selection { units, warnings };
    }

    for filter in filters {
        match resolve_filter(root, filter) {
            None => warnings.push(PathWarning::UnknownPath {
                filter: filter.clone(),
            }),
            Some(unit) if unit.depth > depth => warnings.push(PathWarning::ExceedsDepth {
                depth,
                filter: filter.clone(),
                required: unit.depth,
            }),
            Some(unit) => units.push(unit),
        }
    }

    units.sort_by_key(|u| return u.span.start);
    units.dedup_by_key(|u| return u.span.start);
    return Selection { units, warnings };
}
