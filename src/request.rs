use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{Rule, Violation};
use crate::property::{PropertyRequest, PropertyTag, ALL_PROPERTIES};

/// Resolved, read-only tag list of one load case. Broadcast lists are shared
/// between load cases rather than copied.
pub type TagList = Arc<[PropertyTag]>;

/// Resolves a single `expectedProperties` entry
///
/// # Arguments
/// * `requests` - The parsed entries of one list
/// * `path` - Document path of the list, used for violations
///
/// # Returns
/// The concrete tags, or one violation per duplicated tag
pub fn resolve_list(requests: &[PropertyRequest], path: &str) -> Result<TagList, Vec<Violation>> {
    // `all` absorbs everything listed next to it
    if requests.contains(&PropertyRequest::All) {
        return Ok(Arc::from(ALL_PROPERTIES.as_slice()));
    }

    let mut seen: HashSet<PropertyTag> = HashSet::new();
    let mut tags: Vec<PropertyTag> = Vec::with_capacity(requests.len());
    let mut violations: Vec<Violation> = Vec::new();

    for (i, request) in requests.iter().enumerate() {
        let PropertyRequest::Tag(tag) = request else {
            continue;
        };
        if !seen.insert(*tag) {
            violations.push(Violation::new(
                format!("{path}[{i}]"),
                Rule::DuplicateProperty,
                format!("{tag} is requested more than once for the same load case"),
            ));
            continue;
        }
        tags.push(*tag);
    }

    if violations.is_empty() {
        Ok(Arc::from(tags))
    } else {
        Err(violations)
    }
}

/// Expands the case-level `expectedProperties` into one tag list per load case
///
/// # Arguments
/// * `lists` - Parsed `expectedProperties`, either one list or one per load case
/// * `load_cases` - Number of tensors in the case
///
/// # Returns
/// A vector aligned with the tensors. A single input list is resolved once and
/// the same allocation is handed to every load case.
pub fn resolve(
    lists: &[Vec<PropertyRequest>],
    load_cases: usize,
) -> Result<Vec<TagList>, Vec<Violation>> {
    if lists.len() == 1 {
        let shared = resolve_list(&lists[0], "loading.expectedProperties[0]")?;
        return Ok(vec![shared; load_cases]);
    }

    if lists.len() != load_cases {
        return Err(vec![Violation::new(
            "loading.expectedProperties",
            Rule::LengthParity,
            format!(
                "{} property lists given for {} load cases; expected 1 or {}",
                lists.len(),
                load_cases,
                load_cases
            ),
        )]);
    }

    let mut resolved: Vec<TagList> = Vec::with_capacity(lists.len());
    let mut violations: Vec<Violation> = Vec::new();
    for (i, list) in lists.iter().enumerate() {
        match resolve_list(list, &format!("loading.expectedProperties[{i}]")) {
            Ok(tags) => resolved.push(tags),
            Err(mut errs) => violations.append(&mut errs),
        }
    }

    if violations.is_empty() {
        Ok(resolved)
    } else {
        Err(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requests(raw: &[&str]) -> Vec<PropertyRequest> {
        raw.iter().map(|r| r.parse().unwrap()).collect()
    }

    #[test]
    fn wildcard_expands_to_the_full_set() {
        let tags = resolve_list(&requests(&["all"]), "p").unwrap();
        assert_eq!(&*tags, ALL_PROPERTIES.as_slice());
    }

    #[test]
    fn wildcard_absorbs_other_tags() {
        let tags = resolve_list(&requests(&["E11", "all", "E11"]), "p").unwrap();
        assert_eq!(tags.len(), 12);
    }

    #[test]
    fn explicit_tags_keep_their_order() {
        let tags = resolve_list(&requests(&["v13", "E11", "v12"]), "p").unwrap();
        let rendered: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        assert_eq!(rendered, ["v13", "E11", "v12"]);
    }

    #[test]
    fn duplicates_are_reported_at_their_position() {
        let errs = resolve_list(&requests(&["E11", "G12", "E11"]), "loading.expectedProperties[3]")
            .unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].path, "loading.expectedProperties[3][2]");
        assert_eq!(errs[0].rule, Rule::DuplicateProperty);
    }

    #[test]
    fn single_list_is_shared_across_load_cases() {
        let resolved = resolve(&[requests(&["E11", "v12"])], 4).unwrap();
        assert_eq!(resolved.len(), 4);
        for tags in &resolved[1..] {
            assert!(Arc::ptr_eq(tags, &resolved[0]));
        }
    }

    #[test]
    fn per_case_lists_stay_positional() {
        let resolved = resolve(&[requests(&["E11"]), requests(&["G12"])], 2).unwrap();
        assert_eq!(resolved[0][0].to_string(), "E11");
        assert_eq!(resolved[1][0].to_string(), "G12");
    }

    #[test]
    fn mismatched_list_count_is_a_parity_error() {
        let errs = resolve(&[requests(&["E11"]), requests(&["G12"])], 3).unwrap_err();
        assert_eq!(errs[0].rule, Rule::LengthParity);
    }
}
