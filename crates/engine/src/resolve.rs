// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2025 South Patron LLC
// This file is part of ReasonChip and licensed under the GPLv3+.
// See <https://www.gnu.org/licenses/> for details.

//! Dotted-relative name resolution, the same semantics as common
//! dotted-relative imports: empty stack or no leading dots means the
//! name is absolute; each leading dot climbs one level from the current
//! top of stack, stripping trailing components of its fully-qualified
//! name. Exceeding the top frame's depth is a resolution error.

use crate::error::EngineError;

/// Resolve `name` against the current call stack's top frame.
///
/// `stack` is the call stack at the point of resolution, most recent
/// frame last. A name with no leading dots is returned unchanged
/// (already absolute). A name with `n` leading dots strips the last `n`
/// dot-separated components from the stack top's fully-qualified name
/// and joins what remains with the rest of `name`.
pub fn resolve(name: &str, stack: &[String]) -> Result<String, EngineError> {
    let dots = name.chars().take_while(|&c| c == '.').count();
    if dots == 0 {
        return Ok(name.to_string());
    }

    let rest = &name[dots..];

    let top = stack
        .last()
        .ok_or_else(|| EngineError::WorkflowNotFound(name.to_string()))?;
    let parts: Vec<&str> = top.split('.').collect();

    if dots > parts.len() {
        return Err(EngineError::WorkflowNotFound(name.to_string()));
    }

    let prefix = &parts[..parts.len() - dots];

    match (prefix.is_empty(), rest.is_empty()) {
        (true, true) => Err(EngineError::WorkflowNotFound(name.to_string())),
        (true, false) => Ok(rest.to_string()),
        (false, true) => Ok(prefix.join(".")),
        (false, false) => Ok(format!("{}.{}", prefix.join("."), rest)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn stack(top: &str) -> Vec<String> {
        vec![top.to_string()]
    }

    #[test]
    fn empty_stack_takes_an_absolute_name_as_is() {
        assert_eq!(resolve("pkg.hello", &[]).unwrap(), "pkg.hello");
    }

    #[test]
    fn names_with_no_leading_dots_are_always_absolute() {
        assert_eq!(resolve("pkg.hello", &stack("pkg.sub.a")).unwrap(), "pkg.hello");
    }

    #[test]
    fn one_leading_dot_is_a_sibling_within_the_current_package() {
        // Stack top is pkg.sub.a; ".sibling" resolves to pkg.sub.sibling
        assert_eq!(resolve(".sibling", &stack("pkg.sub.a")).unwrap(), "pkg.sub.sibling");
    }

    #[test]
    fn two_leading_dots_climb_to_the_parent_package() {
        // Stack top is pkg.sub.a; "..other" resolves to pkg.other
        assert_eq!(resolve("..other", &stack("pkg.sub.a")).unwrap(), "pkg.other");
    }

    #[test]
    fn dots_exactly_matching_stack_depth_yield_the_bare_package_root() {
        assert_eq!(resolve("...hello", &stack("pkg.sub.a")).unwrap(), "hello");
    }

    #[test]
    fn dots_exceeding_stack_depth_is_a_resolution_error() {
        // Exceeding the stack depth with leading dots is an error.
        let err = resolve("....hello", &stack("pkg.sub.a")).unwrap_err();
        assert!(matches!(err, EngineError::WorkflowNotFound(_)));
    }

    #[test]
    fn a_relative_name_against_an_empty_stack_is_a_resolution_error() {
        let err = resolve(".hello", &[]).unwrap_err();
        assert!(matches!(err, EngineError::WorkflowNotFound(_)));
    }

    #[test]
    fn all_dots_no_trailing_name_against_an_empty_top_is_an_error() {
        let err = resolve(".", &stack("a")).unwrap_err();
        assert!(matches!(err, EngineError::WorkflowNotFound(_)));
    }

    proptest! {
        // Resolving an already-resolved (absolute) name is a no-op,
        // regardless of which stack it's resolved against.
        #[test]
        fn resolution_is_idempotent_on_absolute_names(
            segments in prop::collection::vec("[a-z]{1,8}", 1..4),
            top_segments in prop::collection::vec("[a-z]{1,8}", 1..4),
        ) {
            let name = segments.join(".");
            let top = top_segments.join(".");
            let s = stack(&top);

            let once = resolve(&name, &s).unwrap();
            let twice = resolve(&once, &s).unwrap();
            prop_assert_eq!(once, twice);
        }

        // A leading-dot name whose dot count exceeds the stack top's
        // depth always raises WorkflowNotFound.
        #[test]
        fn excess_dots_always_raise_workflow_not_found(
            top_segments in prop::collection::vec("[a-z]{1,8}", 1..4),
            extra in 1usize..5,
            tail in "[a-z]{0,8}",
        ) {
            let top = top_segments.join(".");
            let dots = ".".repeat(top_segments.len() + extra);
            let name = format!("{dots}{tail}");

            let err = resolve(&name, &stack(&top));
            prop_assert!(matches!(err, Err(EngineError::WorkflowNotFound(_))));
        }
    }
}
