//! Parsers for the string-encoded tool arguments.

use glbridge_core::api::BuildState;

/// Parse a comma-separated user ID list.
///
/// - `""` means "leave unchanged" (`None`),
/// - `"-"` means "clear" (`Some(vec![])`),
/// - otherwise every integer token is kept; other tokens are skipped.
pub fn parse_user_ids(input: &str) -> Option<Vec<u64>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if input == "-" {
        return Some(Vec::new());
    }

    let ids = input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| match token.parse::<u64>() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!("Skipping invalid user ID {:?}", token);
                None
            }
        })
        .collect();
    Some(ids)
}

/// Normalize a comma-separated label list. `None` when nothing is left.
pub fn parse_labels(input: Option<String>) -> Option<String> {
    let labels: Vec<&str> = input
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .collect();

    if labels.is_empty() {
        None
    } else {
        Some(labels.join(","))
    }
}

/// Parse a comma-separated job state list, dropping unknown and repeated
/// states. An empty result means "no filter".
pub fn parse_build_states(input: &str) -> Vec<BuildState> {
    let mut states = Vec::new();
    for token in input.split(',').map(str::trim) {
        match BuildState::from_name(token) {
            Some(state) if !states.contains(&state) => states.push(state),
            Some(_) => {}
            None if token.is_empty() => {}
            None => tracing::debug!("Ignoring unknown job state {:?}", token),
        }
    }
    states
}

/// `None` for absent and blank strings.
pub fn non_empty(input: Option<String>) -> Option<String> {
    input.filter(|s| !s.trim().is_empty())
}

/// Upstream `confidential` filter for list tools.
///
/// `true` lifts the filter so confidential records are included; `false`
/// (the default) restricts the listing to public records.
pub fn confidential_filter(include_confidential: bool) -> Option<bool> {
    if include_confidential {
        None
    } else {
        Some(false)
    }
}
