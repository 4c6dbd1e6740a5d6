//! Site profiles: the CSS surface of one registry family.
//!
//! A profile describes where the list, rows, detail view and pagination
//! controls live on a site. The navigator is generic over profiles, so
//! supporting a new municipality on a known platform is a matter of
//! adding selectors, not code.

use serde::Serialize;

/// How a registry paginates its association list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationModel {
    /// Numbered page links; the adapter clicks the link after the
    /// current one.
    NumberedLinks,
    /// A single "next" anchor.
    NextLink,
    /// A "next" button, disabled on the last page.
    NextButton,
}

impl PaginationModel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NumberedLinks => "numbered_links",
            Self::NextLink => "next_link",
            Self::NextButton => "next_button",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pagination {
    pub model: PaginationModel,
    /// Matches the control that advances to the next page. For
    /// numbered links this targets the link following the current
    /// page marker, so it stops matching on the last page.
    pub next_selector: String,
    /// When this matches, the next control is present but inert.
    pub disabled_selector: Option<String>,
}

/// Selector set for one registry platform.
///
/// Per-row selectors (`row_name_selector`, `row_open_selector`,
/// `row_link_selector`) must match exactly one element per list row,
/// in row order.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    /// Signals that the association list has rendered.
    pub list_ready_selector: String,
    /// One match per association row.
    pub row_selector: String,
    /// The row's association name.
    pub row_name_selector: String,
    /// The element clicked to open the row's detail view.
    pub row_open_selector: String,
    /// Optional anchor carrying a stable detail permalink.
    pub row_link_selector: Option<String>,
    /// Root of the detail view once open. Its HTML and text form the
    /// extraction snapshot; its absence confirms the view is closed.
    pub detail_root_selector: String,
    /// Page-level marker present while a modal is open. Closing is
    /// only confirmed once both the detail root and this marker are
    /// gone.
    pub modal_open_selector: Option<String>,
    /// Close controls in preference order. The Escape key is always
    /// the final fallback.
    pub close_selectors: Vec<String>,
    pub pagination: Pagination,
    /// Element whose text states the expected number of associations.
    pub total_count_selector: Option<String>,
    /// Element describing the currently active list filter.
    pub filter_state_selector: Option<String>,
}

/// Pulls the last integer out of a result-count blurb.
///
/// Handles the phrasings these registries use: `"Antal föreningar: 132"`,
/// `"132 träffar"` and window phrasings like `"1 - 20 av 132"`, where
/// the final number is the total.
#[must_use]
pub fn parse_trailing_count(text: &str) -> Option<usize> {
    let mut last: Option<usize> = None;
    let mut current: Option<usize> = None;
    for ch in text.chars() {
        if let Some(digit) = ch.to_digit(10) {
            let value = current
                .unwrap_or(0)
                .saturating_mul(10)
                .saturating_add(digit as usize);
            current = Some(value);
        } else if let Some(done) = current.take() {
            last = Some(done);
        }
    }
    current.or(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- parse_trailing_count ----

    #[test]
    fn parses_labelled_total() {
        assert_eq!(parse_trailing_count("Antal föreningar: 132"), Some(132));
    }

    #[test]
    fn parses_hit_count_phrasing() {
        assert_eq!(parse_trailing_count("132 träffar"), Some(132));
    }

    #[test]
    fn takes_the_last_number_in_a_window_phrase() {
        assert_eq!(parse_trailing_count("Visar 1 - 20 av 457"), Some(457));
    }

    #[test]
    fn no_digits_yields_none() {
        assert_eq!(parse_trailing_count("Inga träffar"), None);
    }

    #[test]
    fn empty_input_yields_none() {
        assert_eq!(parse_trailing_count(""), None);
    }

    // ---- PaginationModel ----

    #[test]
    fn model_names_are_stable() {
        assert_eq!(PaginationModel::NumberedLinks.as_str(), "numbered_links");
        assert_eq!(PaginationModel::NextLink.as_str(), "next_link");
        assert_eq!(PaginationModel::NextButton.as_str(), "next_button");
    }
}
