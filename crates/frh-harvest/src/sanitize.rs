//! Record sanitation: pure, total and idempotent.
//!
//! Every function here accepts whatever messy value extraction found
//! and either returns a cleaned form or gives the value up as `None`.
//! Running [`sanitize_record`] twice yields the same record as running
//! it once, so re-sanitizing old output is always safe. Suspicious
//! values are flagged, never discarded: an implausible organisation
//! number stays on the record with `invalid_org_number` set in extras.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use url::Url;

use frh_core::{AssociationRecord, ContactRecord, Description};

static EMAIL_SHAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9._%+\-]*@[a-z0-9](?:[a-z0-9.\-]*[a-z0-9])?\.[a-z]{2,}$")
        .expect("valid regex")
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<[^>]+>").expect("valid regex"));

static BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*(?:br\s*/?|/p|/div|/li|/tr|/h[1-6])\s*>").expect("valid regex")
});

/// Lowercases, strips a `mailto:` prefix and validates a conservative
/// address shape. Anything that fails the shape check is dropped.
#[must_use]
pub fn normalize_email(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase();
    let candidate = lowered.strip_prefix("mailto:").unwrap_or(&lowered);
    let candidate = candidate
        .split_once('?')
        .map_or(candidate, |(address, _)| address)
        .trim();
    if EMAIL_SHAPE_RE.is_match(candidate) {
        Some(candidate.to_owned())
    } else {
        None
    }
}

/// Normalizes a phone number towards E.164 for Swedish numbers.
///
/// `00` becomes `+`, a leading `0` becomes `+46`, a bare `46` country
/// prefix gains `+`. Anything else passes through digit-stripped, so
/// no number is lost merely for looking foreign.
#[must_use]
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let has_plus = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    let normalized = if has_plus {
        format!("+{digits}")
    } else if let Some(rest) = digits.strip_prefix("00") {
        if rest.is_empty() {
            return None;
        }
        format!("+{rest}")
    } else if let Some(rest) = digits.strip_prefix('0') {
        if rest.is_empty() {
            return None;
        }
        format!("+46{rest}")
    } else if digits.starts_with("46") {
        format!("+{digits}")
    } else {
        digits
    };
    Some(normalized)
}

/// Formats five contiguous digits as `"NNN NN"`. Anything else passes
/// through trimmed, so foreign postal codes survive untouched.
#[must_use]
pub fn normalize_postal_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.len() == 5 && compact.chars().all(|c| c.is_ascii_digit()) {
        Some(format!("{} {}", &compact[..3], &compact[3..]))
    } else {
        Some(trimmed.to_owned())
    }
}

/// Parses a URL, defaulting the scheme to `https`, and strips tracking
/// query parameters (`utm_*`, `fbclid`). Unparsable input yields
/// `None`.
#[must_use]
pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches(['.', ',']);
    if trimmed.is_empty() {
        return None;
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    };
    let mut parsed = Url::parse(&candidate).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    parsed.host_str()?;

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !(key.starts_with("utm_") || key.as_ref() == "fbclid"))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        let rebuilt = {
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            serializer.extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            serializer.finish()
        };
        parsed.set_query(Some(&rebuilt));
    }
    Some(parsed.to_string())
}

/// Checksum plausibility for a Swedish organisation number.
///
/// Requires exactly ten digits among the characters, then applies the
/// Luhn variant used by Skatteverket: weights 2,1,2,1,... over the
/// first nine digits plus check digit, summing the digits of each
/// product.
#[must_use]
pub fn is_plausible_org_number(raw: &str) -> bool {
    let digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 10 {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(position, digit)| {
            let product = digit * if position % 2 == 0 { 2 } else { 1 };
            product / 10 + product % 10
        })
        .sum();
    sum % 10 == 0
}

/// Drops tags and normalizes whitespace. Block-closing tags and `<br>`
/// become line breaks so paragraph structure survives. Entities are not
/// decoded here; the HTML parser and the browser already hand over
/// decoded text, and text that genuinely contains `&amp;` must come out
/// unchanged no matter how often it is sanitized.
#[must_use]
pub fn strip_html(raw: &str) -> String {
    let with_breaks = BREAK_RE.replace_all(raw, "\n");
    let stripped = TAG_RE.replace_all(&with_breaks, " ");

    let mut lines: Vec<String> = Vec::new();
    let mut blank_pending = false;
    for line in stripped.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            blank_pending = !lines.is_empty();
        } else {
            if blank_pending {
                lines.push(String::new());
                blank_pending = false;
            }
            lines.push(collapsed);
        }
    }
    lines.join("\n")
}

/// Collapses duplicate contacts by `name|email|phone` signature,
/// keeping the first occurrence. Kept names are folded to one
/// canonical casing, first letter upper and the rest lower, so casing
/// variants of the same person cannot reappear downstream. Role
/// differences alone do not make two contacts distinct.
#[must_use]
pub fn dedupe_contacts(contacts: Vec<ContactRecord>) -> Vec<ContactRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept = Vec::new();
    for mut contact in contacts {
        let signature = format!(
            "{}|{}|{}",
            contact
                .name
                .as_deref()
                .map(|n| n.trim().to_lowercase())
                .unwrap_or_default(),
            contact
                .email
                .as_deref()
                .map(str::to_lowercase)
                .unwrap_or_default(),
            contact.phone.as_deref().unwrap_or_default(),
        );
        if !seen.insert(signature) {
            continue;
        }
        contact.name = contact
            .name
            .as_deref()
            .map(capitalize_name)
            .filter(|n| !n.is_empty());
        kept.push(contact);
    }
    kept
}

fn capitalize_name(name: &str) -> String {
    let trimmed = name.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn apply(value: Option<String>, f: impl Fn(&str) -> Option<String>) -> Option<String> {
    value.as_deref().and_then(f)
}

fn tidy_items(items: Vec<String>) -> Vec<String> {
    let mut seen_lower: Vec<String> = Vec::new();
    let mut kept = Vec::new();
    for item in items {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            continue;
        }
        let lower = trimmed.to_lowercase();
        if seen_lower.contains(&lower) {
            continue;
        }
        seen_lower.push(lower);
        kept.push(trimmed.to_owned());
    }
    kept
}

fn tidy_value(value: &mut Value) {
    match value {
        Value::String(s) => {
            *s = s.trim().to_owned();
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                tidy_value(item);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                tidy_value(item);
            }
        }
        _ => {}
    }
}

/// Applies every normalizer to a record. Total and idempotent:
/// `sanitize_record(sanitize_record(r)) == sanitize_record(r)` for any
/// record.
#[must_use]
pub fn sanitize_record(mut record: AssociationRecord) -> AssociationRecord {
    let assoc = &mut record.association;

    assoc.name = assoc.name.trim().to_owned();
    assoc.org_number = clean(assoc.org_number.take());
    assoc.email = apply(assoc.email.take(), normalize_email);
    assoc.phone = apply(assoc.phone.take(), normalize_phone);
    assoc.homepage_url = apply(assoc.homepage_url.take(), normalize_url);
    assoc.street_address = clean(assoc.street_address.take());
    assoc.postal_code = apply(assoc.postal_code.take(), normalize_postal_code);
    assoc.city = clean(assoc.city.take());
    assoc.detail_url = assoc.detail_url.trim().to_owned();
    assoc.types = tidy_items(std::mem::take(&mut assoc.types));
    assoc.activities = tidy_items(std::mem::take(&mut assoc.activities));
    assoc.categories = tidy_items(std::mem::take(&mut assoc.categories));

    assoc.description = match assoc.description.take() {
        Some(Description::Text(text)) => {
            let stripped = strip_html(&text);
            if stripped.is_empty() {
                None
            } else {
                Some(Description::Text(stripped))
            }
        }
        Some(Description::Structured {
            free_text,
            sections,
        }) => {
            let free_text = free_text
                .as_deref()
                .map(strip_html)
                .filter(|t| !t.is_empty());
            let sections: Vec<_> = sections
                .into_iter()
                .map(|mut section| {
                    section.title = section.title.trim().to_owned();
                    for item in section.data.values_mut() {
                        tidy_value(item);
                    }
                    section
                })
                .collect();
            if free_text.is_none() && sections.is_empty() {
                None
            } else {
                Some(Description::Structured {
                    free_text,
                    sections,
                })
            }
        }
        None => None,
    };

    for contact in &mut record.contacts {
        contact.name = clean(contact.name.take());
        contact.role = clean(contact.role.take());
        contact.email = apply(contact.email.take(), normalize_email);
        contact.phone = apply(contact.phone.take(), normalize_phone);
    }
    record.contacts = dedupe_contacts(std::mem::take(&mut record.contacts));

    for item in record.extras.values_mut() {
        tidy_value(item);
    }
    if let Some(org) = &assoc.org_number {
        if !is_plausible_org_number(org) {
            record
                .extras
                .insert("invalid_org_number".to_owned(), Value::Bool(true));
        }
    }

    record.source_navigation.filter_state = clean(record.source_navigation.filter_state.take());

    record
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::Map;
    use uuid::Uuid;

    use frh_core::{Association, SourceNavigation, SourceSystem};

    use super::*;

    // ---- normalize_email ----

    #[test]
    fn lowercases_and_strips_mailto() {
        assert_eq!(
            normalize_email("mailto:Kansli@Klubb.SE"),
            Some("kansli@klubb.se".into())
        );
    }

    #[test]
    fn rejects_shapes_that_are_not_addresses() {
        assert_eq!(normalize_email("Skicka e-post"), None);
        assert_eq!(normalize_email("info@klubb"), None);
        assert_eq!(normalize_email(""), None);
    }

    #[test]
    fn drops_mailto_query_parameters() {
        assert_eq!(
            normalize_email("mailto:info@klubb.se?subject=Hej"),
            Some("info@klubb.se".into())
        );
    }

    // ---- normalize_phone ----

    #[test]
    fn national_number_gains_country_code() {
        assert_eq!(normalize_phone("08-123 456"), Some("+468123456".into()));
    }

    #[test]
    fn double_zero_prefix_becomes_plus() {
        assert_eq!(
            normalize_phone("0046 70 111 22 33"),
            Some("+46701112233".into())
        );
    }

    #[test]
    fn bare_country_prefix_gains_plus() {
        assert_eq!(
            normalize_phone("46 70 111 22 33"),
            Some("+46701112233".into())
        );
    }

    #[test]
    fn foreign_number_passes_through_digit_stripped() {
        assert_eq!(normalize_phone("+45 33 12 34 56"), Some("+4533123456".into()));
        assert_eq!(normalize_phone("12 34 56"), Some("123456".into()));
    }

    #[test]
    fn empty_phone_is_none() {
        assert_eq!(normalize_phone("   "), None);
        assert_eq!(normalize_phone("ring oss"), None);
    }

    #[test]
    fn phone_normalization_is_idempotent() {
        let once = normalize_phone("08-123 456").unwrap();
        assert_eq!(normalize_phone(&once), Some(once.clone()));
    }

    // ---- normalize_postal_code ----

    #[test]
    fn five_digits_gain_the_standard_space() {
        assert_eq!(normalize_postal_code("12345"), Some("123 45".into()));
        assert_eq!(normalize_postal_code("756 51"), Some("756 51".into()));
    }

    #[test]
    fn foreign_codes_pass_through() {
        assert_eq!(normalize_postal_code("SW1A 1AA"), Some("SW1A 1AA".into()));
    }

    // ---- normalize_url ----

    #[test]
    fn schemeless_hosts_get_https() {
        assert_eq!(
            normalize_url("www.klubb.se"),
            Some("https://www.klubb.se/".into())
        );
    }

    #[test]
    fn tracking_parameters_are_stripped() {
        assert_eq!(
            normalize_url("https://klubb.se/om?utm_source=reg&utm_medium=x&fbclid=abc"),
            Some("https://klubb.se/om".into())
        );
        assert_eq!(
            normalize_url("https://klubb.se/om?page=2&utm_source=reg"),
            Some("https://klubb.se/om?page=2".into())
        );
    }

    #[test]
    fn unparsable_urls_become_none() {
        assert_eq!(normalize_url("inte en länk alls https://"), None);
        assert_eq!(normalize_url(""), None);
    }

    // ---- is_plausible_org_number ----

    #[test]
    fn accepts_a_valid_number_with_separator() {
        assert!(is_plausible_org_number("556036-0793"));
        assert!(is_plausible_org_number("5560360793"));
    }

    #[test]
    fn rejects_failed_checksum_and_wrong_length() {
        assert!(!is_plausible_org_number("556036-0794"));
        assert!(!is_plausible_org_number("12345"));
        assert!(!is_plausible_org_number("55603607931"));
        assert!(!is_plausible_org_number(""));
    }

    // ---- strip_html ----

    #[test]
    fn drops_tags_and_collapses_whitespace() {
        let text = strip_html("<p>Vi &amp; våra medlemmar</p><p>Alla   välkomna</p>");
        assert_eq!(text, "Vi &amp; våra medlemmar\nAlla välkomna");
    }

    #[test]
    fn keeps_plain_text_unchanged() {
        assert_eq!(strip_html("Grundad 1952 i Umeå"), "Grundad 1952 i Umeå");
    }

    #[test]
    fn leaves_escaped_markup_untouched() {
        assert_eq!(strip_html("Vi ses &amp;amp; hej"), "Vi ses &amp;amp; hej");
        assert_eq!(
            strip_html("&amp;lt;b&amp;gt; är inte en tagg"),
            "&amp;lt;b&amp;gt; är inte en tagg"
        );
    }

    // ---- dedupe_contacts ----

    #[test]
    fn collapses_same_signature_and_capitalizes() {
        let contacts = vec![
            ContactRecord {
                name: Some("eva LUND".into()),
                role: Some("Ordförande".into()),
                email: Some("eva@klubb.se".into()),
                phone: None,
            },
            ContactRecord {
                name: Some("Eva lund".into()),
                role: Some("Kassör".into()),
                email: Some("eva@klubb.se".into()),
                phone: None,
            },
        ];
        let kept = dedupe_contacts(contacts);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name.as_deref(), Some("Eva lund"));
        assert_eq!(kept[0].role.as_deref(), Some("Ordförande"));
    }

    #[test]
    fn name_casing_folds_to_one_canonical_form() {
        for variant in ["ANNA-KARIN BERG", "anna-karin berg", "Anna-karin berg"] {
            let contacts = vec![ContactRecord {
                name: Some(variant.into()),
                role: None,
                email: None,
                phone: None,
            }];
            assert_eq!(
                dedupe_contacts(contacts)[0].name.as_deref(),
                Some("Anna-karin berg"),
                "variant: {variant}"
            );
        }
    }

    #[test]
    fn different_emails_stay_distinct() {
        let contacts = vec![
            ContactRecord {
                name: Some("Eva Lund".into()),
                role: None,
                email: Some("eva@klubb.se".into()),
                phone: None,
            },
            ContactRecord {
                name: Some("Eva Lund".into()),
                role: None,
                email: Some("kassor@klubb.se".into()),
                phone: None,
            },
        ];
        assert_eq!(dedupe_contacts(contacts).len(), 2);
    }

    // ---- sanitize_record ----

    fn messy_record() -> AssociationRecord {
        AssociationRecord {
            source_system: SourceSystem::Fri,
            municipality: "Uppsala".into(),
            scrape_run_id: Uuid::nil(),
            scraped_at: Utc::now(),
            association: Association {
                name: "  Sunnersta AIF ".into(),
                org_number: Some("817605-1963".into()),
                types: vec!["Idrott ".into(), "idrott".into(), String::new()],
                activities: vec!["Fotboll".into()],
                categories: Vec::new(),
                homepage_url: Some("www.sunnerstaaif.se?utm_source=reg".into()),
                detail_url: " https://fri.uppsala.se/forening/42 ".into(),
                street_address: Some(" Sunnerstavägen 51 ".into()),
                postal_code: Some("75651".into()),
                city: Some("Uppsala ".into()),
                email: Some("Kansli@SunnerstaAIF.se".into()),
                phone: Some("018-32 10 00".into()),
                description: Some(Description::Text("<p>En klubb & en familj</p>".into())),
            },
            contacts: vec![
                ContactRecord {
                    name: Some("eva lund".into()),
                    role: Some("Ordförande".into()),
                    email: Some("Eva@SunnerstaAIF.se".into()),
                    phone: Some("070-123 45 67".into()),
                },
                ContactRecord {
                    name: Some("EVA LUND".into()),
                    role: None,
                    email: Some("eva@sunnerstaaif.se".into()),
                    phone: Some("070-123 45 67".into()),
                },
            ],
            source_navigation: SourceNavigation {
                list_page_index: 0,
                position_on_page: 3,
                pagination_model: "next_link".into(),
                filter_state: Some(" alla ".into()),
            },
            extras: Map::new(),
        }
    }

    #[test]
    fn sanitizes_every_field_of_a_messy_record() {
        let record = sanitize_record(messy_record());
        let assoc = &record.association;

        assert_eq!(assoc.name, "Sunnersta AIF");
        assert_eq!(assoc.detail_url, "https://fri.uppsala.se/forening/42");
        assert_eq!(assoc.email.as_deref(), Some("kansli@sunnerstaaif.se"));
        assert_eq!(assoc.phone.as_deref(), Some("+4618321000"));
        assert_eq!(assoc.postal_code.as_deref(), Some("756 51"));
        assert_eq!(
            assoc.homepage_url.as_deref(),
            Some("https://www.sunnerstaaif.se/")
        );
        assert_eq!(assoc.types, vec!["Idrott"]);
        assert_eq!(
            assoc.description,
            Some(Description::Text("En klubb & en familj".into()))
        );
        assert_eq!(record.contacts.len(), 1);
        assert_eq!(record.contacts[0].phone.as_deref(), Some("+46701234567"));
        assert_eq!(record.source_navigation.filter_state.as_deref(), Some("alla"));
    }

    #[test]
    fn implausible_org_number_is_flagged_not_dropped() {
        let record = sanitize_record(messy_record());
        assert_eq!(
            record.association.org_number.as_deref(),
            Some("817605-1963")
        );
        assert_eq!(
            record.extras.get("invalid_org_number"),
            Some(&Value::Bool(true))
        );
    }

    #[test]
    fn sanitize_is_idempotent() {
        let once = sanitize_record(messy_record());
        let twice = sanitize_record(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn escaped_text_survives_repeat_sanitization() {
        let mut record = messy_record();
        record.association.description =
            Some(Description::Text("Vi ses &amp;amp; hej".into()));

        let once = sanitize_record(record);
        let twice = sanitize_record(once.clone());

        assert_eq!(
            once.association.description,
            Some(Description::Text("Vi ses &amp;amp; hej".into()))
        );
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_record_survives_sanitation() {
        let mut record = messy_record();
        record.association = Association {
            name: "X".into(),
            org_number: None,
            types: Vec::new(),
            activities: Vec::new(),
            categories: Vec::new(),
            homepage_url: None,
            detail_url: "https://fri.uppsala.se/forening/42".into(),
            street_address: None,
            postal_code: None,
            city: None,
            email: None,
            phone: None,
            description: None,
        };
        record.contacts.clear();
        let sanitized = sanitize_record(record);
        assert_eq!(sanitized.association.name, "X");
        assert!(sanitized.extras.get("invalid_org_number").is_none());
    }
}
