//! Extraction strategies: one per registry platform family.
//!
//! A strategy is a pure function from a captured [`DetailSurface`] to a
//! [`DetailExtraction`]. No strategy touches the browser, so each one
//! can be exercised against fixture HTML. Field-level oddities degrade
//! to `None` or to `extras`; the only hard failure is a surface with no
//! association name at all.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use frh_core::{ContactRecord, DescriptionSection, SourceSystem};

use crate::surface::DetailSurface;

pub mod labels;

mod free_text;
mod list_modal;
mod table;

pub use free_text::FreeTextStrategy;
pub use list_modal::ListModalStrategy;
pub use table::TableStrategy;

use labels::{extras_key, field_for_label, FieldKey};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no association name on the detail surface")]
    MissingName,
}

/// Everything one detail surface yielded, before sanitation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetailExtraction {
    pub name: String,
    pub org_number: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub homepage_url: Option<String>,
    pub street_address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub types: Vec<String>,
    pub activities: Vec<String>,
    pub categories: Vec<String>,
    pub free_text: Option<String>,
    pub sections: Vec<DescriptionSection>,
    pub contacts: Vec<ContactRecord>,
    pub extras: Map<String, Value>,
}

pub trait ExtractionStrategy: Send + Sync {
    /// Extracts one association from a captured detail surface.
    ///
    /// `name_hint` is the name shown on the list row, used when the
    /// surface itself does not state one.
    ///
    /// # Errors
    ///
    /// [`ExtractError::MissingName`] when neither the surface nor the
    /// hint yields a name.
    fn extract(
        &self,
        surface: &DetailSurface,
        name_hint: Option<&str>,
    ) -> Result<DetailExtraction, ExtractError>;
}

/// The strategy wired to each registry platform.
#[must_use]
pub fn strategy_for(source: SourceSystem) -> &'static dyn ExtractionStrategy {
    match source {
        SourceSystem::Fri => &TableStrategy,
        SourceSystem::ActorSmartbook => &ListModalStrategy,
        SourceSystem::InterbookGo => &FreeTextStrategy,
    }
}

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9][A-Za-z0-9._%+\-]*@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}")
        .expect("valid regex")
});

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s<>"')]+"#).expect("valid regex"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\+|0)[0-9][0-9 \-()./]{4,}[0-9]").expect("valid regex"));

pub(crate) fn find_emails(text: &str) -> Vec<String> {
    EMAIL_RE
        .find_iter(text)
        .map(|m| m.as_str().to_owned())
        .collect()
}

pub(crate) fn find_urls(text: &str) -> Vec<String> {
    URL_RE
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',']).to_owned())
        .collect()
}

pub(crate) fn find_phones(text: &str) -> Vec<String> {
    PHONE_RE
        .find_iter(text)
        .map(|m| m.as_str().to_owned())
        .filter(|candidate| candidate.chars().filter(|c| c.is_ascii_digit()).count() >= 7)
        .collect()
}

/// Splits a multi-valued cell on the delimiters these registries use.
pub(crate) fn split_multi(value: &str) -> Vec<String> {
    let mut seen_lower: Vec<String> = Vec::new();
    let mut items = Vec::new();
    for part in value.split(['\n', ',', ';', '/', '•', '·']) {
        let item = part.trim().trim_matches('-').trim();
        if item.is_empty() {
            continue;
        }
        let lower = item.to_lowercase();
        if seen_lower.contains(&lower) {
            continue;
        }
        seen_lower.push(lower);
        items.push(item.to_owned());
    }
    items
}

/// Accumulates labelled values into record fields, shared by the table
/// and list-modal strategies.
#[derive(Debug, Default)]
pub(crate) struct FieldSink {
    name: Option<String>,
    org_number: Option<String>,
    emails: Vec<String>,
    phone: Option<String>,
    phone_home: Option<String>,
    phone_work: Option<String>,
    phone_mobile: Option<String>,
    homepage_url: Option<String>,
    street_address: Option<String>,
    postal_code: Option<String>,
    city: Option<String>,
    types: Vec<String>,
    activities: Vec<String>,
    categories: Vec<String>,
    free_text_parts: Vec<String>,
    contact_names: Vec<String>,
    contact_role: Option<String>,
    target_groups: Vec<String>,
    founded: Option<String>,
    extras: Map<String, Value>,
}

impl FieldSink {
    pub(crate) fn set_name(&mut self, name: &str) {
        let trimmed = name.trim();
        if self.name.is_none() && !trimmed.is_empty() {
            self.name = Some(trimmed.to_owned());
        }
    }

    /// Routes one label/value pair to its field, or to `extras` when
    /// the label is outside the dictionary. First value wins for
    /// single-valued fields.
    pub(crate) fn apply_labeled(&mut self, label: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        match field_for_label(label) {
            Some(FieldKey::Name) => self.set_name(value),
            Some(FieldKey::OrgNumber) => set_first(&mut self.org_number, value),
            Some(FieldKey::Homepage) => {
                let found = find_urls(value);
                let url = found.first().map_or(value, String::as_str);
                set_first(&mut self.homepage_url, url);
            }
            Some(FieldKey::Email) => {
                let mut found = find_emails(value);
                if found.is_empty() {
                    found.push(value.to_owned());
                }
                self.emails.extend(found);
            }
            Some(FieldKey::Phone) => set_first(&mut self.phone, value),
            Some(FieldKey::PhoneHome) => set_first(&mut self.phone_home, value),
            Some(FieldKey::PhoneWork) => set_first(&mut self.phone_work, value),
            Some(FieldKey::PhoneMobile) => set_first(&mut self.phone_mobile, value),
            Some(FieldKey::StreetAddress) => set_first(&mut self.street_address, value),
            Some(FieldKey::PostalCode) => set_first(&mut self.postal_code, value),
            Some(FieldKey::City) => set_first(&mut self.city, value),
            Some(FieldKey::AssociationType) => extend_unique(&mut self.types, split_multi(value)),
            Some(FieldKey::Activities) => extend_unique(&mut self.activities, split_multi(value)),
            Some(FieldKey::Categories) => extend_unique(&mut self.categories, split_multi(value)),
            Some(FieldKey::Description) => self.free_text_parts.push(value.to_owned()),
            Some(FieldKey::ContactName) => self.contact_names.push(value.to_owned()),
            Some(FieldKey::ContactRole) => set_first(&mut self.contact_role, value),
            Some(FieldKey::TargetGroup) => {
                extend_unique(&mut self.target_groups, split_multi(value));
            }
            Some(FieldKey::Founded) => set_first(&mut self.founded, value),
            Some(FieldKey::BankDetails) => {
                let key = extras_key(label);
                if !key.is_empty() {
                    self.extras
                        .entry(key)
                        .or_insert_with(|| Value::String(value.to_owned()));
                }
            }
            None => {
                let key = extras_key(label);
                if !key.is_empty() {
                    self.extras
                        .entry(key)
                        .or_insert_with(|| Value::String(value.to_owned()));
                }
            }
        }
    }

    /// Finalizes the sink into an extraction.
    ///
    /// Phone variants collapse with mobile preferred, then work, then
    /// home, then an unqualified number. The first email becomes the
    /// association email; every further email fans out into its own
    /// contact entry so none is dropped.
    pub(crate) fn into_extraction(
        mut self,
        name_hint: Option<&str>,
    ) -> Result<DetailExtraction, ExtractError> {
        let name = self
            .name
            .take()
            .or_else(|| {
                name_hint
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .map(str::to_owned)
            })
            .ok_or(ExtractError::MissingName)?;

        let phone = self
            .phone_mobile
            .or(self.phone_work)
            .or(self.phone_home)
            .or(self.phone);

        let mut emails = self.emails.into_iter();
        let email = emails.next();

        let mut contacts: Vec<ContactRecord> = Vec::new();
        let mut role = self.contact_role.take();
        for contact_name in self.contact_names {
            contacts.push(ContactRecord {
                name: Some(contact_name),
                role: role.take(),
                email: None,
                phone: None,
            });
        }
        for extra_email in emails {
            contacts.push(ContactRecord {
                name: None,
                role: None,
                email: Some(extra_email),
                phone: None,
            });
        }

        let mut extras = self.extras;
        if !self.target_groups.is_empty() {
            extras.entry("target_groups").or_insert_with(|| {
                Value::Array(
                    self.target_groups
                        .into_iter()
                        .map(Value::String)
                        .collect(),
                )
            });
        }
        if let Some(founded) = self.founded {
            extras
                .entry("founded")
                .or_insert_with(|| Value::String(founded));
        }

        let free_text = if self.free_text_parts.is_empty() {
            None
        } else {
            Some(self.free_text_parts.join("\n\n"))
        };

        Ok(DetailExtraction {
            name,
            org_number: self.org_number,
            email,
            phone,
            homepage_url: self.homepage_url,
            street_address: self.street_address,
            postal_code: self.postal_code,
            city: self.city,
            types: self.types,
            activities: self.activities,
            categories: self.categories,
            free_text,
            sections: Vec::new(),
            contacts,
            extras,
        })
    }
}

fn set_first(slot: &mut Option<String>, value: &str) {
    if slot.is_none() {
        *slot = Some(value.to_owned());
    }
}

fn extend_unique(target: &mut Vec<String>, items: Vec<String>) {
    for item in items {
        if !target
            .iter()
            .any(|existing| existing.to_lowercase() == item.to_lowercase())
        {
            target.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- scanners ----

    #[test]
    fn finds_multiple_emails_in_one_block() {
        let found = find_emails("kassor@klubb.se, ordforande@klubb.se");
        assert_eq!(found, vec!["kassor@klubb.se", "ordforande@klubb.se"]);
    }

    #[test]
    fn finds_bare_www_urls() {
        let found = find_urls("Se www.sunnerstaaif.se för mer info.");
        assert_eq!(found, vec!["www.sunnerstaaif.se"]);
    }

    #[test]
    fn phone_scan_skips_short_number_runs() {
        assert!(find_phones("Bildad 1952").is_empty());
        assert_eq!(find_phones("Ring 070-123 45 67"), vec!["070-123 45 67"]);
    }

    #[test]
    fn split_multi_handles_mixed_delimiters() {
        let items = split_multi("Fotboll, Innebandy / Schack; fotboll");
        assert_eq!(items, vec!["Fotboll", "Innebandy", "Schack"]);
    }

    // ---- FieldSink ----

    #[test]
    fn phone_variants_collapse_with_mobile_preferred() {
        let mut sink = FieldSink::default();
        sink.set_name("Sunnersta AIF");
        sink.apply_labeled("Hem", "08-111 11 11");
        sink.apply_labeled("Arbete", "08-222 22 22");
        sink.apply_labeled("Mobil", "070-333 33 33");
        let extraction = sink.into_extraction(None).unwrap();
        assert_eq!(extraction.phone.as_deref(), Some("070-333 33 33"));
    }

    #[test]
    fn extra_emails_fan_out_into_contacts() {
        let mut sink = FieldSink::default();
        sink.set_name("Kulturklubben");
        sink.apply_labeled("E-post", "a@klubb.se; b@klubb.se");
        let extraction = sink.into_extraction(None).unwrap();
        assert_eq!(extraction.email.as_deref(), Some("a@klubb.se"));
        assert_eq!(extraction.contacts.len(), 1);
        assert_eq!(extraction.contacts[0].email.as_deref(), Some("b@klubb.se"));
    }

    #[test]
    fn unmapped_labels_land_in_extras() {
        let mut sink = FieldSink::default();
        sink.set_name("OK Linné");
        sink.apply_labeled("Medlemsavgift", "200 kr");
        let extraction = sink.into_extraction(None).unwrap();
        assert_eq!(
            extraction.extras.get("medlemsavgift"),
            Some(&Value::String("200 kr".into()))
        );
    }

    #[test]
    fn missing_name_falls_back_to_hint_then_errors() {
        let sink = FieldSink::default();
        let extraction = sink.into_extraction(Some("Radhusets BK")).unwrap();
        assert_eq!(extraction.name, "Radhusets BK");

        let empty = FieldSink::default();
        assert_eq!(empty.into_extraction(None), Err(ExtractError::MissingName));
    }

    #[test]
    fn target_groups_become_an_extras_array() {
        let mut sink = FieldSink::default();
        sink.set_name("Simklubben");
        sink.apply_labeled("Målgrupp", "Barn, Ungdomar");
        let extraction = sink.into_extraction(None).unwrap();
        assert_eq!(
            extraction.extras.get("target_groups"),
            Some(&Value::Array(vec![
                Value::String("Barn".into()),
                Value::String("Ungdomar".into()),
            ]))
        );
    }
}
