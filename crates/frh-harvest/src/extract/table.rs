//! Strategy for registries that render each association as one or two
//! label/value tables: one block keyed by the association name with
//! organisation fields, one keyed by "Kontaktperson" with the primary
//! contact. Either block may be absent.

use scraper::{ElementRef, Html, Selector};

use frh_core::ContactRecord;

use super::{
    find_emails,
    labels::{field_for_label, FieldKey},
    DetailExtraction, ExtractError, ExtractionStrategy, FieldSink,
};
use crate::surface::DetailSurface;

pub struct TableStrategy;

impl ExtractionStrategy for TableStrategy {
    fn extract(
        &self,
        surface: &DetailSurface,
        name_hint: Option<&str>,
    ) -> Result<DetailExtraction, ExtractError> {
        let doc = Html::parse_fragment(&surface.html);
        let table_sel = Selector::parse("table").expect("valid selector");
        let row_sel = Selector::parse("tr").expect("valid selector");
        let cell_sel = Selector::parse("th, td").expect("valid selector");

        let mut sink = FieldSink::default();
        let mut contact = PrimaryContact::default();

        for table in doc.select(&table_sel) {
            let rows: Vec<ElementRef> = table.select(&row_sel).collect();
            if rows.is_empty() {
                continue;
            }

            // A leading single-cell row is the block heading: the
            // association name for the organisation block, a
            // "Kontaktperson" style caption for the contact block.
            // Single-cell rows that carry a "Label: value" or
            // "Label | value" payload are data, not headings.
            let first_cells: Vec<ElementRef> = rows[0].select(&cell_sel).collect();
            let heading = if first_cells.len() == 1 && is_heading_cell(first_cells[0]) {
                Some(cell_text(first_cells[0]))
            } else {
                None
            };
            let is_contact_block = heading
                .as_deref()
                .is_some_and(|h| h.to_lowercase().contains("kontakt"));
            let data_rows = if heading.is_some() { &rows[1..] } else { &rows[..] };

            if let Some(name) = heading.as_deref().filter(|_| !is_contact_block) {
                sink.set_name(name);
            }

            for row in data_rows {
                let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
                let Some((label, value)) = labelled_pair(&cells) else {
                    continue;
                };
                if is_contact_block {
                    contact.apply(&label, &value);
                } else {
                    sink.apply_labeled(&label, &value);
                }
            }
        }

        let mut extraction = sink.into_extraction(name_hint)?;
        let mut contacts = contact.into_contacts();
        contacts.append(&mut extraction.contacts);
        extraction.contacts = contacts;
        Ok(extraction)
    }
}

fn is_heading_cell(cell: ElementRef) -> bool {
    let element = cell.value();
    if element.name() == "th" || element.attr("colspan").is_some() {
        return true;
    }
    let text = cell_text(cell);
    if text.contains('|') {
        return false;
    }
    match text.split_once(':') {
        Some((_, value)) => value.trim().is_empty(),
        None => true,
    }
}

/// Resolves one table row into a label/value pair. Two-column rows use
/// their cells directly; single-cell rows split on the first colon, or
/// on the first pipe when no colon is present.
fn labelled_pair(cells: &[ElementRef]) -> Option<(String, String)> {
    match cells {
        [] => None,
        [only] => {
            let text = cell_text(*only);
            let (label, value) = text.split_once(':').or_else(|| text.split_once('|'))?;
            let label = label.trim();
            let value = value.trim();
            if label.is_empty() || value.is_empty() {
                None
            } else {
                Some((label.to_owned(), value.to_owned()))
            }
        }
        [label_cell, value_cells @ ..] => {
            let label = cell_text(*label_cell);
            if label.is_empty() {
                return None;
            }
            let value = value_for_cells(&label, value_cells);
            Some((label, value))
        }
    }
}

/// Text of the value cells, preferring a link target when the label
/// asks for one: `mailto:` hrefs beat "send email" link text, and a
/// homepage label takes the anchor's href over its caption.
fn value_for_cells(label: &str, cells: &[ElementRef]) -> String {
    let anchor_sel = Selector::parse("a[href]").expect("valid selector");
    let text = cells
        .iter()
        .map(|cell| cell_text(*cell))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let href = cells
        .iter()
        .find_map(|cell| cell.select(&anchor_sel).next())
        .and_then(|a| a.value().attr("href"))
        .map(str::trim);

    match (field_for_label(label), href) {
        (Some(FieldKey::Email), Some(h)) if h.to_lowercase().starts_with("mailto:") => {
            h[7..].to_owned()
        }
        (Some(FieldKey::Homepage), Some(h))
            if h.starts_with("http://") || h.starts_with("https://") || h.starts_with("www.") =>
        {
            h.to_owned()
        }
        _ => text,
    }
}

fn cell_text(cell: ElementRef) -> String {
    cell.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// The contact block's fields, folded into contact records once the
/// whole block is read.
#[derive(Debug, Default)]
struct PrimaryContact {
    name: Option<String>,
    role: Option<String>,
    emails: Vec<String>,
    phone: Option<String>,
    phone_home: Option<String>,
    phone_work: Option<String>,
    phone_mobile: Option<String>,
}

impl PrimaryContact {
    fn apply(&mut self, label: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        match field_for_label(label) {
            Some(FieldKey::Name | FieldKey::ContactName) => {
                if self.name.is_none() {
                    let (name, role) = split_name_and_role(value);
                    self.name = Some(name);
                    if self.role.is_none() {
                        self.role = role;
                    }
                }
            }
            Some(FieldKey::ContactRole) => {
                if self.role.is_none() {
                    self.role = Some(value.to_owned());
                }
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
            _ => {}
        }
    }

    fn into_contacts(self) -> Vec<ContactRecord> {
        let phone = self
            .phone_mobile
            .or(self.phone_work)
            .or(self.phone_home)
            .or(self.phone);
        let mut emails = self.emails.into_iter();
        let first_email = emails.next();

        let mut contacts = Vec::new();
        if self.name.is_some() || first_email.is_some() || phone.is_some() {
            contacts.push(ContactRecord {
                name: self.name,
                role: self.role,
                email: first_email,
                phone,
            });
        }
        for email in emails {
            contacts.push(ContactRecord {
                name: None,
                role: None,
                email: Some(email),
                phone: None,
            });
        }
        contacts
    }
}

fn set_first(slot: &mut Option<String>, value: &str) {
    if slot.is_none() {
        *slot = Some(value.to_owned());
    }
}

/// Splits "Eva Lund, Ordförande" or "Eva Lund (Ordförande)" into name
/// and role.
fn split_name_and_role(value: &str) -> (String, Option<String>) {
    if let Some((name, rest)) = value.split_once('(') {
        let role = rest.trim_end_matches(')').trim();
        if !role.is_empty() && !name.trim().is_empty() {
            return (name.trim().to_owned(), Some(role.to_owned()));
        }
    }
    if let Some((name, role)) = value.split_once(',') {
        let name = name.trim();
        let role = role.trim();
        if !name.is_empty() && !role.is_empty() {
            return (name.to_owned(), Some(role.to_owned()));
        }
    }
    (value.trim().to_owned(), None)
}
