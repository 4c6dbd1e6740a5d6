//! Strategy for registries whose detail modal holds a heading, a list
//! of "Label: value" items and a four-column contacts table
//! (name, email, phone, role).

use scraper::{ElementRef, Html, Selector};

use frh_core::ContactRecord;

use super::{find_emails, DetailExtraction, ExtractError, ExtractionStrategy, FieldSink};
use crate::surface::DetailSurface;

pub struct ListModalStrategy;

impl ExtractionStrategy for ListModalStrategy {
    fn extract(
        &self,
        surface: &DetailSurface,
        name_hint: Option<&str>,
    ) -> Result<DetailExtraction, ExtractError> {
        let doc = Html::parse_fragment(&surface.html);
        let heading_sel = Selector::parse("h1, h2, h3, .modal-title").expect("valid selector");
        let item_sel = Selector::parse("li").expect("valid selector");
        let table_sel = Selector::parse("table").expect("valid selector");
        let row_sel = Selector::parse("tr").expect("valid selector");
        let cell_sel = Selector::parse("th, td").expect("valid selector");

        let mut sink = FieldSink::default();

        if let Some(heading) = doc.select(&heading_sel).next() {
            sink.set_name(&element_text(heading));
        }

        for item in doc.select(&item_sel) {
            let text = element_text(item);
            if let Some((label, value)) = text.split_once(':') {
                sink.apply_labeled(label, value);
            }
        }

        let mut table_contacts = Vec::new();
        for table in doc.select(&table_sel) {
            for row in table.select(&row_sel) {
                let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
                if is_header_row(&cells) {
                    continue;
                }
                // Narrower rows are captions or spacers, not contacts.
                if cells.len() < 4 {
                    continue;
                }
                let name = non_empty(element_text(cells[0]));
                let email_cell = element_text(cells[1]);
                let phone = non_empty(element_text(cells[2]));
                let role = non_empty(element_text(cells[3]));

                let mut emails = find_emails(&email_cell).into_iter();
                let first_email = emails.next().or_else(|| non_empty(email_cell.clone()));

                if name.is_none() && first_email.is_none() && phone.is_none() && role.is_none() {
                    continue;
                }
                table_contacts.push(ContactRecord {
                    name,
                    role,
                    email: first_email,
                    phone,
                });
                for email in emails {
                    table_contacts.push(ContactRecord {
                        name: None,
                        role: None,
                        email: Some(email),
                        phone: None,
                    });
                }
            }
        }

        let mut extraction = sink.into_extraction(name_hint)?;
        table_contacts.append(&mut extraction.contacts);
        extraction.contacts = table_contacts;
        Ok(extraction)
    }
}

fn is_header_row(cells: &[ElementRef]) -> bool {
    if cells.is_empty() {
        return false;
    }
    if cells.iter().all(|c| c.value().name() == "th") {
        return true;
    }
    let first = element_text(cells[0]).to_lowercase();
    first == "namn" || first == "name"
}

fn element_text(el: ElementRef) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}
