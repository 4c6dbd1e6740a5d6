//! Strategy for registries whose detail modal is free-running text.
//!
//! The rendered text is split into lines and bucketed under recognized
//! section headings. Each bucket gets its own small parser; lines
//! before the first heading, and anything under an "about" heading,
//! become the description. When no heading is recognized at all the
//! whole text survives as the description rather than being discarded.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use frh_core::{ContactRecord, DescriptionSection};

use super::{
    find_emails, find_phones, find_urls, split_multi, DetailExtraction, ExtractError,
    ExtractionStrategy, FieldSink,
};
use crate::surface::DetailSurface;

pub struct FreeTextStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Activities,
    TargetGroup,
    Address,
    Contact,
    OrgNumber,
    Homepage,
    Categories,
    About,
}

static ORG_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{6}\s*[-–]\s*\d{4}|\d{10})\b").expect("valid regex"));

static POSTAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{3})\s*(\d{2})\b").expect("valid regex"));

impl ExtractionStrategy for FreeTextStrategy {
    fn extract(
        &self,
        surface: &DetailSurface,
        name_hint: Option<&str>,
    ) -> Result<DetailExtraction, ExtractError> {
        let lines: Vec<&str> = surface
            .text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        let mut preamble: Vec<String> = Vec::new();
        let mut buckets: Vec<(SectionKind, String, Vec<String>)> = Vec::new();

        for line in &lines {
            if let Some((kind, title, inline)) = classify_heading(line) {
                buckets.push((kind, title, Vec::new()));
                if let Some(value) = inline {
                    if let Some(bucket) = buckets.last_mut() {
                        bucket.2.push(value);
                    }
                }
            } else if let Some(bucket) = buckets.last_mut() {
                bucket.2.push((*line).to_owned());
            } else {
                preamble.push((*line).to_owned());
            }
        }

        let mut sink = FieldSink::default();
        let hinted = name_hint.map(str::trim).filter(|h| !h.is_empty());
        // The list row's name is authoritative here; the first text
        // line stands in only when the row gave none.
        let candidate_name = preamble
            .first()
            .filter(|l| !l.contains('@') && l.chars().count() < 80)
            .cloned();
        if hinted.is_none() {
            if let Some(candidate) = &candidate_name {
                sink.set_name(candidate);
            }
        }

        let mut sections: Vec<DescriptionSection> = Vec::new();
        let mut contacts: Vec<ContactRecord> = Vec::new();
        let mut about_parts: Vec<String> = Vec::new();

        for (kind, title, bucket_lines) in &buckets {
            let mut data = Map::new();
            match kind {
                SectionKind::Activities => {
                    let items = split_lines(bucket_lines);
                    for item in &items {
                        sink.apply_labeled("Verksamhet", item);
                    }
                    data.insert("items".into(), string_array(&items));
                }
                SectionKind::Categories => {
                    let items = split_lines(bucket_lines);
                    for item in &items {
                        sink.apply_labeled("Kategori", item);
                    }
                    data.insert("items".into(), string_array(&items));
                }
                SectionKind::TargetGroup => {
                    let items = split_lines(bucket_lines);
                    for item in &items {
                        sink.apply_labeled("Målgrupp", item);
                    }
                    data.insert("items".into(), string_array(&items));
                }
                SectionKind::Address => {
                    let parsed = parse_address(bucket_lines);
                    if let Some(street) = &parsed.street {
                        sink.apply_labeled("Adress", street);
                        data.insert("street".into(), Value::String(street.clone()));
                    }
                    if let Some(postal) = &parsed.postal_code {
                        sink.apply_labeled("Postnummer", postal);
                        data.insert("postalCode".into(), Value::String(postal.clone()));
                    }
                    if let Some(city) = &parsed.city {
                        sink.apply_labeled("Postort", city);
                        data.insert("city".into(), Value::String(city.clone()));
                    }
                }
                SectionKind::Contact => {
                    let parsed = parse_contact(bucket_lines);
                    if let Some(email) = parsed.emails.first() {
                        sink.apply_labeled("E-post", email);
                    }
                    if let Some(phone) = parsed.phones.first() {
                        sink.apply_labeled("Telefon", phone);
                    }
                    if let Some(url) = parsed.urls.first() {
                        sink.apply_labeled("Hemsida", url);
                    }
                    contacts.extend(parsed.to_contacts());
                    if !parsed.names.is_empty() {
                        data.insert("names".into(), string_array(&parsed.names));
                    }
                    if !parsed.emails.is_empty() {
                        data.insert("emails".into(), string_array(&parsed.emails));
                    }
                    if !parsed.phones.is_empty() {
                        data.insert("phones".into(), string_array(&parsed.phones));
                    }
                    if !parsed.urls.is_empty() {
                        data.insert("urls".into(), string_array(&parsed.urls));
                    }
                }
                SectionKind::OrgNumber => {
                    let joined = bucket_lines.join(" ");
                    if let Some(m) = ORG_NUMBER_RE.find(&joined) {
                        sink.apply_labeled("Org.nr", m.as_str());
                        data.insert("value".into(), Value::String(m.as_str().to_owned()));
                    }
                }
                SectionKind::Homepage => {
                    let joined = bucket_lines.join(" ");
                    let url = find_urls(&joined)
                        .into_iter()
                        .next()
                        .or_else(|| bucket_lines.first().cloned());
                    if let Some(url) = url {
                        sink.apply_labeled("Hemsida", &url);
                        data.insert("url".into(), Value::String(url));
                    }
                }
                SectionKind::About => {
                    about_parts.extend(bucket_lines.iter().cloned());
                }
            }
            if data.is_empty() && !bucket_lines.is_empty() {
                data.insert("lines".into(), string_array(bucket_lines));
            }
            if *kind != SectionKind::About {
                sections.push(DescriptionSection {
                    title: title.clone(),
                    data,
                });
            }
        }

        let mut extraction = sink.into_extraction(name_hint)?;

        // The name line doubles as text only when it is not the name.
        // Folding must cover Å/Ä/Ö, so no ASCII-only comparison here.
        let mut description_lines: Vec<String> = preamble;
        if description_lines
            .first()
            .is_some_and(|l| l.to_lowercase() == extraction.name.to_lowercase())
        {
            description_lines.remove(0);
        }
        description_lines.extend(about_parts);
        if !description_lines.is_empty() {
            let text = description_lines.join("\n");
            extraction.free_text = match extraction.free_text.take() {
                Some(existing) => Some(format!("{existing}\n\n{text}")),
                None => Some(text),
            };
        }

        contacts.append(&mut extraction.contacts);
        extraction.contacts = contacts;
        extraction.sections = sections;
        Ok(extraction)
    }
}

/// Recognizes a section heading line, returning its kind, the heading
/// text and any value inlined after the colon.
fn classify_heading(line: &str) -> Option<(SectionKind, String, Option<String>)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 64 {
        return None;
    }
    // Colonless lines must be the heading phrase exactly, so a
    // sentence that merely starts with a keyword is not swallowed.
    let (head, rest) = match trimmed.split_once(':') {
        Some((head, rest)) => (head.trim(), Some(rest.trim())),
        None => (trimmed, None),
    };
    let kind = heading_kind(&head.to_lowercase())?;
    let inline = rest.filter(|r| !r.is_empty()).map(str::to_owned);
    Some((kind, head.to_owned(), inline))
}

fn heading_kind(word: &str) -> Option<SectionKind> {
    match word {
        "verksamhet" | "verksamheter" | "aktivitet" | "aktiviteter" | "activities"
        | "activity" => Some(SectionKind::Activities),
        "målgrupp" | "målgrupper" | "target group" | "target groups" => {
            Some(SectionKind::TargetGroup)
        }
        "adress" | "besöksadress" | "postadress" | "address" => Some(SectionKind::Address),
        "kontakt" | "kontaktuppgifter" | "kontaktinformation" | "kontaktperson" | "contact"
        | "contact details" => Some(SectionKind::Contact),
        "organisationsnummer" | "org.nr" | "orgnr" | "org nr" | "org number" => {
            Some(SectionKind::OrgNumber)
        }
        "hemsida" | "webbplats" | "website" | "homepage" => Some(SectionKind::Homepage),
        "kategori" | "kategorier" | "category" | "categories" => Some(SectionKind::Categories),
        "om föreningen" | "om oss" | "beskrivning" | "about" | "description" | "information" => {
            Some(SectionKind::About)
        }
        _ => None,
    }
}

fn split_lines(lines: &[String]) -> Vec<String> {
    let mut items = Vec::new();
    for line in lines {
        for item in split_multi(line) {
            if !items
                .iter()
                .any(|existing: &String| existing.to_lowercase() == item.to_lowercase())
            {
                items.push(item);
            }
        }
    }
    items
}

fn string_array(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

#[derive(Debug, Default)]
struct ParsedAddress {
    street: Option<String>,
    postal_code: Option<String>,
    city: Option<String>,
}

/// Street is the first line without a postal code; the postal line
/// yields the code and whatever trails it as the city.
fn parse_address(lines: &[String]) -> ParsedAddress {
    let mut parsed = ParsedAddress::default();
    for line in lines {
        if let Some(caps) = POSTAL_RE.captures(line) {
            if parsed.postal_code.is_none() {
                let code = format!("{} {}", &caps[1], &caps[2]);
                let tail = line[caps.get(0).map_or(0, |m| m.end())..]
                    .trim_start_matches([',', ' '])
                    .trim();
                parsed.postal_code = Some(code);
                if !tail.is_empty() && tail.chars().any(char::is_alphabetic) {
                    parsed.city = Some(tail.to_owned());
                }
                continue;
            }
        }
        if parsed.street.is_none() && line.chars().any(char::is_alphabetic) {
            parsed.street = Some(line.clone());
        }
    }
    parsed
}

#[derive(Debug, Default)]
struct ParsedContact {
    names: Vec<String>,
    emails: Vec<String>,
    phones: Vec<String>,
    urls: Vec<String>,
}

impl ParsedContact {
    /// First name, email and phone form the primary contact; further
    /// emails and phones fan out so nothing is dropped.
    fn to_contacts(&self) -> Vec<ContactRecord> {
        let mut contacts = Vec::new();
        let primary_name = self.names.first().cloned();
        let primary_email = self.emails.first().cloned();
        let primary_phone = self.phones.first().cloned();
        if primary_name.is_some() || primary_email.is_some() || primary_phone.is_some() {
            contacts.push(ContactRecord {
                name: primary_name,
                role: None,
                email: primary_email,
                phone: primary_phone,
            });
        }
        for email in self.emails.iter().skip(1) {
            contacts.push(ContactRecord {
                name: None,
                role: None,
                email: Some(email.clone()),
                phone: None,
            });
        }
        for phone in self.phones.iter().skip(1) {
            contacts.push(ContactRecord {
                name: None,
                role: None,
                email: None,
                phone: Some(phone.clone()),
            });
        }
        contacts
    }
}

fn parse_contact(lines: &[String]) -> ParsedContact {
    let mut parsed = ParsedContact::default();
    for line in lines {
        let emails = find_emails(line);
        let phones = find_phones(line);
        let urls = find_urls(line);
        let had_data = !emails.is_empty() || !phones.is_empty() || !urls.is_empty();
        parsed.emails.extend(emails);
        parsed.phones.extend(phones);
        parsed.urls.extend(urls);
        if !had_data && looks_like_person_name(line) {
            parsed.names.push(line.clone());
        }
    }
    parsed
}

/// Two to four words, each starting with an uppercase letter, no
/// digits. Deliberately strict; a missed name costs less than a bogus
/// one.
fn looks_like_person_name(line: &str) -> bool {
    let words: Vec<&str> = line.split_whitespace().collect();
    if !(2..=4).contains(&words.len()) {
        return false;
    }
    words.iter().all(|word| {
        let mut chars = word.chars();
        chars.next().is_some_and(char::is_uppercase) && !word.chars().any(|c| c.is_ascii_digit())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface(text: &str) -> DetailSurface {
        DetailSurface {
            html: String::new(),
            text: text.to_owned(),
        }
    }

    const MODAL_TEXT: &str = "\
Umeå Schacksällskap
En klubb för alla som gillar schack.

Verksamhet:
Schack, Blixtschack

Målgrupp
Barn, Vuxna

Adress
Skolgatan 12
903 27 Umeå

Kontakt
Anna Svensson
anna@umeschack.se
070-123 45 67

Org.nr: 894701-5533

Hemsida
www.umeschack.se";

    #[test]
    fn buckets_lines_under_recognized_headings() {
        let extraction = FreeTextStrategy.extract(&surface(MODAL_TEXT), None).unwrap();

        assert_eq!(extraction.name, "Umeå Schacksällskap");
        assert_eq!(extraction.activities, vec!["Schack", "Blixtschack"]);
        assert_eq!(extraction.street_address.as_deref(), Some("Skolgatan 12"));
        assert_eq!(extraction.postal_code.as_deref(), Some("903 27"));
        assert_eq!(extraction.city.as_deref(), Some("Umeå"));
        assert_eq!(extraction.email.as_deref(), Some("anna@umeschack.se"));
        assert_eq!(extraction.phone.as_deref(), Some("070-123 45 67"));
        assert_eq!(extraction.org_number.as_deref(), Some("894701-5533"));
        assert_eq!(extraction.homepage_url.as_deref(), Some("www.umeschack.se"));
        assert_eq!(
            extraction.free_text.as_deref(),
            Some("En klubb för alla som gillar schack.")
        );
    }

    #[test]
    fn contact_section_yields_a_contact_record() {
        let extraction = FreeTextStrategy.extract(&surface(MODAL_TEXT), None).unwrap();
        assert_eq!(extraction.contacts.len(), 1);
        let contact = &extraction.contacts[0];
        assert_eq!(contact.name.as_deref(), Some("Anna Svensson"));
        assert_eq!(contact.email.as_deref(), Some("anna@umeschack.se"));
        assert_eq!(contact.phone.as_deref(), Some("070-123 45 67"));
    }

    #[test]
    fn sections_carry_parsed_data() {
        let extraction = FreeTextStrategy.extract(&surface(MODAL_TEXT), None).unwrap();
        let titles: Vec<&str> = extraction.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Verksamhet", "Målgrupp", "Adress", "Kontakt", "Org.nr", "Hemsida"]
        );
        let address = &extraction.sections[2];
        assert_eq!(
            address.data.get("postalCode"),
            Some(&Value::String("903 27".into()))
        );
    }

    #[test]
    fn postal_code_with_wide_spacing_still_parses() {
        let text = "Sjöviks BK\n\nAdress\nStrandvägen 3\n903  26 Umeå";
        let extraction = FreeTextStrategy.extract(&surface(text), None).unwrap();
        assert_eq!(extraction.street_address.as_deref(), Some("Strandvägen 3"));
        assert_eq!(extraction.postal_code.as_deref(), Some("903 26"));
        assert_eq!(extraction.city.as_deref(), Some("Umeå"));
    }

    #[test]
    fn headingless_text_becomes_the_description() {
        let text = "Karlavagnens kulturförening\nVi ordnar konserter i byahuset.\nAlla är välkomna.";
        let extraction = FreeTextStrategy
            .extract(&surface(text), Some("Karlavagnens kulturförening"))
            .unwrap();
        assert_eq!(extraction.name, "Karlavagnens kulturförening");
        assert_eq!(
            extraction.free_text.as_deref(),
            Some("Vi ordnar konserter i byahuset.\nAlla är välkomna.")
        );
        assert!(extraction.sections.is_empty());
    }

    #[test]
    fn name_line_is_dropped_across_swedish_case_folds() {
        let text = "SJÖVIKS BK\nVi paddlar året runt.";
        let extraction = FreeTextStrategy
            .extract(&surface(text), Some("Sjöviks BK"))
            .unwrap();
        assert_eq!(extraction.name, "Sjöviks BK");
        assert_eq!(extraction.free_text.as_deref(), Some("Vi paddlar året runt."));
    }

    #[test]
    fn sentence_starting_with_keyword_is_not_a_heading() {
        let text = "Klubben X\nKontakta oss gärna på årsmötet i mars.";
        let extraction = FreeTextStrategy.extract(&surface(text), None).unwrap();
        assert!(extraction.sections.is_empty());
        assert!(extraction
            .free_text
            .as_deref()
            .is_some_and(|t| t.contains("årsmötet")));
    }

    #[test]
    fn empty_surface_without_hint_is_missing_name() {
        let result = FreeTextStrategy.extract(&surface(""), None);
        assert_eq!(result.unwrap_err(), ExtractError::MissingName);
    }

    #[test]
    fn inline_heading_value_lands_in_its_bucket() {
        let text = "IK Sirius\nVerksamhet: Fotboll, Bandy";
        let extraction = FreeTextStrategy.extract(&surface(text), None).unwrap();
        assert_eq!(extraction.activities, vec!["Fotboll", "Bandy"]);
    }

    #[test]
    fn target_groups_surface_in_extras() {
        let extraction = FreeTextStrategy.extract(&surface(MODAL_TEXT), None).unwrap();
        assert_eq!(
            extraction.extras.get("target_groups"),
            Some(&Value::Array(vec![
                Value::String("Barn".into()),
                Value::String("Vuxna".into()),
            ]))
        );
    }
}
