//! Label-to-field mapping for labelled detail layouts.
//!
//! Registry platforms label the same field differently across
//! municipalities and languages ("Org.nr", "Organisationsnummer",
//! "Org number"). Labels are normalized and matched against one fixed
//! dictionary so every strategy lands on the same record fields.

/// Canonical destination of a labelled value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKey {
    Name,
    OrgNumber,
    Homepage,
    Email,
    Phone,
    PhoneHome,
    PhoneWork,
    PhoneMobile,
    StreetAddress,
    PostalCode,
    City,
    AssociationType,
    Activities,
    Categories,
    Description,
    ContactName,
    ContactRole,
    TargetGroup,
    Founded,
    BankDetails,
}

/// Lowercases, trims, strips a trailing `:` or `*` and collapses
/// internal whitespace.
#[must_use]
pub fn normalize_label(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let stripped = lowered
        .trim_end_matches(|c: char| c == ':' || c == '*' || c.is_whitespace())
        .trim_start();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Maps a raw label to its record field, `None` for labels outside the
/// dictionary (those land in `extras`).
#[must_use]
pub fn field_for_label(raw: &str) -> Option<FieldKey> {
    let label = normalize_label(raw);
    let exact = match label.as_str() {
        "namn" | "name" | "förening" | "föreningsnamn" | "föreningens namn" => {
            Some(FieldKey::Name)
        }
        "org.nr" | "orgnr" | "org nr" | "org.nummer" | "orgnummer" | "organisationsnummer"
        | "org number" | "organisation number" => Some(FieldKey::OrgNumber),
        "hemsida" | "webbplats" | "webbsida" | "homepage" | "website" => Some(FieldKey::Homepage),
        "e-post" | "epost" | "e-postadress" | "e-post adress" | "email" | "e-mail" | "mail"
        | "mejl" => Some(FieldKey::Email),
        "telefon" | "tel" | "telefonnummer" | "phone" | "telephone" => Some(FieldKey::Phone),
        "hem" | "hemtelefon" | "home" => Some(FieldKey::PhoneHome),
        "arbete" | "arbetstelefon" | "jobb" | "work" => Some(FieldKey::PhoneWork),
        "mobil" | "mobiltelefon" | "mobilnummer" | "mobile" => Some(FieldKey::PhoneMobile),
        "adress" | "gatuadress" | "postadress" | "utdelningsadress" | "besöksadress"
        | "address" => Some(FieldKey::StreetAddress),
        "postnummer" | "postnr" | "zip" | "postal code" => Some(FieldKey::PostalCode),
        "postort" | "ort" | "stad" | "city" => Some(FieldKey::City),
        "föreningstyp" | "föreningsform" | "organisationsform" | "typ" | "type" => {
            Some(FieldKey::AssociationType)
        }
        "verksamhet" | "verksamheter" | "aktivitet" | "aktiviteter" | "activity"
        | "activities" => Some(FieldKey::Activities),
        "kategori" | "kategorier" | "category" | "categories" => Some(FieldKey::Categories),
        "beskrivning" | "om föreningen" | "om oss" | "beskrivning av verksamheten"
        | "description" | "information" => Some(FieldKey::Description),
        "kontaktperson" | "kontakt" | "contact" | "contact person" => Some(FieldKey::ContactName),
        "roll" | "funktion" | "titel" | "befattning" | "role" => Some(FieldKey::ContactRole),
        "målgrupp" | "målgrupper" | "target group" | "target groups" => {
            Some(FieldKey::TargetGroup)
        }
        "bildad" | "bildades" | "bildandeår" | "grundad" | "grundades" | "founded" => {
            Some(FieldKey::Founded)
        }
        "bankgiro" | "plusgiro" | "postgiro" | "swish" | "bg" | "pg" => {
            Some(FieldKey::BankDetails)
        }
        _ => None,
    };
    if exact.is_some() {
        return exact;
    }
    // Suffixed variants seen in the wild, like "Org.nr (10 siffror)"
    // or "Hemsida / webb".
    if label.starts_with("org.nr") || label.starts_with("orgnr") || label.starts_with("org nr") {
        Some(FieldKey::OrgNumber)
    } else if label.starts_with("hemsid") || label.starts_with("webbplats") {
        Some(FieldKey::Homepage)
    } else if label.starts_with("e-post") || label.starts_with("epost") {
        Some(FieldKey::Email)
    } else if label.starts_with("kontaktperson") {
        Some(FieldKey::ContactName)
    } else {
        None
    }
}

/// Key used when an unmapped label is preserved under `extras`:
/// lowercase ASCII-ish snake_case.
#[must_use]
pub fn extras_key(raw: &str) -> String {
    let mut key = String::new();
    for ch in normalize_label(raw).chars() {
        match ch {
            'å' | 'ä' => key.push('a'),
            'ö' => key.push('o'),
            'é' | 'è' => key.push('e'),
            c if c.is_alphanumeric() => key.push(c),
            _ => {
                if !key.ends_with('_') && !key.is_empty() {
                    key.push('_');
                }
            }
        }
    }
    key.trim_end_matches('_').to_owned()
}
