//! The compiled-in site catalog.
//!
//! Each municipality runs one of three known registry platforms, so a
//! site entry is just a key, a start URL and the platform it runs. The
//! selector profile is shared per platform.

use frh_core::SourceSystem;

use crate::profile::{Pagination, PaginationModel, SiteProfile};

#[derive(Debug, Clone, Copy)]
pub struct SiteDefinition {
    /// Stable lowercase key, used on the command line and in output
    /// file names.
    pub key: &'static str,
    pub municipality: &'static str,
    pub source_system: SourceSystem,
    pub start_url: &'static str,
}

impl SiteDefinition {
    #[must_use]
    pub fn profile(&self) -> SiteProfile {
        profile_for(self.source_system)
    }
}

const SITES: &[SiteDefinition] = &[
    SiteDefinition {
        key: "uppsala",
        municipality: "Uppsala",
        source_system: SourceSystem::Fri,
        start_url: "https://fri.uppsala.se/forening/",
    },
    SiteDefinition {
        key: "lulea",
        municipality: "Luleå",
        source_system: SourceSystem::Fri,
        start_url: "https://fri.lulea.se/forening/",
    },
    SiteDefinition {
        key: "falun",
        municipality: "Falun",
        source_system: SourceSystem::Fri,
        start_url: "https://fri.falun.se/forening/",
    },
    SiteDefinition {
        key: "boras",
        municipality: "Borås",
        source_system: SourceSystem::ActorSmartbook,
        start_url: "https://boras.actorsmartbook.se/Associations",
    },
    SiteDefinition {
        key: "varberg",
        municipality: "Varberg",
        source_system: SourceSystem::ActorSmartbook,
        start_url: "https://varberg.actorsmartbook.se/Associations",
    },
    SiteDefinition {
        key: "umea",
        municipality: "Umeå",
        source_system: SourceSystem::InterbookGo,
        start_url: "https://ibgo.umea.se/associations/search",
    },
    SiteDefinition {
        key: "gavle",
        municipality: "Gävle",
        source_system: SourceSystem::InterbookGo,
        start_url: "https://ibgo.gavle.se/associations/search",
    },
];

#[must_use]
pub fn all_sites() -> &'static [SiteDefinition] {
    SITES
}

#[must_use]
pub fn find_site(key: &str) -> Option<&'static SiteDefinition> {
    SITES.iter().find(|site| site.key.eq_ignore_ascii_case(key))
}

/// The selector surface of each registry platform.
#[must_use]
pub fn profile_for(source: SourceSystem) -> SiteProfile {
    match source {
        SourceSystem::Fri => SiteProfile {
            list_ready_selector: "table.forenings-lista tbody".into(),
            row_selector: "table.forenings-lista tbody tr".into(),
            row_name_selector: "table.forenings-lista tbody tr td.namn a".into(),
            row_open_selector: "table.forenings-lista tbody tr td.namn a".into(),
            row_link_selector: Some("table.forenings-lista tbody tr td.namn a".into()),
            detail_root_selector: "#foreningsdetalj".into(),
            modal_open_selector: None,
            close_selectors: vec![
                "#foreningsdetalj a.tillbaka".into(),
                ".brodsmulor a.register".into(),
            ],
            pagination: Pagination {
                model: PaginationModel::NextLink,
                next_selector: ".paginering a.nasta".into(),
                disabled_selector: Some(".paginering a.nasta.inaktiv".into()),
            },
            total_count_selector: Some("#antal-traffar".into()),
            filter_state_selector: Some("#bokstavsfilter .vald".into()),
        },
        SourceSystem::ActorSmartbook => SiteProfile {
            list_ready_selector: "#associationList".into(),
            row_selector: "#associationList .association-row".into(),
            row_name_selector: "#associationList .association-row .association-name".into(),
            row_open_selector: "#associationList .association-row button.visa-detaljer".into(),
            row_link_selector: None,
            detail_root_selector: ".modal-dialog .association-details".into(),
            modal_open_selector: Some("body.modal-open".into()),
            close_selectors: vec![
                ".modal-dialog button.stang".into(),
                ".modal-dialog .modal-header .btn-close".into(),
            ],
            pagination: Pagination {
                model: PaginationModel::NextButton,
                next_selector: "ul.pagination button.nasta".into(),
                disabled_selector: Some("ul.pagination button.nasta[disabled]".into()),
            },
            total_count_selector: Some("#resultatAntal".into()),
            filter_state_selector: Some("#kategoriFilter option:checked".into()),
        },
        SourceSystem::InterbookGo => SiteProfile {
            list_ready_selector: "ul.foreningslista".into(),
            row_selector: "ul.foreningslista li.forening".into(),
            row_name_selector: "ul.foreningslista li.forening a.foreningslank".into(),
            row_open_selector: "ul.foreningslista li.forening a.foreningslank".into(),
            row_link_selector: None,
            detail_root_selector: ".ibgo-modal .modal-innehall".into(),
            modal_open_selector: Some(".ibgo-modal-backdrop".into()),
            close_selectors: vec![".ibgo-modal button.stang-modal".into()],
            pagination: Pagination {
                model: PaginationModel::NumberedLinks,
                next_selector: "nav.sidnumrering li.aktiv + li a".into(),
                disabled_selector: None,
            },
            total_count_selector: Some(".sokresultat-antal".into()),
            filter_state_selector: Some(".aktiva-filter".into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_keys_are_unique_and_lowercase() {
        let mut keys: Vec<&str> = all_sites().iter().map(|s| s.key).collect();
        keys.sort_unstable();
        let before = keys.len();
        keys.dedup();
        assert_eq!(keys.len(), before);
        assert!(all_sites()
            .iter()
            .all(|s| s.key.chars().all(|c| c.is_ascii_lowercase())));
    }

    #[test]
    fn lookup_ignores_case() {
        assert!(find_site("UPPSALA").is_some());
        assert!(find_site("uppsala").is_some());
        assert!(find_site("atlantis").is_none());
    }

    #[test]
    fn each_platform_has_its_pagination_model() {
        let fri = profile_for(SourceSystem::Fri);
        assert_eq!(fri.pagination.model, PaginationModel::NextLink);
        let actor = profile_for(SourceSystem::ActorSmartbook);
        assert_eq!(actor.pagination.model, PaginationModel::NextButton);
        let ibgo = profile_for(SourceSystem::InterbookGo);
        assert_eq!(ibgo.pagination.model, PaginationModel::NumberedLinks);
    }

    #[test]
    fn every_site_resolves_a_profile() {
        for site in all_sites() {
            let profile = site.profile();
            assert!(!profile.row_selector.is_empty());
            assert!(!profile.detail_root_selector.is_empty());
            assert!(!profile.close_selectors.is_empty());
        }
    }
}
