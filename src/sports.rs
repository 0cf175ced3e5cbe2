//! Sport catalog.
//!
//! Activities reference sports by catalog id (e.g. `"futevolei"`). The
//! catalog supplies display names and categories for the sport picker.

use serde::{Deserialize, Serialize};

/// Grouping used by the sport picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[serde(rename_all = "snake_case")]
pub enum SportCategory {
    Beach,
    Club,
    Wellness,
    Culture,
}

/// A catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sport {
    pub id: &'static str,
    pub name: &'static str,
    pub category: SportCategory,
}

/// Sport used for the pin icon when an activity's sport is not in the catalog.
pub const DEFAULT_SPORT_ID: &str = "corrida";

pub static SPORTS: &[Sport] = &[
    Sport { id: "corrida", name: "Corrida/Caminhada", category: SportCategory::Beach },
    Sport { id: "futevolei", name: "Futevôlei", category: SportCategory::Beach },
    Sport { id: "volei_praia", name: "Vôlei de Praia", category: SportCategory::Beach },
    Sport { id: "beach_tennis", name: "Beach Tennis", category: SportCategory::Beach },
    Sport { id: "frescobol", name: "Frescobol", category: SportCategory::Beach },
    Sport { id: "surf", name: "Surf/Bodyboard", category: SportCategory::Beach },
    Sport { id: "natacao", name: "Natação", category: SportCategory::Club },
    Sport { id: "sup", name: "Stand Up Paddle (SUP)", category: SportCategory::Beach },
    Sport { id: "canoagem", name: "Canoagem/Caiaque", category: SportCategory::Beach },
    Sport { id: "futebol", name: "Futebol", category: SportCategory::Club },
    Sport { id: "tenis", name: "Tênis", category: SportCategory::Club },
    Sport { id: "bike", name: "Bicicleta", category: SportCategory::Club },
    Sport { id: "slackline", name: "Slackline", category: SportCategory::Club },
    Sport { id: "skate", name: "Skate/Patins/Roller", category: SportCategory::Club },
    Sport { id: "funcional", name: "Treino Funcional", category: SportCategory::Club },
    Sport { id: "yoga", name: "Yoga", category: SportCategory::Wellness },
    Sport { id: "pilates", name: "Pilates Solo", category: SportCategory::Wellness },
    Sport { id: "meditacao", name: "Meditação/Mindfulness", category: SportCategory::Wellness },
    Sport { id: "danca", name: "Dança/Zumba", category: SportCategory::Wellness },
    Sport { id: "capoeira", name: "Capoeira", category: SportCategory::Culture },
    Sport { id: "tecido", name: "Tecido Acrobático", category: SportCategory::Culture },
];

pub fn find_sport(id: &str) -> Option<&'static Sport> {
    SPORTS.iter().find(|s| s.id == id)
}

pub fn is_known_sport(id: &str) -> bool {
    find_sport(id).is_some()
}

pub fn sports_in_category(category: SportCategory) -> Vec<&'static Sport> {
    SPORTS.iter().filter(|s| s.category == category).collect()
}

/// Catalog id whose icon should be drawn for `sport`.
pub fn icon_sport_id(sport: &str) -> &'static str {
    find_sport(sport).map(|s| s.id).unwrap_or(DEFAULT_SPORT_ID)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_ids_unique() {
        let ids: HashSet<&str> = SPORTS.iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), SPORTS.len());
        assert_eq!(SPORTS.len(), 21);
    }

    #[test]
    fn test_lookup() {
        assert_eq!(find_sport("yoga").map(|s| s.category), Some(SportCategory::Wellness));
        assert!(is_known_sport("capoeira"));
        assert!(!is_known_sport("curling"));
    }

    #[test]
    fn test_icon_fallback() {
        assert_eq!(icon_sport_id("surf"), "surf");
        assert_eq!(icon_sport_id("curling"), DEFAULT_SPORT_ID);
        assert_eq!(icon_sport_id(""), DEFAULT_SPORT_ID);
    }

    #[test]
    fn test_categories_cover_catalog() {
        let total: usize = [
            SportCategory::Beach,
            SportCategory::Club,
            SportCategory::Wellness,
            SportCategory::Culture,
        ]
        .into_iter()
        .map(|c| sports_in_category(c).len())
        .sum();
        assert_eq!(total, SPORTS.len());
        assert_eq!(sports_in_category(SportCategory::Culture).len(), 2);
    }
}
