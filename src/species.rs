//! # Species Catalog
//!
//! Static name ↔ id lookup used to repair records that carry only one of
//! the two. The host application may supply its own catalog through the
//! [`SpeciesCatalog`] trait; [`StaticCatalog::default_seed`] ships the
//! first-generation table.
//!
//! Lookups by name are case-insensitive and ignore surrounding whitespace.

use std::collections::HashMap;

pub trait SpeciesCatalog: Send + Sync {
    fn name_for(&self, id: u32) -> Option<String>;
    fn id_for(&self, name: &str) -> Option<u32>;
}

/// In-memory catalog built from `(id, name)` pairs.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    names: HashMap<u32, String>,
    ids: HashMap<String, u32>,
}

impl StaticCatalog {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        let mut catalog = Self::default();
        for (id, name) in pairs {
            let name = name.into();
            catalog.ids.insert(normalize(&name), id);
            catalog.names.insert(id, name);
        }
        catalog
    }

    /// Built-in seed covering national dex #1–#151.
    pub fn default_seed() -> Self {
        Self::from_pairs(
            GEN1_NAMES
                .iter()
                .enumerate()
                .map(|(i, n)| (i as u32 + 1, *n)),
        )
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl SpeciesCatalog for StaticCatalog {
    fn name_for(&self, id: u32) -> Option<String> {
        self.names.get(&id).cloned()
    }

    fn id_for(&self, name: &str) -> Option<u32> {
        self.ids.get(&normalize(name)).copied()
    }
}

/// Gender glyphs become the " M"/" F" suffixes the catalog uses.
pub fn normalize_species_name(raw: &str) -> String {
    raw.replace('\u{2642}', " M").replace('\u{2640}', " F")
}

fn normalize(name: &str) -> String {
    normalize_species_name(name.trim()).to_lowercase()
}

const GEN1_NAMES: [&str; 151] = [
    "Bulbasaur", "Ivysaur", "Venusaur", "Charmander", "Charmeleon", "Charizard",
    "Squirtle", "Wartortle", "Blastoise", "Caterpie", "Metapod", "Butterfree",
    "Weedle", "Kakuna", "Beedrill", "Pidgey", "Pidgeotto", "Pidgeot", "Rattata",
    "Raticate", "Spearow", "Fearow", "Ekans", "Arbok", "Pikachu", "Raichu",
    "Sandshrew", "Sandslash", "Nidoran F", "Nidorina", "Nidoqueen", "Nidoran M",
    "Nidorino", "Nidoking", "Clefairy", "Clefable", "Vulpix", "Ninetales",
    "Jigglypuff", "Wigglytuff", "Zubat", "Golbat", "Oddish", "Gloom", "Vileplume",
    "Paras", "Parasect", "Venonat", "Venomoth", "Diglett", "Dugtrio", "Meowth",
    "Persian", "Psyduck", "Golduck", "Mankey", "Primeape", "Growlithe", "Arcanine",
    "Poliwag", "Poliwhirl", "Poliwrath", "Abra", "Kadabra", "Alakazam", "Machop",
    "Machoke", "Machamp", "Bellsprout", "Weepinbell", "Victreebel", "Tentacool",
    "Tentacruel", "Geodude", "Graveler", "Golem", "Ponyta", "Rapidash", "Slowpoke",
    "Slowbro", "Magnemite", "Magneton", "Farfetch'd", "Doduo", "Dodrio", "Seel",
    "Dewgong", "Grimer", "Muk", "Shellder", "Cloyster", "Gastly", "Haunter",
    "Gengar", "Onix", "Drowzee", "Hypno", "Krabby", "Kingler", "Voltorb",
    "Electrode", "Exeggcute", "Exeggutor", "Cubone", "Marowak", "Hitmonlee",
    "Hitmonchan", "Lickitung", "Koffing", "Weezing", "Rhyhorn", "Rhydon", "Chansey",
    "Tangela", "Kangaskhan", "Horsea", "Seadra", "Goldeen", "Seaking", "Staryu",
    "Starmie", "Mr. Mime", "Scyther", "Jynx", "Electabuzz", "Magmar", "Pinsir",
    "Tauros", "Magikarp", "Gyarados", "Lapras", "Ditto", "Eevee", "Vaporeon",
    "Jolteon", "Flareon", "Porygon", "Omanyte", "Omastar", "Kabuto", "Kabutops",
    "Aerodactyl", "Snorlax", "Articuno", "Zapdos", "Moltres", "Dratini",
    "Dragonair", "Dragonite", "Mewtwo", "Mew",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_resolves_both_directions() {
        let c = StaticCatalog::default_seed();
        assert_eq!(c.len(), 151);
        assert_eq!(c.name_for(25).as_deref(), Some("Pikachu"));
        assert_eq!(c.id_for("pikachu"), Some(25));
        assert_eq!(c.id_for("  Dragonite "), Some(149));
        assert_eq!(c.name_for(0), None);
        assert_eq!(c.id_for("Missingno"), None);
    }

    #[test]
    fn gender_glyphs_are_normalized() {
        let c = StaticCatalog::default_seed();
        assert_eq!(normalize_species_name("Nidoran\u{2640}"), "Nidoran F");
        assert_eq!(c.id_for("Nidoran\u{2642}"), Some(32));
    }
}
