//! Hand-authored starting world content.
//!
//! Twelve settlements across the four great realms, eight lords, five
//! tavern companions, and the def tables for units, items, enterprises,
//! and character backgrounds. Everything here is data; the engines never
//! hard-code content.

use std::collections::{BTreeMap, BTreeSet};

use marchlands_types::{
    AiLord, CharacterBackground, Companion, CompanionId, EnterpriseKind, EquipmentSlot, FactionId,
    GoodId, ItemId, Location, LocationId, LocationOwner, LocationStatus, LordId, MarketGood,
    SkillId, UnitId,
};

/// Where every new campaign begins.
pub const START_LOCATION: &str = "westmere";

/// Gold price of one fresh recruit before relation discounts.
pub const BASE_RECRUIT_COST: u32 = 10;

/// The starting location id.
pub fn start_location() -> LocationId {
    LocationId::from(START_LOCATION)
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Static definition of a troop type and its upgrade gates.
#[derive(Debug, Clone, Copy)]
pub struct UnitDef {
    /// The troop type.
    pub unit: UnitId,
    /// Previous rung of the upgrade chain, if any.
    pub upgrade_from: Option<UnitId>,
    /// Gold per upgraded troop, before trainer discounts.
    pub upgrade_gold: u32,
    /// Training xp per upgraded troop, drawn from the source unit's pool.
    pub upgrade_xp: u32,
    /// Items consumed per upgraded troop.
    pub upgrade_items: &'static [(ItemId, u32)],
    /// Settlements where the upgrade can be performed; empty means anywhere.
    pub upgrade_locations: &'static [&'static str],
    /// Companion whose presence the upgrade requires, if any.
    pub upgrade_companion: Option<&'static str>,
}

/// Look up the def table entry for a troop type.
pub const fn unit_def(unit: UnitId) -> UnitDef {
    match unit {
        UnitId::Recruit => UnitDef {
            unit: UnitId::Recruit,
            upgrade_from: None,
            upgrade_gold: 0,
            upgrade_xp: 0,
            upgrade_items: &[],
            upgrade_locations: &[],
            upgrade_companion: None,
        },
        UnitId::Footman => UnitDef {
            unit: UnitId::Footman,
            upgrade_from: Some(UnitId::Recruit),
            upgrade_gold: 50,
            upgrade_xp: 20,
            upgrade_items: &[],
            upgrade_locations: &[],
            upgrade_companion: None,
        },
        UnitId::Veteran => UnitDef {
            unit: UnitId::Veteran,
            upgrade_from: Some(UnitId::Footman),
            upgrade_gold: 120,
            upgrade_xp: 60,
            upgrade_items: &[],
            upgrade_locations: &[],
            upgrade_companion: None,
        },
        UnitId::Knight => UnitDef {
            unit: UnitId::Knight,
            upgrade_from: Some(UnitId::Veteran),
            upgrade_gold: 300,
            upgrade_xp: 150,
            upgrade_items: &[(ItemId::Warhorse, 1)],
            upgrade_locations: &["westmere", "volkharad"],
            upgrade_companion: Some("dain"),
        },
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Static definition of an item.
#[derive(Debug, Clone, Copy)]
pub struct ItemDef {
    /// The item.
    pub item: ItemId,
    /// Shop name.
    pub name: &'static str,
    /// Slot it equips into.
    pub slot: EquipmentSlot,
    /// Shop price in gold.
    pub price: u32,
}

/// Look up the def table entry for an item.
pub const fn item_def(item: ItemId) -> ItemDef {
    match item {
        ItemId::TatteredRags => ItemDef {
            item: ItemId::TatteredRags,
            name: "Tattered Rags",
            slot: EquipmentSlot::Body,
            price: 5,
        },
        ItemId::RustySword => ItemDef {
            item: ItemId::RustySword,
            name: "Rusty Sword",
            slot: EquipmentSlot::Weapon,
            price: 20,
        },
        ItemId::IronSword => ItemDef {
            item: ItemId::IronSword,
            name: "Iron Sword",
            slot: EquipmentSlot::Weapon,
            price: 150,
        },
        ItemId::KettleHelm => ItemDef {
            item: ItemId::KettleHelm,
            name: "Kettle Helm",
            slot: EquipmentSlot::Head,
            price: 90,
        },
        ItemId::MailHauberk => ItemDef {
            item: ItemId::MailHauberk,
            name: "Mail Hauberk",
            slot: EquipmentSlot::Body,
            price: 400,
        },
        ItemId::LeatherBoots => ItemDef {
            item: ItemId::LeatherBoots,
            name: "Leather Boots",
            slot: EquipmentSlot::Feet,
            price: 60,
        },
        ItemId::Warhorse => ItemDef {
            item: ItemId::Warhorse,
            name: "Warhorse",
            slot: EquipmentSlot::Horse,
            price: 800,
        },
    }
}

// ---------------------------------------------------------------------------
// Enterprises
// ---------------------------------------------------------------------------

/// Static definition of an enterprise kind.
#[derive(Debug, Clone, Copy)]
pub struct EnterpriseDef {
    /// The workshop kind.
    pub kind: EnterpriseKind,
    /// Construction cost in gold.
    pub cost: u32,
    /// Weekly profit at output-good multiplier 1.0.
    pub base_weekly_profit: u32,
    /// The good whose local price scales the profit.
    pub output: GoodId,
}

/// Look up the def table entry for an enterprise kind.
pub const fn enterprise_def(kind: EnterpriseKind) -> EnterpriseDef {
    match kind {
        EnterpriseKind::Mill => EnterpriseDef {
            kind: EnterpriseKind::Mill,
            cost: 2500,
            base_weekly_profit: 200,
            output: GoodId::Grain,
        },
        EnterpriseKind::Brewery => EnterpriseDef {
            kind: EnterpriseKind::Brewery,
            cost: 3000,
            base_weekly_profit: 250,
            output: GoodId::Ale,
        },
        EnterpriseKind::Winery => EnterpriseDef {
            kind: EnterpriseKind::Winery,
            cost: 5500,
            base_weekly_profit: 380,
            output: GoodId::Wine,
        },
        EnterpriseKind::Smithy => EnterpriseDef {
            kind: EnterpriseKind::Smithy,
            cost: 5000,
            base_weekly_profit: 350,
            output: GoodId::Tools,
        },
        EnterpriseKind::Weavery => EnterpriseDef {
            kind: EnterpriseKind::Weavery,
            cost: 6000,
            base_weekly_profit: 400,
            output: GoodId::Velvet,
        },
    }
}

// ---------------------------------------------------------------------------
// Backgrounds
// ---------------------------------------------------------------------------

/// Starting-roll ranges for a character background.
///
/// Gold and renown are half-open ranges; troops is the count of starting
/// recruits.
#[derive(Debug, Clone, Copy)]
pub struct BackgroundDef {
    /// The background.
    pub background: CharacterBackground,
    /// Minimum starting gold.
    pub gold_min: u32,
    /// Maximum starting gold (exclusive).
    pub gold_max: u32,
    /// Minimum starting renown.
    pub renown_min: u32,
    /// Maximum starting renown (exclusive).
    pub renown_max: u32,
    /// Minimum starting recruits.
    pub troops_min: u32,
    /// Maximum starting recruits (exclusive).
    pub troops_max: u32,
}

/// Look up the roll ranges for a background.
pub const fn background_def(background: CharacterBackground) -> BackgroundDef {
    match background {
        CharacterBackground::Merchant => BackgroundDef {
            background,
            gold_min: 2000,
            gold_max: 2500,
            renown_min: 10,
            renown_max: 30,
            troops_min: 2,
            troops_max: 5,
        },
        CharacterBackground::Noble => BackgroundDef {
            background,
            gold_min: 1500,
            gold_max: 2000,
            renown_min: 50,
            renown_max: 100,
            troops_min: 2,
            troops_max: 5,
        },
        CharacterBackground::Poacher => BackgroundDef {
            background,
            gold_min: 1000,
            gold_max: 1500,
            renown_min: 10,
            renown_max: 30,
            troops_min: 5,
            troops_max: 8,
        },
        CharacterBackground::Nomad | CharacterBackground::Blacksmith => BackgroundDef {
            background,
            gold_min: 1000,
            gold_max: 1500,
            renown_min: 10,
            renown_max: 30,
            troops_min: 2,
            troops_max: 5,
        },
    }
}

// ---------------------------------------------------------------------------
// Markets
// ---------------------------------------------------------------------------

/// A fresh market: every good at multiplier 1.0, sorted by display name.
pub fn fresh_market() -> Vec<MarketGood> {
    let mut rows: Vec<MarketGood> = GoodId::ALL
        .into_iter()
        .map(|good| MarketGood {
            good,
            multiplier: 1.0,
        })
        .collect();
    rows.sort_by_key(|row| row.good.display_name());
    rows
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

struct LocationSeed {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    owner: &'static str,
    faction: FactionId,
    connected: &'static [&'static str],
    recruits: u32,
    x: i32,
    y: i32,
    production: &'static [GoodId],
    garrison: &'static [(UnitId, u32)],
}

const LOCATION_SEEDS: &[LocationSeed] = &[
    LocationSeed {
        id: "westmere",
        name: "Westmere",
        description: "Walled seat of the Velhart kings, where the west road meets the mere.",
        owner: "aldmar",
        faction: FactionId::Velhart,
        connected: &["caldrith", "harrowgate", "skellborg"],
        recruits: 14,
        x: 10,
        y: 40,
        production: &[GoodId::Grain, GoodId::Tools],
        garrison: &[(UnitId::Footman, 20), (UnitId::Veteran, 5)],
    },
    LocationSeed {
        id: "caldrith",
        name: "Caldrith",
        description: "Terraced vineyards above a slow green river.",
        owner: "berenger",
        faction: FactionId::Velhart,
        connected: &["westmere", "harrowgate", "miren"],
        recruits: 10,
        x: 20,
        y: 55,
        production: &[GoodId::Grain, GoodId::Wine],
        garrison: &[(UnitId::Footman, 12)],
    },
    LocationSeed {
        id: "harrowgate",
        name: "Harrowgate",
        description: "Soot-stained forge town at the pass between west and east.",
        owner: "aldmar",
        faction: FactionId::Velhart,
        connected: &["westmere", "caldrith", "drakmar", "volkharad"],
        recruits: 12,
        x: 30,
        y: 42,
        production: &[GoodId::Iron, GoodId::Ale],
        garrison: &[(UnitId::Footman, 10), (UnitId::Recruit, 10)],
    },
    LocationSeed {
        id: "skellborg",
        name: "Skellborg",
        description: "Longship harbor under cliffs white with gulls.",
        owner: "sigvald",
        faction: FactionId::Norden,
        connected: &["westmere", "varnheim", "drakmar"],
        recruits: 15,
        x: 12,
        y: 12,
        production: &[GoodId::Furs, GoodId::Salt],
        garrison: &[(UnitId::Footman, 18), (UnitId::Veteran, 4)],
    },
    LocationSeed {
        id: "varnheim",
        name: "Varnheim",
        description: "Salt pans and smokehouses on a grey fjord.",
        owner: "thorun",
        faction: FactionId::Norden,
        connected: &["skellborg", "drakmar"],
        recruits: 9,
        x: 24,
        y: 8,
        production: &[GoodId::Salt],
        garrison: &[(UnitId::Recruit, 15)],
    },
    LocationSeed {
        id: "drakmar",
        name: "Drakmar",
        description: "Border market where Norden iron meets the inland roads.",
        owner: "sigvald",
        faction: FactionId::Norden,
        connected: &["skellborg", "varnheim", "harrowgate"],
        recruits: 11,
        x: 34,
        y: 20,
        production: &[GoodId::Iron, GoodId::Furs],
        garrison: &[(UnitId::Footman, 10)],
    },
    LocationSeed {
        id: "volkharad",
        name: "Volkharad",
        description: "Timber-walled seat of the Vostyan boyars.",
        owner: "radomir",
        faction: FactionId::Vostya,
        connected: &["harrowgate", "miren", "ostengard", "tulkan"],
        recruits: 13,
        x: 52,
        y: 38,
        production: &[GoodId::Grain, GoodId::Iron],
        garrison: &[(UnitId::Footman, 16), (UnitId::Veteran, 6)],
    },
    LocationSeed {
        id: "miren",
        name: "Miren",
        description: "Loom town famous for velvet and sweet lowland wine.",
        owner: "mstislav",
        faction: FactionId::Vostya,
        connected: &["caldrith", "volkharad", "ostengard"],
        recruits: 8,
        x: 44,
        y: 56,
        production: &[GoodId::Wine, GoodId::Velvet],
        garrison: &[(UnitId::Recruit, 12)],
    },
    LocationSeed {
        id: "ostengard",
        name: "Ostengard",
        description: "Last stone keep before the grass sea begins.",
        owner: "radomir",
        faction: FactionId::Vostya,
        connected: &["volkharad", "miren", "qaraz"],
        recruits: 10,
        x: 62,
        y: 50,
        production: &[GoodId::Salt, GoodId::Grain],
        garrison: &[(UnitId::Footman, 8)],
    },
    LocationSeed {
        id: "tulkan",
        name: "Tulkan",
        description: "Tent city of the Khan, ringed by horse lines.",
        owner: "toregh",
        faction: FactionId::Kherai,
        connected: &["volkharad", "sarai", "qaraz"],
        recruits: 15,
        x: 74,
        y: 30,
        production: &[GoodId::Furs],
        garrison: &[(UnitId::Footman, 14), (UnitId::Veteran, 6)],
    },
    LocationSeed {
        id: "sarai",
        name: "Sarai",
        description: "Caravanserai on the fur road east.",
        owner: "subei",
        faction: FactionId::Kherai,
        connected: &["tulkan", "qaraz"],
        recruits: 9,
        x: 86,
        y: 24,
        production: &[GoodId::Furs],
        garrison: &[(UnitId::Recruit, 14)],
    },
    LocationSeed {
        id: "qaraz",
        name: "Qaraz",
        description: "Salt-caked oasis town where three trails cross.",
        owner: "toregh",
        faction: FactionId::Kherai,
        connected: &["tulkan", "sarai", "ostengard"],
        recruits: 8,
        x: 80,
        y: 44,
        production: &[GoodId::Salt],
        garrison: &[(UnitId::Footman, 8)],
    },
];

/// Build the starting settlements keyed by id.
pub fn starting_locations() -> BTreeMap<LocationId, Location> {
    LOCATION_SEEDS
        .iter()
        .map(|seed| {
            let id = LocationId::from(seed.id);
            let location = Location {
                id: id.clone(),
                name: seed.name.to_owned(),
                description: seed.description.to_owned(),
                owner: LocationOwner::Lord(LordId::from(seed.owner)),
                faction_id: seed.faction,
                connected_to: seed.connected.iter().map(|s| LocationId::from(*s)).collect(),
                recruits_available: seed.recruits,
                x: seed.x,
                y: seed.y,
                market: fresh_market(),
                garrison: seed.garrison.iter().copied().collect(),
                accumulated_taxes: 0,
                status: LocationStatus::Normal,
                looted_until_day: 0,
                production: seed.production.iter().copied().collect(),
            };
            (id, location)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Lords
// ---------------------------------------------------------------------------

struct LordSeed {
    id: &'static str,
    name: &'static str,
    faction: FactionId,
    seat: &'static str,
    army: &'static [(UnitId, u32)],
}

const LORD_SEEDS: &[LordSeed] = &[
    LordSeed {
        id: "aldmar",
        name: "Lord Aldmar",
        faction: FactionId::Velhart,
        seat: "westmere",
        army: &[(UnitId::Footman, 40), (UnitId::Veteran, 15), (UnitId::Knight, 5)],
    },
    LordSeed {
        id: "berenger",
        name: "Lord Berenger",
        faction: FactionId::Velhart,
        seat: "caldrith",
        army: &[(UnitId::Footman, 35), (UnitId::Veteran, 10)],
    },
    LordSeed {
        id: "sigvald",
        name: "Jarl Sigvald",
        faction: FactionId::Norden,
        seat: "skellborg",
        army: &[(UnitId::Footman, 45), (UnitId::Veteran, 12)],
    },
    LordSeed {
        id: "thorun",
        name: "Jarl Thorun",
        faction: FactionId::Norden,
        seat: "varnheim",
        army: &[(UnitId::Recruit, 20), (UnitId::Footman, 30)],
    },
    LordSeed {
        id: "radomir",
        name: "Boyar Radomir",
        faction: FactionId::Vostya,
        seat: "volkharad",
        army: &[(UnitId::Footman, 38), (UnitId::Veteran, 10)],
    },
    LordSeed {
        id: "mstislav",
        name: "Boyar Mstislav",
        faction: FactionId::Vostya,
        seat: "miren",
        army: &[(UnitId::Recruit, 25), (UnitId::Footman, 25)],
    },
    LordSeed {
        id: "toregh",
        name: "Khan Toregh",
        faction: FactionId::Kherai,
        seat: "tulkan",
        army: &[(UnitId::Footman, 30), (UnitId::Veteran, 20)],
    },
    LordSeed {
        id: "subei",
        name: "Noyan Subei",
        faction: FactionId::Kherai,
        seat: "sarai",
        army: &[(UnitId::Recruit, 30), (UnitId::Footman, 20)],
    },
];

/// Build the starting lords keyed by id.
pub fn starting_lords() -> BTreeMap<LordId, AiLord> {
    LORD_SEEDS
        .iter()
        .map(|seed| {
            let id = LordId::from(seed.id);
            let lord = AiLord {
                id: id.clone(),
                name: seed.name.to_owned(),
                faction_id: seed.faction,
                army: seed.army.iter().copied().collect(),
                current_location_id: LocationId::from(seed.seat),
                is_defeated: false,
                defeated_until_day: 0,
            };
            (id, lord)
        })
        .collect()
}

/// The army a lord respawns with after defeat.
pub fn lord_starting_army(lord: &LordId) -> BTreeMap<UnitId, u32> {
    LORD_SEEDS
        .iter()
        .find(|seed| seed.id == lord.as_str())
        .map(|seed| seed.army.iter().copied().collect())
        .unwrap_or_default()
}

/// The settlement a lord holds as his seat, if he is a seeded lord.
pub fn lord_seat(lord: &LordId) -> Option<LocationId> {
    LORD_SEEDS
        .iter()
        .find(|seed| seed.id == lord.as_str())
        .map(|seed| LocationId::from(seed.seat))
}

// ---------------------------------------------------------------------------
// Companions
// ---------------------------------------------------------------------------

struct CompanionSeed {
    id: &'static str,
    name: &'static str,
    backstory: &'static str,
    skills: &'static [(SkillId, u32)],
    cost: u32,
    location: &'static str,
}

const COMPANION_SEEDS: &[CompanionSeed] = &[
    CompanionSeed {
        id: "elric",
        name: "Elric the Leech",
        backstory: "A defrocked monastery physician who stitches wounds for coin.",
        skills: &[(SkillId::Surgery, 4), (SkillId::WoundTreatment, 3)],
        cost: 300,
        location: "westmere",
    },
    CompanionSeed {
        id: "mara",
        name: "Mara of the Roads",
        backstory: "A caravan mistress who knows every toll keeper by name.",
        skills: &[(SkillId::Trade, 5), (SkillId::Persuasion, 2)],
        cost: 400,
        location: "skellborg",
    },
    CompanionSeed {
        id: "dain",
        name: "Dain Master-at-Arms",
        backstory: "Drilled three generations of Vostyan levies before the boyars stopped paying.",
        skills: &[(SkillId::Tactics, 3), (SkillId::Trainer, 2)],
        cost: 500,
        location: "volkharad",
    },
    CompanionSeed {
        id: "kestrel",
        name: "Kestrel",
        backstory: "A quiet scout with a talent for finding other people's baggage trains.",
        skills: &[(SkillId::Looting, 4), (SkillId::Tactics, 1)],
        cost: 250,
        location: "tulkan",
    },
    CompanionSeed {
        id: "ysolde",
        name: "Ysolde of Miren",
        backstory: "A weaver's daughter who talked her way out of two sieges and a marriage.",
        skills: &[(SkillId::WoundTreatment, 5), (SkillId::Persuasion, 3)],
        cost: 600,
        location: "miren",
    },
];

/// Build the starting companions keyed by id.
pub fn starting_companions() -> BTreeMap<CompanionId, Companion> {
    COMPANION_SEEDS
        .iter()
        .map(|seed| {
            let id = CompanionId::from(seed.id);
            let companion = Companion {
                id: id.clone(),
                name: seed.name.to_owned(),
                backstory: seed.backstory.to_owned(),
                skills: seed.skills.iter().copied().collect(),
                cost: seed.cost,
                location_id: LocationId::from(seed.location),
                equipment: BTreeMap::new(),
                hp: 100,
                is_wounded: false,
                recruited: false,
            };
            (id, companion)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Diplomacy
// ---------------------------------------------------------------------------

/// Wars in progress on day one: Velhart and Norden are already fighting.
pub fn initial_wars() -> BTreeMap<FactionId, BTreeSet<FactionId>> {
    let mut wars: BTreeMap<FactionId, BTreeSet<FactionId>> = BTreeMap::new();
    for faction in FactionId::GREAT_FACTIONS {
        wars.insert(faction, BTreeSet::new());
    }
    if let Some(set) = wars.get_mut(&FactionId::Velhart) {
        set.insert(FactionId::Norden);
    }
    if let Some(set) = wars.get_mut(&FactionId::Norden) {
        set.insert(FactionId::Velhart);
    }
    wars
}

/// Standing between the great factions on day one, symmetric.
pub fn initial_relations() -> BTreeMap<FactionId, BTreeMap<FactionId, f64>> {
    let mut relations: BTreeMap<FactionId, BTreeMap<FactionId, f64>> = BTreeMap::new();
    for a in FactionId::GREAT_FACTIONS {
        let mut row = BTreeMap::new();
        for b in FactionId::GREAT_FACTIONS {
            if a != b {
                row.insert(b, 0.0);
            }
        }
        relations.insert(a, row);
    }
    let seeds = [
        (FactionId::Velhart, FactionId::Norden, -20.0),
        (FactionId::Vostya, FactionId::Kherai, -15.0),
    ];
    for (a, b, value) in seeds {
        if let Some(row) = relations.get_mut(&a) {
            row.insert(b, value);
        }
        if let Some(row) = relations.get_mut(&b) {
            row.insert(a, value);
        }
    }
    relations
}
