//! Enumeration types for the Marchlands simulation.
//!
//! The value sets here are closed by world content: goods, units, items,
//! skills, factions, and enterprise kinds are fixed catalogs, so each is a
//! unit-variant enum rather than a free-form string. Slugs (`as_str` /
//! `from_slug`) are the wire form used in save documents and provider
//! payloads.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Factions
// ---------------------------------------------------------------------------

/// A realm of the Marchlands.
///
/// The four great factions wage war, hold fiefs, and field lords. `Neutral`
/// marks free towns and is excluded from diplomacy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactionId {
    /// The western knightly kingdom.
    Velhart,
    /// The northern sea-raider jarldoms.
    Norden,
    /// The eastern woodland principality.
    Vostya,
    /// The steppe khanate of horse archers.
    Kherai,
    /// Unaligned free towns and wanderers.
    Neutral,
}

impl FactionId {
    /// The four factions that participate in diplomacy.
    pub const GREAT_FACTIONS: [Self; 4] = [Self::Velhart, Self::Norden, Self::Vostya, Self::Kherai];

    /// Human-readable realm name.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Velhart => "Kingdom of Velhart",
            Self::Norden => "Jarldoms of Norden",
            Self::Vostya => "Principality of Vostya",
            Self::Kherai => "Kherai Khanate",
            Self::Neutral => "Free Towns",
        }
    }
}

// ---------------------------------------------------------------------------
// Goods
// ---------------------------------------------------------------------------

/// A trade good carried in markets, caravans, and delivery quests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoodId {
    /// Staple grain, the cheapest bulk good.
    Grain,
    /// Common ale, demanded wherever armies camp.
    Ale,
    /// Fine wine, a luxury that sells poorly in wartime.
    Wine,
    /// Preserved-food salt, strategic in wartime.
    Salt,
    /// Smithed tools, strategic in wartime.
    Tools,
    /// Woven velvet, the dearest luxury cloth.
    Velvet,
    /// Bar iron for smiths and armorers.
    Iron,
    /// Northern furs.
    Furs,
}

impl GoodId {
    /// Every good, in catalog order.
    pub const ALL: [Self; 8] = [
        Self::Grain,
        Self::Ale,
        Self::Wine,
        Self::Salt,
        Self::Tools,
        Self::Velvet,
        Self::Iron,
        Self::Furs,
    ];

    /// Wire slug for save documents and provider payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Grain => "grain",
            Self::Ale => "ale",
            Self::Wine => "wine",
            Self::Salt => "salt",
            Self::Tools => "tools",
            Self::Velvet => "velvet",
            Self::Iron => "iron",
            Self::Furs => "furs",
        }
    }

    /// Parse a wire slug back into a good.
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.as_str() == slug)
    }

    /// Human-readable market-row name. Market rows sort by this.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Grain => "Grain",
            Self::Ale => "Ale",
            Self::Wine => "Wine",
            Self::Salt => "Salt",
            Self::Tools => "Tools",
            Self::Velvet => "Velvet",
            Self::Iron => "Iron",
            Self::Furs => "Furs",
        }
    }

    /// Base price in gold at multiplier 1.0.
    pub const fn base_price(self) -> u32 {
        match self {
            Self::Grain => 30,
            Self::Ale => 60,
            Self::Wine => 120,
            Self::Salt => 80,
            Self::Tools => 150,
            Self::Velvet => 250,
            Self::Iron => 100,
            Self::Furs => 90,
        }
    }

    /// Goods whose demand rises while the local faction is at war.
    pub const fn is_strategic(self) -> bool {
        matches!(self, Self::Tools | Self::Salt)
    }

    /// Goods whose demand falls while the local faction is at war.
    pub const fn is_luxury(self) -> bool {
        matches!(self, Self::Velvet | Self::Wine)
    }

    /// Goods consumed by lords' retinues garrisoned in town.
    pub const fn is_provision(self) -> bool {
        matches!(self, Self::Ale | Self::Salt)
    }
}

// ---------------------------------------------------------------------------
// Skills
// ---------------------------------------------------------------------------

/// A character skill.
///
/// Party-pooled skills take the best level among the player and unwounded
/// companions; the rest are personal. `Trade` and `Looting` only appear on
/// companions and contribute additively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillId {
    /// Raises the army size cap (+5 troops per level).
    Leadership,
    /// Battlefield advantage in simulated battles.
    Tactics,
    /// Better quest rewards and trade prices (4% per level).
    Persuasion,
    /// Faster troop training (+2 xp per level) and cheaper upgrades.
    Trainer,
    /// Faster daily healing (+5 hp per level).
    WoundTreatment,
    /// Converts battle deaths into wounds.
    Surgery,
    /// Companion-only: better buy and sell prices.
    Trade,
    /// Companion-only: richer battle loot.
    Looting,
}

impl SkillId {
    /// Every skill, in catalog order.
    pub const ALL: [Self; 8] = [
        Self::Leadership,
        Self::Tactics,
        Self::Persuasion,
        Self::Trainer,
        Self::WoundTreatment,
        Self::Surgery,
        Self::Trade,
        Self::Looting,
    ];

    /// Human-readable skill name.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Leadership => "Leadership",
            Self::Tactics => "Tactics",
            Self::Persuasion => "Persuasion",
            Self::Trainer => "Trainer",
            Self::WoundTreatment => "Wound Treatment",
            Self::Surgery => "Surgery",
            Self::Trade => "Trade",
            Self::Looting => "Looting",
        }
    }

    /// Highest level a skill point can buy.
    pub const fn max_level(self) -> u32 {
        match self {
            Self::Leadership => 10,
            _ => 5,
        }
    }

    /// Whether the best level in the party applies instead of the
    /// player's own.
    pub const fn is_party_pooled(self) -> bool {
        matches!(
            self,
            Self::Tactics | Self::Trainer | Self::Surgery | Self::WoundTreatment | Self::Persuasion
        )
    }
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// A troop type in the upgrade chain recruit -> footman -> veteran -> knight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitId {
    /// Fresh levy straight from the village.
    Recruit,
    /// Drilled infantry.
    Footman,
    /// Battle-hardened veteran.
    Veteran,
    /// Mounted heavy cavalry.
    Knight,
}

impl UnitId {
    /// Every unit type, weakest first.
    pub const ALL: [Self; 4] = [Self::Recruit, Self::Footman, Self::Veteran, Self::Knight];

    /// Wire slug for save documents and provider payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recruit => "recruit",
            Self::Footman => "footman",
            Self::Veteran => "veteran",
            Self::Knight => "knight",
        }
    }

    /// Parse a wire slug back into a unit type.
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.as_str() == slug)
    }

    /// Human-readable troop name.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Recruit => "Recruit",
            Self::Footman => "Footman",
            Self::Veteran => "Veteran",
            Self::Knight => "Knight",
        }
    }
}

// ---------------------------------------------------------------------------
// Items and equipment
// ---------------------------------------------------------------------------

/// A piece of equipment or quest-relevant gear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemId {
    /// Threadbare starting clothes.
    TatteredRags,
    /// A pitted blade barely worth its scabbard.
    RustySword,
    /// A serviceable straight sword.
    IronSword,
    /// A simple open-faced helmet.
    KettleHelm,
    /// Riveted mail armor.
    MailHauberk,
    /// Sturdy traveling boots.
    LeatherBoots,
    /// A trained warhorse, required to field knights.
    Warhorse,
}

impl ItemId {
    /// Every item, in catalog order.
    pub const ALL: [Self; 7] = [
        Self::TatteredRags,
        Self::RustySword,
        Self::IronSword,
        Self::KettleHelm,
        Self::MailHauberk,
        Self::LeatherBoots,
        Self::Warhorse,
    ];

    /// Wire slug for save documents and provider payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TatteredRags => "tattered_rags",
            Self::RustySword => "rusty_sword",
            Self::IronSword => "iron_sword",
            Self::KettleHelm => "kettle_helm",
            Self::MailHauberk => "mail_hauberk",
            Self::LeatherBoots => "leather_boots",
            Self::Warhorse => "warhorse",
        }
    }

    /// Parse a wire slug back into an item.
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.as_str() == slug)
    }
}

/// A slot a character can equip one item into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentSlot {
    /// Main-hand weapon.
    Weapon,
    /// Helmets and caps.
    Head,
    /// Body armor and clothing.
    Body,
    /// Footwear.
    Feet,
    /// Mount.
    Horse,
}

// ---------------------------------------------------------------------------
// Stock (inventory keys)
// ---------------------------------------------------------------------------

/// An inventory line: either a trade good or an item.
///
/// Serializes as the underlying slug so inventories stay plain JSON objects
/// keyed by string, matching the save-document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StockId {
    /// A stack of trade goods.
    Good(GoodId),
    /// One or more copies of an item.
    Item(ItemId),
}

impl StockId {
    /// Wire slug (the inner good or item slug).
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Good(g) => g.as_str(),
            Self::Item(i) => i.as_str(),
        }
    }

    /// Parse a wire slug, trying goods first, then items.
    pub fn from_slug(slug: &str) -> Option<Self> {
        GoodId::from_slug(slug)
            .map(Self::Good)
            .or_else(|| ItemId::from_slug(slug).map(Self::Item))
    }
}

impl From<GoodId> for StockId {
    fn from(good: GoodId) -> Self {
        Self::Good(good)
    }
}

impl From<ItemId> for StockId {
    fn from(item: ItemId) -> Self {
        Self::Item(item)
    }
}

impl Serialize for StockId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StockId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SlugVisitor;

        impl Visitor<'_> for SlugVisitor {
            type Value = StockId;

            fn expecting(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str("a good or item slug")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<StockId, E> {
                StockId::from_slug(v)
                    .ok_or_else(|| E::custom(format!("unknown good or item slug: {v}")))
            }
        }

        deserializer.deserialize_str(SlugVisitor)
    }
}

// ---------------------------------------------------------------------------
// Enterprises
// ---------------------------------------------------------------------------

/// A productive enterprise the player can build in a town.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnterpriseKind {
    /// Grinds grain.
    Mill,
    /// Brews ale.
    Brewery,
    /// Presses wine.
    Winery,
    /// Forges tools.
    Smithy,
    /// Weaves velvet.
    Weavery,
}

impl EnterpriseKind {
    /// Every enterprise kind, in catalog order.
    pub const ALL: [Self; 5] = [
        Self::Mill,
        Self::Brewery,
        Self::Winery,
        Self::Smithy,
        Self::Weavery,
    ];

    /// Human-readable workshop name.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Mill => "Mill",
            Self::Brewery => "Brewery",
            Self::Winery => "Winery",
            Self::Smithy => "Smithy",
            Self::Weavery => "Weavery",
        }
    }
}

// ---------------------------------------------------------------------------
// Character creation
// ---------------------------------------------------------------------------

/// The background chosen at character creation.
///
/// Determines starting gold, renown, and troop ranges, and seeds the
/// generated backstory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterBackground {
    /// A drifter of the steppe margins.
    Nomad,
    /// A caravan trader with deep pockets.
    Merchant,
    /// A woodland hunter handy with a band of rough men.
    Poacher,
    /// A minor noble with a name worth something.
    Noble,
    /// A smith who starts with a blade of his own making.
    Blacksmith,
}

impl CharacterBackground {
    /// Every background, in catalog order.
    pub const ALL: [Self; 5] = [
        Self::Nomad,
        Self::Merchant,
        Self::Poacher,
        Self::Noble,
        Self::Blacksmith,
    ];

    /// Human-readable background name.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Nomad => "Nomad",
            Self::Merchant => "Merchant",
            Self::Poacher => "Poacher",
            Self::Noble => "Noble",
            Self::Blacksmith => "Blacksmith",
        }
    }
}

// ---------------------------------------------------------------------------
// Quests, battles, logs
// ---------------------------------------------------------------------------

/// The kind of work a quest asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestKind {
    /// Hunt down a named enemy party.
    Bounty,
    /// Carry goods to another city.
    Delivery,
}

/// Lifecycle state of a quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    /// Accepted and in progress.
    Active,
    /// Finished and paid out.
    Completed,
}

/// Whether a settlement is functioning or recently sacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationStatus {
    /// Trading and recruiting as usual.
    Normal,
    /// Sacked: market pinned high, no recruits, until recovery day.
    Looted,
}

/// How a simulated battle ended for the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleOutcome {
    /// The player's party won the field.
    Victory,
    /// The player's party was beaten.
    Defeat,
    /// Both sides withdrew.
    Draw,
}

/// Category tag on a game-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    /// World happenings: lords, diplomacy, road events.
    Event,
    /// Player actions: trade, recruitment, administration.
    Action,
    /// Movement between settlements.
    Travel,
    /// Battle reports.
    Battle,
    /// Engine notices: income, healing, errors surfaced to the player.
    System,
    /// Tavern rumors.
    Rumor,
    /// Quest offers, progress, and completion.
    Quest,
    /// Market shortages and gluts.
    Market,
}
