//! Player actions: validated state transitions.
//!
//! Every action either applies completely or returns an [`ActionError`]
//! with a player-facing message and changes nothing. Validation happens
//! up front; once gold or goods move, the action cannot fail.

use rand::Rng;
use tracing::info;

use marchlands_types::{
    CompanionId, EquipmentSlot, FactionId, GoodId, ItemId, LocationId, LocationOwner,
    LocationStatus, LogEvent, LogKind, Player, SkillId, StockId, UnitId,
};
use marchlands_world::{WorldState, templates};

use crate::config::ActionConfig;
use crate::skill::{companion_skill_sum, effective_skill};

/// A rejected action, with a message fit to show the player.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ActionError {
    /// The purse does not cover the price.
    #[error("not enough gold: this costs {needed}, you have {have}")]
    NotEnoughGold {
        /// Price of the action.
        needed: u32,
        /// Gold on hand.
        have: u32,
    },

    /// The party is at its command limit.
    #[error("your renown and leadership can sustain no more than {cap} followers")]
    ArmyCapReached {
        /// Current cap.
        cap: u32,
    },

    /// The settlement cannot muster that many levies.
    #[error("only {available} recruits are willing to sign on here")]
    NotEnoughRecruits {
        /// Levies actually available.
        available: u32,
    },

    /// The market is shut after a sack.
    #[error("the market here is in ashes; nothing is bought or sold")]
    MarketLooted,

    /// Not enough goods or items carried.
    #[error("you carry {have} but would need {needed}")]
    NotEnoughStock {
        /// Amount the action needs.
        needed: u32,
        /// Amount carried.
        have: u32,
    },

    /// No upgrade path between those unit types.
    #[error("those troops cannot be trained into that rank")]
    InvalidUpgrade,

    /// One of the upgrade requirements is unmet; the message names it.
    #[error("{0}")]
    UpgradeGate(String),

    /// Equipment cannot be changed on a wounded character.
    #[error("{name} is too badly hurt to change equipment")]
    WoundedCharacter {
        /// Who is wounded.
        name: String,
    },

    /// The item is not in the player's baggage.
    #[error("you do not carry that item")]
    ItemNotCarried,

    /// The slot is already empty.
    #[error("nothing is equipped there")]
    NothingEquipped,

    /// No skill points to spend.
    #[error("you have no skill points to spend")]
    NoSkillPoints,

    /// The skill cannot be raised further.
    #[error("{skill} is already at its peak")]
    SkillMaxed {
        /// Display name of the skill.
        skill: &'static str,
    },

    /// The companion is not waiting in this settlement.
    #[error("that companion is not drinking in this tavern")]
    CompanionNotHere,

    /// The companion already rides with the player.
    #[error("that companion already rides with you")]
    AlreadyRecruited,

    /// The companion is not in the party.
    #[error("that companion does not ride with you")]
    NotInParty,

    /// The player has already sworn to a faction.
    #[error("you have already sworn an oath")]
    AlreadySworn,

    /// Not renowned enough.
    #[error("none will take your oath until your renown reaches {needed}")]
    RenownTooLow {
        /// Renown required.
        needed: u32,
    },

    /// The action needs faction membership.
    #[error("you are sworn to no faction")]
    NotFactionMember,

    /// A second fief is not on offer.
    #[error("you already hold a fief")]
    AlreadyHasFief,

    /// The faction has no settlement to grant.
    #[error("your liege has no settlement to spare")]
    NoFiefAvailable,

    /// The settlement is not the player's to administer.
    #[error("this settlement is not yours to administer")]
    NotYourFief,

    /// Not enough troops for the transfer.
    #[error("only {have} such troops are at hand, not {needed}")]
    NotEnoughTroops {
        /// Troops the transfer needs.
        needed: u32,
        /// Troops actually present.
        have: u32,
    },

    /// Raiding one's own fief.
    #[error("you will not put your own people to the torch")]
    RaidOwnFief,

    /// The settlement is already sacked.
    #[error("there is nothing left here to take")]
    AlreadyLooted,

    /// Nobody in the party needs treatment.
    #[error("nobody in the party needs a physician")]
    NobodyWounded,

    /// The destination does not border the current settlement.
    #[error("{destination} is more than a day's ride from here")]
    NotConnected {
        /// Display name of the destination.
        destination: String,
    },

    /// A quest is already underway.
    #[error("you already have a commission underway")]
    QuestAlreadyActive,

    /// No quest offer is pending.
    #[error("no commission is on the table")]
    NoQuestOffered,

    /// The provider named a settlement that does not exist.
    #[error("the commission names an unknown destination and cannot be taken")]
    UnknownDestination,
}

/// The party cap: base plus renown and leadership allowances. Companions
/// count against it like troops do.
pub fn army_cap(player: &Player, config: &ActionConfig) -> u32 {
    let renown_slots = player
        .renown
        .checked_div(config.renown_per_cap_slot)
        .unwrap_or(0);
    let leadership_slots = player
        .skill(SkillId::Leadership)
        .saturating_mul(config.cap_per_leadership);
    config
        .base_army_cap
        .saturating_add(renown_slots)
        .saturating_add(leadership_slots)
}

fn party_size(player: &Player) -> u32 {
    player
        .total_troops()
        .saturating_add(u32::try_from(player.companions.len()).unwrap_or(u32::MAX))
}

/// Sign levies on at the current settlement.
pub fn recruit_troops(
    world: &mut WorldState,
    player: &mut Player,
    here: &LocationId,
    count: u32,
    config: &ActionConfig,
) -> Result<Vec<LogEvent>, ActionError> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let (available, faction) = {
        let location = world.location(here).map_err(|_| ActionError::NotConnected {
            destination: here.as_str().to_owned(),
        })?;
        if location.is_looted() {
            return Err(ActionError::MarketLooted);
        }
        (location.recruits_available, location.faction_id)
    };
    if available < count {
        return Err(ActionError::NotEnoughRecruits { available });
    }
    let cap = army_cap(player, config);
    if party_size(player).saturating_add(count) > cap {
        return Err(ActionError::ArmyCapReached { cap });
    }

    // A good name with the local faction drives the signing price down;
    // a bad one drives it up.
    let relation = f64::from(player.relation(faction).clamp(-100, 100));
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let price = (f64::from(templates::BASE_RECRUIT_COST)
        * (1.0 - relation / config.recruit_discount_scale))
        .round() as u32;
    let cost = price.saturating_mul(count);
    if !player.try_spend_gold(cost) {
        return Err(ActionError::NotEnoughGold {
            needed: cost,
            have: player.gold,
        });
    }

    if let Ok(location) = world.location_mut(here) {
        location.recruits_available = location.recruits_available.saturating_sub(count);
    }
    player.add_troops(UnitId::Recruit, count);
    info!(count, cost, "recruited troops");
    Ok(vec![LogEvent::new(
        LogKind::Action,
        format!("You sign on {count} recruits for {cost} gold."),
    )])
}

/// Combined trade modifier: additive party trade plus persuasion.
fn trade_modifier(player: &Player, world: &WorldState, config: &ActionConfig) -> f64 {
    let own = if player.is_wounded {
        0
    } else {
        player.skill(SkillId::Trade)
    };
    let trade = own.saturating_add(companion_skill_sum(player, world, SkillId::Trade));
    let persuasion = effective_skill(player, world, SkillId::Persuasion);
    f64::from(trade) / 100.0 + f64::from(persuasion) * config.persuasion_rate
}

fn market_price(world: &WorldState, here: &LocationId, good: GoodId) -> Result<u32, ActionError> {
    let location = world.location(here).map_err(|_| ActionError::NotConnected {
        destination: here.as_str().to_owned(),
    })?;
    if location.is_looted() {
        return Err(ActionError::MarketLooted);
    }
    let row = marchlands_types::MarketGood {
        good,
        multiplier: location.multiplier(good),
    };
    Ok(row.price())
}

/// Buy goods at the local market.
pub fn buy_good(
    world: &WorldState,
    player: &mut Player,
    here: &LocationId,
    good: GoodId,
    count: u32,
    config: &ActionConfig,
) -> Result<Vec<LogEvent>, ActionError> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let base = market_price(world, here, good)?;
    let modifier = (1.0 - trade_modifier(player, world, config)).max(0.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let unit = ((f64::from(base) * modifier).round() as u32).max(1);
    let cost = unit.saturating_mul(count);
    if !player.try_spend_gold(cost) {
        return Err(ActionError::NotEnoughGold {
            needed: cost,
            have: player.gold,
        });
    }
    player.add_stock(StockId::Good(good), count);
    Ok(vec![LogEvent::new(
        LogKind::Action,
        format!("Bought {count} {} at {unit} gold each.", good.display_name()),
    )])
}

/// Sell goods at the local market.
pub fn sell_good(
    world: &WorldState,
    player: &mut Player,
    here: &LocationId,
    good: GoodId,
    count: u32,
    config: &ActionConfig,
) -> Result<Vec<LogEvent>, ActionError> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let base = market_price(world, here, good)?;
    let have = player.stock(StockId::Good(good));
    if have < count {
        return Err(ActionError::NotEnoughStock {
            needed: count,
            have,
        });
    }
    let modifier = 1.0 + trade_modifier(player, world, config);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let unit = (f64::from(base) * modifier).round() as u32;
    let earned = unit.saturating_mul(count);
    player.try_remove_stock(StockId::Good(good), count);
    player.add_gold(earned);
    Ok(vec![LogEvent::new(
        LogKind::Action,
        format!("Sold {count} {} at {unit} gold each.", good.display_name()),
    )])
}

/// Buy a piece of equipment at its catalog price.
pub fn buy_item(
    world: &WorldState,
    player: &mut Player,
    here: &LocationId,
    item: ItemId,
) -> Result<Vec<LogEvent>, ActionError> {
    let location = world.location(here).map_err(|_| ActionError::NotConnected {
        destination: here.as_str().to_owned(),
    })?;
    if location.is_looted() {
        return Err(ActionError::MarketLooted);
    }
    let def = templates::item_def(item);
    if !player.try_spend_gold(def.price) {
        return Err(ActionError::NotEnoughGold {
            needed: def.price,
            have: player.gold,
        });
    }
    player.add_stock(StockId::Item(item), 1);
    Ok(vec![LogEvent::new(
        LogKind::Action,
        format!("Bought a {} for {} gold.", def.name, def.price),
    )])
}

/// Build an enterprise in the current town.
pub fn build_enterprise(
    world: &WorldState,
    player: &mut Player,
    here: &LocationId,
    kind: marchlands_types::EnterpriseKind,
) -> Result<Vec<LogEvent>, ActionError> {
    let location = world.location(here).map_err(|_| ActionError::NotConnected {
        destination: here.as_str().to_owned(),
    })?;
    if location.is_looted() {
        return Err(ActionError::MarketLooted);
    }
    let def = templates::enterprise_def(kind);
    if player
        .enterprises
        .iter()
        .any(|e| e.location_id == *here)
    {
        return Err(ActionError::UpgradeGate(format!(
            "you already operate a workshop in {}",
            location.name
        )));
    }
    if !player.try_spend_gold(def.cost) {
        return Err(ActionError::NotEnoughGold {
            needed: def.cost,
            have: player.gold,
        });
    }
    player.enterprises.push(marchlands_types::Enterprise {
        kind,
        location_id: here.clone(),
    });
    info!(kind = kind.display_name(), location = here.as_str(), "enterprise built");
    Ok(vec![LogEvent::new(
        LogKind::Action,
        format!(
            "Your new {} opens its doors in {}.",
            kind.display_name(),
            location.name
        ),
    )])
}

/// Train troops up to the next rank.
///
/// Four gates, checked in order: the unit xp pool, gold (discounted by
/// the party trainer), the required items, and where the training can
/// happen. Any failure rejects the whole order with a message naming the
/// gate that blocked it.
pub fn upgrade_units(
    world: &mut WorldState,
    player: &mut Player,
    here: &LocationId,
    target: UnitId,
    count: u32,
    config: &ActionConfig,
) -> Result<Vec<LogEvent>, ActionError> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let def = templates::unit_def(target);
    let Some(from) = def.upgrade_from else {
        return Err(ActionError::InvalidUpgrade);
    };
    let fit = player.army.get(&from).copied().unwrap_or(0);
    if fit < count {
        return Err(ActionError::NotEnoughTroops {
            needed: count,
            have: fit,
        });
    }

    // Gate 1: the unit pool must have trained enough.
    let xp_needed = def.upgrade_xp.saturating_mul(count);
    let pool = player.unit_experience.get(&from).copied().unwrap_or(0);
    if pool < xp_needed {
        return Err(ActionError::UpgradeGate(format!(
            "your {} lack the drill for that: {pool} of {xp_needed} experience",
            from.display_name()
        )));
    }

    // Gate 2: gold, cheaper with a trainer in the party.
    let trainer = effective_skill(player, world, SkillId::Trainer);
    let discount =
        (1.0 - f64::from(trainer) * config.trainer_upgrade_discount).max(0.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let gold_cost =
        (f64::from(def.upgrade_gold.saturating_mul(count)) * discount).round() as u32;
    if player.gold < gold_cost {
        return Err(ActionError::UpgradeGate(format!(
            "the arms and wages come to {gold_cost} gold; you have {}",
            player.gold
        )));
    }

    // Gate 3: required items, consumed one set per trooper.
    for (item, per_unit) in def.upgrade_items {
        let needed = per_unit.saturating_mul(count);
        let have = player.stock(StockId::Item(*item));
        if have < needed {
            return Err(ActionError::UpgradeGate(format!(
                "you need {needed} {} and carry {have}",
                templates::item_def(*item).name
            )));
        }
    }

    // Gate 4: the right ground and the right drillmaster.
    if !def.upgrade_locations.is_empty()
        && !def.upgrade_locations.contains(&here.as_str())
    {
        return Err(ActionError::UpgradeGate(
            "this rank can only be trained at certain seats of war".to_owned(),
        ));
    }
    if let Some(slug) = def.upgrade_companion {
        let required = CompanionId::from(slug);
        if !player.companions.contains(&required) {
            let name = world
                .companion(&required)
                .map_or_else(|_| slug.to_owned(), |c| c.name.clone());
            return Err(ActionError::UpgradeGate(format!(
                "only {name} can drill troops to that rank"
            )));
        }
    }

    // All gates passed; apply.
    player.try_spend_gold(gold_cost);
    if let Some(pool) = player.unit_experience.get_mut(&from) {
        *pool = pool.saturating_sub(xp_needed);
    }
    for (item, per_unit) in def.upgrade_items {
        player.try_remove_stock(StockId::Item(*item), per_unit.saturating_mul(count));
    }
    match fit.checked_sub(count) {
        Some(0) | None => {
            player.army.remove(&from);
        }
        Some(rest) => {
            player.army.insert(from, rest);
        }
    }
    player.add_troops(target, count);
    info!(count, from = from.as_str(), to = target.as_str(), "units upgraded");
    Ok(vec![LogEvent::new(
        LogKind::Action,
        format!(
            "{count} {} complete their training as {}.",
            from.display_name(),
            target.display_name()
        ),
    )])
}

/// Equip an item from the baggage onto the player.
pub fn equip_player(player: &mut Player, item: ItemId) -> Result<Vec<LogEvent>, ActionError> {
    if player.is_wounded {
        return Err(ActionError::WoundedCharacter {
            name: player.name.clone(),
        });
    }
    if !player.try_remove_stock(StockId::Item(item), 1) {
        return Err(ActionError::ItemNotCarried);
    }
    let def = templates::item_def(item);
    if let Some(previous) = player.equipment.insert(def.slot, item) {
        player.add_stock(StockId::Item(previous), 1);
    }
    Ok(vec![LogEvent::new(
        LogKind::Action,
        format!("You equip the {}.", def.name),
    )])
}

/// Return the player's equipped item in a slot to the baggage.
pub fn unequip_player(
    player: &mut Player,
    slot: EquipmentSlot,
) -> Result<Vec<LogEvent>, ActionError> {
    if player.is_wounded {
        return Err(ActionError::WoundedCharacter {
            name: player.name.clone(),
        });
    }
    let item = player
        .equipment
        .remove(&slot)
        .ok_or(ActionError::NothingEquipped)?;
    player.add_stock(StockId::Item(item), 1);
    Ok(vec![LogEvent::new(
        LogKind::Action,
        format!("You stow the {}.", templates::item_def(item).name),
    )])
}

/// Equip an item from the player's baggage onto a companion.
pub fn equip_companion(
    world: &mut WorldState,
    player: &mut Player,
    companion_id: &CompanionId,
    item: ItemId,
) -> Result<Vec<LogEvent>, ActionError> {
    if !player.companions.contains(companion_id) {
        return Err(ActionError::NotInParty);
    }
    let companion = world
        .companion_mut(companion_id)
        .map_err(|_| ActionError::NotInParty)?;
    if companion.is_wounded {
        return Err(ActionError::WoundedCharacter {
            name: companion.name.clone(),
        });
    }
    if !player.try_remove_stock(StockId::Item(item), 1) {
        return Err(ActionError::ItemNotCarried);
    }
    let def = templates::item_def(item);
    let name = companion.name.clone();
    if let Some(previous) = companion.equipment.insert(def.slot, item) {
        player.add_stock(StockId::Item(previous), 1);
    }
    Ok(vec![LogEvent::new(
        LogKind::Action,
        format!("{name} takes up the {}.", def.name),
    )])
}

/// Spend a skill point on a skill, up to its cap.
pub fn spend_skill_point(
    player: &mut Player,
    skill: SkillId,
) -> Result<Vec<LogEvent>, ActionError> {
    if player.skill_points == 0 {
        return Err(ActionError::NoSkillPoints);
    }
    let current = player.skill(skill);
    if current >= skill.max_level() {
        return Err(ActionError::SkillMaxed {
            skill: skill.display_name(),
        });
    }
    player.skill_points = player.skill_points.saturating_sub(1);
    let next = current.saturating_add(1);
    player.skills.insert(skill, next);
    Ok(vec![LogEvent::new(
        LogKind::Action,
        format!("{} rises to level {next}.", skill.display_name()),
    )])
}

/// Hire a companion waiting in the local tavern.
pub fn hire_companion(
    world: &mut WorldState,
    player: &mut Player,
    here: &LocationId,
    companion_id: &CompanionId,
) -> Result<Vec<LogEvent>, ActionError> {
    let (cost, name) = {
        let companion = world
            .companion(companion_id)
            .map_err(|_| ActionError::CompanionNotHere)?;
        if companion.recruited {
            return Err(ActionError::AlreadyRecruited);
        }
        if companion.location_id != *here {
            return Err(ActionError::CompanionNotHere);
        }
        (companion.cost, companion.name.clone())
    };
    if !player.try_spend_gold(cost) {
        return Err(ActionError::NotEnoughGold {
            needed: cost,
            have: player.gold,
        });
    }
    if let Ok(companion) = world.companion_mut(companion_id) {
        companion.recruited = true;
    }
    player.companions.push(companion_id.clone());
    info!(companion = companion_id.as_str(), cost, "companion hired");
    Ok(vec![LogEvent::new(
        LogKind::Action,
        format!("{name} joins your company for {cost} gold."),
    )])
}

/// Swear an oath to a great faction.
pub fn join_faction(
    player: &mut Player,
    faction: FactionId,
    config: &ActionConfig,
) -> Result<Vec<LogEvent>, ActionError> {
    if player.faction_id.is_some() {
        return Err(ActionError::AlreadySworn);
    }
    if player.renown < config.join_faction_min_renown {
        return Err(ActionError::RenownTooLow {
            needed: config.join_faction_min_renown,
        });
    }
    player.faction_id = Some(faction);
    player.shift_relation(faction, config.join_faction_relation_bonus);
    Ok(vec![LogEvent::new(
        LogKind::Action,
        format!(
            "You swear your banner to {}. Your standing with them rises.",
            faction.display_name()
        ),
    )])
}

/// Petition the sworn faction for a fief.
///
/// The liege parts with the settlement worth the least to the levy
/// rolls: the faction town with the fewest recruits available.
pub fn request_fief(
    world: &mut WorldState,
    player: &mut Player,
) -> Result<Vec<LogEvent>, ActionError> {
    let faction = player.faction_id.ok_or(ActionError::NotFactionMember)?;
    if !player.fiefs.is_empty() {
        return Err(ActionError::AlreadyHasFief);
    }
    let granted = world
        .faction_locations(faction)
        .into_iter()
        .filter(|id| {
            world
                .location(id)
                .is_ok_and(|l| !l.owner.is_player())
        })
        .min_by_key(|id| {
            world
                .location(id)
                .map_or(u32::MAX, |l| l.recruits_available)
        })
        .ok_or(ActionError::NoFiefAvailable)?;

    let name = {
        let location = world
            .location_mut(&granted)
            .map_err(|_| ActionError::NoFiefAvailable)?;
        location.owner = LocationOwner::Player;
        location.name.clone()
    };
    player.fiefs.push(granted.clone());
    info!(fief = granted.as_str(), "fief granted");
    Ok(vec![LogEvent::new(
        LogKind::Action,
        format!("Your liege grants you {name} as a fief."),
    )])
}

/// Collect the taxes accrued at one of the player's fiefs.
pub fn collect_taxes(
    world: &mut WorldState,
    player: &mut Player,
    here: &LocationId,
) -> Result<Vec<LogEvent>, ActionError> {
    if !player.fiefs.contains(here) {
        return Err(ActionError::NotYourFief);
    }
    let location = world
        .location_mut(here)
        .map_err(|_| ActionError::NotYourFief)?;
    let taxes = location.accumulated_taxes;
    location.accumulated_taxes = 0;
    let name = location.name.clone();
    player.add_gold(taxes);
    Ok(vec![LogEvent::new(
        LogKind::Action,
        format!("You collect {taxes} gold in taxes from {name}."),
    )])
}

/// Move troops from the field army into a fief's garrison.
pub fn garrison_deposit(
    world: &mut WorldState,
    player: &mut Player,
    here: &LocationId,
    unit: UnitId,
    count: u32,
) -> Result<Vec<LogEvent>, ActionError> {
    if !player.fiefs.contains(here) {
        return Err(ActionError::NotYourFief);
    }
    let have = player.army.get(&unit).copied().unwrap_or(0);
    if have < count {
        return Err(ActionError::NotEnoughTroops {
            needed: count,
            have,
        });
    }
    let location = world
        .location_mut(here)
        .map_err(|_| ActionError::NotYourFief)?;
    match have.checked_sub(count) {
        Some(0) | None => {
            player.army.remove(&unit);
        }
        Some(rest) => {
            player.army.insert(unit, rest);
        }
    }
    let line = location.garrison.entry(unit).or_insert(0);
    *line = line.saturating_add(count);
    Ok(vec![LogEvent::new(
        LogKind::Action,
        format!("{count} {} take up garrison duty.", unit.display_name()),
    )])
}

/// Move troops from a fief's garrison back into the field army.
pub fn garrison_withdraw(
    world: &mut WorldState,
    player: &mut Player,
    here: &LocationId,
    unit: UnitId,
    count: u32,
) -> Result<Vec<LogEvent>, ActionError> {
    if !player.fiefs.contains(here) {
        return Err(ActionError::NotYourFief);
    }
    let location = world
        .location_mut(here)
        .map_err(|_| ActionError::NotYourFief)?;
    let have = location.garrison.get(&unit).copied().unwrap_or(0);
    if have < count {
        return Err(ActionError::NotEnoughTroops {
            needed: count,
            have,
        });
    }
    match have.checked_sub(count) {
        Some(0) | None => {
            location.garrison.remove(&unit);
        }
        Some(rest) => {
            location.garrison.insert(unit, rest);
        }
    }
    player.add_troops(unit, count);
    Ok(vec![LogEvent::new(
        LogKind::Action,
        format!("{count} {} rejoin the field army.", unit.display_name()),
    )])
}

/// Put the current settlement to the torch.
pub fn raid_location<R: Rng + ?Sized>(
    world: &mut WorldState,
    player: &mut Player,
    here: &LocationId,
    config: &ActionConfig,
    rng: &mut R,
) -> Result<Vec<LogEvent>, ActionError> {
    if player.fiefs.contains(here) {
        return Err(ActionError::RaidOwnFief);
    }
    let day = world.day;
    let (name, faction) = {
        let location = world.location(here).map_err(|_| ActionError::NotConnected {
            destination: here.as_str().to_owned(),
        })?;
        if location.is_looted() {
            return Err(ActionError::AlreadyLooted);
        }
        if location.owner.is_player() {
            return Err(ActionError::RaidOwnFief);
        }
        (location.name.clone(), location.faction_id)
    };

    let loot = rng.random_range(config.raid_gold_min..config.raid_gold_max);
    if let Ok(location) = world.location_mut(here) {
        location.status = LocationStatus::Looted;
        location.looted_until_day = day.saturating_add(config.raid_loot_duration_days);
        location.recruits_available = 0;
    }
    player.add_gold(loot);
    player.renown = player.renown.saturating_sub(config.raid_renown_penalty);
    player.shift_relation(faction, config.raid_relation_penalty);
    info!(location = here.as_str(), loot, "settlement raided");
    Ok(vec![LogEvent::new(
        LogKind::Battle,
        format!(
            "You put {name} to the torch and carry off {loot} gold. Word of it will travel."
        ),
    )])
}

/// Pay a physician to treat every wounded member of the party.
pub fn heal_party(
    world: &mut WorldState,
    player: &mut Player,
    config: &ActionConfig,
) -> Result<Vec<LogEvent>, ActionError> {
    let any_wounded = player.is_wounded
        || player
            .companions
            .iter()
            .filter_map(|id| world.companions.get(id))
            .any(|c| c.is_wounded);
    if !any_wounded {
        return Err(ActionError::NobodyWounded);
    }
    if !player.try_spend_gold(config.heal_party_cost) {
        return Err(ActionError::NotEnoughGold {
            needed: config.heal_party_cost,
            have: player.gold,
        });
    }
    if player.is_wounded {
        player.heal(config.heal_party_heal);
    }
    for id in &player.companions {
        if let Some(companion) = world.companions.get_mut(id) {
            if companion.is_wounded {
                companion.heal(config.heal_party_heal);
            }
        }
    }
    Ok(vec![LogEvent::new(
        LogKind::Action,
        format!(
            "A physician tends the wounded for {} gold.",
            config.heal_party_cost
        ),
    )])
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::float_cmp)]

    use super::*;
    use crate::config::ActionConfig;
    use crate::testutil::{recruit_companion, test_player};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn westmere() -> LocationId {
        LocationId::from("westmere")
    }

    #[test]
    fn recruiting_respects_the_cap_and_the_stock() {
        let mut world = WorldState::new();
        let mut player = test_player();
        let config = ActionConfig::default();

        // Renown 10 gives no extra slots: cap is 20.
        let err = recruit_troops(&mut world, &mut player, &westmere(), 21, &config).unwrap_err();
        assert!(matches!(err, ActionError::NotEnoughRecruits { .. } | ActionError::ArmyCapReached { .. }));

        recruit_troops(&mut world, &mut player, &westmere(), 5, &config).unwrap();
        assert_eq!(player.army.get(&UnitId::Recruit), Some(&5));
        assert_eq!(player.gold, 1000 - 50);
    }

    #[test]
    fn reputation_discounts_the_signing_price() {
        let mut world = WorldState::new();
        let mut player = test_player();
        player.shift_relation(FactionId::Velhart, 100);
        recruit_troops(&mut world, &mut player, &westmere(), 4, &ActionConfig::default()).unwrap();
        // 10 * (1 - 100/200) = 5 gold each.
        assert_eq!(player.gold, 1000 - 20);
    }

    #[test]
    fn a_bad_name_raises_the_signing_price() {
        let mut world = WorldState::new();
        let mut player = test_player();
        player.shift_relation(FactionId::Velhart, -60);
        recruit_troops(&mut world, &mut player, &westmere(), 4, &ActionConfig::default()).unwrap();
        // 10 * (1 - (-60)/200) = 13 gold each.
        assert_eq!(player.gold, 1000 - 52);
    }

    #[test]
    fn trade_skill_moves_both_sides_of_the_market() {
        let mut world = WorldState::new();
        let mut player = test_player();
        let config = ActionConfig::default();
        // Mara brings Trade 5 and Persuasion 2: modifier 0.05 + 0.08 = 0.13.
        recruit_companion(&mut world, &mut player, "mara");
        player.skills.insert(SkillId::Persuasion, 2);

        // Westmere iron sits at 1.0: base 100.
        buy_good(&world, &mut player, &westmere(), GoodId::Iron, 1, &config).unwrap();
        assert_eq!(player.gold, 1000 - 87);

        sell_good(&world, &mut player, &westmere(), GoodId::Iron, 1, &config).unwrap();
        assert_eq!(player.gold, 1000 - 87 + 113);
        assert_eq!(player.stock(StockId::Good(GoodId::Iron)), 0);
    }

    #[test]
    fn a_sacked_market_refuses_all_trade() {
        let mut world = WorldState::new();
        let mut player = test_player();
        {
            let town = world.location_mut(&westmere()).unwrap();
            town.status = LocationStatus::Looted;
        }
        let err = buy_good(
            &world,
            &mut player,
            &westmere(),
            GoodId::Grain,
            1,
            &ActionConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, ActionError::MarketLooted);
    }

    #[test]
    fn upgrades_reject_the_whole_order_naming_the_gate() {
        let mut world = WorldState::new();
        let mut player = test_player();
        let config = ActionConfig::default();
        player.army.insert(UnitId::Recruit, 10);

        // No drill yet: the xp gate trips first.
        let err =
            upgrade_units(&mut world, &mut player, &westmere(), UnitId::Footman, 5, &config)
                .unwrap_err();
        assert!(matches!(err, ActionError::UpgradeGate(ref m) if m.contains("drill")));

        // With the pool filled, the order goes through: 5 * 50 gold.
        player.unit_experience.insert(UnitId::Recruit, 100);
        upgrade_units(&mut world, &mut player, &westmere(), UnitId::Footman, 5, &config).unwrap();
        assert_eq!(player.army.get(&UnitId::Recruit), Some(&5));
        assert_eq!(player.army.get(&UnitId::Footman), Some(&5));
        assert_eq!(player.unit_experience.get(&UnitId::Recruit), Some(&0));
        assert_eq!(player.gold, 1000 - 250);
    }

    #[test]
    fn knights_need_dain_and_a_seat_of_war() {
        let mut world = WorldState::new();
        let mut player = test_player();
        let config = ActionConfig::default();
        player.add_gold(5000);
        player.army.insert(UnitId::Veteran, 2);
        player.unit_experience.insert(UnitId::Veteran, 1000);
        player.add_stock(StockId::Item(ItemId::Warhorse), 2);

        let err =
            upgrade_units(&mut world, &mut player, &westmere(), UnitId::Knight, 2, &config)
                .unwrap_err();
        assert!(matches!(err, ActionError::UpgradeGate(ref m) if m.contains("Dain")));

        recruit_companion(&mut world, &mut player, "dain");
        upgrade_units(&mut world, &mut player, &westmere(), UnitId::Knight, 2, &config).unwrap();
        assert_eq!(player.army.get(&UnitId::Knight), Some(&2));
        assert_eq!(player.stock(StockId::Item(ItemId::Warhorse)), 0);
    }

    #[test]
    fn equipment_swaps_return_to_the_baggage() {
        let mut player = test_player();
        player.add_stock(StockId::Item(ItemId::RustySword), 1);
        player.add_stock(StockId::Item(ItemId::IronSword), 1);

        equip_player(&mut player, ItemId::RustySword).unwrap();
        equip_player(&mut player, ItemId::IronSword).unwrap();
        assert_eq!(
            player.equipment.get(&EquipmentSlot::Weapon),
            Some(&ItemId::IronSword)
        );
        assert_eq!(player.stock(StockId::Item(ItemId::RustySword)), 1);

        player.wound_to(30);
        let err = unequip_player(&mut player, EquipmentSlot::Weapon).unwrap_err();
        assert!(matches!(err, ActionError::WoundedCharacter { .. }));
    }

    #[test]
    fn skill_points_respect_the_caps() {
        let mut player = test_player();
        player.skills.insert(SkillId::Trade, 5);
        let err = spend_skill_point(&mut player, SkillId::Trade).unwrap_err();
        assert_eq!(err, ActionError::SkillMaxed { skill: "Trade" });

        spend_skill_point(&mut player, SkillId::Leadership).unwrap();
        assert_eq!(player.skill(SkillId::Leadership), 1);
        assert_eq!(player.skill_points, 0);
        let err = spend_skill_point(&mut player, SkillId::Leadership).unwrap_err();
        assert_eq!(err, ActionError::NoSkillPoints);
    }

    #[test]
    fn companions_hire_only_in_their_own_tavern() {
        let mut world = WorldState::new();
        let mut player = test_player();
        // Mara waits in Skellborg, not Westmere.
        let err = hire_companion(&mut world, &mut player, &westmere(), &CompanionId::from("mara"))
            .unwrap_err();
        assert_eq!(err, ActionError::CompanionNotHere);

        hire_companion(
            &mut world,
            &mut player,
            &LocationId::from("skellborg"),
            &CompanionId::from("mara"),
        )
        .unwrap();
        assert_eq!(player.gold, 600);
        assert!(world.companion(&CompanionId::from("mara")).unwrap().recruited);
    }

    #[test]
    fn oaths_need_renown_and_grant_standing() {
        let mut player = test_player();
        let config = ActionConfig::default();
        let err = join_faction(&mut player, FactionId::Velhart, &config).unwrap_err();
        assert_eq!(err, ActionError::RenownTooLow { needed: 50 });

        player.renown = 60;
        join_faction(&mut player, FactionId::Velhart, &config).unwrap();
        assert_eq!(player.faction_id, Some(FactionId::Velhart));
        assert_eq!(player.relation(FactionId::Velhart), 10);

        let err = join_faction(&mut player, FactionId::Norden, &config).unwrap_err();
        assert_eq!(err, ActionError::AlreadySworn);
    }

    #[test]
    fn the_liege_grants_the_leanest_town() {
        let mut world = WorldState::new();
        let mut player = test_player();
        player.faction_id = Some(FactionId::Velhart);
        {
            let town = world.location_mut(&LocationId::from("caldrith")).unwrap();
            town.recruits_available = 1;
        }
        request_fief(&mut world, &mut player).unwrap();
        assert_eq!(player.fiefs, vec![LocationId::from("caldrith")]);
        assert!(world
            .location(&LocationId::from("caldrith"))
            .unwrap()
            .owner
            .is_player());

        let err = request_fief(&mut world, &mut player).unwrap_err();
        assert_eq!(err, ActionError::AlreadyHasFief);
    }

    #[test]
    fn garrison_transfers_validate_counts_and_ownership() {
        let mut world = WorldState::new();
        let mut player = test_player();
        player.army.insert(UnitId::Footman, 10);

        let err = garrison_deposit(&mut world, &mut player, &westmere(), UnitId::Footman, 5)
            .unwrap_err();
        assert_eq!(err, ActionError::NotYourFief);

        player.fiefs.push(westmere());
        garrison_deposit(&mut world, &mut player, &westmere(), UnitId::Footman, 5).unwrap();
        assert_eq!(player.army.get(&UnitId::Footman), Some(&5));
        // Westmere starts with 20 footmen garrisoned.
        assert_eq!(
            world.location(&westmere()).unwrap().garrison.get(&UnitId::Footman),
            Some(&25)
        );

        let err =
            garrison_withdraw(&mut world, &mut player, &westmere(), UnitId::Knight, 1).unwrap_err();
        assert_eq!(err, ActionError::NotEnoughTroops { needed: 1, have: 0 });
    }

    #[test]
    fn raiding_pays_in_gold_and_costs_a_name() {
        let mut world = WorldState::new();
        let mut player = test_player();
        let config = ActionConfig::default();
        let mut rng = StdRng::seed_from_u64(7);

        let target = LocationId::from("skellborg");
        raid_location(&mut world, &mut player, &target, &config, &mut rng).unwrap();

        let town = world.location(&target).unwrap();
        assert!(town.is_looted());
        assert_eq!(town.looted_until_day, world.day + 7);
        assert_eq!(town.recruits_available, 0);
        assert!(player.gold >= 1200 && player.gold < 1700);
        assert_eq!(player.renown, 0);
        assert_eq!(player.relation(FactionId::Norden), -30);

        let err = raid_location(&mut world, &mut player, &target, &config, &mut rng).unwrap_err();
        assert_eq!(err, ActionError::AlreadyLooted);
    }

    #[test]
    fn the_physician_treats_the_whole_party_for_a_flat_fee() {
        let mut world = WorldState::new();
        let mut player = test_player();
        let config = ActionConfig::default();

        let err = heal_party(&mut world, &mut player, &config).unwrap_err();
        assert_eq!(err, ActionError::NobodyWounded);

        recruit_companion(&mut world, &mut player, "elric");
        player.wound_to(30);
        world
            .companion_mut(&CompanionId::from("elric"))
            .unwrap()
            .wound_to(60);
        heal_party(&mut world, &mut player, &config).unwrap();
        assert_eq!(player.hp, 80);
        assert_eq!(
            world.companion(&CompanionId::from("elric")).unwrap().hp,
            100
        );
        assert!(player.gold < 1000);
    }
}
