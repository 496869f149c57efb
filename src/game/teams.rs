use serde::Serialize;

/// 队伍名册中的一项。
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: &'static str,
    pub name: &'static str,
    pub trainer: &'static str,
    pub monster: &'static str,
    pub is_flying: bool,
}

impl Team {
    const fn new(
        id: &'static str,
        name: &'static str,
        trainer: &'static str,
        monster: &'static str,
        is_flying: bool,
    ) -> Self {
        Self {
            id,
            name,
            trainer,
            monster,
            is_flying,
        }
    }

    pub fn is_dark_champion(&self) -> bool {
        self.id == DARK_CHAMPION_ID
    }
}

/// 最后一支队伍是 Dark Champion，只作为最终 Boss 出场。
pub const DARK_CHAMPION_ID: &str = "team-remix";

pub const TEAMS: [Team; 8] = [
    Team::new("team-avax", "Team Avax", "@Avax", "Blazoid", false),
    Team::new("team-yieldguild", "Team YieldGuild", "@YieldGuild", "Cryowind", true),
    Team::new("team-wolves", "Team Wolves", "@Wolves", "Noctyra", false),
    Team::new("team-solana", "Team Solana", "@Solana", "Solatox", false),
    Team::new("team-opensea", "Team Opensea", "@Opensea", "Seabyt", false),
    Team::new("team-g3", "Team G3", "@G3", "Sparkid", false),
    Team::new("team-arbitrum", "Team Arbitrum", "@Arbitrum", "Arbitron", false),
    Team::new(DARK_CHAMPION_ID, "Team Remix", "@Remix", "Floramix", false),
];

pub fn team_by_id(id: &str) -> Option<&'static Team> {
    TEAMS.iter().find(|team| team.id == id)
}

pub fn dark_champion() -> &'static Team {
    &TEAMS[TEAMS.len() - 1]
}

/// 玩家可选的队伍（不含 Dark Champion）。
pub fn selectable_teams() -> impl Iterator<Item = &'static Team> {
    TEAMS.iter().filter(|team| !team.is_dark_champion())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_ids_are_unique() {
        for (index, team) in TEAMS.iter().enumerate() {
            assert!(
                TEAMS[index + 1..].iter().all(|other| other.id != team.id),
                "duplicate id {}",
                team.id
            );
        }
    }

    #[test]
    fn dark_champion_is_not_selectable() {
        assert_eq!(dark_champion().id, DARK_CHAMPION_ID);
        assert_eq!(selectable_teams().count(), TEAMS.len() - 1);
        assert!(selectable_teams().all(|team| !team.is_dark_champion()));
    }

    #[test]
    fn lookup_by_id() {
        let team = team_by_id("team-yieldguild").expect("roster entry");
        assert_eq!(team.monster, "Cryowind");
        assert!(team.is_flying);
        assert!(team_by_id("team-unknown").is_none());
    }
}
