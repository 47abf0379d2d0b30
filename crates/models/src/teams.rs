/// Full franchise name to the three-letter code used in `MATCHUP` strings.
pub const TEAM_ABBREVIATIONS: [(&str, &str); 30] = [
    ("Atlanta Hawks", "ATL"),
    ("Boston Celtics", "BOS"),
    ("Brooklyn Nets", "BKN"),
    ("Charlotte Hornets", "CHA"),
    ("Chicago Bulls", "CHI"),
    ("Cleveland Cavaliers", "CLE"),
    ("Dallas Mavericks", "DAL"),
    ("Denver Nuggets", "DEN"),
    ("Detroit Pistons", "DET"),
    ("Golden State Warriors", "GSW"),
    ("Houston Rockets", "HOU"),
    ("Indiana Pacers", "IND"),
    ("LA Clippers", "LAC"),
    ("Los Angeles Lakers", "LAL"),
    ("Memphis Grizzlies", "MEM"),
    ("Miami Heat", "MIA"),
    ("Milwaukee Bucks", "MIL"),
    ("Minnesota Timberwolves", "MIN"),
    ("New Orleans Pelicans", "NOP"),
    ("New York Knicks", "NYK"),
    ("Oklahoma City Thunder", "OKC"),
    ("Orlando Magic", "ORL"),
    ("Philadelphia 76ers", "PHI"),
    ("Phoenix Suns", "PHX"),
    ("Portland Trail Blazers", "POR"),
    ("Sacramento Kings", "SAC"),
    ("San Antonio Spurs", "SAS"),
    ("Toronto Raptors", "TOR"),
    ("Utah Jazz", "UTA"),
    ("Washington Wizards", "WAS"),
];

pub fn team_abbreviation(full_name: &str) -> Option<&'static str> {
    let full_name = full_name.trim();
    TEAM_ABBREVIATIONS
        .iter()
        .find(|(name, _)| *name == full_name)
        .map(|(_, abbr)| *abbr)
}

pub fn team_name(abbreviation: &str) -> Option<&'static str> {
    TEAM_ABBREVIATIONS
        .iter()
        .find(|(_, abbr)| *abbr == abbreviation)
        .map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_lookup_both_ways() {
        assert_eq!(team_abbreviation("Los Angeles Lakers"), Some("LAL"));
        assert_eq!(team_abbreviation(" LA Clippers "), Some("LAC"));
        assert_eq!(team_abbreviation("Seattle SuperSonics"), None);
        assert_eq!(team_name("GSW"), Some("Golden State Warriors"));
    }

    #[test]
    fn test_codes_are_unique() {
        let codes: HashSet<_> = TEAM_ABBREVIATIONS.iter().map(|(_, a)| a).collect();
        assert_eq!(codes.len(), TEAM_ABBREVIATIONS.len());
    }
}
