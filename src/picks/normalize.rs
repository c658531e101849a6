//! Team-name canonicalization for cross-feed matching.
//!
//! The schedule sheet says "Duke", the scoreboard says "Duke Blue Devils".
//! Both reduce to `DUKE` once punctuation is dropped and generic words
//! (school type, "State", mascots) are stripped.
//!
//! Stripping is deliberately blunt: "Kansas State" and "Kansas" share a key.
//! That precision loss is accepted; see DESIGN.md.

/// Generic words and mascot names removed from every key. Multi-word entries
/// are removed only as a whole phrase.
pub const DEFAULT_AFFIXES: &[&str] = &[
    // School / institution words
    "STATE", "UNIVERSITY", "UNIV", "COLLEGE", "OF", "THE",
    // Mascots
    "BLUE DEVILS", "DEMON DEACONS", "TAR HEELS", "WOLFPACK", "CAVALIERS",
    "HOKIES", "SEMINOLES", "HURRICANES", "YELLOW JACKETS", "FIGHTING IRISH",
    "ORANGE", "CARDINALS", "PANTHERS", "EAGLES", "WILDCATS", "JAYHAWKS",
    "BEARS", "CYCLONES", "LONGHORNS", "SOONERS", "COWBOYS", "RED RAIDERS",
    "HORNED FROGS", "MOUNTAINEERS", "BOILERMAKERS", "HOOSIERS", "SPARTANS",
    "WOLVERINES", "BUCKEYES", "BADGERS", "HAWKEYES", "GOLDEN GOPHERS",
    "FIGHTING ILLINI", "NITTANY LIONS", "TERRAPINS", "SCARLET KNIGHTS",
    "CORNHUSKERS", "HUSKIES", "BULLDOGS", "TIGERS", "GATORS", "VOLUNTEERS",
    "CRIMSON TIDE", "GAMECOCKS", "RAZORBACKS", "REBELS", "AGGIES",
    "COMMODORES", "BLUEJAYS", "BRUINS", "TROJANS", "DUCKS", "BEAVERS",
    "SUN DEVILS", "UTES", "BUFFALOES", "GAELS", "FRIARS", "PIRATES",
    "MUSKETEERS", "GOLDEN EAGLES", "HOYAS", "RED STORM", "SHOCKERS",
    "BEARCATS", "COUGARS", "KNIGHTS", "OWLS", "RAMS", "BILLIKENS", "FLYERS",
    "SPIDERS", "LOBOS", "AZTECS", "RUNNIN REBELS", "BRONCOS", "FALCONS",
];

/// Maps a display name to a comparable key.
#[derive(Debug, Clone)]
pub struct Normalizer {
    /// Affix phrases as token lists, longest first
    affixes: Vec<Vec<String>>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Normalizer::new(DEFAULT_AFFIXES.iter().copied())
    }
}

impl Normalizer {
    pub fn new<'a>(affixes: impl IntoIterator<Item = &'a str>) -> Self {
        let mut normalizer = Normalizer {
            affixes: Vec::new(),
        };
        normalizer.extend(affixes);
        normalizer
    }

    /// Add more affixes on top of the current list.
    pub fn with_extra<S: AsRef<str>>(mut self, extra: &[S]) -> Self {
        self.extend(extra.iter().map(|s| s.as_ref()));
        self
    }

    fn extend<'a>(&mut self, affixes: impl IntoIterator<Item = &'a str>) {
        for affix in affixes {
            let tokens = tokenize(affix);
            if !tokens.is_empty() && !self.affixes.contains(&tokens) {
                self.affixes.push(tokens);
            }
        }
        self.affixes.sort_by(|a, b| b.len().cmp(&a.len()));
    }

    /// Uppercase, drop punctuation, strip affixes, trim.
    /// Blank input gives an empty key.
    pub fn normalize(&self, name: &str) -> String {
        let tokens = tokenize(name);
        let mut kept: Vec<&str> = Vec::with_capacity(tokens.len());
        let mut i = 0;
        'scan: while i < tokens.len() {
            for affix in &self.affixes {
                let end = i + affix.len();
                if end <= tokens.len() && tokens[i..end] == affix[..] {
                    i = end;
                    continue 'scan;
                }
            }
            kept.push(&tokens[i]);
            i += 1;
        }
        kept.join(" ")
    }
}

/// Uppercase word tokens. Hyphens and slashes split words; other
/// punctuation is removed in place ("St. Mary's" → ["ST", "MARYS"]).
fn tokenize(name: &str) -> Vec<String> {
    name.to_uppercase()
        .chars()
        .filter_map(|c| match c {
            '-' | '/' => Some(' '),
            c if c.is_alphanumeric() || c.is_whitespace() => Some(c),
            _ => None,
        })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_mascot_phrase() {
        let n = Normalizer::default();
        assert_eq!(n.normalize("Duke Blue Devils"), "DUKE");
        assert_eq!(n.normalize("Wake Forest Demon Deacons"), "WAKE FOREST");
    }

    #[test]
    fn strips_school_words_and_punctuation() {
        let n = Normalizer::default();
        assert_eq!(n.normalize("University of Kentucky"), "KENTUCKY");
        assert_eq!(n.normalize("St. Mary's Gaels"), "ST MARYS");
        assert_eq!(n.normalize("Miami (OH)"), "MIAMI OH");
        assert_eq!(n.normalize("UL-Monroe"), "UL MONROE");
    }

    #[test]
    fn blank_input_gives_empty_key() {
        let n = Normalizer::default();
        assert_eq!(n.normalize(""), "");
        assert_eq!(n.normalize("   "), "");
        assert_eq!(n.normalize("State"), "");
    }

    #[test]
    fn multi_word_affix_only_strips_whole_phrase() {
        let n = Normalizer::default();
        // "RED" alone is not an affix; "RED STORM" is.
        assert_eq!(n.normalize("Miami Red Hawks"), "MIAMI RED HAWKS");
        assert_eq!(n.normalize("St. John's Red Storm"), "ST JOHNS");
    }

    #[test]
    fn stripping_can_collapse_distinct_teams() {
        let n = Normalizer::default();
        assert_eq!(n.normalize("Kansas State"), n.normalize("Kansas"));
    }

    #[test]
    fn extra_affixes_extend_the_default_list() {
        let n = Normalizer::default().with_extra(&["hawks"]);
        assert_eq!(n.normalize("Miami Red Hawks"), "MIAMI RED");
    }

    #[test]
    fn deterministic_across_calls() {
        let n = Normalizer::default();
        assert_eq!(n.normalize("North Carolina Tar Heels"), n.normalize("North Carolina Tar Heels"));
    }
}
