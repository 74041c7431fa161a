//! Static command table and keyword matching

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Help-menu grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCategory {
    /// Weather
    Weather,
    /// Jokes
    Fun,
    /// Facts
    Knowledge,
    /// Quotes
    Motivation,
    /// Food suggestions
    Food,
    /// Headlines
    News,
    /// Games
    Games,
    /// Clock
    Time,
    /// Everything else
    Utilities,
}

impl fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Weather => "🌤️ Hava Durumu",
            Self::Fun => "😂 Eğlence",
            Self::Knowledge => "🧠 Bilgi",
            Self::Motivation => "💪 Motivasyon",
            Self::Food => "🍽️ Yemek",
            Self::News => "📰 Haberler",
            Self::Games => "🎲 Oyunlar",
            Self::Time => "🕒 Zaman",
            Self::Utilities => "🛠️ Araçlar",
        })
    }
}

/// What a command does; the dispatcher matches on this exhaustively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Command list
    Help,
    /// Start number-guess
    NumberGuess,
    /// Start quiz
    Quiz,
    /// Rock-paper-scissors
    RockPaperScissors,
    /// Die roll
    Dice,
    /// Coin flip
    Coin,
    /// Weather lookup
    Weather,
    /// Random joke
    Joke,
    /// Random fact
    Fact,
    /// Random quote
    Quote,
    /// Food suggestion
    Food,
    /// One headline
    News,
    /// Games menu
    GamesMenu,
    /// Local time
    Time,
    /// Exchange rates
    Exchange,
    /// Caller's stats
    Stats,
    /// Bot info
    BotInfo,
}

/// One row of the command table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEntry {
    /// Primary keyword
    pub name: &'static str,
    /// Help grouping
    pub category: CommandCategory,
    /// Help text
    pub description: &'static str,
    /// Alternate keywords
    pub aliases: &'static [&'static str],
    /// Handler selector
    pub kind: CommandKind,
}

impl CommandEntry {
    /// Name followed by aliases
    pub fn keywords(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.name).chain(self.aliases.iter().copied())
    }

    /// Whether any keyword occurs as a substring of `text`
    pub fn matches(&self, text: &str) -> bool {
        self.keywords().any(|keyword| text.contains(keyword))
    }
}

const fn entry(
    name: &'static str,
    category: CommandCategory,
    description: &'static str,
    aliases: &'static [&'static str],
    kind: CommandKind,
) -> CommandEntry {
    CommandEntry {
        name,
        category,
        description,
        aliases,
        kind,
    }
}

/// The table in match order. Earlier rows win when several match, so
/// multi-word game commands come before the single words they contain.
/// The stateless games sit last: "zar" also hides inside "pazar" and "nazar".
pub static COMMANDS: &[CommandEntry] = &[
    entry("yardım", CommandCategory::Utilities, "Tüm komutları göster", &["komutlar", "help", "menu"], CommandKind::Help),
    entry("sayı tahmin", CommandCategory::Games, "Sayı tahmin oyunu", &["sayitahmin", "sayı oyunu", "tahmin oyunu"], CommandKind::NumberGuess),
    entry("bilgi yarışması", CommandCategory::Games, "Quiz oyunu", &["quiz", "yarışma"], CommandKind::Quiz),
    entry("hava", CommandCategory::Weather, "Hava durumu bilgisi", &["havadurumu", "weather"], CommandKind::Weather),
    entry("fıkra", CommandCategory::Fun, "Rastgele fıkra", &["şaka", "güldür", "joke"], CommandKind::Joke),
    entry("bilgi", CommandCategory::Knowledge, "İlginç bilgi", &["ilginç", "fact", "öğren"], CommandKind::Fact),
    entry("söz", CommandCategory::Motivation, "Motivasyon sözü", &["motivasyon", "moral", "quote"], CommandKind::Quote),
    entry("yemek", CommandCategory::Food, "Yemek önerisi", &["neyesem", "acıktım", "food"], CommandKind::Food),
    entry("haber", CommandCategory::News, "Güncel haberler", &["gündem", "news"], CommandKind::News),
    entry("oyun", CommandCategory::Games, "Oyun menüsü", &["games", "play"], CommandKind::GamesMenu),
    entry("saat", CommandCategory::Time, "Saat ve tarih", &["tarih", "time", "zaman"], CommandKind::Time),
    entry("döviz", CommandCategory::Utilities, "Döviz kurları", &["kur", "exchange"], CommandKind::Exchange),
    entry("istatistik", CommandCategory::Utilities, "Kişisel istatistikler", &["stats", "stat"], CommandKind::Stats),
    entry("bot", CommandCategory::Utilities, "Bot bilgisi", &["botbilgi", "info", "hakkında"], CommandKind::BotInfo),
    entry("tkm", CommandCategory::Games, "Taş kağıt makas", &["taş kağıt makas"], CommandKind::RockPaperScissors),
    entry("zar", CommandCategory::Games, "Zar atma", &["zar at", "dice"], CommandKind::Dice),
    entry("yazı tura", CommandCategory::Games, "Yazı tura", &["yazıtura", "coin"], CommandKind::Coin),
];

static ALIAS_INDEX: LazyLock<HashMap<&'static str, &'static CommandEntry>> = LazyLock::new(|| {
    let mut index = HashMap::new();
    for command in COMMANDS {
        for keyword in command.keywords() {
            index.entry(keyword).or_insert(command);
        }
    }
    index
});

/// Read-only view over [`COMMANDS`]
#[derive(Debug, Clone, Copy)]
pub struct CommandRegistry {
    commands: &'static [CommandEntry],
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    /// The built-in table
    pub const fn new() -> Self {
        Self { commands: COMMANDS }
    }

    /// All entries in match order
    pub const fn entries(&self) -> &'static [CommandEntry] {
        self.commands
    }

    /// First entry, in table order, with a keyword contained in `text`
    pub fn find(&self, text: &str) -> Option<&'static CommandEntry> {
        self.commands.iter().find(|command| command.matches(text))
    }

    /// Exact keyword lookup
    pub fn lookup(&self, keyword: &str) -> Option<&'static CommandEntry> {
        ALIAS_INDEX.get(keyword).copied()
    }

    /// Help text grouped by category, in first-appearance order
    pub fn help_text(&self) -> String {
        let mut groups: Vec<(CommandCategory, Vec<String>)> = Vec::new();
        for command in self.commands {
            let line = format!(
                "• `{}` ({}) - {}",
                command.name,
                command.aliases.iter().take(2).copied().collect::<Vec<_>>().join("/"),
                command.description
            );
            match groups.iter_mut().find(|(category, _)| *category == command.category) {
                Some((_, lines)) => lines.push(line),
                None => groups.push((command.category, vec![line])),
            }
        }

        let mut help = String::from("🤖 **ASİSTAN BOT KOMUTLARI** 🤖\n\n");
        for (category, lines) in groups {
            help.push_str(&format!("{category}:\n{}\n\n", lines.join("\n")));
        }
        help.push_str("💡 *Örnek: 'hava İstanbul' veya 'fıkra'*");
        help
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(text: &str) -> Option<CommandKind> {
        CommandRegistry::new().find(text).map(|c| c.kind)
    }

    #[test]
    fn test_earlier_entry_wins() {
        assert_eq!(kind_of("hava ve haber"), Some(CommandKind::Weather));
        assert_eq!(kind_of("haber ve hava"), Some(CommandKind::Weather));
        assert_eq!(kind_of("bilgi yarışması"), Some(CommandKind::Quiz));
        assert_eq!(kind_of("sayı tahmin"), Some(CommandKind::NumberGuess));
    }

    #[test]
    fn test_substring_containment() {
        assert_eq!(kind_of("bugün havadurumu nasıl"), Some(CommandKind::Weather));
        assert_eq!(kind_of("bana bir fıkra anlat"), Some(CommandKind::Joke));
        assert_eq!(kind_of("robot"), Some(CommandKind::BotInfo));
        assert_eq!(kind_of("xyz"), None);
    }

    #[test]
    fn test_dice_does_not_shadow_words_containing_zar() {
        assert_eq!(kind_of("pazartesi hava nasıl"), Some(CommandKind::Weather));
        assert_eq!(kind_of("pazar günü saat kaç"), Some(CommandKind::Time));
        assert_eq!(kind_of("nazar boncuğu bilgi"), Some(CommandKind::Fact));
        assert_eq!(kind_of("zar at"), Some(CommandKind::Dice));
        assert_eq!(kind_of("yazı tura"), Some(CommandKind::Coin));
    }

    #[test]
    fn test_weather_forecast_is_not_a_game() {
        assert_eq!(kind_of("hava tahmini"), Some(CommandKind::Weather));
    }

    #[test]
    fn test_lookup_exact_alias() {
        let registry = CommandRegistry::new();
        assert_eq!(registry.lookup("joke").map(|c| c.name), Some("fıkra"));
        assert_eq!(registry.lookup("kur").map(|c| c.kind), Some(CommandKind::Exchange));
        assert!(registry.lookup("fıkr").is_none());
    }

    #[test]
    fn test_keywords_unique() {
        let total: usize = COMMANDS.iter().map(|c| c.keywords().count()).sum();
        assert_eq!(ALIAS_INDEX.len(), total);
    }

    #[test]
    fn test_help_groups_categories() {
        let help = CommandRegistry::new().help_text();
        assert!(help.contains("🛠️ Araçlar:\n• `yardım` (komutlar/help) - Tüm komutları göster"));
        assert_eq!(help.matches("🎲 Oyunlar:").count(), 1);
        assert!(help.contains("• `döviz` (kur/exchange) - Döviz kurları"));
    }
}
