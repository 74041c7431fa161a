//! Stateless games: rock-paper-scissors, dice, coin

use std::fmt;

/// Rock-paper-scissors hand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hand {
    /// taş
    Rock,
    /// kağıt
    Paper,
    /// makas
    Scissors,
}

/// Outcome from the player's side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duel {
    /// Same hand
    Draw,
    /// Player wins
    PlayerWins,
    /// Bot wins
    BotWins,
}

impl fmt::Display for Duel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Draw => "🤝 BERABERE!",
            Self::PlayerWins => "🎉 SEN KAZANDIN!",
            Self::BotWins => "😢 BEN KAZANDIM!",
        })
    }
}

const HANDS: [Hand; 3] = [Hand::Rock, Hand::Paper, Hand::Scissors];

/// Reply when the text names no hand
pub const RPS_USAGE: &str = "Geçerli bir seçim yap: taş, kağıt veya makas";

impl Hand {
    /// Turkish name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rock => "taş",
            Self::Paper => "kağıt",
            Self::Scissors => "makas",
        }
    }

    /// Display emoji
    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Rock => "🪨",
            Self::Paper => "📄",
            Self::Scissors => "✂️",
        }
    }

    /// The hand this one beats
    pub const fn beats(self) -> Self {
        match self {
            Self::Rock => Self::Scissors,
            Self::Paper => Self::Rock,
            Self::Scissors => Self::Paper,
        }
    }

    /// Find a hand named in the words after the command.
    ///
    /// Only the text following the `tkm` keyword (or the full phrase) is
    /// considered, so the command itself does not count as a choice.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text
            .split_once("taş kağıt makas")
            .or_else(|| text.split_once("tkm"))
            .map_or(text, |(_, rest)| rest);

        rest.split_whitespace()
            .find_map(|word| HANDS.into_iter().find(|hand| hand.name() == word))
    }

    /// A random hand
    pub fn random() -> Self {
        HANDS[fastrand::usize(..HANDS.len())]
    }
}

/// Decide a round
pub fn play(player: Hand, bot: Hand) -> Duel {
    if player == bot {
        Duel::Draw
    } else if player.beats() == bot {
        Duel::PlayerWins
    } else {
        Duel::BotWins
    }
}

/// Play a round against a random hand
pub fn rock_paper_scissors(text: &str) -> String {
    let Some(player) = Hand::parse(text) else {
        return RPS_USAGE.to_string();
    };
    let bot = Hand::random();
    format!("{} vs {}\n\n{}", player.emoji(), bot.emoji(), play(player, bot))
}

/// Roll a six-sided die
pub fn roll_die() -> String {
    format!("🎲 Zar atıldı: {}", fastrand::u8(1..=6))
}

/// Flip a coin
pub fn flip_coin() -> String {
    let side = if fastrand::bool() { "Yazı" } else { "Tura" };
    format!("🪙 {side}!")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_table() {
        for hand in HANDS {
            assert_eq!(play(hand, hand), Duel::Draw);
            assert_eq!(play(hand, hand.beats()), Duel::PlayerWins);
            assert_eq!(play(hand.beats(), hand), Duel::BotWins);
        }
    }

    #[test]
    fn test_parse_choice() {
        assert_eq!(Hand::parse("tkm taş"), Some(Hand::Rock));
        assert_eq!(Hand::parse("tkm  makas"), Some(Hand::Scissors));
        assert_eq!(Hand::parse("taş kağıt makas kağıt"), Some(Hand::Paper));
        assert_eq!(Hand::parse("taş kağıt makas"), None);
        assert_eq!(Hand::parse("tkm"), None);
        assert_eq!(Hand::parse("tkm bomba"), None);
    }

    #[test]
    fn test_rps_reply() {
        assert_eq!(rock_paper_scissors("tkm"), RPS_USAGE);
        let reply = rock_paper_scissors("tkm kağıt");
        assert!(reply.starts_with("📄 vs "));
    }

    #[test]
    fn test_die_and_coin() {
        for _ in 0..50 {
            let roll = roll_die();
            let face: u8 = roll.trim_start_matches("🎲 Zar atıldı: ").parse().unwrap();
            assert!((1..=6).contains(&face));

            let coin = flip_coin();
            assert!(coin == "🪙 Yazı!" || coin == "🪙 Tura!");
        }
    }
}
