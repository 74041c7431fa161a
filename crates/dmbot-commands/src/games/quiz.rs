//! Single-question quiz

use dmbot_common::Timestamp;
use serde::{Deserialize, Serialize};

/// Question pool: prompt, options, zero-based correct index
const QUESTIONS: &[(&str, [&str; 4], usize)] = &[
    (
        "Türkiye'nin başkenti neresidir?",
        ["İstanbul", "Ankara", "İzmir", "Bursa"],
        1,
    ),
    (
        "Güneş sistemindeki en büyük gezegen hangisidir?",
        ["Dünya", "Mars", "Jüpiter", "Satürn"],
        2,
    ),
    (
        "İnsan vücudunda kaç kemik bulunur?",
        ["106", "187", "206", "305"],
        2,
    ),
];

/// One quiz question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    /// Question text
    pub prompt: String,
    /// Options in display order
    pub options: Vec<String>,
    /// Zero-based index of the correct option
    pub answer: usize,
}

impl QuizQuestion {
    /// Number of questions in the pool
    pub const fn pool_size() -> usize {
        QUESTIONS.len()
    }

    /// Question `index` from the pool, wrapping around
    pub fn from_pool(index: usize) -> Self {
        let (prompt, options, answer) = QUESTIONS[index % QUESTIONS.len()];
        Self {
            prompt: prompt.to_string(),
            options: options.iter().map(ToString::to_string).collect(),
            answer,
        }
    }

    /// Text of the correct option
    pub fn correct_option(&self) -> &str {
        self.options.get(self.answer).map_or("", String::as_str)
    }
}

/// Verdict on a quiz answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizVerdict {
    /// Right option picked
    Correct,
    /// Anything else, malformed input included
    Wrong {
        /// Text of the correct option
        correct: String,
    },
}

impl QuizVerdict {
    /// Reply text
    pub fn message(&self) -> String {
        match self {
            Self::Correct => "✅ Doğru cevap! 🏆".to_string(),
            Self::Wrong { correct } => format!("❌ Yanlış cevap. Doğrusu: {correct}"),
        }
    }
}

/// An open quiz question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizGame {
    /// The question asked
    pub question: QuizQuestion,
    /// When it was asked
    pub started_at: Timestamp,
}

impl QuizGame {
    /// A random question from the pool
    pub fn new(now: Timestamp) -> Self {
        Self::with_question(fastrand::usize(..QUESTIONS.len()), now)
    }

    /// A specific question from the pool
    pub fn with_question(index: usize, now: Timestamp) -> Self {
        Self {
            question: QuizQuestion::from_pool(index),
            started_at: now,
        }
    }

    /// Question text with a 1-indexed option list
    pub fn prompt(&self) -> String {
        let options = self
            .question
            .options
            .iter()
            .enumerate()
            .map(|(i, option)| format!("{}. {option}", i + 1))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "❓ Bilgi Yarışması!\n\n{}\n\n{options}\n\nCevap numarasını yaz!",
            self.question.prompt
        )
    }

    /// Judge a 1-indexed answer. Unparseable or out-of-range input is wrong.
    pub fn judge(&self, raw: &str) -> QuizVerdict {
        let picked = raw
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1));

        if picked == Some(self.question.answer) {
            QuizVerdict::Correct
        } else {
            QuizVerdict::Wrong {
                correct: self.question.correct_option().to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmbot_common::test_utils::mock_timestamp;

    fn capital_question() -> QuizGame {
        QuizGame::with_question(0, mock_timestamp(2024, 1, 1, 0, 0, 0))
    }

    #[test]
    fn test_pool_answers_in_range() {
        for i in 0..QuizQuestion::pool_size() {
            let q = QuizQuestion::from_pool(i);
            assert!(q.answer < q.options.len());
        }
    }

    #[test]
    fn test_prompt_lists_options_one_indexed() {
        let prompt = capital_question().prompt();
        assert!(prompt.starts_with("❓ Bilgi Yarışması!"));
        assert!(prompt.contains("1. İstanbul\n2. Ankara\n3. İzmir\n4. Bursa"));
        assert!(prompt.ends_with("Cevap numarasını yaz!"));
    }

    #[test]
    fn test_judge() {
        let game = capital_question();
        assert_eq!(game.judge("2"), QuizVerdict::Correct);
        assert_eq!(
            game.judge("1"),
            QuizVerdict::Wrong {
                correct: "Ankara".into()
            }
        );
    }

    #[test]
    fn test_malformed_answers_are_wrong() {
        let game = capital_question();
        for raw in ["", "ankara", "0", "9", "-1"] {
            assert!(matches!(game.judge(raw), QuizVerdict::Wrong { .. }), "{raw}");
        }
    }

    #[test]
    fn test_messages() {
        assert_eq!(QuizVerdict::Correct.message(), "✅ Doğru cevap! 🏆");
        assert_eq!(
            QuizVerdict::Wrong {
                correct: "206".into()
            }
            .message(),
            "❌ Yanlış cevap. Doğrusu: 206"
        );
    }
}
