//! Canned replies and small-talk detection

use dmbot_common::contains_word;

/// Jokes
pub const JOKES: &[&str] = &[
    "Geçen gün bi taksi çevirdim hala dönüyor.",
    "Bi adam gülmüş karısı da papatya",
    "İki yanlış bir Wi-Fi bağlatmaz!",
    "Programcı hayatı: 99 başarısızlık, 1 çalışıyor. Çalışanı sil, 99'a geri dön.",
    "C++: İnsanın kendi ayağına sıkabileceği en güçlü silah.",
];

/// Trivia
pub const FACTS: &[&str] = &[
    "Zürafaların ses telleri yoktur.",
    "Bir insanın parmak izi gibi dil izi de benzersizdir.",
    "Bal bozulmayan tek gıdadır.",
    "Dünyadaki karıncaların toplam ağırlığı, insanların toplam ağırlığına eşittir.",
    "Bir insan hayatı boyunca ortalama 35 ton yemek yer.",
    "Uzayda ağlamak imkansızdır çünkü gözyaşları düşmez.",
];

/// Motivational quotes
pub const QUOTES: &[&str] = &[
    "Hayat bir hıyardır, tuzu olan koşsun.",
    "Azimle sıçan, duvarı deler.",
    "Bugünün işini yarına bırakma, yarın başka işin çıkar.",
    "Kod yazmak: %10 ilham, %90 stackoverflow.",
];

/// A dish to suggest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Food {
    /// Name with emoji
    pub name: &'static str,
    /// Short description
    pub description: &'static str,
    /// Approximate calories
    pub calories: u32,
}

/// Dishes
pub const FOODS: &[Food] = &[
    Food { name: "🌯 Dürüm", description: "Acılı, soğanlı, bol salatalı", calories: 450 },
    Food { name: "🍕 Pizza", description: "Pepperoni, ekstra peynir", calories: 850 },
    Food { name: "🥙 Lahmacun", description: "Bol limonlu, kıymalı", calories: 300 },
    Food { name: "🍔 Burger", description: "Çift köfte, cheddar, bacon", calories: 750 },
    Food { name: "🍝 Makarna", description: "Bolonez soslu", calories: 500 },
    Food { name: "🍣 Sushi", description: "Somon, avokado", calories: 350 },
    Food { name: "🥗 Salata", description: "Akdeniz usulü", calories: 250 },
];

const GREETINGS: &[&str] = &[
    "Selam! 😊 Ben senin mesaj asistanınım.",
    "Merhaba! 🤖 Size nasıl yardımcı olabilirim?",
    "Hoş geldin! 🎉 Hadi sohbet edelim!",
    "Selamlar! ✨ Bugün nasılsın?",
];

const MOODS: &[&str] = &[
    "Harikayım! Seni görmek güzel 😊",
    "Kodlarım tıkırında, sen nasılsın? 🤖",
    "CPU'm %100, RAM'im dolu, hazırım! 💻",
    "Süperim! Yeni özellikler öğreniyorum 🚀",
    "Her zamankinden iyiyim! Sen? 🌟",
];

const THANKS: &[&str] = &[
    "Rica ederim! 😊",
    "Her zaman yanındayım! 💙",
    "Benim için bir zevk! 🤖",
    "Sorun değil, başka ne yardımım olabilir?",
    "Yardımcı olabildiğime sevindim! ✨",
];

const UNKNOWN: &[&str] = &[
    "Anlayamadım, yardım için 'yardım' yazabilirsin 🤔",
    "Bu komutu bilmiyorum, 'komutlar' yazarak neler yapabildiğimi görebilirsin 😊",
    "Üzgünüm, bunu henüz yapamıyorum. Komut listesi için 'yardım' yaz! 📝",
];

/// Uniformly random element; `None` for an empty slice
pub fn pick<T>(items: &[T]) -> Option<&T> {
    if items.is_empty() {
        None
    } else {
        items.get(fastrand::usize(..items.len()))
    }
}

fn pick_str(items: &[&'static str]) -> &'static str {
    pick(items).copied().unwrap_or_default()
}

/// Joke reply
pub fn joke() -> String {
    format!("😂 Fıkra:\n\n{}", pick_str(JOKES))
}

/// Fact reply
pub fn fact() -> String {
    format!("🧠 İlginç Bilgi:\n\n{}", pick_str(FACTS))
}

/// Quote reply
pub fn quote() -> String {
    format!("💪 {}", pick_str(QUOTES))
}

/// Food suggestion with a made-up price (30..=150 TL) and rating (3.5..=5.0)
pub fn food() -> String {
    let Some(food) = pick(FOODS) else {
        return String::new();
    };
    let price = fastrand::u32(30..=150);
    let rating = f64::from(fastrand::u8(7..=10)) / 2.0;
    format!(
        "🍽️ Yemek Önerisi:\n\n{}\n{}\n⭐ {rating:.1}/5 | 💰 ~{price} TL\n🔥 {} kalori",
        food.name, food.description, food.calories
    )
}

/// Reply for text no rule recognised
pub fn unknown_reply() -> String {
    pick_str(UNKNOWN).to_string()
}

/// Small-talk categories, checked in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmallTalk {
    /// selam, merhaba, ...
    Greeting,
    /// nasılsın, naber, ...
    Mood,
    /// teşekkür, sağ ol, ...
    Thanks,
}

impl SmallTalk {
    const ORDER: [Self; 3] = [Self::Greeting, Self::Mood, Self::Thanks];

    /// Trigger words
    pub const fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Greeting => &["selam", "merhaba", "sa", "hey", "hi", "hello"],
            Self::Mood => &["nasılsın", "naber", "iyi misin"],
            Self::Thanks => &["teşekkür", "sağ ol", "thanks"],
        }
    }

    /// First category with a keyword at word boundaries in `text`
    pub fn detect(text: &str) -> Option<Self> {
        Self::ORDER.into_iter().find(|category| {
            category
                .keywords()
                .iter()
                .any(|keyword| contains_word(text, keyword))
        })
    }

    /// A random reply for the category
    pub fn reply(self) -> String {
        match self {
            Self::Greeting => format!(
                "{}\n\nYardım için 'yardım' yazabilirsin.",
                pick_str(GREETINGS)
            ),
            Self::Mood => pick_str(MOODS).to_string(),
            Self::Thanks => pick_str(THANKS).to_string(),
        }
    }
}
