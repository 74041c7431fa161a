//! Reply builders for the informational commands
//!
//! Everything here is pure formatting over provider results, stored records
//! and the clock; the dispatcher does the I/O.

use crate::providers::{ExchangeRates, NewsItem, WeatherReport};
use crate::store::UserRecord;
use chrono::Utc;
use dmbot_common::{
    add_city_suffix, format_time_delta, format_timestamp_tr, istanbul_time, title_case_tr,
    Timestamp, UserId,
};
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

/// Asked when the weather command names no city
pub const ASK_CITY: &str = "🌍 Hangi şehrin hava durumunu merak ediyorsun?";
/// Shown when no headline could be fetched
pub const NO_NEWS: &str = "📰 Şu anda haber bulunamadı. Daha sonra tekrar deneyin.";
/// Shown when the caller has no stored record
pub const NO_STATS: &str = "İstatistik bulunamadı.";

static CITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*?\b(?:havadurumu|hava|weather)\b\s*(?:durumu\b)?\s*(.*)$")
        .expect("valid city regex")
});

/// City named after the weather keyword, if any
pub fn extract_city(text: &str) -> Option<String> {
    let city = CITY_RE.captures(text)?.get(1)?.as_str().trim();
    (!city.is_empty()).then(|| city.to_string())
}

/// Emoji for an OpenWeatherMap icon code
pub fn weather_emoji(icon: &str) -> &'static str {
    match icon.get(..2).unwrap_or_default() {
        "01" => "☀️",
        "02" => "⛅",
        "03" | "04" => "☁️",
        "09" => "🌧️",
        "10" => "🌦️",
        "11" => "⛈️",
        "13" => "❄️",
        "50" => "🌫️",
        _ => "🌤️",
    }
}

/// Reply for a live weather report
pub fn weather_reply(city: &str, report: &WeatherReport) -> String {
    format!(
        "{} hava durumu:\n\n🌡️ Sıcaklık: {}°C\n🤔 Hissedilen: {}°C\n🌤️ Durum: {} {}\n💧 Nem: %{}\n💨 Rüzgar: {} m/s",
        add_city_suffix(city),
        report.temperature,
        report.feels_like,
        title_case_tr(&report.description),
        weather_emoji(&report.icon),
        report.humidity,
        report.wind_speed
    )
}

const CONDITIONS: &[(&str, &str)] = &[
    ("Güneşli", "☀️"),
    ("Parçalı Bulutlu", "⛅"),
    ("Yağmurlu", "🌧️"),
    ("Karlı", "❄️"),
    ("Rüzgarlı", "💨"),
    ("Sisli", "🌫️"),
];

/// Made-up conditions, labelled as simulated
pub fn simulated_weather_reply(city: &str) -> String {
    let (condition, emoji) = CONDITIONS[fastrand::usize(..CONDITIONS.len())];
    format!(
        "{} hava durumu (simüle):\n\n🌡️ Sıcaklık: {}°C\n🌤️ Durum: {condition} {emoji}\n💧 Nem: %{}\n💨 Rüzgar: {} km/s",
        add_city_suffix(city),
        fastrand::i32(-5..=35),
        fastrand::u32(30..=90),
        fastrand::u32(0..=15)
    )
}

/// One random headline out of the first five
pub fn news_reply(items: &[NewsItem]) -> String {
    let pool = &items[..items.len().min(5)];
    if pool.is_empty() {
        return NO_NEWS.to_string();
    }
    let item = &pool[fastrand::usize(..pool.len())];
    format!("📰 Güncel Haber:\n\n{}\n\n🔗 {}", item.title, item.link)
}

/// Random rates in the usual band, used when the service is unreachable
pub fn simulated_rates() -> ExchangeRates {
    let around = |low: f64, high: f64| {
        let raw = fastrand::f64().mul_add(high - low, low);
        (raw * 100.0).round() / 100.0
    };
    ExchangeRates {
        usd: around(28.0, 32.0),
        eur: around(30.0, 34.0),
        gbp: around(35.0, 38.0),
    }
}

/// Exchange-rate table; `simulated` adds the "(simüle)" label
pub fn exchange_reply(rates: &ExchangeRates, simulated: bool, now: Timestamp) -> String {
    let local = istanbul_time(now);
    let label = if simulated { " (simüle)" } else { "" };
    format!(
        "💱 Döviz Kurları{label}:\n\nUSD: {:.2} TL\nEUR: {:.2} TL\nGBP: {:.2} TL\n\n📅 {} {}",
        rates.usd, rates.eur, rates.gbp, local.date, local.time
    )
}

/// Istanbul wall clock
pub fn time_reply(now: Timestamp) -> String {
    let local = istanbul_time(now);
    format!(
        "🕒 Saat: {}\n📅 Tarih: {}\n📌 Gün: {}\n🌍 Zaman Dilimi: {}",
        local.time, local.date, local.weekday, local.zone
    )
}

/// The caller's stored counters
pub fn stats_reply(user_id: UserId, record: Option<&UserRecord>) -> String {
    let Some(user) = record else {
        return NO_STATS.to_string();
    };
    let name = if user.username.is_empty() {
        "Kullanıcı"
    } else {
        user.username.as_str()
    };
    format!(
        "📊 {name} İstatistikleri:\n\n📅 İlk Görülme: {}\n🕒 Son Görülme: {}\n💬 Toplam Mesaj: {}\n😂 Fıkra Dinleme: {}\n🧠 Bilgi Öğrenme: {}\n🏆 Oyun Kazanma: {}\n👤 Kullanıcı ID: {user_id}",
        format_timestamp_tr(user.first_seen),
        format_timestamp_tr(user.last_seen),
        user.message_count,
        user.fikra_count,
        user.bilgi_count,
        user.game_wins
    )
}

/// Process-wide counters shown by the bot-info command
#[derive(Debug)]
pub struct BotStats {
    started_at: Timestamp,
    total_messages: AtomicU64,
}

impl Default for BotStats {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl BotStats {
    /// Counters starting at `started_at`
    pub const fn new(started_at: Timestamp) -> Self {
        Self {
            started_at,
            total_messages: AtomicU64::new(0),
        }
    }

    /// Count one admitted message
    pub fn record_message(&self) {
        self.total_messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Messages admitted since start
    pub fn total_messages(&self) -> u64 {
        self.total_messages.load(Ordering::Relaxed)
    }

    /// Process start
    pub const fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Bot-info reply
    pub fn info_reply(&self, user_count: usize, now: Timestamp) -> String {
        format!(
            "🤖 DMBOT v{}\n\n🚀 Çalışma Süresi: {}\n💬 Toplam Mesaj: {}\n👥 Toplam Kullanıcı: {user_count}\n📅 Başlangıç: {}\n\n✨ Özellikler:\n• Akıllı komut sistemi\n• Gerçek hava durumu\n• Güncel haberler\n• Eğlenceli oyunlar\n• İstatistik takibi\n• Güvenlik sistemi",
            env!("CARGO_PKG_VERSION"),
            format_time_delta(now - self.started_at),
            self.total_messages(),
            format_timestamp_tr(self.started_at)
        )
    }
}
