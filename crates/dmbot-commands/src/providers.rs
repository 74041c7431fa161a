//! Weather, news and exchange-rate providers
//!
//! Providers never fail a turn: a fetch problem is logged and reported as
//! "unavailable" (`None` or an empty list) so the handler can fall back.

use async_trait::async_trait;
use dmbot_common::{DmBotError, Result};
use dmbot_config::ProvidersConfig;
use governor::{DefaultDirectRateLimiter, Quota};
use moka::future::Cache;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;
use tracing::{debug, info, instrument, warn};

/// Headlines kept per news source
pub const ITEMS_PER_SOURCE: usize = 5;

/// Current conditions for a city
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    /// City name as the service spells it
    pub city: String,
    /// Celsius
    pub temperature: f64,
    /// Celsius
    pub feels_like: f64,
    /// Percent
    pub humidity: u32,
    /// Localised description
    pub description: String,
    /// Metres per second
    pub wind_speed: f64,
    /// Service icon code, e.g. `10d`
    pub icon: String,
}

/// One headline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsItem {
    /// Headline
    pub title: String,
    /// Article URL
    pub link: String,
}

/// Lira price of one unit of each currency
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExchangeRates {
    /// US dollar
    pub usd: f64,
    /// Euro
    pub eur: f64,
    /// Pound sterling
    pub gbp: f64,
}

/// Source of external data for the weather, news and exchange commands
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Conditions for `city`, or `None` when unavailable
    async fn weather(&self, city: &str) -> Option<WeatherReport>;

    /// Recent headlines; empty when unavailable
    async fn news(&self) -> Vec<NewsItem>;

    /// Current rates, or `None` when unavailable
    async fn exchange_rates(&self) -> Option<ExchangeRates>;
}

/// Provider that never has data
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineProvider;

#[async_trait]
impl DataProvider for OfflineProvider {
    async fn weather(&self, _city: &str) -> Option<WeatherReport> {
        None
    }

    async fn news(&self) -> Vec<NewsItem> {
        Vec::new()
    }

    async fn exchange_rates(&self) -> Option<ExchangeRates> {
        None
    }
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    name: String,
    main: OwmMain,
    weather: Vec<OwmCondition>,
    wind: OwmWind,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: f64,
    humidity: u32,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: f64,
}

impl OwmResponse {
    fn into_report(self) -> Option<WeatherReport> {
        let condition = self.weather.into_iter().next()?;
        Some(WeatherReport {
            city: self.name,
            temperature: self.main.temp,
            feels_like: self.main.feels_like,
            humidity: self.main.humidity,
            description: condition.description,
            wind_speed: self.wind.speed,
            icon: condition.icon,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: RatesTable,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
struct RatesTable {
    usd: f64,
    eur: f64,
    gbp: f64,
}

impl RatesTable {
    /// The service quotes foreign units per lira; invert to lira per unit.
    fn invert(&self) -> Option<ExchangeRates> {
        let per_unit = |rate: f64| (rate > 0.0 && rate.is_finite()).then(|| 1.0 / rate);
        Some(ExchangeRates {
            usd: per_unit(self.usd)?,
            eur: per_unit(self.eur)?,
            gbp: per_unit(self.gbp)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemField {
    Title,
    Link,
}

/// Extract up to `limit` `<item>` headlines from an RSS document.
///
/// Entities, numeric character references and CDATA sections are decoded.
/// Malformed markup ends the scan; items read before it are kept.
pub fn parse_rss(body: &str, limit: usize) -> Vec<NewsItem> {
    let mut reader = Reader::from_str(body);

    let mut items = Vec::new();
    let mut current: Option<NewsItem> = None;
    let mut field: Option<ItemField> = None;

    while items.len() < limit {
        let event = match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(event) => event,
            Err(e) => {
                debug!("Stopping RSS scan at byte {}: {}", reader.buffer_position(), e);
                break;
            }
        };

        match event {
            Event::Start(tag) => match tag.local_name().as_ref() {
                b"item" => {
                    current = Some(NewsItem {
                        title: String::new(),
                        link: String::new(),
                    })
                }
                b"title" if current.is_some() => field = Some(ItemField::Title),
                b"link" if current.is_some() => field = Some(ItemField::Link),
                _ => {}
            },
            Event::Text(text) => {
                if let (Some(item), Some(field)) = (current.as_mut(), field) {
                    match text.unescape() {
                        Ok(decoded) => push_field(item, field, &decoded),
                        Err(e) => debug!("Skipping undecodable RSS text: {}", e),
                    }
                }
            }
            Event::CData(data) => {
                if let (Some(item), Some(field)) = (current.as_mut(), field) {
                    push_field(item, field, &String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(tag) => match tag.local_name().as_ref() {
                b"item" => {
                    if let Some(mut item) = current.take() {
                        item.title = item.title.trim().to_string();
                        item.link = item.link.trim().to_string();
                        if !item.title.is_empty() && !item.link.is_empty() {
                            items.push(item);
                        }
                    }
                    field = None;
                }
                b"title" | b"link" => field = None,
                _ => {}
            },
            _ => {}
        }
    }
    items
}

fn push_field(item: &mut NewsItem, field: ItemField, text: &str) {
    match field {
        ItemField::Title => item.title.push_str(text),
        ItemField::Link => item.link.push_str(text),
    }
}

fn is_retryable(err: &DmBotError) -> bool {
    !matches!(
        err,
        DmBotError::Network {
            status_code: Some(400..=499),
            ..
        }
    )
}

/// HTTP-backed provider with rate limiting, retries and caching
#[derive(Debug, Clone)]
pub struct HttpDataProvider {
    client: Client,
    config: ProvidersConfig,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    news_cache: Cache<&'static str, Arc<Vec<NewsItem>>>,
    rates_cache: Cache<&'static str, ExchangeRates>,
}

const CACHE_KEY: &str = "latest";

impl HttpDataProvider {
    /// Create a provider from the `providers` configuration section
    pub fn new(config: &ProvidersConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("dmbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DmBotError::network_with_source("Failed to create HTTP client", e))?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.rate_limit_per_sec)
                .ok_or_else(|| DmBotError::config("Provider rate limit must be greater than 0"))?,
        );
        let rate_limiter = Arc::new(DefaultDirectRateLimiter::direct(quota));

        let ttl = Duration::from_secs(config.cache_ttl_secs);
        Ok(Self {
            client,
            config: config.clone(),
            rate_limiter,
            news_cache: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
            rates_cache: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        })
    }

    #[instrument(skip(self, query))]
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Response> {
        let retry_strategy = ExponentialBackoff::from_millis(100)
            .max_delay(Duration::from_secs(5))
            .take(self.config.max_retries as usize);

        RetryIf::spawn(
            retry_strategy,
            || async {
                self.rate_limiter.until_ready().await;
                let response = match self.client.get(url).query(query).send().await {
                    Ok(response) => response,
                    Err(e) => return Err(DmBotError::from(e)),
                };
                let status = response.status();
                if status.is_success() {
                    Ok(response)
                } else {
                    debug!("Provider returned {}", status);
                    Err(DmBotError::network_with_status(
                        format!("Provider returned {status}"),
                        status.as_u16(),
                    ))
                }
            },
            is_retryable,
        )
        .await
    }

    async fn fetch_weather(&self, city: &str, api_key: &str) -> Result<Option<WeatherReport>> {
        let response = self
            .get(
                &self.config.weather_url,
                &[("q", city), ("appid", api_key), ("units", "metric"), ("lang", "tr")],
            )
            .await?;
        let body: OwmResponse = response.json().await?;
        Ok(body.into_report())
    }

    async fn fetch_source(&self, url: &str) -> Result<Vec<NewsItem>> {
        let body = self.get(url, &[]).await?.text().await?;
        Ok(parse_rss(&body, ITEMS_PER_SOURCE))
    }

    async fn fetch_rates(&self) -> Result<Option<ExchangeRates>> {
        let body: RatesResponse = self.get(&self.config.exchange_url, &[]).await?.json().await?;
        Ok(body.rates.invert())
    }
}

#[async_trait]
impl DataProvider for HttpDataProvider {
    async fn weather(&self, city: &str) -> Option<WeatherReport> {
        let api_key = self.config.weather_api_key.as_deref()?;
        match self.fetch_weather(city, api_key).await {
            Ok(report) => report,
            Err(e) => {
                warn!(city, "Weather lookup failed: {}", e);
                None
            }
        }
    }

    async fn news(&self) -> Vec<NewsItem> {
        if let Some(cached) = self.news_cache.get(CACHE_KEY).await {
            return cached.as_ref().clone();
        }

        let mut items = Vec::new();
        for source in &self.config.news_sources {
            match self.fetch_source(source).await {
                Ok(mut fetched) => items.append(&mut fetched),
                Err(e) => warn!(source = %source, "News fetch failed: {}", e),
            }
        }

        if !items.is_empty() {
            info!("Fetched {} headlines", items.len());
            self.news_cache
                .insert(CACHE_KEY, Arc::new(items.clone()))
                .await;
        }
        items
    }

    async fn exchange_rates(&self) -> Option<ExchangeRates> {
        if let Some(cached) = self.rates_cache.get(CACHE_KEY).await {
            return Some(cached);
        }

        match self.fetch_rates().await {
            Ok(Some(rates)) => {
                self.rates_cache.insert(CACHE_KEY, rates).await;
                Some(rates)
            }
            Ok(None) => {
                warn!("Exchange service returned unusable rates");
                None
            }
            Err(e) => {
                warn!("Exchange rate fetch failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves `body` with `status` to every connection; returns the base URL.
    async fn serve(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}")
    }

    fn config_for(base: &str) -> ProvidersConfig {
        ProvidersConfig {
            weather_api_key: Some("test-key".into()),
            weather_url: format!("{base}/weather"),
            exchange_url: format!("{base}/rates"),
            news_sources: vec![format!("{base}/rss")],
            max_retries: 0,
            ..ProvidersConfig::default()
        }
    }

    const RSS: &str = r#"<?xml version="1.0"?>
<rss><channel><title>Kanal</title>
<item><title><![CDATA[Birinci & haber]]></title><link>https://example.com/1</link></item>
<item><title>İkinci haber</title><link>https://example.com/2</link></item>
<item><title></title><link>https://example.com/empty</link></item>
</channel></rss>"#;

    #[test]
    fn test_parse_rss() {
        let items = parse_rss(RSS, 5);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Birinci & haber");
        assert_eq!(items[1].link, "https://example.com/2");
        assert_eq!(parse_rss(RSS, 1).len(), 1);
        assert!(parse_rss("not xml", 5).is_empty());
    }

    #[test]
    fn test_parse_rss_decodes_character_references() {
        let body = r#"<rss><channel>
<item><title>Meclis'te yeni d&#305;&#351; politika</title><link>https://example.com/a?x=1&amp;y=2</link></item>
<item><title>&#x15E;ampiyon &quot;Kartal&quot; &lt;canl&#x131;&gt;</title><link>https://example.com/b</link></item>
<item><title>Yar&#305;m <![CDATA[& eksik]]> kay&#305;t</title><link>https://example.com/c</link></item>
</channel></rss>"#;

        let items = parse_rss(body, 5);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].title, "Meclis'te yeni dış politika");
        assert_eq!(items[0].link, "https://example.com/a?x=1&y=2");
        assert_eq!(items[1].title, "Şampiyon \"Kartal\" <canlı>");
        assert_eq!(items[2].title, "Yarım & eksik kayıt");
    }

    #[test]
    fn test_parse_rss_keeps_items_before_broken_markup() {
        let body = "<rss><channel><item><title>Tamam</title><link>https://example.com/1</link></item>\
<item><title>Bozuk</link></item></channel></rss>";
        let items = parse_rss(body, 5);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Tamam");
    }

    #[test]
    fn test_owm_payload() {
        let json = r#"{"name":"Istanbul","main":{"temp":21.5,"feels_like":20.9,"humidity":60},
            "weather":[{"description":"açık","icon":"01d"}],"wind":{"speed":3.1}}"#;
        let report = serde_json::from_str::<OwmResponse>(json)
            .unwrap()
            .into_report()
            .unwrap();
        assert_eq!(report.city, "Istanbul");
        assert_eq!(report.humidity, 60);
        assert_eq!(report.icon, "01d");
    }

    #[test]
    fn test_rates_are_inverted() {
        let table = RatesTable {
            usd: 0.025,
            eur: 0.02,
            gbp: 0.0,
        };
        assert!(table.invert().is_none());

        let table = RatesTable {
            usd: 0.025,
            eur: 0.02,
            gbp: 0.016,
        };
        let rates = table.invert().unwrap();
        assert!((rates.usd - 40.0).abs() < 1e-9);
        assert!((rates.eur - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_retry_skips_client_errors() {
        assert!(!is_retryable(&DmBotError::network_with_status("nope", 404)));
        assert!(is_retryable(&DmBotError::network_with_status("later", 503)));
        assert!(is_retryable(&DmBotError::network("reset")));
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let config = ProvidersConfig {
            rate_limit_per_sec: 0,
            ..ProvidersConfig::default()
        };
        assert!(HttpDataProvider::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_offline_provider() {
        let provider = OfflineProvider;
        assert!(provider.weather("Ankara").await.is_none());
        assert!(provider.news().await.is_empty());
        assert!(provider.exchange_rates().await.is_none());
    }

    #[tokio::test]
    async fn test_weather_without_key_is_unavailable() {
        let config = ProvidersConfig {
            weather_api_key: None,
            ..config_for("http://127.0.0.1:9")
        };
        let provider = HttpDataProvider::new(&config).unwrap();
        assert!(provider.weather("Ankara").await.is_none());
    }

    #[tokio::test]
    async fn test_news_over_http() {
        let base = serve("200 OK", RSS).await;
        let provider = HttpDataProvider::new(&config_for(&base)).unwrap();

        let items = provider.news().await;
        assert_eq!(items.len(), 2);
        // Served from the cache the second time.
        assert_eq!(provider.news().await, items);
    }

    #[tokio::test]
    async fn test_exchange_over_http() {
        let base = serve("200 OK", r#"{"base":"TRY","rates":{"USD":0.025,"EUR":0.02,"GBP":0.016}}"#).await;
        let provider = HttpDataProvider::new(&config_for(&base)).unwrap();

        let rates = provider.exchange_rates().await.unwrap();
        assert!((rates.gbp - 62.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let base = serve("500 Internal Server Error", "boom").await;
        let provider = HttpDataProvider::new(&config_for(&base)).unwrap();

        assert!(provider.exchange_rates().await.is_none());
        assert!(provider.news().await.is_empty());
        assert!(provider.weather("Ankara").await.is_none());
    }
}
