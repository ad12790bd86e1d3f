use std::path::PathBuf;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;

use crate::config::Config;
use crate::domain::WordOfTheDay;
use crate::errors::{PlannerError, PlannerResult};
use crate::logging::Logger;
use crate::patch::{self, Document, FieldBinding};
use crate::sources::traits::DashboardSource;

const STREAM: &str = "wotd";

/// Word-of-the-day adapter. Discovers the current word from the
/// dictionary's RSS feed (the word sits inside the first CDATA block),
/// then looks the word up for pronunciation, part of speech, and
/// definitions.
pub struct DictionarySource {
    client: Client,
    rss_url: String,
    lookup_url: String,
    api_key: String,
    html_file: PathBuf,
    interval: Duration,
    logger: Logger,
    tag_re: Regex,
}

impl DictionarySource {
    pub fn new(config: &Config, logger: Logger) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            rss_url: config.mw_rss.clone(),
            lookup_url: config.mw_url.clone(),
            api_key: config.mw_key.clone(),
            html_file: PathBuf::from(&config.html_file),
            interval: config.wotd_interval(),
            logger,
            tag_re: Regex::new(r"<[^>]+>").expect("tag regex is valid"),
        }
    }

    fn fetch(&self) -> PlannerResult<WordOfTheDay> {
        let rss = self
            .client
            .get(&self.rss_url)
            .send()?
            .error_for_status()?
            .text()?;

        let word = patch::extract(&rss, "<![CDATA[", "]]>")
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .ok_or_else(|| {
                PlannerError::Payload("word-of-the-day feed has no CDATA-wrapped word".to_string())
            })?;
        self.logger
            .info(STREAM, &format!("word of the day: {}", word));

        let lookup = format!("{}{}?key={}", self.lookup_url, word, self.api_key);
        let xml = self
            .client
            .get(&lookup)
            .send()?
            .error_for_status()?
            .text()?;

        self.parse_entry(word, &xml)
    }

    /// Pull the consumed fields out of the dictionary XML. The payload is
    /// treated as text with known sentinels; nested markup inside a
    /// definition is stripped and stray colons erased.
    fn parse_entry(&self, word: &str, xml: &str) -> PlannerResult<WordOfTheDay> {
        let entry = patch::extract(xml, "<entry id=", "</entry>").ok_or_else(|| {
            PlannerError::Payload(format!("dictionary response has no entry for '{}'", word))
        })?;

        let pronounce = patch::extract(entry, "<pr>", "</pr>").unwrap_or_default();
        let part_of_speech = patch::extract(entry, "<fl>", "</fl>").unwrap_or_default();

        let definitions: Vec<String> = patch::extract_all(entry, "<dt>", "</dt>")
            .into_iter()
            .map(|raw| {
                self.tag_re
                    .replace_all(raw, "")
                    .replace(':', "")
                    .trim()
                    .to_string()
            })
            .filter(|def| !def.is_empty())
            .collect();

        Ok(WordOfTheDay {
            word: word.to_string(),
            pronounce: pronounce.to_string(),
            part_of_speech: part_of_speech.to_string(),
            definitions,
        })
    }

    fn bindings(wotd: &WordOfTheDay) -> Vec<FieldBinding> {
        let mut defs_block = String::new();
        for (i, def) in wotd.definitions.iter().enumerate() {
            defs_block.push_str(&format!(
                "&nbsp;&nbsp;&nbsp;Definition {}) &nbsp;{}<br>",
                i + 1,
                def
            ));
        }

        vec![
            FieldBinding::text(
                "word",
                "<span id=\"word\">",
                ":&nbsp;<!--w1--></span>",
                wotd.word.clone(),
            ),
            FieldBinding::text(
                "pronounce",
                "<span id=\"pronounce\">[&nbsp;",
                "&nbsp;]<!--w2--></span>",
                format!("&nbsp;{}", wotd.pronounce),
            ),
            FieldBinding::text(
                "pos",
                "<span id=\"pos\">",
                "<!--w3--></span>",
                format!("&nbsp;{}", wotd.part_of_speech),
            ),
            FieldBinding::text(
                "defs",
                "<span id=\"defs\">",
                "<!--w4--></span>",
                defs_block,
            ),
        ]
    }
}

impl DashboardSource for DictionarySource {
    fn name(&self) -> &'static str {
        "word-of-the-day"
    }

    fn log_stream(&self) -> &'static str {
        STREAM
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn refresh(&self) -> PlannerResult<()> {
        let wotd = self.fetch()?;

        let mut doc = Document::load(&self.html_file)?;
        for name in doc.apply(&Self::bindings(&wotd)) {
            self.logger.warn(
                STREAM,
                &format!("marker pair for '{}' not found; field left unchanged", name),
            );
        }
        doc.save()?;

        self.logger.info(STREAM, "finished word-of-the-day refresh");
        Ok(())
    }
}
