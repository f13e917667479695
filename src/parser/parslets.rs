use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use tracing::debug;

use super::lines::Paragraph;
use super::speakers::{slug, SpeakerRegistry};
use crate::error::{ParseError, Result};

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)[ ,]+(\w+)[ ,]+(\d{4})$").unwrap());
static PARENS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\(.*\)\.?$").unwrap());
static ASSEMBLED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*(?:assembled|met)(?: in .*)? at )(\d+:\d+)\.?$").unwrap()
});
static AROSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*rose at )(\d+:\d+)\.?$").unwrap());
static PRAYERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.* prayers or meditation.$").unwrap());
static SPEECH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z][A-Za-z]+ [A-Z -]+(?: \(\w+\))?):\s*(.*)$").unwrap()
});

const MONTHS: &[&str] = &[
    "january", "february", "march", "april", "may", "june",
    "july", "august", "september", "october", "november", "december",
];

/// One-way flags. Each goes false → true at most once per parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Latches {
    pub date: bool,
    pub title: bool,
    pub assembled: bool,
    pub arisen: bool,
    pub prayers: bool,
}

/// Flip `flag` on. Returns false if it was already on.
pub fn trip(flag: &mut bool) -> bool {
    if *flag {
        return false;
    }
    *flag = true;
    true
}

/// A clock time as printed plus its parsed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTime {
    /// Everything before the time, e.g. "The House met at ".
    pub prefix: String,
    pub display: String,
    pub time: NaiveTime,
}

impl RecordedTime {
    pub fn iso(&self) -> String {
        self.time.format("%H:%M:%S").to_string()
    }
}

/// What a paragraph was recognised as, with the fields its apply-step needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Match {
    Date { text: String, date: NaiveDate },
    Title { text: String },
    Parens { text: String },
    Assembled { text: String, at: RecordedTime },
    Arose { text: String, at: RecordedTime },
    Prayers { text: String },
    Speech {
        text: String,
        name: String,
        speech: String,
        id: String,
    },
    Continuation { text: String },
}

impl Match {
    pub fn kind(&self) -> &'static str {
        match self {
            Match::Date { .. } => "date",
            Match::Title { .. } => "title",
            Match::Parens { .. } => "parens",
            Match::Assembled { .. } => "assembled",
            Match::Arose { .. } => "arose",
            Match::Prayers { .. } => "prayers",
            Match::Speech { .. } => "speech",
            Match::Continuation { .. } => "continuation",
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Match::Date { text, .. }
            | Match::Title { text }
            | Match::Parens { text }
            | Match::Assembled { text, .. }
            | Match::Arose { text, .. }
            | Match::Prayers { text }
            | Match::Speech { text, .. }
            | Match::Continuation { text } => text,
        }
    }
}

type Parslet = fn(&Latches, &Paragraph) -> Result<Option<Match>>;

/// Priority order: the first parslet that accepts wins. `continuation` is total.
const PARSLETS: &[Parslet] = &[
    date,
    title,
    parens,
    assembled,
    arose,
    prayers,
    speech,
    continuation,
];

// ── Parslets ──

/// Sitting date. While no date is known, the paragraph *must* be one.
pub fn date(latches: &Latches, p: &Paragraph) -> Result<Option<Match>> {
    if latches.date {
        return Ok(None);
    }
    let fail = || ParseError::Date {
        line: p.lines.join("\n"),
    };
    let line = p.single_line().ok_or_else(fail)?;
    let caps = DATE_RE.captures(line).ok_or_else(fail)?;
    let date = resolve_date(&caps[1], &caps[2], &caps[3]).ok_or_else(fail)?;
    Ok(Some(Match::Date {
        text: line.to_string(),
        date,
    }))
}

fn resolve_date(day: &str, month: &str, year: &str) -> Option<NaiveDate> {
    let month = MONTHS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(month))?;
    NaiveDate::from_ymd_opt(year.parse().ok()?, month as u32 + 1, day.parse().ok()?)
}

/// ALL CAPS paragraph, ignoring the "see col" cross-reference marker.
pub fn title(_: &Latches, p: &Paragraph) -> Result<Option<Match>> {
    let text = p.joined();
    if text.replace("see col", "").chars().any(|c| c.is_ascii_lowercase()) {
        return Ok(None);
    }
    Ok(Some(Match::Title { text }))
}

/// A single line wrapped in parentheses, e.g. "(Introduction)".
pub fn parens(_: &Latches, p: &Paragraph) -> Result<Option<Match>> {
    Ok(p.single_line()
        .filter(|line| PARENS_RE.is_match(line))
        .map(|line| Match::Parens {
            text: line.trim_start().to_string(),
        }))
}

pub fn assembled(latches: &Latches, p: &Paragraph) -> Result<Option<Match>> {
    if latches.assembled {
        return Ok(None);
    }
    let text = p.joined();
    Ok(recorded_time(&ASSEMBLED_RE, &text).map(|at| Match::Assembled { text, at }))
}

pub fn arose(latches: &Latches, p: &Paragraph) -> Result<Option<Match>> {
    if latches.arisen {
        return Ok(None);
    }
    let text = p.joined();
    Ok(recorded_time(&AROSE_RE, &text).map(|at| Match::Arose { text, at }))
}

fn recorded_time(re: &Regex, text: &str) -> Option<RecordedTime> {
    let caps = re.captures(text)?;
    let display = caps[2].to_string();
    let (hours, minutes) = display.split_once(':')?;
    let time = NaiveTime::from_hms_opt(hours.parse().ok()?, minutes.parse().ok()?, 0)?;
    Some(RecordedTime {
        prefix: caps[1].to_string(),
        display,
        time,
    })
}

pub fn prayers(latches: &Latches, p: &Paragraph) -> Result<Option<Match>> {
    if latches.prayers {
        return Ok(None);
    }
    let text = p.joined();
    if PRAYERS_RE.is_match(&text) {
        return Ok(Some(Match::Prayers { text }));
    }
    Ok(None)
}

/// "Mr A SMITH (DA): speech text". The id here is provisional; the classifier
/// replaces it with the registry's answer.
pub fn speech(_: &Latches, p: &Paragraph) -> Result<Option<Match>> {
    let text = p.joined();
    let Some(caps) = SPEECH_RE.captures(&text) else {
        return Ok(None);
    };
    let name = caps[1].to_string();
    let speech = caps[2].trim_start().to_string();
    let id = slug(&name);
    Ok(Some(Match::Speech {
        text,
        name,
        speech,
        id,
    }))
}

pub fn continuation(_: &Latches, p: &Paragraph) -> Result<Option<Match>> {
    Ok(Some(Match::Continuation { text: p.joined() }))
}

// ── Classifier ──

/// Runs the parslet chain over paragraphs in document order.
///
/// Tracks which one-shot parslets have already accepted, so a second
/// "The House met at ..." falls through to later parslets instead of
/// matching again. Speakers are resolved here so ids are fixed before any
/// apply-step runs.
pub struct Classifier<'a> {
    claimed: Latches,
    speakers: &'a mut SpeakerRegistry,
}

impl<'a> Classifier<'a> {
    pub fn new(speakers: &'a mut SpeakerRegistry) -> Self {
        Classifier {
            claimed: Latches::default(),
            speakers,
        }
    }

    pub fn classify(&mut self, p: &Paragraph) -> Result<Match> {
        let mut found = None;
        for parslet in PARSLETS {
            if let Some(m) = parslet(&self.claimed, p)? {
                found = Some(m);
                break;
            }
        }
        // the chain ends with a total parslet
        let mut m = match found {
            Some(m) => m,
            None => Match::Continuation { text: p.joined() },
        };

        match &mut m {
            Match::Date { .. } => self.claimed.date = true,
            Match::Assembled { .. } => self.claimed.assembled = true,
            Match::Arose { .. } => self.claimed.arisen = true,
            Match::Prayers { .. } => self.claimed.prayers = true,
            Match::Speech { name, id, .. } => *id = self.speakers.resolve(name),
            _ => {}
        }

        debug!(kind = m.kind(), text = %preview(m.text()), "Classified paragraph");
        Ok(m)
    }
}

fn preview(s: &str) -> String {
    if s.chars().count() <= 60 {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(60).collect();
        format!("{}...", truncated)
    }
}
