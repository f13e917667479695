pub mod builder;
pub mod lines;
pub mod parslets;
pub mod speakers;

use std::path::Path;

use chrono::{Local, NaiveDate};
use tracing::info;

use crate::akn::Document;
use crate::config::Settings;
use crate::convert;
use crate::error::{ParseError, Result};
use builder::DocumentBuilder;
use parslets::{Classifier, Match};

/// Per-call inputs that aren't part of the transcript itself.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Processing date stamped into the FRBR `FRBRdate` entries.
    pub generated: NaiveDate,
    pub speaker_href_base: String,
}

impl ParseOptions {
    pub fn new(generated: NaiveDate) -> Self {
        ParseOptions {
            generated,
            speaker_href_base: Settings::default().speaker_href_base,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        ParseOptions {
            generated: Local::now().date_naive(),
            speaker_href_base: settings.speaker_href_base.clone(),
        }
    }
}

/// Two-pass pipeline: text → paragraphs → matches (classify), then matches →
/// tree (apply, in document order).
pub fn parse_text(text: &str, options: &ParseOptions) -> Result<Document> {
    let mut builder = DocumentBuilder::new(options.generated, &options.speaker_href_base);

    let matches = {
        let mut classifier = Classifier::new(builder.speakers_mut());
        lines::paragraphs(text)
            .map(|p| classifier.classify(&p))
            .collect::<Result<Vec<Match>>>()?
    };
    if matches.is_empty() {
        return Err(ParseError::Date {
            line: String::new(),
        });
    }

    let paragraphs = matches.len();
    for m in matches {
        builder.apply(m);
    }

    let state = builder.state();
    info!(
        paragraphs,
        date = ?state.date,
        subsections = state.subsection_count,
        speakers = state.speakers.len(),
        "Parsed debate"
    );
    Ok(builder.finish())
}

/// Extract text from a source document with the configured converter, then parse it.
pub fn parse_file(path: &Path, settings: &Settings) -> Result<Document> {
    let text = convert::extract_text(path, settings)?;
    parse_text(&text, &ParseOptions::from_settings(settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::akn::xml::to_xml;

    fn options() -> ParseOptions {
        ParseOptions::new(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())
    }

    fn parse(paragraphs: &[&str]) -> Result<Document> {
        parse_text(&paragraphs.join("\n\n"), &options())
    }

    #[test]
    fn opening_sitting_end_to_end() {
        let doc = parse(&[
            "1 JANUARY 2014",
            "OPENING OF SESSION",
            "The House met at 09:30.",
            "JOHN X SMITH: I move.",
            "MARY T JONES: I second.",
        ])
        .unwrap();

        let dates = doc.find_all("docDate");
        assert_eq!(dates.len(), 1);
        assert_eq!(doc.attr(dates[0], "date"), Some("2014-01-01"));

        let sections = doc.find_all("debateSection");
        assert_eq!(sections.len(), 1);
        let heading = doc.first_child(sections[0], "heading").unwrap();
        assert_eq!(doc.text(heading), "OPENING OF SESSION");

        let times = doc.find_all("recordedTime");
        assert_eq!(times.len(), 1);
        assert_eq!(doc.text(times[0]), "09:30");

        let by: Vec<_> = doc
            .find_all("speech")
            .into_iter()
            .filter_map(|s| doc.attr(s, "by"))
            .collect();
        assert_eq!(by, vec!["#john-x-smith", "#mary-t-jones"]);
    }

    #[test]
    fn missing_date_produces_no_document() {
        let err = parse(&["Welcome everyone", "OPENING OF SESSION"]).unwrap_err();
        assert!(matches!(err, ParseError::Date { line } if line == "Welcome everyone"));
    }

    #[test]
    fn empty_transcript_is_a_date_error() {
        let err = parse_text("\n\n", &options()).unwrap_err();
        assert!(matches!(err, ParseError::Date { .. }));
    }

    #[test]
    fn second_assembly_line_is_plain_text() {
        let doc = parse(&[
            "1 JANUARY 2014",
            "OPENING OF SESSION",
            "QUESTIONS",
            "The House met at 09:30.",
            "The House met at 10:30.",
        ])
        .unwrap();
        assert_eq!(doc.find_all("recordedTime").len(), 1);
        let xml = to_xml(&doc).unwrap();
        assert!(xml.contains("<p>The House met at 10:30.</p>"));
    }

    #[test]
    fn repeated_speaker_is_registered_once() {
        let doc = parse(&[
            "1 JANUARY 2014",
            "DEBATE",
            "Mr A SMITH: One.",
            "Ms B JONES: Two.",
            "Mr A SMITH: Three.",
            "Mr A SMITH: Four.",
        ])
        .unwrap();
        let people = doc.find_all("TLCPerson");
        assert_eq!(people.len(), 2);
        let ids: Vec<_> = people.iter().filter_map(|&p| doc.attr(p, "id")).collect();
        assert_eq!(ids, vec!["mr-a-smith", "ms-b-jones"]);
        let smith = doc
            .find_all("speech")
            .into_iter()
            .filter(|&s| doc.attr(s, "by") == Some("#mr-a-smith"))
            .count();
        assert_eq!(smith, 3);
    }

    #[test]
    fn subsection_ids_increase_from_one() {
        let doc = parse(&["1 JANUARY 2014", "TITLE", "ONE", "TWO", "THREE"]).unwrap();
        let ids: Vec<_> = doc
            .find_all("debateSection")
            .into_iter()
            .filter_map(|s| doc.attr(s, "id"))
            .collect();
        assert_eq!(ids, vec!["db0", "dbs1", "dbs2", "dbs3"]);
    }

    #[test]
    fn speeches_never_nest() {
        let doc = parse(&["1 JANUARY 2014", "DEBATE", "Mr A SMITH: One.", "Ms B JONES: Two."])
            .unwrap();
        for s in doc.find_all("speech") {
            assert_eq!(doc.tag(doc.parent(s).unwrap()), "debateSection");
        }
    }

    #[test]
    fn sitting_fixture() {
        let text = std::fs::read_to_string("tests/fixtures/sitting.txt").unwrap();
        let doc = parse_text(&text, &options()).unwrap();
        let xml = to_xml(&doc).unwrap();

        let debate = doc.path(doc.root(), &["debate"]).unwrap();
        assert_eq!(doc.attr(debate, "name"), Some("PROCEEDINGS OF THE NATIONAL ASSEMBLY"));
        assert!(xml.contains("<docDate date=\"2013-05-14\">14 May 2013</docDate>"));
        assert!(xml.contains("FRBRthis value=\"/za/debaterecord/2013-05-14/main\""));

        assert_eq!(doc.find_all("recordedTime").len(), 2);
        assert_eq!(doc.find_all("prayers").len(), 1);
        assert_eq!(doc.find_all("adjournment").len(), 1);

        let headings: Vec<_> = doc
            .find_all("heading")
            .into_iter()
            .map(|h| doc.text(h))
            .collect();
        assert_eq!(
            headings,
            vec![
                "PROCEEDINGS OF THE NATIONAL ASSEMBLY",
                "MEMBERS' STATEMENTS",
                "ANC'S COMMITMENT TO SERVICE DELIVERY (Member's Statement)",
                "APPROPRIATION BILL (Second Reading debate)",
            ]
        );

        let speakers: Vec<_> = doc
            .find_all("TLCPerson")
            .into_iter()
            .filter_map(|p| doc.attr(p, "showAs"))
            .collect();
        assert_eq!(
            speakers,
            vec!["Mr M J ELLIS (DA)", "The DEPUTY SPEAKER", "The MINISTER OF FINANCE"]
        );
        assert_eq!(doc.find_all("speech").len(), 4);

        // trailing text stays with the last speech
        let last = *doc.find_all("speech").last().unwrap();
        assert_eq!(doc.child_elements(last).count(), 3);
    }
}
