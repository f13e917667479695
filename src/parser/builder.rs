use chrono::NaiveDate;
use tracing::debug;

use super::parslets::{trip, Latches, Match, RecordedTime};
use super::speakers::{slug, SpeakerRegistry};
use crate::akn::{Document, NodeId, AKN_NAMESPACE};

const PUBLISHER: &str = "mysociety";
const LEGISLATURE: &str = "za-parliament";

/// Mutable state of one parse call.
#[derive(Debug, Clone)]
pub struct ParseState {
    pub latches: Latches,
    pub subsection_count: u32,
    /// Where the next apply-step attaches content.
    pub current: NodeId,
    pub date: Option<NaiveDate>,
    pub speakers: SpeakerRegistry,
}

/// `FRBRthis` and `FRBRuri` of one FRBR level.
#[derive(Debug, Clone, Copy)]
struct FrbrSlots {
    this: NodeId,
    uri: NodeId,
}

/// Grows the debate tree one apply-step at a time.
pub struct DocumentBuilder {
    doc: Document,
    state: ParseState,
    debate: NodeId,
    references: NodeId,
    root_section: Option<NodeId>,
    work: FrbrSlots,
    expression: FrbrSlots,
    manifestation: FrbrSlots,
    speaker_href_base: String,
}

impl DocumentBuilder {
    /// Skeleton with placeholder identifiers; `generated` stamps the FRBR dates.
    pub fn new(generated: NaiveDate, speaker_href_base: &str) -> Self {
        let today = generated.format("%Y-%m-%d").to_string();
        let mut doc = Document::new("akomaNtoso");
        let root = doc.root();
        doc.set_attr(root, "xmlns", AKN_NAMESPACE);

        let debate = doc.append(root, "debate", &[]);
        let meta = doc.append(debate, "meta", &[]);
        let preface = doc.append(debate, "preface", &[]);

        let publisher = format!("#{}", PUBLISHER);
        let legislature = format!("#{}", LEGISLATURE);
        let identification = doc.append(meta, "identification", &[("source", &publisher)]);

        let level = doc.append(identification, "FRBRWork", &[]);
        let work = frbr_slots(&mut doc, level);
        doc.append(level, "FRBRdate", &[("date", &today), ("name", "generation")]);
        doc.append(level, "FRBRauthor", &[("href", &legislature)]);
        doc.append(level, "FRBRcountry", &[("value", "za")]);

        let level = doc.append(identification, "FRBRExpression", &[]);
        let expression = frbr_slots(&mut doc, level);
        doc.append(level, "FRBRdate", &[("date", &today), ("name", "markup")]);
        doc.append(level, "FRBRauthor", &[("href", &legislature)]);
        doc.append(level, "FRBRlanguage", &[("language", "eng")]);

        let level = doc.append(identification, "FRBRManifestation", &[]);
        let manifestation = frbr_slots(&mut doc, level);
        doc.append(level, "FRBRdate", &[("date", &today), ("name", "markup")]);
        doc.append(level, "FRBRauthor", &[("href", &publisher)]);

        let references = doc.append(meta, "references", &[("source", &publisher)]);
        doc.append(
            references,
            "TLCOrganization",
            &[
                ("id", LEGISLATURE),
                ("showAs", "ZA Parliament"),
                ("href", "http://www.parliament.gov.za/"),
            ],
        );
        doc.append(
            references,
            "TLCOrganization",
            &[
                ("id", PUBLISHER),
                ("showAs", "MySociety"),
                ("href", "http://www.mysociety.org/"),
            ],
        );

        DocumentBuilder {
            doc,
            state: ParseState {
                latches: Latches::default(),
                subsection_count: 0,
                current: preface,
                date: None,
                speakers: SpeakerRegistry::new(),
            },
            debate,
            references,
            root_section: None,
            work,
            expression,
            manifestation,
            speaker_href_base: speaker_href_base.to_string(),
        }
    }

    pub fn state(&self) -> &ParseState {
        &self.state
    }

    /// Registry the classify pass resolves speakers through.
    pub fn speakers_mut(&mut self) -> &mut SpeakerRegistry {
        &mut self.state.speakers
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn finish(self) -> Document {
        self.doc
    }

    pub fn apply(&mut self, m: Match) {
        debug!(kind = m.kind(), current = self.doc.tag(self.state.current), "Applying");
        match m {
            Match::Date { date, .. } => self.apply_date(date),
            Match::Title { text } => {
                if self.state.latches.title {
                    self.create_subsection(&text);
                } else {
                    self.set_title(&text);
                }
            }
            Match::Parens { text } => self.append_to_heading(&text),
            Match::Assembled { at, .. } => {
                if trip(&mut self.state.latches.assembled) {
                    let current = self.state.current;
                    self.recorded_time_paragraph(current, &at);
                }
            }
            Match::Arose { at, .. } => {
                if trip(&mut self.state.latches.arisen) {
                    let current = self.state.current;
                    let parent = self.doc.parent(current).unwrap_or(current);
                    let adjournment = self.doc.append(parent, "adjournment", &[("id", "adjournment")]);
                    self.recorded_time_paragraph(adjournment, &at);
                }
            }
            Match::Prayers { text } => {
                if trip(&mut self.state.latches.prayers) {
                    let prayers = self
                        .doc
                        .append(self.state.current, "prayers", &[("id", "prayers")]);
                    self.doc.append_text_element(prayers, "p", &[], &text);
                }
            }
            Match::Speech {
                name, speech, id, ..
            } => self.append_speech(&name, &speech, &id),
            Match::Continuation { text } => {
                if !self.state.latches.title {
                    self.set_title(&text.to_uppercase());
                } else if self.state.subsection_count == 0 {
                    self.create_subsection(&text.to_uppercase());
                } else {
                    self.doc
                        .append_text_element(self.state.current, "p", &[], text.trim_start());
                }
            }
        }
    }

    fn apply_date(&mut self, date: NaiveDate) {
        if !trip(&mut self.state.latches.date) {
            return;
        }
        let iso = date.format("%Y-%m-%d").to_string();
        let p = self.doc.append(self.state.current, "p", &[]);
        self.doc.push_text(p, &date.format("%A, ").to_string());
        self.doc.append_text_element(
            p,
            "docDate",
            &[("date", &iso)],
            &date.format("%d %B %Y").to_string(),
        );
        self.state.date = Some(date);

        let base = format!("/za/debaterecord/{}", iso);
        let stamps = [
            (self.work.this, format!("{}/main", base)),
            (self.work.uri, base.clone()),
            (self.expression.this, format!("{}/eng@/main", base)),
            (self.expression.uri, format!("{}/eng@", base)),
            (self.manifestation.this, format!("{}/eng@/main.xml", base)),
            (self.manifestation.uri, format!("{}/eng@.akn", base)),
        ];
        for (node, value) in stamps {
            self.doc.set_attr(node, "value", &value);
        }
    }

    fn set_title(&mut self, line: &str) {
        let line = line.trim_start().replace('\n', "");
        let body = self.doc.append(self.debate, "debateBody", &[]);
        let section = self
            .doc
            .append(body, "debateSection", &[("id", "db0"), ("name", &slug(&line))]);
        self.doc
            .append_text_element(section, "heading", &[("id", "dbh0")], &line);
        self.doc.set_attr(self.debate, "name", &line);
        self.root_section = Some(section);
        self.state.current = section;
        self.state.latches.title = true;
    }

    fn create_subsection(&mut self, line: &str) {
        let line = line.trim_start().replace('\n', "");
        self.state.subsection_count += 1;
        let n = self.state.subsection_count;
        let parent = self.root_section.unwrap_or(self.state.current);
        let section = self.doc.append(
            parent,
            "debateSection",
            &[("id", &format!("dbs{}", n)), ("name", &slug(&line))],
        );
        self.doc
            .append_text_element(section, "heading", &[("id", &format!("dbsh{}", n))], &line);
        self.state.current = section;
    }

    /// Parenthetical notes extend the heading of the section just opened, and are
    /// dropped anywhere else.
    fn append_to_heading(&mut self, text: &str) {
        let current = self.state.current;
        if self.doc.tag(current) != "debateSection" {
            debug!(text, "Dropping parenthetical outside a section");
            return;
        }
        if let Some(heading) = self.doc.first_child(current, "heading") {
            let merged = format!("{} {}", self.doc.text(heading), text);
            self.doc.set_text(heading, &merged);
        }
    }

    fn recorded_time_paragraph(&mut self, parent: NodeId, at: &RecordedTime) {
        let p = self.doc.append(parent, "p", &[]);
        self.doc.push_text(p, &at.prefix);
        self.doc
            .append_text_element(p, "recordedTime", &[("time", &at.iso())], &at.display);
    }

    fn append_speech(&mut self, name: &str, speech: &str, id: &str) {
        if self.doc.tag(self.state.current) == "speech" {
            if let Some(parent) = self.doc.parent(self.state.current) {
                self.state.current = parent;
            }
        }
        self.register_speaker(name, id);

        let by = format!("#{}", id);
        let elem = self.doc.append(self.state.current, "speech", &[("by", &by)]);
        self.doc.append_text_element(elem, "from", &[], name);
        self.doc.append_text_element(elem, "p", &[], speech);
        self.state.current = elem;
    }

    fn register_speaker(&mut self, name: &str, id: &str) {
        if self.state.speakers.get(name).is_none() {
            // classify normally resolves first; keep the registry complete either way
            self.state.speakers.resolve(name);
        }
        if self.state.speakers.unregistered(name).is_none() {
            return;
        }
        let href = format!("{}{}", self.speaker_href_base, id);
        let person = self.doc.append(
            self.references,
            "TLCPerson",
            &[("id", id), ("showAs", name), ("href", &href)],
        );
        self.state.speakers.set_reference(name, person);
    }
}

fn frbr_slots(doc: &mut Document, level: NodeId) -> FrbrSlots {
    FrbrSlots {
        this: doc.append(level, "FRBRthis", &[]),
        uri: doc.append(level, "FRBRuri", &[]),
    }
}
