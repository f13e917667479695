use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::akn::xml::to_xml;
use crate::config::Settings;
use crate::error::{ParseError, Result};
use crate::parser::parse_file;

/// Processing history of one source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub last_attempt: Option<DateTime<Local>>,
    pub last_success: Option<DateTime<Local>>,
    pub ok: bool,
    pub error: Option<String>,
}

/// Run report kept next to the sources, keyed by file name.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Report {
    pub sources: BTreeMap<String, SourceRecord>,
}

impl Report {
    /// Load the report at `path`; a missing file is an empty report.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json).map_err(|source| ParseError::Report {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Report::default()),
            Err(e) => Err(ParseError::io(path, e)),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|source| ParseError::Report {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(|e| ParseError::io(path, e))
    }
}

/// Which sources a run should pick up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Never attempted.
    Pending,
    /// Attempted before but never successfully parsed.
    Retry,
    /// Everything, including already parsed sources.
    Redo,
}

pub struct RunStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

pub struct DirStats {
    pub total: usize,
    pub parsed: usize,
    pub failed: usize,
    pub unattempted: usize,
}

/// Source documents in `dir` with the given extension, sorted by path.
pub fn discover(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| ParseError::io(dir, e))?;
    let mut sources = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ParseError::io(dir, e))?.path();
        let matches = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            sources.push(path);
        }
    }
    sources.sort();
    Ok(sources)
}

pub fn source_key(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<source>.xml`, next to the source.
pub fn xml_path(source: &Path) -> PathBuf {
    let mut name = source.as_os_str().to_owned();
    name.push(".xml");
    PathBuf::from(name)
}

pub fn select(
    sources: &[PathBuf],
    report: &Report,
    selection: Selection,
    limit: usize,
) -> Vec<PathBuf> {
    sources
        .iter()
        .filter(|path| {
            let record = report.sources.get(&source_key(path));
            match selection {
                Selection::Pending => record.is_none(),
                Selection::Retry => record.is_some_and(|r| !r.ok),
                Selection::Redo => true,
            }
        })
        .take(limit)
        .cloned()
        .collect()
}

struct Outcome {
    key: String,
    result: Result<()>,
}

/// Stamp `last_attempt` on every selected source, leaving its outcome as it was.
pub fn mark_attempted(report: &mut Report, selected: &[PathBuf], at: DateTime<Local>) {
    for path in selected {
        report
            .sources
            .entry(source_key(path))
            .or_insert(SourceRecord {
                last_attempt: None,
                last_success: None,
                ok: false,
                error: None,
            })
            .last_attempt = Some(at);
    }
}

/// Parse selected sources in `dir` in parallel, write `<source>.xml` for each
/// success and record every attempt in the run report. Attempts hit the report
/// before any parsing starts, so an interrupted run still shows them. Failures
/// are recorded, never retried within the run.
pub fn run(dir: &Path, settings: &Settings, selection: Selection, limit: usize) -> Result<RunStats> {
    let report_path = dir.join(&settings.report_file);
    let mut report = Report::load(&report_path)?;
    let sources = discover(dir, &settings.source_extension)?;
    let selected = select(&sources, &report, selection, limit);
    let total = selected.len();
    info!("Parsing {} of {} sources in {}", total, sources.len(), dir.display());

    mark_attempted(&mut report, &selected, Local::now());
    report.save(&report_path)?;

    let pb = progress_bar(total);

    let outcomes: Vec<Outcome> = selected
        .par_iter()
        .map(|path| {
            let result = parse_one(path, settings);
            pb.inc(1);
            Outcome {
                key: source_key(path),
                result,
            }
        })
        .collect();
    pb.finish_and_clear();

    let mut ok = 0usize;
    let mut errors = 0usize;
    for outcome in outcomes {
        let Some(record) = report.sources.get_mut(&outcome.key) else {
            continue;
        };
        match outcome.result {
            Ok(()) => {
                ok += 1;
                record.ok = true;
                record.last_success = Some(Local::now());
                record.error = None;
                info!("Processed {}", outcome.key);
            }
            Err(e) => {
                errors += 1;
                record.ok = false;
                record.error = Some(e.to_string());
                warn!("Failed to parse {}: {}", outcome.key, e);
            }
        }
    }

    report.save(&report_path)?;
    Ok(RunStats { total, ok, errors })
}

fn progress_bar(total: usize) -> ProgressBar {
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    let pb = ProgressBar::new(total as u64);
    pb.set_style(style);
    pb
}

fn parse_one(path: &Path, settings: &Settings) -> Result<()> {
    let doc = parse_file(path, settings)?;
    let xml = to_xml(&doc)?;
    let out = xml_path(path);
    std::fs::write(&out, xml).map_err(|e| ParseError::io(out, e))
}

pub fn dir_stats(dir: &Path, settings: &Settings) -> Result<DirStats> {
    let report = Report::load(&dir.join(&settings.report_file))?;
    let sources = discover(dir, &settings.source_extension)?;
    let mut stats = DirStats {
        total: sources.len(),
        parsed: 0,
        failed: 0,
        unattempted: 0,
    };
    for path in &sources {
        match report.sources.get(&source_key(path)) {
            Some(r) if r.ok => stats.parsed += 1,
            Some(_) => stats.failed += 1,
            None => stats.unattempted += 1,
        }
    }
    Ok(stats)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    const GOOD: &str = "1 JANUARY 2014\n\nOPENING OF SESSION\n\nMr A SMITH: I move.\n";

    fn settings() -> Settings {
        Settings {
            converter: "cat".to_string(),
            ..Settings::default()
        }
    }

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn discover_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.doc", GOOD);
        write(dir.path(), "a.DOC", GOOD);
        write(dir.path(), "notes.txt", "x");
        let found: Vec<_> = discover(dir.path(), "doc")
            .unwrap()
            .iter()
            .map(|p| source_key(p))
            .collect();
        assert_eq!(found, vec!["a.DOC", "b.doc"]);
    }

    #[test]
    fn xml_path_appends_extension() {
        assert_eq!(xml_path(Path::new("/x/s.doc")), PathBuf::from("/x/s.doc.xml"));
    }

    #[test]
    fn selection_modes() {
        let sources = vec![
            PathBuf::from("new.doc"),
            PathBuf::from("failed.doc"),
            PathBuf::from("done.doc"),
        ];
        let mut report = Report::default();
        let rec = |ok| SourceRecord {
            last_attempt: Some(Local::now()),
            last_success: None,
            ok,
            error: None,
        };
        report.sources.insert("failed.doc".into(), rec(false));
        report.sources.insert("done.doc".into(), rec(true));

        let keys = |sel, limit| -> Vec<String> {
            select(&sources, &report, sel, limit)
                .iter()
                .map(|p| source_key(p))
                .collect()
        };
        assert_eq!(keys(Selection::Pending, 10), vec!["new.doc"]);
        assert_eq!(keys(Selection::Retry, 10), vec!["failed.doc"]);
        assert_eq!(keys(Selection::Redo, 10).len(), 3);
        assert_eq!(keys(Selection::Redo, 1), vec!["new.doc"]);
    }

    #[test]
    fn attempts_are_marked_without_touching_outcomes() {
        let mut report = Report::default();
        report.sources.insert(
            "done.doc".into(),
            SourceRecord {
                last_attempt: None,
                last_success: Some(Local::now()),
                ok: true,
                error: None,
            },
        );
        let at = Local::now();
        mark_attempted(
            &mut report,
            &[PathBuf::from("/x/new.doc"), PathBuf::from("/x/done.doc")],
            at,
        );

        let new = &report.sources["new.doc"];
        assert_eq!(new.last_attempt, Some(at));
        assert!(!new.ok);
        let done = &report.sources["done.doc"];
        assert_eq!(done.last_attempt, Some(at));
        assert!(done.ok);
    }

    #[test]
    fn run_writes_xml_and_records_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = write(dir.path(), "good.doc", GOOD);
        write(dir.path(), "bad.doc", "Welcome everyone\n");

        let stats = run(dir.path(), &settings(), Selection::Pending, 10).unwrap();
        assert_eq!((stats.total, stats.ok, stats.errors), (2, 1, 1));

        let xml = std::fs::read_to_string(xml_path(&good)).unwrap();
        assert!(xml.contains("<speech by=\"#mr-a-smith\">"));
        assert!(!xml_path(&dir.path().join("bad.doc")).exists());

        let report = Report::load(&dir.path().join("parse_report.json")).unwrap();
        let bad = &report.sources["bad.doc"];
        assert!(!bad.ok);
        assert!(bad.error.as_deref().unwrap().contains("couldn't match date"));
        assert!(report.sources["good.doc"].last_success.is_some());

        // nothing left that was never attempted
        let again = run(dir.path(), &settings(), Selection::Pending, 10).unwrap();
        assert_eq!(again.total, 0);

        // only the failed source comes back on retry
        let retried = run(dir.path(), &settings(), Selection::Retry, 10).unwrap();
        assert_eq!((retried.total, retried.errors), (1, 1));

        let s = dir_stats(dir.path(), &settings()).unwrap();
        assert_eq!((s.total, s.parsed, s.failed, s.unattempted), (2, 1, 1, 0));
    }

    #[test]
    fn conversion_failure_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.doc", GOOD);
        let failing = Settings {
            converter: "false".to_string(),
            ..Settings::default()
        };
        let stats = run(dir.path(), &failing, Selection::Pending, 10).unwrap();
        assert_eq!(stats.errors, 1);
        let report = Report::load(&dir.path().join("parse_report.json")).unwrap();
        assert!(report.sources["a.doc"]
            .error
            .as_deref()
            .unwrap()
            .starts_with("could not convert"));
    }
}
