use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const CONFIG_FILE: &str = "hansard";
const ENV_PREFIX: &str = "HANSARD";

/// Runtime settings: built-in defaults, then `hansard.toml`, then `HANSARD_*` env vars.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Program turning a source document into plain text on stdout.
    pub converter: String,
    /// Extra arguments placed before the document path.
    #[serde(default)]
    pub converter_args: Vec<String>,
    /// File extension (without dot) of source documents in a batch directory.
    pub source_extension: String,
    /// Name of the JSON run report kept inside a batch directory.
    pub report_file: String,
    /// Default cap on documents per batch run.
    pub limit: usize,
    /// Prefix of the `href` attached to each registered speaker.
    pub speaker_href_base: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            converter: "antiword".to_string(),
            converter_args: Vec::new(),
            source_extension: "doc".to_string(),
            report_file: "parse_report.json".to_string(),
            limit: 10,
            speaker_href_base: "http://dummy/popit/path/".to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        Config::builder()
            .set_default("converter", defaults.converter)?
            .set_default("converter_args", Vec::<String>::new())?
            .set_default("source_extension", defaults.source_extension)?
            .set_default("report_file", defaults.report_file)?
            .set_default("limit", defaults.limit as u64)?
            .set_default("speaker_href_base", defaults.speaker_href_base)?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(" ")
                    .with_list_parse_key("converter_args"),
            )
            .build()?
            .try_deserialize()
    }
}
