//! Local folder store
//!
//! Layout under the root folder (folder names come from [`StorageLayout`]):
//!
//! ```text
//! prompts/<persona>.txt              persona prompt
//! prompts/<persona>__config.json     KPI list
//! transcriptions/<call>.txt          transcripts
//! llmanalysis/<persona>/<call>.json  LLM analysis per call
//! evals/<persona>/<call>.json        ground truth per call
//! ```
//!
//! A persona id is the prompt file name up to its first `.`
//! (`sales.txt` → `sales`). Writes go through a temp file and a rename so a
//! reader never sees a half-written record.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use callscore_common::{Error, Result, StorageLayout};
use serde_json::Value;
use tracing::debug;

use super::{RecordLoader, RecordRef};
use crate::models::KpiConfig;

/// Marker distinguishing KPI config files from prompts
const CONFIG_MARKER: &str = "__config";

/// Filesystem-backed record store
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    layout: StorageLayout,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>, layout: StorageLayout) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Create the root folder and the shared top-level folders if missing
    pub fn ensure_folders(&self) -> Result<()> {
        for dir in [
            self.prompt_dir(),
            self.transcription_dir(),
            self.root.join(&self.layout.llm_analysis_folder),
            self.root.join(&self.layout.eval_folder),
        ] {
            fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Persona id of a prompt file name (`sales.txt` → `sales`)
    pub fn persona_id(file_name: &str) -> &str {
        file_name.split('.').next().unwrap_or(file_name)
    }

    // ------------------------------------------------------------------
    // Prompts and KPI configuration
    // ------------------------------------------------------------------

    /// Persona ids with a prompt file, sorted
    pub fn list_personas(&self) -> Result<Vec<String>> {
        let mut personas: Vec<String> = list_files(&self.prompt_dir(), |name| {
            !name.contains(CONFIG_MARKER)
        })?
        .iter()
        .map(|name| Self::persona_id(name).to_string())
        .filter(|id| !id.is_empty())
        .collect();
        personas.dedup();
        Ok(personas)
    }

    pub fn persona_exists(&self, persona: &str) -> Result<bool> {
        Ok(self.prompt_file(persona)?.is_some())
    }

    /// Read the persona prompt text
    pub fn read_prompt(&self, persona: &str) -> Result<String> {
        let path = self
            .prompt_file(persona)?
            .ok_or_else(|| Error::NotFound(format!("persona '{}'", persona)))?;
        Ok(fs::read_to_string(path)?)
    }

    /// Create or replace the persona prompt (`<persona>.txt`)
    pub fn save_prompt(&self, persona: &str, content: &str) -> Result<()> {
        let persona = checked_persona(persona)?;
        let path = match self.prompt_file(persona)? {
            Some(existing) => existing,
            None => self.prompt_dir().join(format!("{}.txt", persona)),
        };
        write_atomic(&path, content.as_bytes())
    }

    /// Read the KPI config, `None` if the persona has none yet
    pub fn read_kpi_config(&self, persona: &str) -> Result<Option<KpiConfig>> {
        let path = self.kpi_config_path(persona)?;
        if !path.exists() {
            return Ok(None);
        }
        KpiConfig::from_value(read_json(&path)?).map(Some)
    }

    pub fn save_kpi_config(&self, persona: &str, config: &KpiConfig) -> Result<()> {
        let path = self.kpi_config_path(persona)?;
        let content = serde_json::to_vec_pretty(&config.to_value())?;
        write_atomic(&path, &content)
    }

    // ------------------------------------------------------------------
    // Transcriptions and analysis results
    // ------------------------------------------------------------------

    /// Transcript file names (`<call>.txt`), sorted
    pub fn list_transcriptions(&self) -> Result<Vec<String>> {
        list_files(&self.transcription_dir(), |name| name.ends_with(".txt"))
    }

    pub fn read_transcription(&self, name: &str) -> Result<String> {
        let path = self.transcription_dir().join(checked_name(name)?);
        fs::read_to_string(&path).map_err(|e| not_found_or_io(e, &path))
    }

    /// Store an analysis result as `<call>.json` for the persona
    pub fn save_analysis(&self, persona: &str, call_id: &str, content: &str) -> Result<()> {
        let path = self
            .analysis_dir(persona)?
            .join(format!("{}.json", checked_name(call_id)?));
        write_atomic(&path, content.as_bytes())
    }

    /// Store a ground-truth record as `<call>.json` for the persona
    pub fn save_ground_truth(&self, persona: &str, call_id: &str, record: &Value) -> Result<()> {
        let path = self
            .eval_dir(persona)?
            .join(format!("{}.json", checked_name(call_id)?));
        let content = serde_json::to_vec_pretty(record)?;
        write_atomic(&path, &content)
    }

    // ------------------------------------------------------------------
    // Paths
    // ------------------------------------------------------------------

    fn prompt_dir(&self) -> PathBuf {
        self.root.join(&self.layout.prompt_folder)
    }

    fn transcription_dir(&self) -> PathBuf {
        self.root.join(&self.layout.transcription_folder)
    }

    fn analysis_dir(&self, persona: &str) -> Result<PathBuf> {
        Ok(self
            .root
            .join(&self.layout.llm_analysis_folder)
            .join(checked_persona(persona)?))
    }

    fn eval_dir(&self, persona: &str) -> Result<PathBuf> {
        Ok(self
            .root
            .join(&self.layout.eval_folder)
            .join(checked_persona(persona)?))
    }

    fn kpi_config_path(&self, persona: &str) -> Result<PathBuf> {
        Ok(self
            .prompt_dir()
            .join(format!("{}{}.json", checked_persona(persona)?, CONFIG_MARKER)))
    }

    fn prompt_file(&self, persona: &str) -> Result<Option<PathBuf>> {
        let persona = checked_persona(persona)?;
        let found = list_files(&self.prompt_dir(), |name| {
            !name.contains(CONFIG_MARKER) && Self::persona_id(name) == persona
        })?
        .into_iter()
        .next()
        .map(|name| self.prompt_dir().join(name));
        Ok(found)
    }
}

impl RecordLoader for FsStore {
    fn list_analyses(&self, persona: &str) -> Result<Vec<RecordRef>> {
        list_files(&self.analysis_dir(persona)?, |name| name.ends_with(".json"))
    }

    fn read_analysis(&self, persona: &str, record: &str) -> Result<Value> {
        read_json(&self.analysis_dir(persona)?.join(checked_name(record)?))
    }

    fn read_ground_truth(&self, persona: &str, record: &str) -> Result<Option<Value>> {
        let path = self.eval_dir(persona)?.join(checked_name(record)?);
        if !path.exists() {
            debug!(persona = %persona, record = %record, "No ground truth for record");
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    fn list_kpis(&self, persona: &str) -> Result<Vec<String>> {
        Ok(self
            .read_kpi_config(persona)?
            .map(|config| config.names())
            .unwrap_or_default())
    }
}

/// Reject names that could escape their folder
fn checked_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed.starts_with('.')
        || trimmed.contains(|c: char| c == '/' || c == '\\' || c.is_control())
    {
        return Err(Error::InvalidInput(format!("invalid name: {:?}", name)));
    }
    Ok(trimmed)
}

/// Persona ids are prompt file names cut at the first `.`, so they never
/// contain one
fn checked_persona(persona: &str) -> Result<&str> {
    let persona = checked_name(persona)?;
    if persona.contains('.') {
        return Err(Error::InvalidInput(format!(
            "persona id must not contain '.': {:?}",
            persona
        )));
    }
    Ok(persona)
}

/// Regular file names in `dir` accepted by `keep`, sorted; a missing folder is empty
fn list_files<F>(dir: &Path, keep: F) -> Result<Vec<String>>
where
    F: Fn(&str) -> bool,
{
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with('.') && keep(name) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|e| not_found_or_io(e, path))?;
    Ok(serde_json::from_str(&content)?)
}

fn not_found_or_io(error: std::io::Error, path: &Path) -> Error {
    if error.kind() == ErrorKind::NotFound {
        Error::NotFound(path.display().to_string())
    } else {
        Error::Io(error)
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::Internal(format!("no parent folder for {}", path.display())))?;
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::Internal(format!("bad file name {}", path.display())))?;
    let temp_path = parent.join(format!(".{}.tmp", file_name));

    fs::write(&temp_path, contents)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}
