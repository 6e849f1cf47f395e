//! Persona KPI list edits
//!
//! The KPI list is plain state owned here and persisted through the store.
//! Edits keep the shape (list or described map) of the existing config.

use callscore_common::{Error, Result};
use tracing::info;

use crate::loader::{FsStore, RecordLoader};
use crate::models::KpiConfig;

/// KPI names configured for a persona (empty if none configured)
pub fn list_kpis(store: &FsStore, persona: &str) -> Result<Vec<String>> {
    ensure_persona(store, persona)?;
    store.list_kpis(persona)
}

/// Add a KPI and return the updated list
pub fn add_kpi(store: &FsStore, persona: &str, name: &str) -> Result<Vec<String>> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("KPI name must not be empty".to_string()));
    }
    ensure_persona(store, persona)?;

    let mut config = store.read_kpi_config(persona)?.unwrap_or_default();
    if !config.add(name) {
        return Err(Error::InvalidInput(format!(
            "KPI '{}' already exists for persona '{}'",
            name, persona
        )));
    }
    store.save_kpi_config(persona, &config)?;

    info!(persona = %persona, kpi = %name, "KPI added");
    Ok(config.names())
}

/// Remove a KPI and return the updated list
pub fn remove_kpi(store: &FsStore, persona: &str, name: &str) -> Result<Vec<String>> {
    ensure_persona(store, persona)?;

    let mut config: KpiConfig = store
        .read_kpi_config(persona)?
        .ok_or_else(|| Error::NotFound(format!("KPI '{}'", name)))?;
    if !config.remove(name.trim()) {
        return Err(Error::NotFound(format!("KPI '{}'", name)));
    }
    store.save_kpi_config(persona, &config)?;

    info!(persona = %persona, kpi = %name, "KPI removed");
    Ok(config.names())
}

fn ensure_persona(store: &FsStore, persona: &str) -> Result<()> {
    if store.persona_exists(persona)? {
        Ok(())
    } else {
        Err(Error::NotFound(format!("persona '{}'", persona)))
    }
}
