//! Reuse stored tables or rebuild them from the export
//!
//! The decision is made once, when the store is opened. Stored tables are
//! never invalidated: if the export changes, the old tables keep being used
//! until they are dropped (`--force-refresh`) or the database file is removed.

use std::path::Path;

use tracing::{info, warn};

use crate::db::{SourceTables, TableName};
use crate::error::Result;
use crate::export;
use crate::flatten::flatten_export;

use super::HealthStore;

/// Whether the stored tables can be used as they are
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// All three tables are stored and will be read back
    Fresh,
    /// Tables are missing (or a refresh was forced) and will be rebuilt
    StaleOrAbsent,
}

impl CacheState {
    pub fn decide(store: &HealthStore, force_refresh: bool) -> Result<Self> {
        if !force_refresh && store.tables_exist()? {
            Ok(CacheState::Fresh)
        } else {
            Ok(CacheState::StaleOrAbsent)
        }
    }
}

impl std::fmt::Display for CacheState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheState::Fresh => write!(f, "reused stored tables"),
            CacheState::StaleOrAbsent => write!(f, "rebuilt from export"),
        }
    }
}

/// Source tables plus how they were obtained
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub tables: SourceTables,
    pub state: CacheState,
}

/// Read the three tables back if they are stored, otherwise parse the
/// export and store them.
pub fn load_or_create(
    store: &mut HealthStore,
    input_path: &Path,
    force_refresh: bool,
) -> Result<LoadOutcome> {
    let state = CacheState::decide(store, force_refresh)?;

    let tables = match state {
        CacheState::Fresh => {
            info!("using stored tables");
            store.read_tables()?
        }
        CacheState::StaleOrAbsent => {
            if force_refresh {
                store.drop_tables()?;
            }

            let mut partial = false;
            for name in TableName::ALL {
                if store.table_exists(name)? {
                    warn!(table = %name, "keeping previously stored table");
                    partial = true;
                }
            }

            let export = export::parse_file(input_path)?;
            let tables = flatten_export(&export);
            store.write_tables(&tables)?;

            // kept tables win over the fresh parse, same as a later cached run
            if partial {
                store.read_tables()?
            } else {
                tables
            }
        }
    };

    Ok(LoadOutcome { tables, state })
}
