//! Table registry: the open tables of one server.
//!
//! A table is created by its owner with a ruleset and a configuration,
//! collects up to four participants, and is started by the owner. Starting
//! fills the empty seats with robots and shuffles the seating from the
//! table seed. A table whose last participant leaves is removed.
//!
//! The registry is shared between connection handlers; every operation
//! holds its lock only for the map update.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::{ConfigError, GameRng, Seat, SeatError, SeatMap, TableConfig, SEAT_COUNT};
use crate::protocol::{Remote, RobotRemote};
use crate::rules::{RuleError, Ruleset, RulesetHash, RulesetRef, RulesetSource};

use super::coordinator::{SeatSetup, TableCoordinator, TableError};
use super::persistence::Persistence;

/// Robot names, in the order empty seats are filled.
const ROBOT_NAMES: [&str; 3] = ["Robot 1", "Robot 2", "Robot 3"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u64);

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "table {}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{0} not found")]
    NoSuchTable(TableId),

    #[error("all seats of {0} are taken")]
    TableFull(TableId),

    #[error("{0} has already started")]
    AlreadyStarted(TableId),

    #[error("{name} already joined {table}")]
    AlreadyJoined { table: TableId, name: String },

    #[error("{name} is not at {table}")]
    NotSeated { table: TableId, name: String },

    #[error("only the owner {owner} can start {table}")]
    NotOwner { table: TableId, owner: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ruleset(#[from] RuleError),

    #[error(transparent)]
    Seating(#[from] SeatError),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Public view of one table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableInfo {
    pub id: TableId,
    pub ruleset: RulesetHash,
    pub ruleset_name: String,
    pub owner: String,
    pub participants: Vec<String>,
    pub started: bool,
}

struct TableEntry {
    config: TableConfig,
    ruleset: Arc<Ruleset>,
    /// In joining order; the first one owns the table.
    participants: Vec<SeatSetup>,
    started: bool,
}

impl TableEntry {
    fn info(&self, id: TableId) -> TableInfo {
        TableInfo {
            id,
            ruleset: self.ruleset.hash(),
            ruleset_name: self.ruleset.name().to_owned(),
            owner: self.participants.first().map(|p| p.name.clone()).unwrap_or_default(),
            participants: self.participants.iter().map(|p| p.name.clone()).collect(),
            started: self.started,
        }
    }
}

pub struct TableRegistry {
    rulesets: Arc<dyn RulesetSource>,
    tables: Mutex<FxHashMap<TableId, TableEntry>>,
    next_id: AtomicU64,
}

impl TableRegistry {
    #[must_use]
    pub fn new(rulesets: Arc<dyn RulesetSource>) -> Self {
        Self {
            rulesets,
            tables: Mutex::new(FxHashMap::default()),
            next_id: AtomicU64::new(1),
        }
    }

    fn tables(&self) -> MutexGuard<'_, FxHashMap<TableId, TableEntry>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a table and seat its owner.
    pub fn create_table(
        &self,
        owner: SeatSetup,
        ruleset: &RulesetRef,
        config: TableConfig,
    ) -> Result<TableId, RegistryError> {
        config.validate()?;
        let ruleset = self.rulesets.load_ruleset(ruleset)?;
        let id = TableId(self.next_id.fetch_add(1, Ordering::SeqCst));
        info!(table = %id, owner = %owner.name, ruleset = ruleset.name(), "table created");
        self.tables().insert(
            id,
            TableEntry {
                config,
                ruleset,
                participants: vec![owner],
                started: false,
            },
        );
        Ok(id)
    }

    /// Seat a participant. Returns the number now seated.
    pub fn join(&self, id: TableId, participant: SeatSetup) -> Result<usize, RegistryError> {
        let mut tables = self.tables();
        let table = tables.get_mut(&id).ok_or(RegistryError::NoSuchTable(id))?;
        if table.started {
            return Err(RegistryError::AlreadyStarted(id));
        }
        if table.participants.iter().any(|p| p.name == participant.name) {
            return Err(RegistryError::AlreadyJoined {
                table: id,
                name: participant.name,
            });
        }
        if table.participants.len() == SEAT_COUNT {
            return Err(RegistryError::TableFull(id));
        }
        debug!(table = %id, name = %participant.name, "joined");
        table.participants.push(participant);
        Ok(table.participants.len())
    }

    /// Unseat a participant. Returns true when the table was removed
    /// because nobody is left.
    pub fn leave(&self, id: TableId, name: &str) -> Result<bool, RegistryError> {
        let mut tables = self.tables();
        let table = tables.get_mut(&id).ok_or(RegistryError::NoSuchTable(id))?;
        let Some(position) = table.participants.iter().position(|p| p.name == name) else {
            return Err(RegistryError::NotSeated {
                table: id,
                name: name.to_owned(),
            });
        };
        table.participants.remove(position);
        debug!(table = %id, name, "left");
        if table.participants.is_empty() {
            tables.remove(&id);
            info!(table = %id, "table removed");
            return Ok(true);
        }
        Ok(false)
    }

    #[must_use]
    pub fn lookup(&self, id: TableId) -> Option<TableInfo> {
        self.tables().get(&id).map(|table| table.info(id))
    }

    /// All tables, by id.
    #[must_use]
    pub fn list(&self) -> Vec<TableInfo> {
        let mut list: Vec<TableInfo> = self.tables().iter().map(|(id, table)| table.info(*id)).collect();
        list.sort_by_key(|info| info.id);
        list
    }

    /// Start the game of a table.
    ///
    /// Only the owner may start a table with empty seats; they are filled
    /// with robots. The seating order is shuffled from the table seed.
    pub fn start(
        &self,
        id: TableId,
        by: &str,
        persistence: Arc<dyn Persistence>,
    ) -> Result<TableCoordinator, RegistryError> {
        let (config, ruleset, mut seating) = {
            let mut tables = self.tables();
            let table = tables.get_mut(&id).ok_or(RegistryError::NoSuchTable(id))?;
            if table.started {
                return Err(RegistryError::AlreadyStarted(id));
            }
            let owner = table.participants.first().map(|p| p.name.clone()).unwrap_or_default();
            if table.participants.len() < SEAT_COUNT && owner != by {
                return Err(RegistryError::NotOwner { table: id, owner });
            }
            table.started = true;
            let mut seating: Vec<Option<SeatSetup>> = table.participants.iter().cloned().map(Some).collect();
            seating.resize(SEAT_COUNT, None);
            (table.config.clone(), Arc::clone(&table.ruleset), seating)
        };

        GameRng::new(config.seed).for_context("seating").shuffle(&mut seating);

        let mut robots = Vec::new();
        let mut robot_names = ROBOT_NAMES.iter();
        let seats: Vec<SeatSetup> = seating
            .into_iter()
            .zip(Seat::all())
            .map(|(setup, seat)| match setup {
                Some(setup) => setup,
                None => {
                    robots.push(seat);
                    SeatSetup {
                        name: robot_names.next().map_or_else(|| seat.to_string(), |n| (*n).to_owned()),
                        remote: Arc::new(RobotRemote::new(seat, Arc::clone(&ruleset), config.claim_timeout))
                            as Arc<dyn Remote>,
                    }
                }
            })
            .collect();
        info!(table = %id, robots = robots.len(), "table starting");

        let coordinator = TableCoordinator::new(config, ruleset, SeatMap::from_vec(seats)?, persistence)?;
        Ok(coordinator.with_robots(&robots))
    }

    /// Remove a table, started or not.
    pub fn abort(&self, id: TableId) -> Result<(), RegistryError> {
        self.tables().remove(&id).ok_or(RegistryError::NoSuchTable(id))?;
        info!(table = %id, "table aborted");
        Ok(())
    }
}
