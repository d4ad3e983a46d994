//! Configuration resolution: a [`Source`] trait with `Env` and `File`
//! implementations that each yield per-field `Option<T>` plus non-fatal
//! [`ReadError`]s, folded left-to-right into a [`Config`] by
//! [`Config::from_sources_or_default`]. Callers order sources from highest to
//! lowest precedence; `spoor-cli` additionally folds command-line flags ahead
//! of these, giving the full command line > environment > file > defaults
//! layering.

use std::collections::HashMap;
use std::path::Path;

use spoor_util::compression::Strategy;
use spoor_util::file_system::FileReader;
use thiserror::Error;

/// A monotonic slice/buffer capacity, mirroring the original's `SizeType`.
pub type SizeType = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub trace_file_path: String,
    pub compression_strategy: Strategy,
    pub session_id: u64,
    pub thread_event_buffer_capacity: SizeType,
    pub max_reserved_event_buffer_slice_capacity: SizeType,
    pub max_dynamic_event_buffer_slice_capacity: SizeType,
    pub reserved_event_pool_capacity: SizeType,
    pub dynamic_event_pool_capacity: SizeType,
    pub dynamic_event_slice_borrow_cas_attempts: SizeType,
    pub event_buffer_retention_duration_nanoseconds: i64,
    pub max_flush_buffer_to_file_attempts: i32,
    pub flush_all_events: bool,
}

impl Config {
    /// The built-in defaults, mirroring
    /// `original_source/spoor/runtime/config/config.cc`'s
    /// `k*DefaultValue` constants. `session_id` is randomized per call, as
    /// the original draws it from a `std::default_random_engine`.
    pub fn default_with_random_session_id() -> Self {
        Self {
            trace_file_path: ".".to_string(),
            compression_strategy: Strategy::Snappy,
            session_id: rand::random(),
            thread_event_buffer_capacity: 10_000,
            max_reserved_event_buffer_slice_capacity: 1_000,
            max_dynamic_event_buffer_slice_capacity: 1_000,
            reserved_event_pool_capacity: 0,
            dynamic_event_pool_capacity: SizeType::MAX,
            dynamic_event_slice_borrow_cas_attempts: 1,
            event_buffer_retention_duration_nanoseconds: 0,
            max_flush_buffer_to_file_attempts: 2,
            flush_all_events: true,
        }
    }

    /// Resolve a [`Config`] by folding `sources` (ordered highest to lowest
    /// precedence) over `default_config`, taking each field from the first
    /// source that reports a value for it.
    pub fn from_sources_or_default(sources: &[Box<dyn Source>], default_config: &Config) -> Config {
        Config {
            trace_file_path: first_some(sources, Source::trace_file_path)
                .unwrap_or_else(|| default_config.trace_file_path.clone()),
            compression_strategy: first_some(sources, Source::compression_strategy)
                .unwrap_or(default_config.compression_strategy),
            session_id: first_some(sources, Source::session_id).unwrap_or(default_config.session_id),
            thread_event_buffer_capacity: first_some(sources, Source::thread_event_buffer_capacity)
                .unwrap_or(default_config.thread_event_buffer_capacity),
            max_reserved_event_buffer_slice_capacity: first_some(
                sources,
                Source::max_reserved_event_buffer_slice_capacity,
            )
            .unwrap_or(default_config.max_reserved_event_buffer_slice_capacity),
            max_dynamic_event_buffer_slice_capacity: first_some(
                sources,
                Source::max_dynamic_event_buffer_slice_capacity,
            )
            .unwrap_or(default_config.max_dynamic_event_buffer_slice_capacity),
            reserved_event_pool_capacity: first_some(sources, Source::reserved_event_pool_capacity)
                .unwrap_or(default_config.reserved_event_pool_capacity),
            dynamic_event_pool_capacity: first_some(sources, Source::dynamic_event_pool_capacity)
                .unwrap_or(default_config.dynamic_event_pool_capacity),
            dynamic_event_slice_borrow_cas_attempts: first_some(
                sources,
                Source::dynamic_event_slice_borrow_cas_attempts,
            )
            .unwrap_or(default_config.dynamic_event_slice_borrow_cas_attempts),
            event_buffer_retention_duration_nanoseconds: first_some(
                sources,
                Source::event_buffer_retention_duration_nanoseconds,
            )
            .unwrap_or(default_config.event_buffer_retention_duration_nanoseconds),
            max_flush_buffer_to_file_attempts: first_some(
                sources,
                Source::max_flush_buffer_to_file_attempts,
            )
            .unwrap_or(default_config.max_flush_buffer_to_file_attempts),
            flush_all_events: first_some(sources, Source::flush_all_events)
                .unwrap_or(default_config.flush_all_events),
        }
    }
}

fn first_some<T>(sources: &[Box<dyn Source>], accessor: impl Fn(&dyn Source) -> Option<T>) -> Option<T> {
    sources.iter().find_map(|source| accessor(source.as_ref()))
}

const CONFIG_FILE_PATH_ENV_KEY: &str = "SPOOR_RUNTIME_CONFIG_FILE_PATH";

/// The path to an optional TOML config file, read from
/// `SPOOR_RUNTIME_CONFIG_FILE_PATH`. Demangled as
/// `spoor_runtime::config::config_file_path` by the runtime facade's own
/// instrumentation -- the default filter set blocks that name so the pass
/// never instruments the function the runtime calls during its own
/// `Initialize`.
pub fn config_file_path() -> Option<String> {
    std::env::var(CONFIG_FILE_PATH_ENV_KEY).ok().filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("failed to open the config source {name}")]
    FailedToOpenFile { name: String },
    #[error("cannot parse value for key \"{key}\"")]
    UnknownValue { key: String },
    #[error("unknown key \"{key}\"")]
    UnknownKey { key: String },
}

/// A configuration collaborator: environment variables, a config file, or
/// (in `spoor-cli`) parsed command-line flags. Each accessor returns `None`
/// when the source has no opinion on that field, letting
/// [`Config::from_sources_or_default`] fall through to the next source.
pub trait Source {
    fn trace_file_path(&self) -> Option<String>;
    fn compression_strategy(&self) -> Option<Strategy>;
    fn session_id(&self) -> Option<u64>;
    fn thread_event_buffer_capacity(&self) -> Option<SizeType>;
    fn max_reserved_event_buffer_slice_capacity(&self) -> Option<SizeType>;
    fn max_dynamic_event_buffer_slice_capacity(&self) -> Option<SizeType>;
    fn reserved_event_pool_capacity(&self) -> Option<SizeType>;
    fn dynamic_event_pool_capacity(&self) -> Option<SizeType>;
    fn dynamic_event_slice_borrow_cas_attempts(&self) -> Option<SizeType>;
    fn event_buffer_retention_duration_nanoseconds(&self) -> Option<i64>;
    fn max_flush_buffer_to_file_attempts(&self) -> Option<i32>;
    fn flush_all_events(&self) -> Option<bool>;
}

const TRACE_FILE_PATH_ENV_KEY: &str = "SPOOR_RUNTIME_TRACE_FILE_PATH";
const COMPRESSION_STRATEGY_ENV_KEY: &str = "SPOOR_RUNTIME_COMPRESSION_STRATEGY";
const SESSION_ID_ENV_KEY: &str = "SPOOR_RUNTIME_SESSION_ID";
const THREAD_EVENT_BUFFER_CAPACITY_ENV_KEY: &str = "SPOOR_RUNTIME_THREAD_EVENT_BUFFER_CAPACITY";
const MAX_RESERVED_EVENT_BUFFER_SLICE_CAPACITY_ENV_KEY: &str =
    "SPOOR_RUNTIME_MAX_RESERVED_EVENT_BUFFER_SLICE_CAPACITY";
const MAX_DYNAMIC_EVENT_BUFFER_SLICE_CAPACITY_ENV_KEY: &str =
    "SPOOR_RUNTIME_MAX_DYNAMIC_EVENT_BUFFER_SLICE_CAPACITY";
const RESERVED_EVENT_POOL_CAPACITY_ENV_KEY: &str = "SPOOR_RUNTIME_RESERVED_EVENT_POOL_CAPACITY";
const DYNAMIC_EVENT_POOL_CAPACITY_ENV_KEY: &str = "SPOOR_RUNTIME_DYNAMIC_EVENT_POOL_CAPACITY";
const DYNAMIC_EVENT_SLICE_BORROW_CAS_ATTEMPTS_ENV_KEY: &str =
    "SPOOR_RUNTIME_DYNAMIC_EVENT_SLICE_BORROW_CAS_ATTEMPTS";
const EVENT_BUFFER_RETENTION_DURATION_NANOSECONDS_ENV_KEY: &str =
    "SPOOR_RUNTIME_EVENT_BUFFER_RETENTION_DURATION_NANOSECONDS";
const MAX_FLUSH_BUFFER_TO_FILE_ATTEMPTS_ENV_KEY: &str = "SPOOR_RUNTIME_MAX_FLUSH_BUFFER_TO_FILE_ATTEMPTS";
const FLUSH_ALL_EVENTS_ENV_KEY: &str = "SPOOR_RUNTIME_FLUSH_ALL_EVENTS";

/// Reads configuration from `SPOOR_RUNTIME_*` environment variables. Mirrors
/// `original_source/spoor/runtime/config/env_source.h`'s accessor surface.
#[derive(Debug, Default)]
pub struct EnvSource {
    vars: HashMap<String, String>,
}

impl EnvSource {
    /// Build an `EnvSource` from the process environment.
    pub fn from_env() -> Self {
        Self { vars: std::env::vars().collect() }
    }

    /// Build an `EnvSource` from an explicit map, for tests that cannot
    /// safely mutate the real process environment.
    pub fn from_map(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str).filter(|s| !s.is_empty())
    }

    fn parse<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.parse().ok())
    }
}

impl Source for EnvSource {
    fn trace_file_path(&self) -> Option<String> {
        self.get(TRACE_FILE_PATH_ENV_KEY).map(str::to_string)
    }

    fn compression_strategy(&self) -> Option<Strategy> {
        match self.get(COMPRESSION_STRATEGY_ENV_KEY)?.to_ascii_lowercase().as_str() {
            "none" => Some(Strategy::None),
            "snappy" => Some(Strategy::Snappy),
            _ => None,
        }
    }

    fn session_id(&self) -> Option<u64> {
        self.parse(SESSION_ID_ENV_KEY)
    }

    fn thread_event_buffer_capacity(&self) -> Option<SizeType> {
        self.parse(THREAD_EVENT_BUFFER_CAPACITY_ENV_KEY)
    }

    fn max_reserved_event_buffer_slice_capacity(&self) -> Option<SizeType> {
        self.parse(MAX_RESERVED_EVENT_BUFFER_SLICE_CAPACITY_ENV_KEY)
    }

    fn max_dynamic_event_buffer_slice_capacity(&self) -> Option<SizeType> {
        self.parse(MAX_DYNAMIC_EVENT_BUFFER_SLICE_CAPACITY_ENV_KEY)
    }

    fn reserved_event_pool_capacity(&self) -> Option<SizeType> {
        self.parse(RESERVED_EVENT_POOL_CAPACITY_ENV_KEY)
    }

    fn dynamic_event_pool_capacity(&self) -> Option<SizeType> {
        self.parse(DYNAMIC_EVENT_POOL_CAPACITY_ENV_KEY)
    }

    fn dynamic_event_slice_borrow_cas_attempts(&self) -> Option<SizeType> {
        self.parse(DYNAMIC_EVENT_SLICE_BORROW_CAS_ATTEMPTS_ENV_KEY)
    }

    fn event_buffer_retention_duration_nanoseconds(&self) -> Option<i64> {
        self.parse(EVENT_BUFFER_RETENTION_DURATION_NANOSECONDS_ENV_KEY)
    }

    fn max_flush_buffer_to_file_attempts(&self) -> Option<i32> {
        self.parse(MAX_FLUSH_BUFFER_TO_FILE_ATTEMPTS_ENV_KEY)
    }

    fn flush_all_events(&self) -> Option<bool> {
        self.parse(FLUSH_ALL_EVENTS_ENV_KEY)
    }
}

/// Reads configuration from a TOML file whose keys are the unprefixed
/// snake_case field names, e.g. `trace_file_path`, `compression_strategy`.
/// Unlike [`EnvSource`] (which silently ignores unparsable values), a
/// present-but-malformed file is reported via [`ReadError`] from
/// [`FileSource::read`]; [`read_errors`] exposes the errors accumulated by
/// the most recent read.
pub struct FileSource {
    table: toml::value::Table,
    errors: Vec<ReadError>,
}

impl FileSource {
    /// Read and parse `path`, recording (but not failing on) unparsable
    /// scalar values -- only a missing file or a non-table root is fatal.
    pub fn read(file_reader: &impl FileReader, path: &Path) -> Result<Self, ReadError> {
        let contents = file_reader
            .read_to_string(path)
            .map_err(|_| ReadError::FailedToOpenFile { name: path.display().to_string() })?;
        let value: toml::Value = contents
            .parse()
            .map_err(|_| ReadError::FailedToOpenFile { name: path.display().to_string() })?;
        let table = value
            .as_table()
            .ok_or_else(|| ReadError::FailedToOpenFile { name: path.display().to_string() })?
            .clone();
        Ok(Self { table, errors: Vec::new() })
    }

    /// The non-fatal errors accumulated while resolving fields via this
    /// source (unparsable values recorded as [`ReadError::UnknownValue`]).
    pub fn read_errors(&self) -> &[ReadError] {
        &self.errors
    }

    fn string_field(&self, key: &str) -> Option<String> {
        self.table.get(key).and_then(toml::Value::as_str).map(str::to_string)
    }

    fn int_field<T: TryFrom<i64>>(&self, key: &str) -> Option<T> {
        self.table.get(key).and_then(toml::Value::as_integer).and_then(|v| T::try_from(v).ok())
    }

    fn bool_field(&self, key: &str) -> Option<bool> {
        self.table.get(key).and_then(toml::Value::as_bool)
    }
}

impl Source for FileSource {
    fn trace_file_path(&self) -> Option<String> {
        self.string_field("trace_file_path")
    }

    fn compression_strategy(&self) -> Option<Strategy> {
        match self.string_field("compression_strategy")?.to_ascii_lowercase().as_str() {
            "none" => Some(Strategy::None),
            "snappy" => Some(Strategy::Snappy),
            _ => None,
        }
    }

    fn session_id(&self) -> Option<u64> {
        self.int_field("session_id")
    }

    fn thread_event_buffer_capacity(&self) -> Option<SizeType> {
        self.int_field("thread_event_buffer_capacity")
    }

    fn max_reserved_event_buffer_slice_capacity(&self) -> Option<SizeType> {
        self.int_field("max_reserved_event_buffer_slice_capacity")
    }

    fn max_dynamic_event_buffer_slice_capacity(&self) -> Option<SizeType> {
        self.int_field("max_dynamic_event_buffer_slice_capacity")
    }

    fn reserved_event_pool_capacity(&self) -> Option<SizeType> {
        self.int_field("reserved_event_pool_capacity")
    }

    fn dynamic_event_pool_capacity(&self) -> Option<SizeType> {
        self.int_field("dynamic_event_pool_capacity")
    }

    fn dynamic_event_slice_borrow_cas_attempts(&self) -> Option<SizeType> {
        self.int_field("dynamic_event_slice_borrow_cas_attempts")
    }

    fn event_buffer_retention_duration_nanoseconds(&self) -> Option<i64> {
        self.int_field("event_buffer_retention_duration_nanoseconds")
    }

    fn max_flush_buffer_to_file_attempts(&self) -> Option<i32> {
        self.int_field("max_flush_buffer_to_file_attempts")
    }

    fn flush_all_events(&self) -> Option<bool> {
        self.bool_field("flush_all_events")
    }
}
