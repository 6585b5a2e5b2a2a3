/// Product name used in the search directories (`/opt/vemonitor/conf`, `~/.vemonitor`).
pub const PRODUCT_NAME: &str = "vemonitor";
/// System-wide configuration directory, second in the search order
pub const SYSTEM_CONFIG_DIR: &str = "/opt/vemonitor/conf";
/// Per-user configuration directory under `$HOME`, fourth in the search order
pub const USER_CONFIG_DIR: &str = ".vemonitor";
/// Maximum size of a single configuration file (500 KB)
pub const MAX_CONFIG_FILE_SIZE: u64 = 500 * 1024;
/// Maximum size of a root document plus everything it imports (500 KB)
pub const MAX_CONFIG_TOTAL_SIZE: u64 = 500 * 1024;
/// Accepted configuration file extensions
pub const CONFIG_EXTENSIONS: &[&str] = &["yaml", "yml"];
/// Key holding child imports in a mapping-root document
pub const IMPORTS_KEY: &str = "Imports";
/// Key holding child imports on each element of a sequence-root document
pub const INCLUDES_KEY: &str = "includes";

/// Maximum size of a bundled schema file (80 KB)
pub const MAX_SCHEMA_FILE_SIZE: u64 = 80 * 1024;
/// Bundled schema file name suffix: `{key}_schema.json`
pub const SCHEMA_FILE_SUFFIX: &str = "_schema.json";
/// Bundled schema directory name
pub const SCHEMA_DIR: &str = "schemas";

/// Maximum source refs per connector kind in one block
pub const MAX_REFS_PER_KIND: usize = 5;

/// Default seconds of cache accumulation before an output flush
pub const DEFAULT_CACHE_INTERVAL: u64 = 5;
/// Default minimum seconds between two successful sends of one output
pub const DEFAULT_MIN_REQ_INTERVAL: u64 = 1;
/// Default accepted distance between `last_saved_time` and the wall clock (1 day)
pub const DEFAULT_MAX_CLOCK_SKEW: u64 = 86_400;
/// Default serial read timeout in seconds
pub const DEFAULT_SERIAL_TIMEOUT: u64 = 1;
/// Default serial baud rate
pub const DEFAULT_SERIAL_BAUD: u32 = 19_200;

/// Rows per device after which an output flush is attempted regardless of cache_interval
pub const CACHE_SOFT_CAP: usize = 120;
/// Rows per device beyond which the oldest rows are dropped
pub const CACHE_HARD_CAP: usize = 1_000;
