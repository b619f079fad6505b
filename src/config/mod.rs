pub mod loader;
pub mod schema;

pub use loader::{
    discover_config, load_from_path, load_from_str, parse_list, read_list_file, ConfigError,
    DEFAULT_CONFIG_FILE,
};
pub use schema::{
    ClassConfig, HostConfig, InterfaceConfig, LogConfig, NamespaceRewrite, RegionInsert,
    RunConfig, ValidationError, ValidationIssue, WalkConfig,
};
