/// Canonical scheme prefix of the HDFS backend.
pub const HDFS_PREFIX: &str = "hdfs://";

/// Canonical scheme prefix of the local-disk backend.
pub const FILE_PREFIX: &str = "file://";

/// Placeholder host meaning "let the backend pick its configured namenode".
pub const DEFAULT_HOST: &str = "default";

/// Placeholder port meaning "let the backend pick its configured port".
pub const DEFAULT_PORT: u16 = 0;

/// Prefix of every scratch directory created for a run.
pub const SCRATCH_DIR_PREFIX: &str = "runstore-";

/// Environment variable handed to child processes pointing at their scratch directory.
pub const OUTPUT_DIR_ENV: &str = "RUNSTORE_OUTPUT_DIR";

/// Environment variable handed to child processes carrying their run id.
pub const RUN_ID_ENV: &str = "RUNSTORE_RUN_ID";

pub const CHECKPOINT_DIR: &str = "checkpoint";
pub const LOGS_DIR: &str = "logs";

/// Port of the namenode WebHDFS endpoint when none is configured.
pub const WEBHDFS_DEFAULT_PORT: u16 = 9870;
pub const WEBHDFS_DEFAULT_HOST: &str = "localhost";
pub const WEBHDFS_PATH: &str = "/webhdfs/v1";

/// `extra_conf` key overriding the WebHDFS endpoint (`host:port` or a full URL).
pub const CONF_HTTP_ADDRESS: &str = "dfs.namenode.http-address";

/// `extra_conf` key for the per-request timeout, in seconds.
pub const CONF_TIMEOUT_SECS: &str = "dfs.webhdfs.timeout.secs";
