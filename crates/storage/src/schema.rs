use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, unixepoch());

-- Single counter backing seq_id across all tables. seq_id orders changes
-- for auditing; it is assigned at insert time, never by callers.
CREATE TABLE IF NOT EXISTS seq_counter (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    value INTEGER NOT NULL
);
INSERT OR IGNORE INTO seq_counter (id, value) VALUES (1, 0);

CREATE TABLE IF NOT EXISTS clustercredentials (
    clustercredentials_cred_id TEXT PRIMARY KEY,
    seq_id INTEGER NOT NULL,
    host TEXT NOT NULL DEFAULT '',
    kube_config TEXT NOT NULL DEFAULT '',
    kube_config_context TEXT NOT NULL DEFAULT '',
    serviceaccount_bearer_token TEXT NOT NULL DEFAULT '',
    serviceaccount_ns TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS gitopsenginecluster (
    gitopsenginecluster_id TEXT PRIMARY KEY,
    seq_id INTEGER NOT NULL,
    clustercredentials_id TEXT NOT NULL
        REFERENCES clustercredentials (clustercredentials_cred_id)
);
CREATE INDEX IF NOT EXISTS idx_enginecluster_creds
    ON gitopsenginecluster (clustercredentials_id);

CREATE TABLE IF NOT EXISTS gitopsengineinstance (
    gitopsengineinstance_id TEXT PRIMARY KEY,
    seq_id INTEGER NOT NULL,
    namespace_name TEXT NOT NULL DEFAULT '',
    namespace_uid TEXT NOT NULL DEFAULT '',
    enginecluster_id TEXT NOT NULL
        REFERENCES gitopsenginecluster (gitopsenginecluster_id)
);
CREATE INDEX IF NOT EXISTS idx_engineinstance_cluster
    ON gitopsengineinstance (enginecluster_id);

CREATE TABLE IF NOT EXISTS managedenvironment (
    managedenvironment_id TEXT PRIMARY KEY,
    seq_id INTEGER NOT NULL,
    name TEXT NOT NULL DEFAULT '',
    clustercredentials_id TEXT NOT NULL
        REFERENCES clustercredentials (clustercredentials_cred_id)
);
CREATE INDEX IF NOT EXISTS idx_managedenv_creds
    ON managedenvironment (clustercredentials_id);

CREATE TABLE IF NOT EXISTS clusteruser (
    clusteruser_id TEXT PRIMARY KEY,
    seq_id INTEGER NOT NULL,
    user_name TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS clusteraccess (
    clusteraccess_user_id TEXT NOT NULL
        REFERENCES clusteruser (clusteruser_id),
    clusteraccess_managed_environment_id TEXT NOT NULL
        REFERENCES managedenvironment (managedenvironment_id),
    clusteraccess_gitops_engine_instance_id TEXT NOT NULL
        REFERENCES gitopsengineinstance (gitopsengineinstance_id),
    seq_id INTEGER NOT NULL,
    PRIMARY KEY (
        clusteraccess_user_id,
        clusteraccess_managed_environment_id,
        clusteraccess_gitops_engine_instance_id
    )
);
CREATE INDEX IF NOT EXISTS idx_clusteraccess_env
    ON clusteraccess (clusteraccess_managed_environment_id);
CREATE INDEX IF NOT EXISTS idx_clusteraccess_instance
    ON clusteraccess (clusteraccess_gitops_engine_instance_id);

CREATE TABLE IF NOT EXISTS application (
    application_id TEXT PRIMARY KEY,
    seq_id INTEGER NOT NULL,
    name TEXT NOT NULL DEFAULT '',
    spec_field TEXT NOT NULL DEFAULT '',
    engine_instance_inst_id TEXT NOT NULL
        REFERENCES gitopsengineinstance (gitopsengineinstance_id),
    managed_environment_id TEXT NOT NULL
        REFERENCES managedenvironment (managedenvironment_id)
);
CREATE INDEX IF NOT EXISTS idx_application_instance
    ON application (engine_instance_inst_id);
CREATE INDEX IF NOT EXISTS idx_application_env
    ON application (managed_environment_id);

CREATE TABLE IF NOT EXISTS applicationstate (
    applicationstate_application_id TEXT PRIMARY KEY
        REFERENCES application (application_id),
    seq_id INTEGER NOT NULL,
    health TEXT NOT NULL,
    sync_status TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS operation (
    operation_id TEXT PRIMARY KEY,
    seq_id INTEGER NOT NULL,
    instance_id TEXT NOT NULL
        REFERENCES gitopsengineinstance (gitopsengineinstance_id),
    resource_id TEXT NOT NULL,
    resource_type TEXT NOT NULL,
    operation_owner_user_id TEXT NOT NULL
        REFERENCES clusteruser (clusteruser_id),
    created_on INTEGER NOT NULL,
    last_state_update INTEGER NOT NULL,
    state TEXT NOT NULL,
    human_readable_state TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_operation_state
    ON operation (state, last_state_update);
CREATE INDEX IF NOT EXISTS idx_operation_instance
    ON operation (instance_id);
CREATE INDEX IF NOT EXISTS idx_operation_owner
    ON operation (operation_owner_user_id);
";
