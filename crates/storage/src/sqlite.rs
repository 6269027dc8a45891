use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, params};

use gitopsdb_core::{
    Application, ApplicationState, ClusterAccess, ClusterCredentials, ClusterUser,
    GitopsEngineCluster, GitopsEngineInstance, HealthStatus, ManagedEnvironment, Operation,
    OperationState, SyncStatus, ids::*,
};

use crate::error::StorageError;
use crate::traits::{
    ApplicationRepository, ApplicationStateRepository, ClusterAccessRepository,
    ClusterCredentialsRepository, ClusterUserRepository, GitopsEngineClusterRepository,
    GitopsEngineInstanceRepository, ManagedEnvironmentRepository, OperationRepository,
};

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(open_error)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(open_error)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

fn open_error(err: rusqlite::Error) -> StorageError {
    StorageError::Unavailable(err.to_string())
}

/// Translate driver errors at write sites: uniqueness/foreign-key
/// breaches become `ConstraintViolation`, busy/locked becomes
/// `Unavailable`, anything else passes through.
fn classify(err: rusqlite::Error, context: &str) -> StorageError {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StorageError::ConstraintViolation(context.to_string())
        }
        rusqlite::Error::SqliteFailure(e, msg)
            if matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ) =>
        {
            StorageError::Unavailable(msg.unwrap_or_else(|| "database busy".to_string()))
        }
        other => StorageError::Sqlite(other),
    }
}

fn next_seq(tx: &Transaction<'_>) -> Result<i64, StorageError> {
    let seq = tx.query_row(
        "UPDATE seq_counter SET value = value + 1 WHERE id = 1 RETURNING value",
        [],
        |row| row.get(0),
    )?;
    Ok(seq)
}

fn to_millis(t: DateTime<Utc>) -> i64 {
    t.timestamp_millis()
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, StorageError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StorageError::Serialization(format!("timestamp out of range: {ms}")))
}

fn fetch_one<T, P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    read: impl Fn(&rusqlite::Row<'_>) -> Result<T, StorageError>,
    what: &str,
) -> Result<T, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    match rows.next()? {
        Some(row) => read(row),
        None => Err(StorageError::NotFound(what.to_string())),
    }
}

fn fetch_all<T, P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    read: impl Fn(&rusqlite::Row<'_>) -> Result<T, StorageError>,
) -> Result<Vec<T>, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(read(row)?);
    }
    Ok(out)
}

fn expect_row(changed: usize, what: &str) -> Result<(), StorageError> {
    if changed == 0 {
        Err(StorageError::NotFound(what.to_string()))
    } else {
        Ok(())
    }
}

// Row readers, column order matching the SELECT lists below.

fn read_credentials(row: &rusqlite::Row<'_>) -> Result<ClusterCredentials, StorageError> {
    Ok(ClusterCredentials {
        clustercredentials_cred_id: ClusterCredentialsId::new(row.get::<_, String>(0)?),
        seq_id: row.get(1)?,
        host: row.get(2)?,
        kube_config: row.get(3)?,
        kube_config_context: row.get(4)?,
        serviceaccount_bearer_token: row.get(5)?,
        serviceaccount_ns: row.get(6)?,
    })
}

fn read_engine_cluster(row: &rusqlite::Row<'_>) -> Result<GitopsEngineCluster, StorageError> {
    Ok(GitopsEngineCluster {
        gitopsenginecluster_id: GitopsEngineClusterId::new(row.get::<_, String>(0)?),
        seq_id: row.get(1)?,
        clustercredentials_id: ClusterCredentialsId::new(row.get::<_, String>(2)?),
    })
}

fn read_engine_instance(row: &rusqlite::Row<'_>) -> Result<GitopsEngineInstance, StorageError> {
    Ok(GitopsEngineInstance {
        gitopsengineinstance_id: GitopsEngineInstanceId::new(row.get::<_, String>(0)?),
        seq_id: row.get(1)?,
        namespace_name: row.get(2)?,
        namespace_uid: row.get(3)?,
        enginecluster_id: GitopsEngineClusterId::new(row.get::<_, String>(4)?),
    })
}

fn read_managed_environment(row: &rusqlite::Row<'_>) -> Result<ManagedEnvironment, StorageError> {
    Ok(ManagedEnvironment {
        managedenvironment_id: ManagedEnvironmentId::new(row.get::<_, String>(0)?),
        seq_id: row.get(1)?,
        name: row.get(2)?,
        clustercredentials_id: ClusterCredentialsId::new(row.get::<_, String>(3)?),
    })
}

fn read_cluster_user(row: &rusqlite::Row<'_>) -> Result<ClusterUser, StorageError> {
    Ok(ClusterUser {
        clusteruser_id: ClusterUserId::new(row.get::<_, String>(0)?),
        seq_id: row.get(1)?,
        user_name: row.get(2)?,
    })
}

fn read_cluster_access(row: &rusqlite::Row<'_>) -> Result<ClusterAccess, StorageError> {
    Ok(ClusterAccess {
        clusteraccess_user_id: ClusterUserId::new(row.get::<_, String>(0)?),
        clusteraccess_managed_environment_id: ManagedEnvironmentId::new(
            row.get::<_, String>(1)?,
        ),
        clusteraccess_gitops_engine_instance_id: GitopsEngineInstanceId::new(
            row.get::<_, String>(2)?,
        ),
        seq_id: row.get(3)?,
    })
}

fn read_application(row: &rusqlite::Row<'_>) -> Result<Application, StorageError> {
    Ok(Application {
        application_id: ApplicationId::new(row.get::<_, String>(0)?),
        seq_id: row.get(1)?,
        name: row.get(2)?,
        spec_field: row.get(3)?,
        engine_instance_inst_id: GitopsEngineInstanceId::new(row.get::<_, String>(4)?),
        managed_environment_id: ManagedEnvironmentId::new(row.get::<_, String>(5)?),
    })
}

fn read_application_state(row: &rusqlite::Row<'_>) -> Result<ApplicationState, StorageError> {
    let health: String = row.get(2)?;
    let sync_status: String = row.get(3)?;
    Ok(ApplicationState {
        applicationstate_application_id: ApplicationId::new(row.get::<_, String>(0)?),
        seq_id: row.get(1)?,
        health: HealthStatus::parse(&health)?,
        sync_status: SyncStatus::parse(&sync_status)?,
    })
}

fn read_operation(row: &rusqlite::Row<'_>) -> Result<Operation, StorageError> {
    let state: String = row.get(8)?;
    Ok(Operation {
        operation_id: OperationId::new(row.get::<_, String>(0)?),
        seq_id: row.get(1)?,
        instance_id: GitopsEngineInstanceId::new(row.get::<_, String>(2)?),
        resource_id: row.get(3)?,
        resource_type: row.get(4)?,
        operation_owner_user_id: ClusterUserId::new(row.get::<_, String>(5)?),
        created_on: from_millis(row.get(6)?)?,
        last_state_update: from_millis(row.get(7)?)?,
        state: OperationState::parse(&state)?,
        human_readable_state: row.get(9)?,
    })
}

const SELECT_OPERATION: &str = "SELECT operation_id, seq_id, instance_id, resource_id, \
     resource_type, operation_owner_user_id, created_on, last_state_update, state, \
     human_readable_state FROM operation";

impl ClusterCredentialsRepository for SqliteStorage {
    fn create_cluster_credentials(
        &mut self,
        creds: &ClusterCredentials,
    ) -> Result<i64, StorageError> {
        let tx = self.conn.transaction()?;
        let seq = next_seq(&tx)?;
        tx.execute(
            "INSERT INTO clustercredentials (clustercredentials_cred_id, seq_id, host, \
             kube_config, kube_config_context, serviceaccount_bearer_token, serviceaccount_ns) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                creds.clustercredentials_cred_id.as_str(),
                seq,
                creds.host,
                creds.kube_config,
                creds.kube_config_context,
                creds.serviceaccount_bearer_token,
                creds.serviceaccount_ns,
            ],
        )
        .map_err(|e| classify(e, "clustercredentials insert"))?;
        tx.commit()?;
        Ok(seq)
    }

    fn get_cluster_credentials(
        &self,
        id: &ClusterCredentialsId,
    ) -> Result<ClusterCredentials, StorageError> {
        fetch_one(
            &self.conn,
            "SELECT clustercredentials_cred_id, seq_id, host, kube_config, \
             kube_config_context, serviceaccount_bearer_token, serviceaccount_ns \
             FROM clustercredentials WHERE clustercredentials_cred_id = ?1",
            params![id.as_str()],
            read_credentials,
            id.as_str(),
        )
    }

    fn update_cluster_credentials(
        &mut self,
        creds: &ClusterCredentials,
    ) -> Result<(), StorageError> {
        let changed = self
            .conn
            .execute(
                "UPDATE clustercredentials SET host = ?2, kube_config = ?3, \
                 kube_config_context = ?4, serviceaccount_bearer_token = ?5, \
                 serviceaccount_ns = ?6 WHERE clustercredentials_cred_id = ?1",
                params![
                    creds.clustercredentials_cred_id.as_str(),
                    creds.host,
                    creds.kube_config,
                    creds.kube_config_context,
                    creds.serviceaccount_bearer_token,
                    creds.serviceaccount_ns,
                ],
            )
            .map_err(|e| classify(e, "clustercredentials update"))?;
        expect_row(changed, creds.clustercredentials_cred_id.as_str())
    }

    fn delete_cluster_credentials(
        &mut self,
        id: &ClusterCredentialsId,
    ) -> Result<(), StorageError> {
        let changed = self
            .conn
            .execute(
                "DELETE FROM clustercredentials WHERE clustercredentials_cred_id = ?1",
                params![id.as_str()],
            )
            .map_err(|e| classify(e, "clustercredentials delete"))?;
        expect_row(changed, id.as_str())
    }
}

impl GitopsEngineClusterRepository for SqliteStorage {
    fn create_engine_cluster(
        &mut self,
        cluster: &GitopsEngineCluster,
    ) -> Result<i64, StorageError> {
        let tx = self.conn.transaction()?;
        let seq = next_seq(&tx)?;
        tx.execute(
            "INSERT INTO gitopsenginecluster (gitopsenginecluster_id, seq_id, \
             clustercredentials_id) VALUES (?1, ?2, ?3)",
            params![
                cluster.gitopsenginecluster_id.as_str(),
                seq,
                cluster.clustercredentials_id.as_str(),
            ],
        )
        .map_err(|e| classify(e, "gitopsenginecluster insert"))?;
        tx.commit()?;
        Ok(seq)
    }

    fn get_engine_cluster(
        &self,
        id: &GitopsEngineClusterId,
    ) -> Result<GitopsEngineCluster, StorageError> {
        fetch_one(
            &self.conn,
            "SELECT gitopsenginecluster_id, seq_id, clustercredentials_id \
             FROM gitopsenginecluster WHERE gitopsenginecluster_id = ?1",
            params![id.as_str()],
            read_engine_cluster,
            id.as_str(),
        )
    }

    fn update_engine_cluster(
        &mut self,
        cluster: &GitopsEngineCluster,
    ) -> Result<(), StorageError> {
        let changed = self
            .conn
            .execute(
                "UPDATE gitopsenginecluster SET clustercredentials_id = ?2 \
                 WHERE gitopsenginecluster_id = ?1",
                params![
                    cluster.gitopsenginecluster_id.as_str(),
                    cluster.clustercredentials_id.as_str(),
                ],
            )
            .map_err(|e| classify(e, "gitopsenginecluster update"))?;
        expect_row(changed, cluster.gitopsenginecluster_id.as_str())
    }

    fn delete_engine_cluster(&mut self, id: &GitopsEngineClusterId) -> Result<(), StorageError> {
        let changed = self
            .conn
            .execute(
                "DELETE FROM gitopsenginecluster WHERE gitopsenginecluster_id = ?1",
                params![id.as_str()],
            )
            .map_err(|e| classify(e, "gitopsenginecluster delete"))?;
        expect_row(changed, id.as_str())
    }

    fn list_engine_clusters_by_credentials(
        &self,
        credentials_id: &ClusterCredentialsId,
    ) -> Result<Vec<GitopsEngineCluster>, StorageError> {
        fetch_all(
            &self.conn,
            "SELECT gitopsenginecluster_id, seq_id, clustercredentials_id \
             FROM gitopsenginecluster WHERE clustercredentials_id = ?1 ORDER BY seq_id",
            params![credentials_id.as_str()],
            read_engine_cluster,
        )
    }
}

impl GitopsEngineInstanceRepository for SqliteStorage {
    fn create_engine_instance(
        &mut self,
        instance: &GitopsEngineInstance,
    ) -> Result<i64, StorageError> {
        let tx = self.conn.transaction()?;
        let seq = next_seq(&tx)?;
        tx.execute(
            "INSERT INTO gitopsengineinstance (gitopsengineinstance_id, seq_id, \
             namespace_name, namespace_uid, enginecluster_id) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                instance.gitopsengineinstance_id.as_str(),
                seq,
                instance.namespace_name,
                instance.namespace_uid,
                instance.enginecluster_id.as_str(),
            ],
        )
        .map_err(|e| classify(e, "gitopsengineinstance insert"))?;
        tx.commit()?;
        Ok(seq)
    }

    fn get_engine_instance(
        &self,
        id: &GitopsEngineInstanceId,
    ) -> Result<GitopsEngineInstance, StorageError> {
        fetch_one(
            &self.conn,
            "SELECT gitopsengineinstance_id, seq_id, namespace_name, namespace_uid, \
             enginecluster_id FROM gitopsengineinstance WHERE gitopsengineinstance_id = ?1",
            params![id.as_str()],
            read_engine_instance,
            id.as_str(),
        )
    }

    fn update_engine_instance(
        &mut self,
        instance: &GitopsEngineInstance,
    ) -> Result<(), StorageError> {
        let changed = self
            .conn
            .execute(
                "UPDATE gitopsengineinstance SET namespace_name = ?2, namespace_uid = ?3, \
                 enginecluster_id = ?4 WHERE gitopsengineinstance_id = ?1",
                params![
                    instance.gitopsengineinstance_id.as_str(),
                    instance.namespace_name,
                    instance.namespace_uid,
                    instance.enginecluster_id.as_str(),
                ],
            )
            .map_err(|e| classify(e, "gitopsengineinstance update"))?;
        expect_row(changed, instance.gitopsengineinstance_id.as_str())
    }

    fn delete_engine_instance(&mut self, id: &GitopsEngineInstanceId) -> Result<(), StorageError> {
        let changed = self
            .conn
            .execute(
                "DELETE FROM gitopsengineinstance WHERE gitopsengineinstance_id = ?1",
                params![id.as_str()],
            )
            .map_err(|e| classify(e, "gitopsengineinstance delete"))?;
        expect_row(changed, id.as_str())
    }

    fn list_engine_instances_by_cluster(
        &self,
        cluster_id: &GitopsEngineClusterId,
    ) -> Result<Vec<GitopsEngineInstance>, StorageError> {
        fetch_all(
            &self.conn,
            "SELECT gitopsengineinstance_id, seq_id, namespace_name, namespace_uid, \
             enginecluster_id FROM gitopsengineinstance WHERE enginecluster_id = ?1 \
             ORDER BY seq_id",
            params![cluster_id.as_str()],
            read_engine_instance,
        )
    }
}

impl ManagedEnvironmentRepository for SqliteStorage {
    fn create_managed_environment(
        &mut self,
        env: &ManagedEnvironment,
    ) -> Result<i64, StorageError> {
        let tx = self.conn.transaction()?;
        let seq = next_seq(&tx)?;
        tx.execute(
            "INSERT INTO managedenvironment (managedenvironment_id, seq_id, name, \
             clustercredentials_id) VALUES (?1, ?2, ?3, ?4)",
            params![
                env.managedenvironment_id.as_str(),
                seq,
                env.name,
                env.clustercredentials_id.as_str(),
            ],
        )
        .map_err(|e| classify(e, "managedenvironment insert"))?;
        tx.commit()?;
        Ok(seq)
    }

    fn get_managed_environment(
        &self,
        id: &ManagedEnvironmentId,
    ) -> Result<ManagedEnvironment, StorageError> {
        fetch_one(
            &self.conn,
            "SELECT managedenvironment_id, seq_id, name, clustercredentials_id \
             FROM managedenvironment WHERE managedenvironment_id = ?1",
            params![id.as_str()],
            read_managed_environment,
            id.as_str(),
        )
    }

    fn update_managed_environment(
        &mut self,
        env: &ManagedEnvironment,
    ) -> Result<(), StorageError> {
        let changed = self
            .conn
            .execute(
                "UPDATE managedenvironment SET name = ?2, clustercredentials_id = ?3 \
                 WHERE managedenvironment_id = ?1",
                params![
                    env.managedenvironment_id.as_str(),
                    env.name,
                    env.clustercredentials_id.as_str(),
                ],
            )
            .map_err(|e| classify(e, "managedenvironment update"))?;
        expect_row(changed, env.managedenvironment_id.as_str())
    }

    fn delete_managed_environment(
        &mut self,
        id: &ManagedEnvironmentId,
    ) -> Result<(), StorageError> {
        let changed = self
            .conn
            .execute(
                "DELETE FROM managedenvironment WHERE managedenvironment_id = ?1",
                params![id.as_str()],
            )
            .map_err(|e| classify(e, "managedenvironment delete"))?;
        expect_row(changed, id.as_str())
    }

    fn list_managed_environments_by_credentials(
        &self,
        credentials_id: &ClusterCredentialsId,
    ) -> Result<Vec<ManagedEnvironment>, StorageError> {
        fetch_all(
            &self.conn,
            "SELECT managedenvironment_id, seq_id, name, clustercredentials_id \
             FROM managedenvironment WHERE clustercredentials_id = ?1 ORDER BY seq_id",
            params![credentials_id.as_str()],
            read_managed_environment,
        )
    }
}

impl ClusterUserRepository for SqliteStorage {
    fn create_cluster_user(&mut self, user: &ClusterUser) -> Result<i64, StorageError> {
        let tx = self.conn.transaction()?;
        let seq = next_seq(&tx)?;
        tx.execute(
            "INSERT INTO clusteruser (clusteruser_id, seq_id, user_name) VALUES (?1, ?2, ?3)",
            params![user.clusteruser_id.as_str(), seq, user.user_name],
        )
        .map_err(|e| classify(e, "clusteruser insert"))?;
        tx.commit()?;
        Ok(seq)
    }

    fn get_cluster_user(&self, id: &ClusterUserId) -> Result<ClusterUser, StorageError> {
        fetch_one(
            &self.conn,
            "SELECT clusteruser_id, seq_id, user_name FROM clusteruser \
             WHERE clusteruser_id = ?1",
            params![id.as_str()],
            read_cluster_user,
            id.as_str(),
        )
    }

    fn update_cluster_user(&mut self, user: &ClusterUser) -> Result<(), StorageError> {
        let changed = self
            .conn
            .execute(
                "UPDATE clusteruser SET user_name = ?2 WHERE clusteruser_id = ?1",
                params![user.clusteruser_id.as_str(), user.user_name],
            )
            .map_err(|e| classify(e, "clusteruser update"))?;
        expect_row(changed, user.clusteruser_id.as_str())
    }

    fn delete_cluster_user(&mut self, id: &ClusterUserId) -> Result<(), StorageError> {
        let changed = self
            .conn
            .execute(
                "DELETE FROM clusteruser WHERE clusteruser_id = ?1",
                params![id.as_str()],
            )
            .map_err(|e| classify(e, "clusteruser delete"))?;
        expect_row(changed, id.as_str())
    }
}

impl ClusterAccessRepository for SqliteStorage {
    fn create_cluster_access(&mut self, access: &ClusterAccess) -> Result<i64, StorageError> {
        let tx = self.conn.transaction()?;
        let seq = next_seq(&tx)?;
        tx.execute(
            "INSERT INTO clusteraccess (clusteraccess_user_id, \
             clusteraccess_managed_environment_id, \
             clusteraccess_gitops_engine_instance_id, seq_id) VALUES (?1, ?2, ?3, ?4)",
            params![
                access.clusteraccess_user_id.as_str(),
                access.clusteraccess_managed_environment_id.as_str(),
                access.clusteraccess_gitops_engine_instance_id.as_str(),
                seq,
            ],
        )
        .map_err(|e| classify(e, "clusteraccess insert"))?;
        tx.commit()?;
        Ok(seq)
    }

    fn get_cluster_access(
        &self,
        user_id: &ClusterUserId,
        environment_id: &ManagedEnvironmentId,
        instance_id: &GitopsEngineInstanceId,
    ) -> Result<ClusterAccess, StorageError> {
        fetch_one(
            &self.conn,
            "SELECT clusteraccess_user_id, clusteraccess_managed_environment_id, \
             clusteraccess_gitops_engine_instance_id, seq_id FROM clusteraccess \
             WHERE clusteraccess_user_id = ?1 \
               AND clusteraccess_managed_environment_id = ?2 \
               AND clusteraccess_gitops_engine_instance_id = ?3",
            params![user_id.as_str(), environment_id.as_str(), instance_id.as_str()],
            read_cluster_access,
            user_id.as_str(),
        )
    }

    fn delete_cluster_access(
        &mut self,
        user_id: &ClusterUserId,
        environment_id: &ManagedEnvironmentId,
        instance_id: &GitopsEngineInstanceId,
    ) -> Result<(), StorageError> {
        let changed = self
            .conn
            .execute(
                "DELETE FROM clusteraccess \
                 WHERE clusteraccess_user_id = ?1 \
                   AND clusteraccess_managed_environment_id = ?2 \
                   AND clusteraccess_gitops_engine_instance_id = ?3",
                params![user_id.as_str(), environment_id.as_str(), instance_id.as_str()],
            )
            .map_err(|e| classify(e, "clusteraccess delete"))?;
        expect_row(changed, user_id.as_str())
    }

    fn list_cluster_access_by_user(
        &self,
        user_id: &ClusterUserId,
    ) -> Result<Vec<ClusterAccess>, StorageError> {
        fetch_all(
            &self.conn,
            "SELECT clusteraccess_user_id, clusteraccess_managed_environment_id, \
             clusteraccess_gitops_engine_instance_id, seq_id FROM clusteraccess \
             WHERE clusteraccess_user_id = ?1 ORDER BY seq_id",
            params![user_id.as_str()],
            read_cluster_access,
        )
    }

    fn list_cluster_access_by_managed_environment(
        &self,
        environment_id: &ManagedEnvironmentId,
    ) -> Result<Vec<ClusterAccess>, StorageError> {
        fetch_all(
            &self.conn,
            "SELECT clusteraccess_user_id, clusteraccess_managed_environment_id, \
             clusteraccess_gitops_engine_instance_id, seq_id FROM clusteraccess \
             WHERE clusteraccess_managed_environment_id = ?1 ORDER BY seq_id",
            params![environment_id.as_str()],
            read_cluster_access,
        )
    }

    fn list_cluster_access_by_engine_instance(
        &self,
        instance_id: &GitopsEngineInstanceId,
    ) -> Result<Vec<ClusterAccess>, StorageError> {
        fetch_all(
            &self.conn,
            "SELECT clusteraccess_user_id, clusteraccess_managed_environment_id, \
             clusteraccess_gitops_engine_instance_id, seq_id FROM clusteraccess \
             WHERE clusteraccess_gitops_engine_instance_id = ?1 ORDER BY seq_id",
            params![instance_id.as_str()],
            read_cluster_access,
        )
    }
}

impl ApplicationRepository for SqliteStorage {
    fn create_application(&mut self, app: &Application) -> Result<i64, StorageError> {
        let tx = self.conn.transaction()?;
        let seq = next_seq(&tx)?;
        tx.execute(
            "INSERT INTO application (application_id, seq_id, name, spec_field, \
             engine_instance_inst_id, managed_environment_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                app.application_id.as_str(),
                seq,
                app.name,
                app.spec_field,
                app.engine_instance_inst_id.as_str(),
                app.managed_environment_id.as_str(),
            ],
        )
        .map_err(|e| classify(e, "application insert"))?;
        tx.commit()?;
        Ok(seq)
    }

    fn get_application(&self, id: &ApplicationId) -> Result<Application, StorageError> {
        fetch_one(
            &self.conn,
            "SELECT application_id, seq_id, name, spec_field, engine_instance_inst_id, \
             managed_environment_id FROM application WHERE application_id = ?1",
            params![id.as_str()],
            read_application,
            id.as_str(),
        )
    }

    fn update_application(&mut self, app: &Application) -> Result<(), StorageError> {
        let changed = self
            .conn
            .execute(
                "UPDATE application SET name = ?2, spec_field = ?3, \
                 engine_instance_inst_id = ?4, managed_environment_id = ?5 \
                 WHERE application_id = ?1",
                params![
                    app.application_id.as_str(),
                    app.name,
                    app.spec_field,
                    app.engine_instance_inst_id.as_str(),
                    app.managed_environment_id.as_str(),
                ],
            )
            .map_err(|e| classify(e, "application update"))?;
        expect_row(changed, app.application_id.as_str())
    }

    fn delete_application(&mut self, id: &ApplicationId) -> Result<(), StorageError> {
        let changed = self
            .conn
            .execute(
                "DELETE FROM application WHERE application_id = ?1",
                params![id.as_str()],
            )
            .map_err(|e| classify(e, "application delete"))?;
        expect_row(changed, id.as_str())
    }

    fn list_applications_by_engine_instance(
        &self,
        instance_id: &GitopsEngineInstanceId,
    ) -> Result<Vec<Application>, StorageError> {
        fetch_all(
            &self.conn,
            "SELECT application_id, seq_id, name, spec_field, engine_instance_inst_id, \
             managed_environment_id FROM application WHERE engine_instance_inst_id = ?1 \
             ORDER BY seq_id",
            params![instance_id.as_str()],
            read_application,
        )
    }

    fn list_applications_by_managed_environment(
        &self,
        environment_id: &ManagedEnvironmentId,
    ) -> Result<Vec<Application>, StorageError> {
        fetch_all(
            &self.conn,
            "SELECT application_id, seq_id, name, spec_field, engine_instance_inst_id, \
             managed_environment_id FROM application WHERE managed_environment_id = ?1 \
             ORDER BY seq_id",
            params![environment_id.as_str()],
            read_application,
        )
    }
}

impl ApplicationStateRepository for SqliteStorage {
    fn upsert_application_state(&mut self, state: &ApplicationState) -> Result<i64, StorageError> {
        let tx = self.conn.transaction()?;
        let seq = next_seq(&tx)?;
        tx.execute(
            "INSERT INTO applicationstate (applicationstate_application_id, seq_id, health, \
             sync_status) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT (applicationstate_application_id) \
             DO UPDATE SET seq_id = ?2, health = ?3, sync_status = ?4",
            params![
                state.applicationstate_application_id.as_str(),
                seq,
                state.health.as_str(),
                state.sync_status.as_str(),
            ],
        )
        .map_err(|e| classify(e, "applicationstate upsert"))?;
        tx.commit()?;
        Ok(seq)
    }

    fn get_application_state(&self, id: &ApplicationId) -> Result<ApplicationState, StorageError> {
        fetch_one(
            &self.conn,
            "SELECT applicationstate_application_id, seq_id, health, sync_status \
             FROM applicationstate WHERE applicationstate_application_id = ?1",
            params![id.as_str()],
            read_application_state,
            id.as_str(),
        )
    }

    fn delete_application_state(&mut self, id: &ApplicationId) -> Result<(), StorageError> {
        let changed = self
            .conn
            .execute(
                "DELETE FROM applicationstate WHERE applicationstate_application_id = ?1",
                params![id.as_str()],
            )
            .map_err(|e| classify(e, "applicationstate delete"))?;
        expect_row(changed, id.as_str())
    }
}

impl OperationRepository for SqliteStorage {
    fn create_operation(&mut self, op: &Operation) -> Result<i64, StorageError> {
        let tx = self.conn.transaction()?;
        let seq = next_seq(&tx)?;
        tx.execute(
            "INSERT INTO operation (operation_id, seq_id, instance_id, resource_id, \
             resource_type, operation_owner_user_id, created_on, last_state_update, state, \
             human_readable_state) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                op.operation_id.as_str(),
                seq,
                op.instance_id.as_str(),
                op.resource_id,
                op.resource_type,
                op.operation_owner_user_id.as_str(),
                to_millis(op.created_on),
                to_millis(op.last_state_update),
                op.state.as_str(),
                op.human_readable_state,
            ],
        )
        .map_err(|e| classify(e, "operation insert"))?;
        tx.commit()?;
        Ok(seq)
    }

    fn get_operation(&self, id: &OperationId) -> Result<Operation, StorageError> {
        fetch_one(
            &self.conn,
            &format!("{SELECT_OPERATION} WHERE operation_id = ?1"),
            params![id.as_str()],
            read_operation,
            id.as_str(),
        )
    }

    fn delete_operation(&mut self, id: &OperationId) -> Result<(), StorageError> {
        let changed = self
            .conn
            .execute(
                "DELETE FROM operation WHERE operation_id = ?1",
                params![id.as_str()],
            )
            .map_err(|e| classify(e, "operation delete"))?;
        expect_row(changed, id.as_str())
    }

    fn list_operations_by_instance(
        &self,
        instance_id: &GitopsEngineInstanceId,
    ) -> Result<Vec<Operation>, StorageError> {
        fetch_all(
            &self.conn,
            &format!("{SELECT_OPERATION} WHERE instance_id = ?1 ORDER BY seq_id"),
            params![instance_id.as_str()],
            read_operation,
        )
    }

    fn list_operations_by_owner(
        &self,
        owner_user_id: &ClusterUserId,
    ) -> Result<Vec<Operation>, StorageError> {
        fetch_all(
            &self.conn,
            &format!("{SELECT_OPERATION} WHERE operation_owner_user_id = ?1 ORDER BY seq_id"),
            params![owner_user_id.as_str()],
            read_operation,
        )
    }

    fn list_waiting_operations(&self) -> Result<Vec<Operation>, StorageError> {
        fetch_all(
            &self.conn,
            &format!("{SELECT_OPERATION} WHERE state = 'Waiting' ORDER BY seq_id"),
            [],
            read_operation,
        )
    }

    fn compare_and_swap_operation_state(
        &mut self,
        id: &OperationId,
        from: OperationState,
        to: OperationState,
        message: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let changed = self
            .conn
            .execute(
                "UPDATE operation SET state = ?1, last_state_update = ?2, \
                 human_readable_state = COALESCE(?3, human_readable_state) \
                 WHERE operation_id = ?4 AND state = ?5",
                params![
                    to.as_str(),
                    to_millis(now),
                    message,
                    id.as_str(),
                    from.as_str(),
                ],
            )
            .map_err(|e| classify(e, "operation state swap"))?;
        Ok(changed == 1)
    }

    fn list_stale_in_progress(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<Operation>, StorageError> {
        fetch_all(
            &self.conn,
            &format!(
                "{SELECT_OPERATION} WHERE state = 'In_Progress' AND last_state_update < ?1 \
                 ORDER BY last_state_update"
            ),
            params![to_millis(older_than)],
            read_operation,
        )
    }

    fn delete_terminal_operations_before(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, StorageError> {
        let deleted = self
            .conn
            .execute(
                "DELETE FROM operation WHERE state IN ('Completed', 'Failed') \
                 AND last_state_update < ?1",
                params![to_millis(cutoff)],
            )
            .map_err(|e| classify(e, "operation gc"))?;
        Ok(deleted)
    }
}
