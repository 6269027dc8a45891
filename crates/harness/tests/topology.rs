use gitopsdb_core::{
    Application, ApplicationState, ClusterAccess, ClusterCredentials, ClusterUser, CredentialMode,
    GitopsEngineCluster, GitopsEngineInstance, HealthStatus, ManagedEnvironment, SyncStatus,
    ids::*,
};
use gitopsdb_harness::TestPlane;
use gitopsdb_storage::{
    ApplicationRepository, ApplicationStateRepository, ClusterAccessRepository,
    ClusterCredentialsRepository, ClusterUserRepository, GitopsEngineClusterRepository,
    GitopsEngineInstanceRepository, ManagedEnvironmentRepository, StorageError,
};

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn cluster_credentials_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let mut plane = TestPlane::new()?;
    let id = ClusterCredentialsId::new(TestPlane::uid("cred"));
    let mut creds = ClusterCredentials {
        clustercredentials_cred_id: id.clone(),
        seq_id: 0,
        host: "https://api.prod.example.com:6443".into(),
        kube_config: "apiVersion: v1\nkind: Config".into(),
        kube_config_context: "prod-admin".into(),
        serviceaccount_bearer_token: String::new(),
        serviceaccount_ns: String::new(),
    };
    creds.seq_id = plane.storage.create_cluster_credentials(&creds)?;

    let fetched = plane.storage.get_cluster_credentials(&id)?;
    assert_eq!(fetched, creds);
    assert_eq!(fetched.mode(), CredentialMode::Kubeconfig);
    Ok(())
}

#[test]
fn engine_cluster_and_instance_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let mut plane = TestPlane::new()?;
    let creds = plane.seed_credentials()?;

    let cluster_id = GitopsEngineClusterId::new(TestPlane::uid("engine-cluster"));
    let mut cluster = GitopsEngineCluster {
        gitopsenginecluster_id: cluster_id.clone(),
        seq_id: 0,
        clustercredentials_id: creds,
    };
    cluster.seq_id = plane.storage.create_engine_cluster(&cluster)?;
    assert_eq!(plane.storage.get_engine_cluster(&cluster_id)?, cluster);

    let instance_id = GitopsEngineInstanceId::new(TestPlane::uid("engine-instance"));
    let mut instance = GitopsEngineInstance {
        gitopsengineinstance_id: instance_id.clone(),
        seq_id: 0,
        namespace_name: "argocd".into(),
        namespace_uid: TestPlane::uid("ns"),
        enginecluster_id: cluster_id.clone(),
    };
    instance.seq_id = plane.storage.create_engine_instance(&instance)?;
    assert_eq!(plane.storage.get_engine_instance(&instance_id)?, instance);
    Ok(())
}

#[test]
fn managed_environment_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let mut plane = TestPlane::new()?;
    let creds = plane.seed_credentials()?;
    let id = ManagedEnvironmentId::new(TestPlane::uid("env"));
    let mut env = ManagedEnvironment {
        managedenvironment_id: id.clone(),
        seq_id: 0,
        name: "production".into(),
        clustercredentials_id: creds,
    };
    env.seq_id = plane.storage.create_managed_environment(&env)?;
    assert_eq!(plane.storage.get_managed_environment(&id)?, env);
    Ok(())
}

#[test]
fn cluster_user_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let mut plane = TestPlane::new()?;
    let id = ClusterUserId::new(TestPlane::uid("user"));
    let mut user = ClusterUser {
        clusteruser_id: id.clone(),
        seq_id: 0,
        user_name: "sam".into(),
    };
    user.seq_id = plane.storage.create_cluster_user(&user)?;
    assert_eq!(plane.storage.get_cluster_user(&id)?, user);
    Ok(())
}

#[test]
fn application_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let mut plane = TestPlane::new()?;
    let instance = plane.seed_engine_instance()?;
    let env = plane.seed_environment()?;

    let id = ApplicationId::new(TestPlane::uid("app"));
    let mut app = Application {
        application_id: id.clone(),
        seq_id: 0,
        name: "guestbook".into(),
        spec_field: r#"{"destination":{"namespace":"guestbook"}}"#.into(),
        engine_instance_inst_id: instance,
        managed_environment_id: env,
    };
    app.seq_id = plane.storage.create_application(&app)?;
    assert_eq!(plane.storage.get_application(&id)?, app);
    Ok(())
}

// ============================================================================
// Update in place
// ============================================================================

#[test]
fn credentials_promote_to_service_account_mode() -> Result<(), Box<dyn std::error::Error>> {
    let mut plane = TestPlane::new()?;
    let id = plane.seed_credentials()?;
    assert_eq!(
        plane.storage.get_cluster_credentials(&id)?.mode(),
        CredentialMode::Kubeconfig
    );

    // The cluster agent exchanged the kubeconfig for a bearer token.
    let mut creds = plane.storage.get_cluster_credentials(&id)?;
    creds.serviceaccount_bearer_token = "sa-token".into();
    creds.serviceaccount_ns = "gitops-service".into();
    plane.storage.update_cluster_credentials(&creds)?;

    let fetched = plane.storage.get_cluster_credentials(&id)?;
    assert_eq!(fetched.mode(), CredentialMode::ServiceAccount);
    assert_eq!(fetched.serviceaccount_ns, "gitops-service");
    Ok(())
}

#[test]
fn application_spec_updates_in_place() -> Result<(), Box<dyn std::error::Error>> {
    let mut plane = TestPlane::new()?;
    let instance = plane.seed_engine_instance()?;
    let env = plane.seed_environment()?;
    let app_id = plane.seed_application(&instance, &env)?;

    let mut app = plane.storage.get_application(&app_id)?;
    app.spec_field = r#"{"source":{"targetRevision":"v2"}}"#.into();
    plane.storage.update_application(&app)?;

    assert_eq!(
        plane.storage.get_application(&app_id)?.spec_field,
        r#"{"source":{"targetRevision":"v2"}}"#
    );
    Ok(())
}

#[test]
fn update_of_missing_row_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
    let mut plane = TestPlane::new()?;
    let user = ClusterUser {
        clusteruser_id: ClusterUserId::new("ghost"),
        seq_id: 0,
        user_name: "nobody".into(),
    };
    let err = plane.storage.update_cluster_user(&user).unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
    Ok(())
}

// ============================================================================
// Missing keys and constraints
// ============================================================================

#[test]
fn get_of_missing_keys_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
    let plane = TestPlane::new()?;
    assert!(matches!(
        plane
            .storage
            .get_cluster_credentials(&ClusterCredentialsId::new("nope")),
        Err(StorageError::NotFound(_))
    ));
    assert!(matches!(
        plane
            .storage
            .get_managed_environment(&ManagedEnvironmentId::new("nope")),
        Err(StorageError::NotFound(_))
    ));
    assert!(matches!(
        plane.storage.get_application(&ApplicationId::new("nope")),
        Err(StorageError::NotFound(_))
    ));
    Ok(())
}

#[test]
fn duplicate_primary_key_is_a_constraint_violation() -> Result<(), Box<dyn std::error::Error>> {
    let mut plane = TestPlane::new()?;
    let id = plane.seed_user()?;
    let dup = ClusterUser {
        clusteruser_id: id,
        seq_id: 0,
        user_name: "someone else".into(),
    };
    let err = plane.storage.create_cluster_user(&dup).unwrap_err();
    assert!(matches!(err, StorageError::ConstraintViolation(_)));
    Ok(())
}

#[test]
fn dangling_foreign_key_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut plane = TestPlane::new()?;
    let env = ManagedEnvironment {
        managedenvironment_id: ManagedEnvironmentId::new(TestPlane::uid("env")),
        seq_id: 0,
        name: "orphan".into(),
        clustercredentials_id: ClusterCredentialsId::new("no-such-creds"),
    };
    let err = plane.storage.create_managed_environment(&env).unwrap_err();
    assert!(matches!(err, StorageError::ConstraintViolation(_)));
    Ok(())
}

#[test]
fn duplicate_cluster_access_triple_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut plane = TestPlane::new()?;
    let user = plane.seed_user()?;
    let env = plane.seed_environment()?;
    let instance = plane.seed_engine_instance()?;

    plane.seed_access(&user, &env, &instance)?;
    let err = plane
        .storage
        .create_cluster_access(&ClusterAccess {
            clusteraccess_user_id: user.clone(),
            clusteraccess_managed_environment_id: env.clone(),
            clusteraccess_gitops_engine_instance_id: instance.clone(),
            seq_id: 0,
        })
        .unwrap_err();
    assert!(matches!(err, StorageError::ConstraintViolation(_)));

    // Varying any leg of the triple is a different grant.
    let other_instance = plane.seed_engine_instance()?;
    plane.seed_access(&user, &env, &other_instance)?;
    assert_eq!(plane.storage.list_cluster_access_by_user(&user)?.len(), 2);
    Ok(())
}

#[test]
fn deletes_do_not_cascade() -> Result<(), Box<dyn std::error::Error>> {
    let mut plane = TestPlane::new()?;
    let creds = plane.seed_credentials()?;
    let env = ManagedEnvironment {
        managedenvironment_id: ManagedEnvironmentId::new(TestPlane::uid("env")),
        seq_id: 0,
        name: "pinned".into(),
        clustercredentials_id: creds.clone(),
    };
    plane.storage.create_managed_environment(&env)?;

    // Credentials are still referenced; the delete is rejected, the
    // environment untouched. Cleanup ordering is the caller's job.
    let err = plane.storage.delete_cluster_credentials(&creds).unwrap_err();
    assert!(matches!(err, StorageError::ConstraintViolation(_)));
    plane
        .storage
        .get_managed_environment(&env.managedenvironment_id)?;

    plane
        .storage
        .delete_managed_environment(&env.managedenvironment_id)?;
    plane.storage.delete_cluster_credentials(&creds)?;
    Ok(())
}

// ============================================================================
// Lookups by foreign key
// ============================================================================

#[test]
fn instances_list_by_engine_cluster() -> Result<(), Box<dyn std::error::Error>> {
    let mut plane = TestPlane::new()?;
    let cluster = plane.seed_engine_cluster()?;
    let a = plane.seed_engine_instance_on(&cluster)?;
    let b = plane.seed_engine_instance_on(&cluster)?;
    let _elsewhere = plane.seed_engine_instance()?;

    let instances = plane.storage.list_engine_instances_by_cluster(&cluster)?;
    let ids: Vec<_> = instances
        .iter()
        .map(|i| i.gitopsengineinstance_id.clone())
        .collect();
    assert_eq!(ids, vec![a, b]);
    Ok(())
}

#[test]
fn applications_list_by_instance_and_environment() -> Result<(), Box<dyn std::error::Error>> {
    let mut plane = TestPlane::new()?;
    let instance = plane.seed_engine_instance()?;
    let env = plane.seed_environment()?;
    let other_env = plane.seed_environment()?;

    let a = plane.seed_application(&instance, &env)?;
    let b = plane.seed_application(&instance, &other_env)?;

    let by_instance = plane.storage.list_applications_by_engine_instance(&instance)?;
    assert_eq!(by_instance.len(), 2);

    let by_env = plane.storage.list_applications_by_managed_environment(&env)?;
    assert_eq!(by_env.len(), 1);
    assert_eq!(by_env[0].application_id, a);

    let by_other = plane
        .storage
        .list_applications_by_managed_environment(&other_env)?;
    assert_eq!(by_other[0].application_id, b);
    Ok(())
}

#[test]
fn environments_list_by_shared_credentials() -> Result<(), Box<dyn std::error::Error>> {
    let mut plane = TestPlane::new()?;
    let creds = plane.seed_credentials()?;
    for name in ["dev", "stage"] {
        plane.storage.create_managed_environment(&ManagedEnvironment {
            managedenvironment_id: ManagedEnvironmentId::new(TestPlane::uid("env")),
            seq_id: 0,
            name: name.into(),
            clustercredentials_id: creds.clone(),
        })?;
    }
    let envs = plane.storage.list_managed_environments_by_credentials(&creds)?;
    let names: Vec<_> = envs.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["dev", "stage"]);
    Ok(())
}

#[test]
fn access_grants_list_by_each_leg() -> Result<(), Box<dyn std::error::Error>> {
    let mut plane = TestPlane::new()?;
    let user = plane.seed_user()?;
    let other_user = plane.seed_user()?;
    let env = plane.seed_environment()?;
    let instance = plane.seed_engine_instance()?;
    let other_instance = plane.seed_engine_instance()?;

    plane.seed_access(&user, &env, &instance)?;
    plane.seed_access(&other_user, &env, &instance)?;
    plane.seed_access(&user, &env, &other_instance)?;

    assert_eq!(plane.storage.list_cluster_access_by_user(&user)?.len(), 2);
    assert_eq!(
        plane
            .storage
            .list_cluster_access_by_managed_environment(&env)?
            .len(),
        3
    );
    let by_instance = plane
        .storage
        .list_cluster_access_by_engine_instance(&instance)?;
    assert_eq!(by_instance.len(), 2);
    assert!(
        by_instance
            .iter()
            .all(|a| a.clusteraccess_gitops_engine_instance_id == instance)
    );
    Ok(())
}

// ============================================================================
// Observed application state
// ============================================================================

#[test]
fn application_state_is_overwritten_by_observation() -> Result<(), Box<dyn std::error::Error>> {
    let mut plane = TestPlane::new()?;
    let instance = plane.seed_engine_instance()?;
    let env = plane.seed_environment()?;
    let app = plane.seed_application(&instance, &env)?;

    plane.storage.upsert_application_state(&ApplicationState {
        applicationstate_application_id: app.clone(),
        seq_id: 0,
        health: HealthStatus::Progressing,
        sync_status: SyncStatus::OutOfSync,
    })?;
    plane.storage.upsert_application_state(&ApplicationState {
        applicationstate_application_id: app.clone(),
        seq_id: 0,
        health: HealthStatus::Healthy,
        sync_status: SyncStatus::Synced,
    })?;

    let observed = plane.storage.get_application_state(&app)?;
    assert_eq!(observed.health, HealthStatus::Healthy);
    assert_eq!(observed.sync_status, SyncStatus::Synced);
    Ok(())
}

#[test]
fn application_state_requires_an_application() -> Result<(), Box<dyn std::error::Error>> {
    let mut plane = TestPlane::new()?;
    let err = plane
        .storage
        .upsert_application_state(&ApplicationState {
            applicationstate_application_id: ApplicationId::new("no-such-app"),
            seq_id: 0,
            health: HealthStatus::Unknown,
            sync_status: SyncStatus::OutOfSync,
        })
        .unwrap_err();
    assert!(matches!(err, StorageError::ConstraintViolation(_)));
    Ok(())
}
