//! Reconciliation: turn change list entries into deployment API calls.
//!
//! | Status | Action |
//! |--------|--------|
//! | `M` | update the recorded instance, or provision if none is recorded |
//! | `A` | provision unless an instance is already recorded |
//! | `D` | warn only; deprovisioning is not supported |
//!
//! Provisioning failures abort the run: a created instance whose ID never
//! reached `instance.yaml` cannot be repaired automatically. Update failures
//! only affect their own entry.

use crate::changes::{ChangeLine, ChangeRecord, ChangeStatus};
use crate::classify::{Classification, SkipReason, classify};
use crate::error::{Error, Result};
use crate::instance::{
    INSTANCE_FILE, InstanceConfig, KEY_APP, KEY_CLUSTER, KEY_GROUP, MalformedLinePolicy,
    VALUES_FILE, append_instance_id, read_instance_config, read_values,
};
use crate::signal::PushSignal;
use crate::types::{Outcome, RunSummary};
use slate::{Client, ProvisionedId, RetryPolicy, STATUS_OK};
use std::path::{Path, PathBuf};

/// Options for a reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Repository root that container paths are relative to.
    pub root: PathBuf,
    /// Polling policy for recovering IDs missing from create responses.
    pub provisioning: RetryPolicy,
    /// Handling of malformed `instance.yaml` lines.
    pub malformed_lines: MalformedLinePolicy,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            provisioning: RetryPolicy::provisioning(),
            malformed_lines: MalformedLinePolicy::Warn,
        }
    }
}

/// Drives the deployment API from change list entries.
pub struct Reconciler {
    client: Client,
    options: ReconcileOptions,
}

impl Reconciler {
    /// Create a reconciler.
    pub fn new(client: Client, options: ReconcileOptions) -> Self {
        Self { client, options }
    }

    /// Process every line in order.
    ///
    /// `signal` is notified after each entry that changed repository or
    /// remote state. Returns at the first fatal error; entries after it are
    /// not processed.
    pub fn run(&self, lines: &[ChangeLine], signal: &mut dyn PushSignal) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for line in lines {
            match line {
                ChangeLine::Record(record) => {
                    let outcome = self.apply(record)?;
                    if outcome.requires_push() {
                        signal.push_required();
                    }
                    summary.add(Some(record.clone()), outcome);
                }
                ChangeLine::Malformed { line, content } => {
                    log::warn!("Skipping malformed change entry on line {line}: {content:?}");
                    summary.add(
                        None,
                        Outcome::Skipped {
                            reason: SkipReason::MalformedLine,
                        },
                    );
                }
                ChangeLine::UnknownStatus { line, status, path } => {
                    if let Classification::Skip(reason) = classify(path) {
                        log::warn!("Skipping file {path} with status '{status}' ({reason})");
                        summary.add(None, Outcome::Skipped { reason });
                        continue;
                    }
                    log::error!("Invalid file status '{status}' passed for {path}");
                    return Err(Error::UnknownStatus {
                        line: *line,
                        status: status.clone(),
                        path: path.clone(),
                    });
                }
            }
        }

        Ok(summary)
    }

    /// Process a single entry.
    pub fn apply(&self, record: &ChangeRecord) -> Result<Outcome> {
        log::info!("{record}");

        let container = match classify(&record.path) {
            Classification::Container(container) => container,
            Classification::VersionUpdate(container) => {
                log::error!("Not implemented: version update for {container}");
                return Ok(Outcome::Skipped {
                    reason: SkipReason::VersionUpdate,
                });
            }
            Classification::Skip(reason) => {
                log::warn!("Skipping file {} ({reason})", record.path);
                return Ok(Outcome::Skipped { reason });
            }
        };

        match record.status {
            ChangeStatus::Modified => self.update(&container),
            ChangeStatus::Added => self.create(&container),
            ChangeStatus::Deleted => {
                log::warn!(
                    "Deletion is not implemented. The instance for {container} is still running in SLATE despite file deletion."
                );
                Ok(Outcome::DeletionUnsupported)
            }
        }
    }

    fn container_dir(&self, container: &str) -> PathBuf {
        self.options.root.join(container)
    }

    fn read_config(&self, dir: &Path) -> Result<InstanceConfig> {
        read_instance_config(&dir.join(INSTANCE_FILE), self.options.malformed_lines)
    }

    fn update(&self, container: &str) -> Result<Outcome> {
        let dir = self.container_dir(container);
        let config = self.read_config(&dir)?;

        let Some(id) = config.instance_id() else {
            log::error!(
                "Failed to find instance ID for {container} in {}",
                dir.join(INSTANCE_FILE).display()
            );
            log::warn!("Trying to add instance instead...");
            return self.provision(container, &dir, &config);
        };

        let payload = read_values(&dir.join(VALUES_FILE))?;
        match self.client.update(id, &payload) {
            Ok(STATUS_OK) => {
                log::info!("Successfully updated instance {id}");
                Ok(Outcome::Updated { id: id.to_string() })
            }
            Ok(status) => {
                log::error!("Encountered error while updating instance {id}");
                log::error!("Got a {status} from the server");
                log::error!("Processing next entry");
                Ok(Outcome::UpdateFailed {
                    id: id.to_string(),
                    status: Some(status),
                })
            }
            Err(e) => {
                log::error!("Encountered error while updating instance {id}: {e}");
                log::error!("Processing next entry");
                Ok(Outcome::UpdateFailed {
                    id: id.to_string(),
                    status: None,
                })
            }
        }
    }

    fn create(&self, container: &str) -> Result<Outcome> {
        let dir = self.container_dir(container);
        let config = self.read_config(&dir)?;
        self.provision(container, &dir, &config)
    }

    fn provision(&self, container: &str, dir: &Path, config: &InstanceConfig) -> Result<Outcome> {
        let instance_path = dir.join(INSTANCE_FILE);

        if let Some(id) = config.instance_id() {
            log::warn!("Detected newly added but existing instance {id}, no changes to make");
            return Ok(Outcome::AlreadyProvisioned { id: id.to_string() });
        }

        let cluster = required(config.cluster(), KEY_CLUSTER, &instance_path)?;
        let group = required(config.group(), KEY_GROUP, &instance_path)?;
        let app = required(config.app(), KEY_APP, &instance_path)?;
        if let Some(version) = config.app_version() {
            log::debug!("{container} pins {app} version {version}");
        }

        let payload = read_values(&dir.join(VALUES_FILE))?;
        log::info!("Creating {app} on {cluster} for group {group}");
        let response = self.client.create(cluster, group, app, &payload)?;

        if !response.is_success() {
            log::error!("Encountered error while adding instance");
            log::error!("Got a {} from the server", response.status);
            return Err(Error::CreateRejected {
                container: container.to_string(),
                status: response.status,
                body: response.body,
            });
        }

        let id = match response.id {
            ProvisionedId::Assigned(id) => id,
            ProvisionedId::Absent => {
                log::warn!("Did not get an instance id in response");
                self.recover_id(cluster, app)?
            }
            ProvisionedId::Blank => {
                log::warn!("Got a blank instance id in response");
                self.recover_id(cluster, app)?
            }
        };

        append_instance_id(&instance_path, &id)?;
        log::info!("Wrote instance {id} to {}", instance_path.display());
        Ok(Outcome::Created { id })
    }

    fn recover_id(&self, cluster: &str, app: &str) -> Result<String> {
        let policy = &self.options.provisioning;
        log::warn!(
            "Sleeping for {}s before querying SLATE for instance id",
            policy.backoff.as_secs()
        );
        self.client
            .lookup_with(cluster, app, policy)?
            .ok_or_else(|| Error::InstanceIdUnresolved {
                cluster: cluster.to_string(),
                app: app.to_string(),
                attempts: policy.attempts(),
            })
    }
}

fn required<'a>(value: Option<&'a str>, key: &'static str, path: &Path) -> Result<&'a str> {
    value.ok_or_else(|| {
        log::error!("{} is missing required key '{key}'", path.display());
        Error::MissingKey {
            path: path.to_path_buf(),
            key,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::parse_change_list;
    use crate::signal::CountingSignal;
    use slate::{Call, InstanceItem, InstanceList, MockBackend, RecordingSleeper};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        root: TempDir,
        mock: MockBackend,
        sleeper: RecordingSleeper,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                root: tempfile::tempdir().unwrap(),
                mock: MockBackend::new(),
                sleeper: RecordingSleeper::new(),
            }
        }

        fn container(&self, name: &str, instance: Option<&str>) {
            let dir = self.root.path().join(name);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(VALUES_FILE), format!("Instance: {name}\n")).unwrap();
            if let Some(content) = instance {
                fs::write(dir.join(INSTANCE_FILE), content).unwrap();
            }
        }

        fn instance_file(&self, name: &str) -> String {
            fs::read_to_string(self.root.path().join(name).join(INSTANCE_FILE)).unwrap()
        }

        fn reconciler(&self) -> Reconciler {
            let client = Client::with_backend(Box::new(self.mock.clone()))
                .with_sleeper(Box::new(self.sleeper.clone()));
            Reconciler::new(
                client,
                ReconcileOptions {
                    root: self.root.path().to_path_buf(),
                    ..Default::default()
                },
            )
        }

        fn run(&self, changes: &str) -> (Result<RunSummary>, CountingSignal) {
            let mut signal = CountingSignal::default();
            let result = self
                .reconciler()
                .run(&parse_change_list(changes), &mut signal);
            (result, signal)
        }

        fn creates(&self) -> usize {
            self.mock.count(|c| matches!(c, Call::Create { .. }))
        }

        fn updates(&self) -> usize {
            self.mock.count(|c| matches!(c, Call::Update { .. }))
        }

        fn lists(&self) -> usize {
            self.mock.count(|c| matches!(c, Call::List { .. }))
        }
    }

    const PROVISIONING: &str = "cluster: c1\ngroup: g1\napp: a1\n";

    #[test]
    fn test_added_creates_and_records_id() {
        let fx = Fixture::new();
        fx.container("team1", Some(PROVISIONING));
        fx.mock.push_create_json(200, r#"{"metadata":{"id":"xyz"}}"#);

        let (result, signal) = fx.run("A team1/values.yaml\n");
        let summary = result.unwrap();

        assert_eq!(fx.creates(), 1);
        assert_eq!(fx.lists(), 0);
        assert!(fx.instance_file("team1").lines().any(|l| l == "instance: xyz"));
        assert_eq!(signal.count, 1);
        assert_eq!(summary.created, 1);
        assert!(summary.push_required());

        match &fx.mock.calls()[0] {
            Call::Create { app, request } => {
                assert_eq!(app, "a1");
                assert_eq!(request.cluster, "c1");
                assert_eq!(request.group, "g1");
                assert_eq!(request.configuration, "Instance: team1\n");
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn test_added_twice_is_idempotent() {
        let fx = Fixture::new();
        fx.container("team1", Some(PROVISIONING));

        let (result, signal) = fx.run("A team1/values.yaml\nA team1/values.yaml\n");
        let summary = result.unwrap();

        assert_eq!(fx.creates(), 1);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(signal.count, 1);
        let recorded: Vec<_> = fx
            .instance_file("team1")
            .lines()
            .filter(|l| l.starts_with("instance:"))
            .map(str::to_string)
            .collect();
        assert_eq!(recorded, vec!["instance: instance-1".to_string()]);
    }

    #[test]
    fn test_modified_updates_recorded_instance() {
        let fx = Fixture::new();
        fx.container("team1", Some("cluster: c1\ninstance: xyz\n"));

        let (result, signal) = fx.run("M team1/values.yaml");
        let summary = result.unwrap();

        assert_eq!(fx.updates(), 1);
        assert_eq!(fx.creates(), 0);
        assert_eq!(
            fx.mock.calls()[0],
            Call::Update {
                id: "xyz".to_string(),
                request: slate::UpdateInstanceRequest::new("Instance: team1\n"),
            }
        );
        assert_eq!(summary.updated, 1);
        assert_eq!(signal.count, 1);
    }

    #[test]
    fn test_update_failure_is_not_fatal() {
        let fx = Fixture::new();
        fx.container("team1", Some("instance: xyz\n"));
        fx.container("team2", Some("instance: abc\n"));
        fx.mock.push_update(500);

        let (result, signal) = fx.run("M team1/values.yaml\nM team2/values.yaml\n");
        let summary = result.unwrap();

        assert_eq!(fx.updates(), 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(
            summary.entries[0].1,
            Outcome::UpdateFailed {
                id: "xyz".to_string(),
                status: Some(500)
            }
        );
        assert_eq!(signal.count, 1);
    }

    #[test]
    fn test_update_transport_failure_is_not_fatal() {
        let fx = Fixture::new();
        fx.container("team1", Some("instance: xyz\n"));
        fx.mock.fail_update("connection reset by peer");

        let (result, signal) = fx.run("M team1/values.yaml");
        let summary = result.unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(signal.count, 0);
    }

    #[test]
    fn test_modified_without_instance_falls_back_to_create() {
        let fx = Fixture::new();
        fx.container("team1", Some("cluster: c1\ngroup: g1\napp: a1\ninstance:\n"));

        let (result, _) = fx.run("M team1/values.yaml");

        assert_eq!(result.unwrap().created, 1);
        assert_eq!(fx.updates(), 0);
        assert_eq!(fx.creates(), 1);
        assert!(fx.instance_file("team1").ends_with("instance: instance-1\n"));
    }

    #[test]
    fn test_deleted_makes_no_calls() {
        let fx = Fixture::new();
        fx.container("team1", Some("cluster: c1\ninstance: xyz\n"));
        let before = fx.instance_file("team1");

        let (result, signal) = fx.run("D team1/values.yaml");

        assert_eq!(result.unwrap().unsupported, 1);
        assert!(fx.mock.calls().is_empty());
        assert_eq!(fx.instance_file("team1"), before);
        assert_eq!(signal.count, 0);
    }

    #[test]
    fn test_unknown_status_stops_run() {
        let fx = Fixture::new();
        fx.container("team1", Some(PROVISIONING));
        fx.container("team2", Some(PROVISIONING));

        let (result, _) = fx.run("A team1/values.yaml\nX team2/values.yaml\nA team2/values.yaml\n");

        assert!(matches!(result, Err(Error::UnknownStatus { line: 2, .. })));
        assert_eq!(fx.creates(), 1);
    }

    #[test]
    fn test_unknown_status_on_unrelated_file_is_skipped() {
        let fx = Fixture::new();
        fx.container("team1", Some(PROVISIONING));

        let (result, signal) = fx.run(
            "X README.md\nR100 docs/old.md docs/new.md\nT .github/workflows/ci.yml\nA team1/values.yaml\n",
        );
        let summary = result.unwrap();

        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.created, 1);
        assert_eq!(fx.creates(), 1);
        assert_eq!(signal.count, 1);
    }

    #[test]
    fn test_unknown_status_on_instance_file_stops_run() {
        let fx = Fixture::new();

        let (result, _) = fx.run("X team1/instance.yaml\n");

        assert!(matches!(result, Err(Error::UnknownStatus { line: 1, .. })));
        assert!(fx.mock.calls().is_empty());
    }

    #[test]
    fn test_skipped_paths_make_no_calls() {
        let fx = Fixture::new();

        let (result, _) = fx.run(
            "M README.md\nA .github/values.yaml\nM team1/instance.yaml\nM\n",
        );
        let summary = result.unwrap();

        assert_eq!(summary.skipped, 4);
        assert!(fx.mock.calls().is_empty());
    }

    #[test]
    fn test_missing_required_key_is_fatal() {
        let fx = Fixture::new();
        fx.container("team1", Some("cluster: c1\napp: a1\n"));

        let (result, _) = fx.run("A team1/values.yaml");

        assert!(matches!(
            result,
            Err(Error::MissingKey { key: "group", .. })
        ));
        assert_eq!(fx.creates(), 0);
    }

    #[test]
    fn test_added_without_instance_file_is_fatal() {
        let fx = Fixture::new();
        fx.container("team1", None);

        let (result, _) = fx.run("A team1/values.yaml");

        assert!(matches!(
            result,
            Err(Error::MissingKey {
                key: "cluster",
                ..
            })
        ));
    }

    #[test]
    fn test_create_rejection_is_fatal() {
        let fx = Fixture::new();
        fx.container("team1", Some(PROVISIONING));
        fx.container("team2", Some("instance: abc\n"));
        fx.mock.push_create_json(500, "cluster unreachable");

        let (result, _) = fx.run("A team1/values.yaml\nM team2/values.yaml\n");

        assert!(matches!(
            result,
            Err(Error::CreateRejected { status: 500, .. })
        ));
        assert_eq!(fx.updates(), 0);
        assert!(!fx.instance_file("team1").contains("instance:"));
    }

    #[test]
    fn test_missing_id_recovered_by_lookup() {
        let fx = Fixture::new();
        fx.container("team1", Some(PROVISIONING));
        fx.mock.push_create_json(200, r#"{"metadata":{}}"#);
        fx.mock.push_list(InstanceList {
            status: 200,
            items: Vec::new(),
        });
        fx.mock.push_list(InstanceList {
            status: 200,
            items: vec![
                InstanceItem::new("other", "nope"),
                InstanceItem::new("a1", "recovered"),
            ],
        });

        let (result, signal) = fx.run("A team1/values.yaml");

        assert_eq!(
            result.unwrap().entries[0].1,
            Outcome::Created {
                id: "recovered".to_string()
            }
        );
        assert_eq!(fx.lists(), 2);
        assert_eq!(fx.sleeper.slept(), vec![Duration::from_secs(30); 2]);
        assert!(fx.instance_file("team1").contains("instance: recovered\n"));
        assert_eq!(signal.count, 1);
    }

    #[test]
    fn test_blank_id_lookup_exhausted_is_fatal() {
        let fx = Fixture::new();
        fx.container("team1", Some(PROVISIONING));
        fx.mock.push_create_json(200, r#"{"metadata":{"id":""}}"#);

        let (result, signal) = fx.run("A team1/values.yaml");

        assert!(matches!(
            result,
            Err(Error::InstanceIdUnresolved { attempts: 3, .. })
        ));
        assert_eq!(fx.lists(), 3);
        assert_eq!(signal.count, 0);
        assert!(!fx.instance_file("team1").contains("instance:"));
    }

    #[test]
    fn test_lookup_attempts_follow_options() {
        let fx = Fixture::new();
        fx.container("team1", Some(PROVISIONING));
        fx.mock.push_create_json(200, "{}");
        let client = Client::with_backend(Box::new(fx.mock.clone()))
            .with_sleeper(Box::new(fx.sleeper.clone()));
        let reconciler = Reconciler::new(
            client,
            ReconcileOptions {
                root: fx.root.path().to_path_buf(),
                provisioning: RetryPolicy::provisioning()
                    .with_attempts(5)
                    .with_backoff(Duration::from_secs(1)),
                ..Default::default()
            },
        );

        let result = reconciler.apply(&ChangeRecord::new(ChangeStatus::Added, "team1/values.yaml"));

        assert!(result.is_err());
        assert_eq!(fx.lists(), 5);
        assert_eq!(fx.sleeper.total(), Duration::from_secs(5));
    }
}
