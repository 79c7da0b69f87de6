//! Task Module Tests
//!
//! Drives each task kind against an in-memory store and a recording graph layer that
//! counts which removal path a delete went through.

#[cfg(test)]
mod tests {
    use crate::cluster::{ClusterManager, StaticCluster};
    use crate::error::{ReplicationError, StorageError};
    use crate::graph::GraphModel;
    use crate::quorum::QuorumType;
    use crate::record::{RecordBody, RecordId, RecordKind, RecordRef, RequestId, Snapshot};
    use crate::storage::{DeleteResult, LockToken, MemoryStore, RecordStore};
    use crate::task::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store wrapper counting raw deletes issued by tasks.
    struct CountingStore {
        inner: Arc<MemoryStore>,
        deletes: AtomicUsize,
    }

    impl RecordStore for CountingStore {
        fn load(&self, id: RecordId) -> Result<Option<Snapshot>, StorageError> {
            self.inner.load(id)
        }

        fn create(&self, id: RecordId, body: RecordBody) -> Result<RecordRef, StorageError> {
            self.inner.create(id, body)
        }

        fn update(&self, record: RecordRef, body: RecordBody) -> Result<RecordRef, StorageError> {
            self.inner.update(record, body)
        }

        fn put(&self, record: RecordRef, body: RecordBody) -> Result<(), StorageError> {
            self.inner.put(record, body)
        }

        fn restore(&self, snapshot: &Snapshot) -> Result<RecordRef, StorageError> {
            self.inner.restore(snapshot)
        }

        fn delete(&self, record: RecordRef) -> Result<DeleteResult, StorageError> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.inner.delete(record)
        }

        fn lock_record(&self, id: RecordId, owner: LockToken) -> Result<(), StorageError> {
            self.inner.lock_record(id, owner)
        }

        fn unlock_record(&self, id: RecordId, owner: LockToken) {
            self.inner.unlock_record(id, owner)
        }
    }

    /// Graph layer classifying by class name "V"/"E" and counting removals.
    struct RecordingGraph {
        inner: Arc<MemoryStore>,
        edge_removals: AtomicUsize,
        vertex_removals: AtomicUsize,
    }

    impl GraphModel for RecordingGraph {
        fn classify(&self, snapshot: &Snapshot) -> RecordKind {
            match snapshot.body.class_name.as_deref() {
                Some("V") => RecordKind::Vertex,
                Some("E") => RecordKind::Edge,
                _ => RecordKind::Plain,
            }
        }

        fn remove_edge(&self, snapshot: &Snapshot) -> Result<DeleteResult, StorageError> {
            self.edge_removals.fetch_add(1, Ordering::SeqCst);
            self.inner.delete(snapshot.record)
        }

        fn remove_vertex(&self, snapshot: &Snapshot) -> Result<DeleteResult, StorageError> {
            self.vertex_removals.fetch_add(1, Ordering::SeqCst);
            self.inner.delete(snapshot.record)
        }
    }

    struct Fixture {
        memory: Arc<MemoryStore>,
        store: Arc<CountingStore>,
        graph: Arc<RecordingGraph>,
        db: Database,
        cluster: Arc<StaticCluster>,
    }

    impl Fixture {
        fn new() -> Self {
            let memory = MemoryStore::new();
            let store = Arc::new(CountingStore {
                inner: memory.clone(),
                deletes: AtomicUsize::new(0),
            });
            let graph = Arc::new(RecordingGraph {
                inner: memory.clone(),
                edge_removals: AtomicUsize::new(0),
                vertex_removals: AtomicUsize::new(0),
            });
            let db = Database::new("testdb", store.clone(), graph.clone());

            let cluster = StaticCluster::new("node-a", TaskFactory::for_protocol(CURRENT_PROTOCOL));
            cluster.advertise("node-b", TaskFactory::for_protocol(CURRENT_PROTOCOL));
            cluster.advertise("node-old", TaskFactory::for_protocol(1));

            Self {
                memory,
                store,
                graph,
                db,
                cluster,
            }
        }

        fn seed(&self, record: RecordRef, class_name: &str, content: &[u8]) {
            self.memory
                .put(record, RecordBody::new(class_name, content.to_vec()))
                .unwrap();
        }

        fn execute(&self, task: &mut ReplicatedTask) -> crate::error::Result<TaskOutcome> {
            let ctx = ExecutionContext::new(RequestId::new("node-a", 1));
            task.execute(&ctx, self.cluster.as_ref(), &self.db)
        }

        fn raw_deletes(&self) -> usize {
            self.store.deletes.load(Ordering::SeqCst)
        }

        fn edge_removals(&self) -> usize {
            self.graph.edge_removals.load(Ordering::SeqCst)
        }

        fn vertex_removals(&self) -> usize {
            self.graph.vertex_removals.load(Ordering::SeqCst)
        }
    }

    fn request() -> RequestId {
        RequestId::new("node-a", 7)
    }

    #[test]
    fn test_delete_plain_record() {
        // ARRANGE
        let fixture = Fixture::new();
        let record = RecordRef::new(3, 17, 2);
        fixture.seed(record, "Invoice", b"total=10");
        let mut task = ReplicatedTask::delete(record);

        // ACT
        let outcome = fixture.execute(&mut task).unwrap();

        // ASSERT
        assert_eq!(outcome, TaskOutcome::Deleted);
        assert_eq!(fixture.raw_deletes(), 1);
        assert_eq!(fixture.edge_removals(), 0);
        assert_eq!(fixture.vertex_removals(), 0);
        assert!(fixture.memory.load(record.id).unwrap().is_none());

        let snapshot = task.snapshot().expect("snapshot captured");
        assert_eq!(snapshot.record, record);
        assert_eq!(snapshot.body.content, b"total=10".to_vec());
        assert_eq!(task.state(), &TaskState::Executed(TaskOutcome::Deleted));
    }

    #[test]
    fn test_delete_absent_record_is_already_absent() {
        let fixture = Fixture::new();
        let mut task = ReplicatedTask::delete(RecordRef::new(3, 17, 2));

        let outcome = fixture.execute(&mut task).unwrap();

        assert_eq!(outcome, TaskOutcome::AlreadyAbsent);
        assert_eq!(fixture.raw_deletes(), 0);
        assert_eq!(fixture.edge_removals(), 0);
        assert_eq!(fixture.vertex_removals(), 0);
        assert!(task.snapshot().is_none());
    }

    #[test]
    fn test_delete_twice_is_already_absent_both_times() {
        let fixture = Fixture::new();
        let record = RecordRef::new(3, 17, 2);

        let first = fixture.execute(&mut ReplicatedTask::delete(record)).unwrap();
        let second = fixture.execute(&mut ReplicatedTask::delete(record)).unwrap();

        assert_eq!(first, TaskOutcome::AlreadyAbsent);
        assert_eq!(second, TaskOutcome::AlreadyAbsent);
    }

    #[test]
    fn test_delete_redelivery_after_success() {
        let fixture = Fixture::new();
        let record = RecordRef::new(3, 17, 2);
        fixture.seed(record, "Invoice", b"x");
        let mut task = ReplicatedTask::delete(record);

        assert_eq!(fixture.execute(&mut task).unwrap(), TaskOutcome::Deleted);
        assert_eq!(fixture.execute(&mut task).unwrap(), TaskOutcome::AlreadyAbsent);

        // The first capture is kept for undo.
        assert_eq!(task.snapshot().map(|s| s.record), Some(record));
    }

    #[test]
    fn test_delete_edge_goes_through_graph() {
        // ARRANGE
        let fixture = Fixture::new();
        let record = RecordRef::new(12, 4, 1);
        fixture.seed(record, "E", b"");
        let mut task = ReplicatedTask::delete(record);

        // ACT
        let outcome = fixture.execute(&mut task).unwrap();

        // ASSERT
        assert_eq!(outcome, TaskOutcome::Deleted);
        assert_eq!(fixture.edge_removals(), 1);
        assert_eq!(fixture.vertex_removals(), 0);
        assert_eq!(fixture.raw_deletes(), 0);
    }

    #[test]
    fn test_delete_vertex_goes_through_graph() {
        let fixture = Fixture::new();
        let record = RecordRef::new(10, 0, 3);
        fixture.seed(record, "V", b"alice");
        let mut task = ReplicatedTask::delete(record);

        let outcome = fixture.execute(&mut task).unwrap();

        assert_eq!(outcome, TaskOutcome::Deleted);
        assert_eq!(fixture.vertex_removals(), 1);
        assert_eq!(fixture.edge_removals(), 0);
        assert_eq!(fixture.raw_deletes(), 0);
    }

    #[test]
    fn test_delete_version_conflict_propagates() {
        let fixture = Fixture::new();
        fixture.seed(RecordRef::new(3, 17, 5), "Invoice", b"x");
        let mut task = ReplicatedTask::delete(RecordRef::new(3, 17, 2));

        let result = fixture.execute(&mut task);

        assert!(matches!(
            result,
            Err(ReplicationError::Storage(StorageError::ConcurrentModification {
                expected: 2,
                actual: 5,
                ..
            }))
        ));
        assert_eq!(fixture.raw_deletes(), 0);
        assert!(fixture.memory.exists(RecordId::new(3, 17)).unwrap());
        // The pre-state was captured before the check failed.
        assert_eq!(task.state(), &TaskState::SnapshotCaptured);
    }

    #[test]
    fn test_delete_any_version_ignores_version() {
        let fixture = Fixture::new();
        fixture.seed(RecordRef::new(3, 17, 9), "Invoice", b"x");
        let mut task = ReplicatedTask::delete(RecordRef::any_version(RecordId::new(3, 17)));

        assert_eq!(fixture.execute(&mut task).unwrap(), TaskOutcome::Deleted);
    }

    #[test]
    fn test_delete_contract() {
        let task = ReplicatedTask::delete(RecordRef::new(3, 17, 2));

        assert_eq!(task.quorum_type(), QuorumType::Write);
        assert!(!task.is_idempotent());
        assert!(!task.check_record_exists());
        assert!(task.lock_records());
        assert_eq!(task.factory_id(), 4);
        assert_eq!(task.to_string(), "record_delete(#3:17 v.2)");
    }

    #[test]
    fn test_undo_without_snapshot_is_none() {
        let fixture = Fixture::new();
        let mut task = ReplicatedTask::delete(RecordRef::new(3, 17, 2));
        fixture.execute(&mut task).unwrap();

        let undo = task
            .undo_task(fixture.cluster.as_ref(), &request(), &["node-b".to_string()])
            .unwrap();

        assert!(undo.is_none());
        assert_eq!(task.state(), &TaskState::Executed(TaskOutcome::AlreadyAbsent));
    }

    #[test]
    fn test_undo_before_execution_is_none() {
        let fixture = Fixture::new();
        let mut task = ReplicatedTask::delete(RecordRef::new(3, 17, 2));

        let undo = task.undo_task(fixture.cluster.as_ref(), &request(), &[]).unwrap();

        assert!(undo.is_none());
    }

    #[test]
    fn test_undo_after_delete_resurrects_snapshot() {
        // ARRANGE
        let fixture = Fixture::new();
        let record = RecordRef::new(3, 17, 2);
        fixture.seed(record, "Invoice", b"total=10");
        let mut task = ReplicatedTask::delete(record);
        fixture.execute(&mut task).unwrap();

        // ACT
        let mut undo = task
            .undo_task(fixture.cluster.as_ref(), &request(), &["node-a".to_string()])
            .unwrap()
            .expect("undo generated");

        // ASSERT
        assert_eq!(undo.factory_id(), 5);
        assert_eq!(undo.record(), record);
        assert!(!undo.lock_records());
        assert_eq!(
            task.state(),
            &TaskState::CompensationGenerated(Compensation::Undo)
        );

        assert_eq!(fixture.execute(&mut undo).unwrap(), TaskOutcome::Created(record));
        let restored = fixture.memory.load(record.id).unwrap().unwrap();
        assert_eq!(restored.record, record);
        assert_eq!(restored.body.content, b"total=10".to_vec());
    }

    #[test]
    fn test_undo_of_any_version_delete_uses_stored_version() {
        let fixture = Fixture::new();
        let stored = RecordRef::new(3, 17, 4);
        fixture.seed(stored, "Invoice", b"x");
        let mut task = ReplicatedTask::delete(RecordRef::any_version(stored.id));
        fixture.execute(&mut task).unwrap();

        let mut undo = task
            .undo_task(fixture.cluster.as_ref(), &request(), &["node-a".to_string()])
            .unwrap()
            .expect("undo generated");

        assert_eq!(undo.record(), stored);
        assert_ne!(undo.record(), task.record());
        assert_eq!(fixture.execute(&mut undo).unwrap(), TaskOutcome::Created(stored));
        assert_eq!(fixture.memory.load(stored.id).unwrap().unwrap().record, stored);
    }

    #[test]
    fn test_undo_runs_while_repair_holds_lock() {
        let fixture = Fixture::new();
        let record = RecordRef::new(3, 17, 2);
        fixture.seed(record, "Invoice", b"x");
        let mut task = ReplicatedTask::delete(record);
        fixture.execute(&mut task).unwrap();
        let mut undo = task
            .undo_task(fixture.cluster.as_ref(), &request(), &[])
            .unwrap()
            .unwrap();

        // Another owner (the repair machinery) holds the record lock.
        fixture.memory.lock_record(record.id, LockToken::new()).unwrap();

        assert!(fixture.execute(&mut undo).is_ok());
    }

    #[test]
    fn test_fix_targets_exact_record_on_named_node() {
        let fixture = Fixture::new();
        let record = RecordRef::new(3, 17, 2);
        let mut task = ReplicatedTask::delete(record);
        let good = ReplicaResponse::Outcome(TaskOutcome::Deleted);
        let bad = ReplicaResponse::Failed("disk full".to_string());
        let fix = FixContext {
            request_id: &request(),
            bad_response: &bad,
            good_response: &good,
            target_node: "node-b",
        };

        let fix_task = task
            .fix_task(&fix, fixture.cluster.as_ref())
            .unwrap()
            .expect("fix generated");

        assert_eq!(fix_task.factory_id(), 7);
        assert_eq!(fix_task.record(), record);
        assert_eq!(fix_task.record().version, 2);
        assert!(fix_task.is_idempotent());
        assert_eq!(task.state(), &TaskState::CompensationGenerated(Compensation::Fix));
    }

    #[test]
    fn test_fix_for_old_node_is_unknown_task_kind() {
        let fixture = Fixture::new();
        let mut task = ReplicatedTask::delete(RecordRef::new(3, 17, 2));
        let good = ReplicaResponse::Outcome(TaskOutcome::Deleted);
        let bad = ReplicaResponse::Failed("timeout".to_string());
        let fix = FixContext {
            request_id: &request(),
            bad_response: &bad,
            good_response: &good,
            target_node: "node-old",
        };

        let result = task.fix_task(&fix, fixture.cluster.as_ref());

        assert!(matches!(
            result,
            Err(ReplicationError::UnknownTaskKind {
                factory_id: 7,
                protocol_version: 1
            })
        ));
        assert_eq!(task.state(), &TaskState::Created);
    }

    #[test]
    fn test_fix_for_unknown_node() {
        let fixture = Fixture::new();
        let mut task = ReplicatedTask::delete(RecordRef::new(3, 17, 2));
        let good = ReplicaResponse::Outcome(TaskOutcome::Deleted);
        let fix = FixContext {
            request_id: &request(),
            bad_response: &good,
            good_response: &good,
            target_node: "node-z",
        };

        let result = task.fix_task(&fix, fixture.cluster.as_ref());

        assert!(matches!(result, Err(ReplicationError::UnknownNode(_))));
    }

    #[test]
    fn test_execute_after_compensation_is_invalid() {
        let fixture = Fixture::new();
        let record = RecordRef::new(3, 17, 2);
        fixture.seed(record, "Invoice", b"x");
        let mut task = ReplicatedTask::delete(record);
        fixture.execute(&mut task).unwrap();
        task.undo_task(fixture.cluster.as_ref(), &request(), &[]).unwrap();

        let result = fixture.execute(&mut task);

        assert!(matches!(result, Err(ReplicationError::InvalidState { .. })));
    }

    #[test]
    fn test_locked_record_rejects_other_owner() {
        let fixture = Fixture::new();
        let record = RecordRef::new(3, 17, 2);
        fixture.seed(record, "Invoice", b"x");
        let holder = LockToken::new();
        fixture.memory.lock_record(record.id, holder).unwrap();

        let mut task = ReplicatedTask::delete(record);
        let result = fixture.execute(&mut task);
        assert!(matches!(
            result,
            Err(ReplicationError::Storage(StorageError::Locked(_)))
        ));

        // Same owner re-enters the lock.
        let ctx = ExecutionContext::with_owner(request(), holder);
        let mut task = ReplicatedTask::delete(record);
        let outcome = task.execute(&ctx, fixture.cluster.as_ref(), &fixture.db).unwrap();
        assert_eq!(outcome, TaskOutcome::Deleted);

        // The inner task gives back only its own hold.
        assert_eq!(fixture.memory.lock_holder(record.id), Some(holder));
        fixture.memory.unlock_record(record.id, holder);
        assert!(fixture.memory.lock_holder(record.id).is_none());
    }

    #[test]
    fn test_lock_released_after_execution() {
        let fixture = Fixture::new();
        let record = RecordRef::new(3, 17, 2);
        fixture.seed(record, "Invoice", b"x");

        fixture.execute(&mut ReplicatedTask::delete(record)).unwrap();

        assert!(fixture.memory.lock_holder(record.id).is_none());
    }

    #[test]
    fn test_lock_records_false_bypasses_locks() {
        let fixture = Fixture::new();
        let record = RecordRef::new(3, 17, 2);
        fixture.seed(record, "Invoice", b"x");
        fixture.memory.lock_record(record.id, LockToken::new()).unwrap();

        let mut task = ReplicatedTask::delete(record).with_lock_records(false);

        assert_eq!(fixture.execute(&mut task).unwrap(), TaskOutcome::Deleted);
    }

    #[test]
    fn test_create_then_undo_deletes_created_record() {
        let fixture = Fixture::new();
        let record = RecordRef::any_version(RecordId::new(5, 0));
        let mut task = ReplicatedTask::create(record, RecordBody::new("Invoice", b"a".to_vec()));

        let outcome = fixture.execute(&mut task).unwrap();
        assert_eq!(outcome, TaskOutcome::Created(RecordRef::new(5, 0, 1)));

        let mut undo = task
            .undo_task(fixture.cluster.as_ref(), &request(), &[])
            .unwrap()
            .unwrap();
        assert_eq!(undo.factory_id(), 4);
        assert_eq!(undo.record(), RecordRef::new(5, 0, 1));
        assert!(!undo.lock_records());

        assert_eq!(fixture.execute(&mut undo).unwrap(), TaskOutcome::Deleted);
        assert!(fixture.memory.load(RecordId::new(5, 0)).unwrap().is_none());
    }

    #[test]
    fn test_create_existing_record_fails() {
        let fixture = Fixture::new();
        let record = RecordRef::new(5, 0, 1);
        fixture.seed(record, "Invoice", b"a");
        let mut task = ReplicatedTask::create(record, RecordBody::raw(b"b".to_vec()));

        let result = fixture.execute(&mut task);

        assert!(matches!(
            result,
            Err(ReplicationError::Storage(StorageError::AlreadyExists(_)))
        ));
        assert!(task.undo_task(fixture.cluster.as_ref(), &request(), &[]).unwrap().is_none());
    }

    #[test]
    fn test_update_and_undo_restores_previous_body() {
        // ARRANGE
        let fixture = Fixture::new();
        let record = RecordRef::new(5, 1, 3);
        fixture.seed(record, "Invoice", b"old");
        let mut task = ReplicatedTask::update(record, RecordBody::new("Invoice", b"new".to_vec()));

        // ACT
        let outcome = fixture.execute(&mut task).unwrap();
        let mut undo = task
            .undo_task(fixture.cluster.as_ref(), &request(), &["node-b".to_string()])
            .unwrap()
            .unwrap();
        fixture.execute(&mut undo).unwrap();

        // ASSERT
        assert_eq!(outcome, TaskOutcome::Updated(RecordRef::new(5, 1, 4)));
        assert_eq!(undo.factory_id(), 6);
        let current = fixture.memory.load(record.id).unwrap().unwrap();
        assert_eq!(current.record, record);
        assert_eq!(current.body.content, b"old".to_vec());
    }

    #[test]
    fn test_update_missing_record_is_not_found() {
        let fixture = Fixture::new();
        let mut task =
            ReplicatedTask::update(RecordRef::new(5, 1, 3), RecordBody::raw(b"new".to_vec()));

        let result = fixture.execute(&mut task);

        assert!(matches!(
            result,
            Err(ReplicationError::Storage(StorageError::NotFound(_)))
        ));
    }

    #[test]
    fn test_update_fix_converges_to_majority() {
        let fixture = Fixture::new();
        let mut task =
            ReplicatedTask::update(RecordRef::new(5, 1, 3), RecordBody::raw(b"new".to_vec()));
        let good = ReplicaResponse::Outcome(TaskOutcome::Updated(RecordRef::new(5, 1, 4)));
        let bad = ReplicaResponse::Failed("conflict".to_string());
        let fix = FixContext {
            request_id: &request(),
            bad_response: &bad,
            good_response: &good,
            target_node: "node-b",
        };

        let mut fix_task = task.fix_task(&fix, fixture.cluster.as_ref()).unwrap().unwrap();
        fixture.execute(&mut fix_task).unwrap();

        assert_eq!(fix_task.factory_id(), 6);
        let current = fixture.memory.load(RecordId::new(5, 1)).unwrap().unwrap();
        assert_eq!(current.record.version, 4);
        assert_eq!(current.body.content, b"new".to_vec());
    }

    #[test]
    fn test_fix_against_failed_majority_is_none() {
        let fixture = Fixture::new();
        let mut task =
            ReplicatedTask::update(RecordRef::new(5, 1, 3), RecordBody::raw(b"new".to_vec()));
        let failed = ReplicaResponse::Failed("conflict".to_string());
        let fix = FixContext {
            request_id: &request(),
            bad_response: &failed,
            good_response: &failed,
            target_node: "node-b",
        };

        assert!(task.fix_task(&fix, fixture.cluster.as_ref()).unwrap().is_none());
    }

    #[test]
    fn test_resurrect_redelivery_is_tolerated() {
        let fixture = Fixture::new();
        let snapshot = Snapshot::new(RecordRef::new(3, 17, 2), RecordBody::raw(b"x".to_vec()));

        let first = fixture
            .execute(&mut ReplicatedTask::resurrect(snapshot.clone()))
            .unwrap();
        let second = fixture
            .execute(&mut ReplicatedTask::resurrect(snapshot.clone()))
            .unwrap();

        assert_eq!(first, TaskOutcome::Created(snapshot.record));
        assert_eq!(second, TaskOutcome::Created(snapshot.record));
    }

    #[test]
    fn test_fix_delete_is_idempotent() {
        let fixture = Fixture::new();
        let record = RecordRef::new(12, 4, 1);
        fixture.seed(record, "E", b"");

        let first = fixture.execute(&mut ReplicatedTask::fix_delete(record)).unwrap();
        let second = fixture.execute(&mut ReplicatedTask::fix_delete(record)).unwrap();

        assert_eq!(first, TaskOutcome::Deleted);
        assert_eq!(second, TaskOutcome::AlreadyAbsent);
        assert_eq!(fixture.edge_removals(), 1);
    }

    #[test]
    fn test_unknown_factory_id_leaves_registry_unchanged() {
        let factory = TaskFactory::for_protocol(CURRENT_PROTOCOL);
        let before = factory.factory_ids();

        let result = factory.create_task(99, TaskSeed::record(RecordRef::new(3, 17, 2)));

        assert!(matches!(
            result,
            Err(ReplicationError::UnknownTaskKind {
                factory_id: 99,
                protocol_version: 2
            })
        ));
        assert_eq!(factory.factory_ids(), before);
        assert!(!factory.has_kind(99));
    }

    #[test]
    fn test_factory_kinds_per_protocol() {
        let old = TaskFactory::for_protocol(1);
        let current = TaskFactory::for_protocol(CURRENT_PROTOCOL);

        assert_eq!(old.factory_ids(), vec![1, 2, 4, 5]);
        assert_eq!(current.factory_ids(), vec![1, 2, 4, 5, 6, 7]);
        assert_eq!(current.kind_name(4).as_deref(), Some("record_delete"));
        assert!(TaskFactory::new(2).factory_ids().is_empty());
    }

    #[test]
    fn test_seed_without_body_is_rejected() {
        let factory = TaskFactory::for_protocol(CURRENT_PROTOCOL);

        let result = factory.create_task(2, TaskSeed::record(RecordRef::new(3, 17, 2)));

        assert!(matches!(
            result,
            Err(ReplicationError::InvalidSeed {
                task: "record_update",
                ..
            })
        ));
    }

    #[test]
    fn test_envelope_decodes_on_receiving_node() {
        let task = ReplicatedTask::update(
            RecordRef::new(5, 1, 3),
            RecordBody::new("Invoice", b"new".to_vec()),
        )
        .with_lock_records(false);
        let envelope = task.to_envelope(&request()).unwrap();

        let decoded = TaskFactory::for_protocol(CURRENT_PROTOCOL)
            .decode(&envelope)
            .unwrap();

        assert_eq!(envelope.factory_id, 2);
        assert_eq!(envelope.request_id, request());
        assert_eq!(decoded.factory_id(), task.factory_id());
        assert_eq!(decoded.seed(), task.seed());
        assert!(!decoded.lock_records());
    }

    #[test]
    fn test_custom_kind_registration() {
        let factory = TaskFactory::new(CURRENT_PROTOCOL);
        factory.register(4, "custom_delete", |seed| {
            Ok(ReplicatedTask::delete(seed.record).with_lock_records(false))
        });

        let task = factory
            .create_task(4, TaskSeed::record(RecordRef::new(1, 1, 1)))
            .unwrap();

        assert_eq!(factory.kind_name(4).as_deref(), Some("custom_delete"));
        assert!(!task.lock_records());
    }

    #[test]
    fn test_cluster_resolves_factory_for_undo() {
        let fixture = Fixture::new();
        let nodes = vec!["node-b".to_string(), "node-old".to_string()];

        let factory = fixture.cluster.task_factory_for_nodes(&nodes).unwrap();

        // Resurrect exists since the first protocol, so undo works on mixed clusters.
        assert!(factory.has_kind(5));
        assert!(!factory.has_kind(7));
    }

    #[test]
    fn test_outcome_response_keys() {
        let record = RecordRef::new(1, 1, 2);

        assert_eq!(TaskOutcome::Deleted.response_key(), ResponseKey::Absent);
        assert_eq!(TaskOutcome::AlreadyAbsent.response_key(), ResponseKey::Absent);
        assert_eq!(
            TaskOutcome::Updated(record).response_key(),
            ResponseKey::Present(record)
        );
        assert!(!TaskOutcome::AlreadyAbsent.applied_effect());
        assert!(TaskOutcome::Deleted.applied_effect());
        assert_eq!(
            ReplicaResponse::Failed("x".to_string()).key(),
            ResponseKey::Failed
        );
    }
}
