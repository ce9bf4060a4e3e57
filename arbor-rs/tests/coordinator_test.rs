//! Immediate and scheduled execution through the command manager.

use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use arbor::{
    Command, CommandError, CommandManager, CommandResult, ExecutionCoordinator, HandleState,
    HandlerError, Invocation, ManagerSettings, Output, ResolveError, ScheduledCoordinator,
    SystemError, TypeTag,
};

#[derive(Debug, Clone)]
struct Console;

fn scheduled_manager(workers: usize) -> CommandManager<Console> {
    CommandManager::builder()
        .settings(ManagerSettings::scheduled(workers))
        .build()
        .expect("runtime is available")
}

fn register_common(manager: &CommandManager<Console>, log: Arc<Mutex<Vec<i64>>>) {
    let record = Command::builder("record")
        .required("value", TypeTag::INTEGER)
        .handler(move |inv: &Invocation<Console>| -> CommandResult<String> {
            let value = *inv.require::<i64>("value")?;
            log.lock().unwrap().push(value);
            Ok(format!("recorded {}", value))
        })
        .build()
        .unwrap();
    manager.register_command(record).unwrap();

    let fail = Command::builder("fail")
        .handler(|_: &Invocation<Console>| -> CommandResult<()> {
            Err(HandlerError::user("the world is read-only"))
        })
        .build()
        .unwrap();
    manager.register_command(fail).unwrap();

    let explode = Command::builder("explode")
        .handler(|_: &Invocation<Console>| -> CommandResult<()> { panic!("boom") })
        .build()
        .unwrap();
    manager.register_command(explode).unwrap();
}

// ============================================================================
// Immediate
// ============================================================================

#[tokio::test]
async fn test_immediate_handle_is_finished_on_return() {
    let manager = CommandManager::new(|_: &Console, _: &str| true);
    let log = Arc::new(Mutex::new(Vec::new()));
    register_common(&manager, Arc::clone(&log));

    let mut handle = manager.execute_command(Console, "record 7");
    assert!(matches!(handle.state(), HandleState::Completed(_)));
    assert_eq!(*log.lock().unwrap(), vec![7]);
    assert_eq!(handle.await.unwrap(), Output::text("recorded 7"));
}

#[test]
fn test_immediate_panic_is_system_error() {
    let manager = CommandManager::new(|_: &Console, _: &str| true);
    register_common(&manager, Arc::new(Mutex::new(Vec::new())));

    let mut handle = manager.execute_command(Console, "explode");
    let err = handle.try_take().unwrap().unwrap_err();
    assert!(matches!(
        &err,
        CommandError::Handler(HandlerError::System(SystemError::Panicked(message))) if message == "boom"
    ));
    assert_eq!(err.exit_code(), 101);
}

// ============================================================================
// Scheduled
// ============================================================================

#[tokio::test]
async fn test_single_worker_runs_in_submission_order() {
    let manager = scheduled_manager(1);
    let log = Arc::new(Mutex::new(Vec::new()));
    register_common(&manager, Arc::clone(&log));

    let handles: Vec<_> = (0..8)
        .map(|value| manager.execute_command(Console, &format!("record {}", value)))
        .collect();
    for (value, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap(), Output::text(format!("recorded {}", value)));
    }
    assert_eq!(*log.lock().unwrap(), (0..8).collect::<Vec<i64>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_many_workers_complete_every_job() {
    let manager = scheduled_manager(4);
    let log = Arc::new(Mutex::new(Vec::new()));
    register_common(&manager, Arc::clone(&log));

    let handles: Vec<_> = (0..32)
        .map(|value| manager.execute_command(Console, &format!("record {}", value)))
        .collect();
    for handle in handles {
        assert!(handle.await.is_ok());
    }

    let mut recorded = log.lock().unwrap().clone();
    recorded.sort_unstable();
    assert_eq!(recorded, (0..32).collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_scheduled_failures_arrive_through_handle() {
    let manager = scheduled_manager(2);
    register_common(&manager, Arc::new(Mutex::new(Vec::new())));

    let err = manager.execute_command(Console, "fail").await.unwrap_err();
    assert!(matches!(err, CommandError::Handler(HandlerError::User(_))));
    assert_eq!(err.exit_code(), 1);

    let err = manager.execute_command(Console, "explode").await.unwrap_err();
    assert!(matches!(
        err,
        CommandError::Handler(HandlerError::System(SystemError::Panicked(_)))
    ));

    let mut handle = manager.execute_command(Console, "record nine");
    assert!(handle.is_finished());
    assert!(matches!(
        handle.try_take(),
        Some(Err(CommandError::Resolve(ResolveError::ArgumentParse { .. })))
    ));

    // Workers survive handler panics.
    assert!(manager.execute_command(Console, "record 1").await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_queued_invocation() {
    let manager = scheduled_manager(1);
    let log = Arc::new(Mutex::new(Vec::new()));
    register_common(&manager, Arc::clone(&log));

    let (release, gate) = mpsc::channel::<()>();
    let gate = Mutex::new(gate);
    let block = Command::builder("block")
        .handler(move |_: &Invocation<Console>| {
            let _ = gate.lock().unwrap().recv_timeout(Duration::from_secs(5));
        })
        .build()
        .unwrap();
    manager.register_command(block).unwrap();

    let mut first = manager.execute_command(Console, "block");
    let mut second = manager.execute_command(Console, "record 1");

    while !first.is_running() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(!first.cancel());
    assert!(second.cancel());
    assert!(!second.cancel());

    release.send(()).unwrap();
    assert!(first.await.is_ok());
    assert!(matches!(second.await, Err(CommandError::Cancelled)));

    // The cancelled job is skipped, later ones still run.
    assert!(manager.execute_command(Console, "record 2").await.is_ok());
    assert_eq!(*log.lock().unwrap(), vec![2]);
}

#[tokio::test]
async fn test_shutdown_rejects_new_work() {
    let coordinator = Arc::new(ScheduledCoordinator::<Console>::new(1).unwrap());
    let manager = CommandManager::builder()
        .shared_coordinator(coordinator.clone())
        .build()
        .unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    register_common(&manager, Arc::clone(&log));

    let queued = manager.execute_command(Console, "record 1");
    coordinator.shutdown();

    assert!(queued.await.is_ok());
    let err = manager.execute_command(Console, "record 2").await.unwrap_err();
    assert!(matches!(err, CommandError::CoordinatorClosed));
    assert_eq!(err.exit_code(), 101);
    assert_eq!(*log.lock().unwrap(), vec![1]);
}

#[tokio::test]
async fn test_coordinator_used_directly() {
    let coordinator = ScheduledCoordinator::<Console>::new(1).unwrap();
    assert_eq!(coordinator.workers(), 1);

    let manager = CommandManager::new(|_: &Console, _: &str| true);
    register_common(&manager, Arc::new(Mutex::new(Vec::new())));

    let invocation = manager.resolve(Console, "record 5").unwrap();
    let output = coordinator.coordinate(invocation).await.unwrap();
    assert_eq!(output, Output::text("recorded 5"));
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_resolution_during_registration() {
    let manager = Arc::new(CommandManager::new(|_: &Console, _: &str| true));
    register_common(&manager, Arc::new(Mutex::new(Vec::new())));

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let manager = Arc::clone(&manager);
            scope.spawn(move || {
                for _ in 0..200 {
                    assert!(manager.resolve(Console, "record 3").is_ok());
                }
            });
        }
        scope.spawn(|| {
            for index in 0..50 {
                let command = Command::builder(format!("extra{}", index))
                    .handler(|_: &Invocation<Console>| ())
                    .build()
                    .unwrap();
                manager.register_command(command).unwrap();
            }
        });
    });

    assert_eq!(manager.commands().len(), 53);
}
