// tests/session_workflows.rs

use std::error::Error;
use std::path::Path;
use std::time::Duration;

use tpc::actions::run_action;
use tpc::cli::Action;
use tpc::config::{Settings, SettingKey};
use tpc::errors::TpcError;
use tpc::gateway::Gateway;
use tpc::session::SessionOrchestrator;
use tpc_test_utils::builders::SettingsBuilder;
use tpc_test_utils::recording_executor::RecordingExecutor;
use tpc_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

const SCRIPT: &str = "#!/bin/bash\ncd ~/job\npython train.py\n";
const REMOTE: &str = "/home/tester/tpc_launch_script.sh";

fn launch_settings() -> Settings {
    SettingsBuilder::pod()
        .with(SettingKey::LaunchScript, SCRIPT)
        .build()
}

fn orchestrator<'a>(
    settings: &'a Settings,
    executor: &'a RecordingExecutor,
) -> SessionOrchestrator<'a, RecordingExecutor> {
    SessionOrchestrator::new(Gateway::new(settings, executor)).with_settle_delay(Duration::ZERO)
}

#[tokio::test]
async fn launch_replaces_script_then_starts_session() -> TestResult {
    init_tracing();

    let settings = launch_settings();
    let executor = RecordingExecutor::new();

    orchestrator(&settings, &executor).launch().await?;

    let calls = executor.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].mentions(&format!("--command=rm -f {REMOTE}")));
    assert!(calls[1].mentions("scp"));
    assert!(calls[1].mentions(&format!("tester@test-pod:{REMOTE}")));
    assert!(!calls[1].mentions("--recurse"));
    assert!(calls[2].mentions(&format!("--command=tmux new-session -d -s tpc {REMOTE}")));

    // The staged script carried the configured text and is gone afterwards.
    assert_eq!(calls[1].files.len(), 1);
    let (local, contents) = &calls[1].files[0];
    assert_eq!(contents, SCRIPT);
    assert!(!Path::new(local).exists());
    Ok(())
}

#[tokio::test]
async fn launch_continues_when_old_script_cannot_be_removed() -> TestResult {
    init_tracing();

    let settings = launch_settings();
    let executor = RecordingExecutor::new().fail_when("rm -f", 1);

    orchestrator(&settings, &executor).launch().await?;

    let calls = executor.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[1].mentions("scp"));
    assert!(calls[2].mentions("tmux new-session"));
    Ok(())
}

#[tokio::test]
async fn failed_script_copy_stops_launch_and_cleans_up() -> TestResult {
    init_tracing();

    let settings = launch_settings();
    let executor = RecordingExecutor::new().fail_when("scp", 1);

    let err = orchestrator(&settings, &executor).launch().await.unwrap_err();

    assert_eq!(err.exit_code(), Some(1));
    let calls = executor.calls();
    assert_eq!(calls.len(), 2);
    assert!(!calls.iter().any(|c| c.mentions("tmux new-session")));
    let (local, _) = &calls[1].files[0];
    assert!(!Path::new(local).exists());
    Ok(())
}

#[tokio::test]
async fn launch_without_script_runs_nothing() -> TestResult {
    init_tracing();

    let settings = SettingsBuilder::pod().build();
    let executor = RecordingExecutor::new();

    let err = orchestrator(&settings, &executor).launch().await.unwrap_err();

    assert!(matches!(err, TpcError::MissingField(SettingKey::LaunchScript)));
    assert_eq!(executor.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn launch_uses_configured_session_and_remote_path() -> TestResult {
    init_tracing();

    let settings = SettingsBuilder::pod()
        .with(SettingKey::LaunchScript, SCRIPT)
        .with(SettingKey::TmuxSessionName, "train")
        .with(SettingKey::LaunchScriptRemotePath, "/opt/jobs/run me.sh")
        .build();
    let executor = RecordingExecutor::new();

    orchestrator(&settings, &executor).launch().await?;

    let last = executor.calls().pop().ok_or("no calls recorded")?;
    assert_eq!(
        last.command.args.last().map(String::as_str),
        Some("--command=tmux new-session -d -s train '/opt/jobs/run me.sh'")
    );
    Ok(())
}

#[tokio::test]
async fn upload_failure_skips_launch_entirely() -> TestResult {
    init_tracing();

    let settings = SettingsBuilder::pod()
        .with(SettingKey::LaunchScript, SCRIPT)
        .with(SettingKey::UploadPath, "./src:~/src")
        .build();
    let executor = RecordingExecutor::new().fail_when("--recurse", 1);

    let err = orchestrator(&settings, &executor)
        .upload_and_launch()
        .await
        .unwrap_err();

    assert!(matches!(err, TpcError::ExecutionError { code: 1, .. }));
    let commands = executor.commands();
    assert_eq!(commands.len(), 1);
    assert!(commands[0].contains("--recurse"));
    Ok(())
}

#[tokio::test]
async fn upload_then_launch_in_order() -> TestResult {
    init_tracing();

    let settings = SettingsBuilder::pod()
        .with(SettingKey::LaunchScript, SCRIPT)
        .with(SettingKey::UploadPath, "./src:~/src,./data:~/data")
        .build();
    let executor = RecordingExecutor::new();

    with_timeout(orchestrator(&settings, &executor).upload_and_launch()).await?;

    let calls = executor.calls();
    assert_eq!(calls.len(), 5);
    assert!(calls[0].mentions("./src"));
    assert!(calls[1].mentions("./data"));
    assert!(calls[2].mentions("rm -f"));
    assert!(calls[3].mentions("scp"));
    assert!(calls[4].mentions("tmux new-session"));
    Ok(())
}

#[tokio::test]
async fn check_stop_and_reboot_address_the_session() -> TestResult {
    init_tracing();

    let settings = SettingsBuilder::pod()
        .with(SettingKey::TmuxSessionName, "train")
        .build();
    let executor = RecordingExecutor::new().respond_when("capture-pane", &["step 10 loss 0.3"]);
    let session = orchestrator(&settings, &executor);

    let checked = session.check().await?;
    session.stop().await?;
    session.reboot().await?;

    assert_eq!(checked.output(), "step 10 loss 0.3");
    let remote: Vec<String> = executor
        .calls()
        .iter()
        .filter_map(|c| c.command.args.last().cloned())
        .collect();
    assert_eq!(
        remote,
        vec![
            "--command=tmux capture-pane -pt train -S -2000",
            "--command=tmux kill-session -t train",
            "--command=tmux new-session -d -s reboot sudo reboot",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn run_action_requires_command() -> TestResult {
    init_tracing();

    let settings = SettingsBuilder::pod().build();
    let executor = RecordingExecutor::new();

    let err = run_action(Action::Run, &orchestrator(&settings, &executor))
        .await
        .unwrap_err();
    assert!(matches!(err, TpcError::MissingField(SettingKey::Command)));
    assert_eq!(executor.call_count(), 0);

    let settings = SettingsBuilder::pod()
        .with(SettingKey::Command, "nvidia-smi || true")
        .build();
    run_action(Action::Run, &orchestrator(&settings, &executor)).await?;
    assert_eq!(
        executor.calls()[0].command.args.last().map(String::as_str),
        Some("--command=nvidia-smi || true")
    );
    Ok(())
}

#[tokio::test]
async fn debug_action_touches_nothing_remote() -> TestResult {
    init_tracing();

    let settings = SettingsBuilder::new().build();
    let executor = RecordingExecutor::new();

    run_action(Action::Debug, &orchestrator(&settings, &executor)).await?;

    assert_eq!(executor.call_count(), 0);
    Ok(())
}
