//! FSM unit tests

use launcher::deploy::fsm::{DeploymentEvent, DeploymentFsm, Phase};
use launcher::deploy::outputs::ExtractedOutputs;

fn outputs(ip: &str) -> ExtractedOutputs {
    ExtractedOutputs {
        public_ip: ip.to_string(),
        vscode_server_url: None,
    }
}

#[test]
fn test_fsm_initial_phase() {
    let fsm = DeploymentFsm::new();
    assert_eq!(fsm.phase(), Phase::NotStarted);
    assert!(fsm.error().is_none());
    assert!(fsm.outputs().is_none());
}

#[test]
fn test_fsm_success_flow() {
    let mut fsm = DeploymentFsm::new();

    // NotStarted -> Initializing
    assert_eq!(fsm.process(DeploymentEvent::Start).unwrap(), Phase::Initializing);

    // Initializing -> Applying
    assert_eq!(fsm.process(DeploymentEvent::Initialized).unwrap(), Phase::Applying);

    // Applying -> RetrievingOutputs
    assert_eq!(
        fsm.process(DeploymentEvent::Applied).unwrap(),
        Phase::RetrievingOutputs
    );

    // RetrievingOutputs -> Completed
    fsm.process(DeploymentEvent::OutputsReady(outputs("10.0.0.5")))
        .unwrap();
    assert_eq!(fsm.phase(), Phase::Completed);
    assert_eq!(fsm.outputs().unwrap().public_ip, "10.0.0.5");
    assert!(fsm.error().is_none());
}

#[test]
fn test_fsm_failure_from_each_running_phase() {
    for steps in 1..=3 {
        let mut fsm = DeploymentFsm::new();
        let events = [
            DeploymentEvent::Start,
            DeploymentEvent::Initialized,
            DeploymentEvent::Applied,
        ];
        for event in events.into_iter().take(steps) {
            fsm.process(event).unwrap();
        }

        fsm.process(DeploymentEvent::Failed("boom".to_string()))
            .unwrap();
        assert_eq!(fsm.phase(), Phase::Error);
        assert_eq!(fsm.error(), Some("boom"));
        assert!(fsm.outputs().is_none());
    }
}

#[test]
fn test_fsm_cancel() {
    let mut fsm = DeploymentFsm::new();
    fsm.process(DeploymentEvent::Start).unwrap();
    fsm.process(DeploymentEvent::Cancel).unwrap();
    assert_eq!(fsm.phase(), Phase::Error);
    assert_eq!(fsm.error(), Some("Deployment cancelled"));
}

#[test]
fn test_fsm_terminal_phases_are_final() {
    let mut fsm = DeploymentFsm::new();
    fsm.process(DeploymentEvent::Start).unwrap();
    fsm.process(DeploymentEvent::Failed("boom".to_string()))
        .unwrap();

    assert!(fsm.process(DeploymentEvent::Cancel).is_err());
    assert!(fsm.process(DeploymentEvent::Initialized).is_err());
    assert!(fsm
        .process(DeploymentEvent::Failed("again".to_string()))
        .is_err());
    assert_eq!(fsm.error(), Some("boom"));
}

#[test]
fn test_fsm_invalid_transitions() {
    let mut fsm = DeploymentFsm::new();

    // Cannot skip init
    assert!(fsm.process(DeploymentEvent::Applied).is_err());
    assert!(fsm
        .process(DeploymentEvent::OutputsReady(outputs("10.0.0.5")))
        .is_err());
    assert_eq!(fsm.phase(), Phase::NotStarted);

    // Cannot start twice
    fsm.process(DeploymentEvent::Start).unwrap();
    assert!(fsm.process(DeploymentEvent::Start).is_err());
    assert_eq!(fsm.phase(), Phase::Initializing);
}

#[test]
fn test_phase_wire_names() {
    let names: Vec<String> = [
        Phase::NotStarted,
        Phase::Initializing,
        Phase::Applying,
        Phase::RetrievingOutputs,
        Phase::Completed,
        Phase::Error,
    ]
    .iter()
    .map(|phase| serde_json::to_value(phase).unwrap().as_str().unwrap().to_string())
    .collect();

    assert_eq!(
        names,
        vec![
            "not_started",
            "initializing",
            "applying",
            "retrieving_ip",
            "completed",
            "error"
        ]
    );
}
