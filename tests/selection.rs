use std::collections::HashMap;
use std::sync::Arc;

use pixell_mpi::testing::RecordingCommunicator;
use pixell_mpi::{Communicator, Mode, MpiConfig, MpiContext, DISABLE_MPI_VAR};

fn context_for(value: Option<&str>) -> pixell_mpi::Result<MpiContext> {
    let mut vars = HashMap::new();
    if let Some(value) = value {
        vars.insert(DISABLE_MPI_VAR.to_string(), value.to_string());
    }
    MpiContext::from_config(&MpiConfig::from_vars(vars)?)
}

#[test]
fn disable_true_selects_fake_world() {
    let ctx = context_for(Some("true")).unwrap();
    assert!(ctx.disabled());
    assert_eq!(ctx.size(), 1);
    assert_eq!(ctx.rank(), 0);
}

#[test]
fn disable_one_selects_fake_world() {
    let ctx = context_for(Some("1")).unwrap();
    assert!(ctx.disabled());
    assert_eq!(ctx.world().size(), 1);
    assert_eq!(ctx.world().rank(), 0);
}

#[test]
fn other_values_do_not_disable() {
    for value in [None, Some("0"), Some("false"), Some("no")] {
        let mut vars = HashMap::new();
        if let Some(value) = value {
            vars.insert(DISABLE_MPI_VAR.to_string(), value.to_string());
        }
        assert_eq!(MpiConfig::from_vars(vars).unwrap().mode(), Mode::Real);
    }
}

#[cfg(not(feature = "mpi"))]
#[test]
fn real_mode_does_not_fall_back() {
    let err = context_for(None).unwrap_err();
    assert!(matches!(err, pixell_mpi::Error::Unavailable));
}

#[test]
fn real_world_reports_its_rank() {
    let comm = Arc::new(RecordingCommunicator::new(8, 5));
    let ctx = MpiContext::with_world(comm);
    assert!(!ctx.disabled());
    assert_eq!(ctx.size(), 8);
    assert_eq!(ctx.rank(), 5);
}

fn flag(value: Option<&str>) -> HashMap<String, String> {
    value
        .map(|v| (DISABLE_MPI_VAR.to_string(), v.to_string()))
        .into_iter()
        .collect()
}

#[test]
fn config_file_is_layered_under_variables() {
    let path = std::env::temp_dir().join(format!("pixell-mpi-{}.toml", std::process::id()));
    std::fs::write(&path, "disable_mpi = \"TRUE\"\n").unwrap();

    let from_file = MpiConfig::from_file_and_vars(&path, flag(None)).unwrap();
    let overridden = MpiConfig::from_file_and_vars(&path, flag(Some("0"))).unwrap();
    let lowercase_name = MpiConfig::from_file_and_vars(
        &path,
        [("disable_mpi".to_string(), "0".to_string())].into_iter().collect(),
    )
    .unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(from_file.mode(), Mode::Disabled);
    assert_eq!(overridden.mode(), Mode::Real);
    assert_eq!(lowercase_name.mode(), Mode::Disabled);
}

#[test]
fn missing_config_file_is_empty() {
    let path = std::env::temp_dir().join("pixell-mpi-does-not-exist.toml");
    assert_eq!(MpiConfig::from_file_and_vars(&path, flag(None)).unwrap().mode(), Mode::Real);
    assert_eq!(
        MpiConfig::from_file_and_vars(&path, flag(Some("1"))).unwrap().mode(),
        Mode::Disabled
    );
}

#[test]
fn malformed_config_file_is_an_error() {
    let path = std::env::temp_dir().join(format!("pixell-mpi-bad-{}.toml", std::process::id()));
    std::fs::write(&path, "disable_mpi = ").unwrap();
    let result = MpiConfig::from_file_and_vars(&path, flag(Some("1")));
    std::fs::remove_file(&path).unwrap();

    assert!(matches!(result, Err(pixell_mpi::Error::ConfigFile(_))));
}
