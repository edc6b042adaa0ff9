use rstest::rstest;
use shooter_core::error::BuildError;
use shooter_core::{Exchanges, MagazineState, State, build_shooter};
use shooter_hardware::{JointModel, SimRig};

const CONFIG: &str = r#"
[joints]
topology = "dual"
friction = ["friction_left", "friction_right"]
trigger = "trigger"
magazine = "magazine"

[pid.friction]
kp = 0.05
ki = 0.5
out_max = 10.0

[pid.trigger]
kp = 2.0
kd = 0.1
out_max = 5.0

[pid.magazine]
kp = 1.0
out_max = 2.0
"#;

fn full_rig() -> SimRig {
    SimRig::new()
        .with_joint("friction_left", JointModel::flywheel())
        .with_joint("friction_right", JointModel::flywheel())
        .with_joint("trigger", JointModel::trigger())
        .with_joint("magazine", JointModel::magazine())
}

#[test]
fn builds_from_config_and_rig() {
    let cfg = shooter_config::load_toml(CONFIG).expect("parse");
    cfg.validate().expect("valid");
    let ex = Exchanges::new();
    let mut rig = full_rig();
    let mut s = build_shooter(&mut rig, &ex, &cfg).expect("build");
    assert_eq!(s.wheel_count(), 2);
    assert_eq!(s.state(), State::Passive);

    s.enable();
    s.update(std::time::Instant::now(), std::time::Duration::from_millis(1));
    assert_eq!(s.magazine_state(), MagazineState::Close);
}

#[rstest]
#[case("friction_right")]
#[case("trigger")]
#[case("magazine")]
fn missing_joint_fails_construction(#[case] absent: &str) {
    let cfg = shooter_config::load_toml(CONFIG).expect("parse");
    let ex = Exchanges::new();
    let mut rig = SimRig::new();
    for name in ["friction_left", "friction_right", "trigger", "magazine"] {
        if name != absent {
            rig.add_joint(name, JointModel::trigger());
        }
    }
    let err = build_shooter(&mut rig, &ex, &cfg).expect_err("missing joint");
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingActuator(j)) => assert_eq!(j, absent),
        other => panic!("expected MissingActuator, got: {other:?}"),
    }
}

#[test]
fn single_topology_claims_one_wheel() {
    let text = CONFIG
        .replace("topology = \"dual\"", "topology = \"single\"")
        .replace(
            "friction = [\"friction_left\", \"friction_right\"]",
            "friction = [\"friction_left\"]",
        );
    let cfg = shooter_config::load_toml(&text).expect("parse");
    cfg.validate().expect("valid");
    let ex = Exchanges::new();
    let mut rig = full_rig();
    let s = build_shooter(&mut rig, &ex, &cfg).expect("build");
    assert_eq!(s.wheel_count(), 1);
}

#[test]
fn second_claim_of_a_joint_is_a_hardware_error() {
    let cfg = shooter_config::load_toml(CONFIG).expect("parse");
    let ex = Exchanges::new();
    let mut rig = full_rig();
    let _first = build_shooter(&mut rig, &ex, &cfg).expect("build");
    let err = build_shooter(&mut rig, &ex, &cfg).expect_err("already claimed");
    assert!(format!("{err}").contains("already claimed"));
}
