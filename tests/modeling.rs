use pwlmodel::*;
use pwlmodel::assignment::{AssignmentModel, DelayFormulation, Scenario};
use pwlmodel::lp_format::to_lp_string;
use pwlmodel::pwl::{add_piecewise_linear, BreakpointTable, PwlConfig, QueueingDelay, ResponseFunction, Sos2Encoding};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn scenario() -> Scenario {
    Scenario::new(5, vec![3.0,6.0,6.0], vec![10.0,25.0,40.0], 1.0).unwrap()
}

#[test]
fn native_sos2_assignment() {
    init_logging();
    let config = PwlConfig::default().with_samples(10);
    let am = AssignmentModel::<dummy::Backend>::build(&scenario(), &DelayFormulation::PiecewiseLinear(config)).unwrap();
    let data = am.model().data();

    assert_eq!(data.sos2_sets().len(), 3);
    for (pwl,set) in am.delays().iter().zip(data.sos2_sets().iter()) {
        assert_eq!(pwl.encoding(), Sos2Encoding::Native);
        assert_eq!(set.weights.as_slice(), pwl.table().loads());
        assert_eq!(set.subj, pwl.weights().iter().map(|w| w.index()).collect::<Vec<usize>>());
    }
    // no selector binaries: only the 15 assignment variables are integer
    assert_eq!(data.num_integer(), 15);

    let lp = to_lp_string(data);
    assert!(lp.contains("SOS\n delay_0_.sos2: S2::"));
    assert!(lp.contains(" theta_2_: + 1 delay_2_.y <= 1\n"));
}

#[test]
fn solving_with_dummy_backend_fails() {
    let mut am = AssignmentModel::<dummy::Backend>::build(&scenario(), &DelayFormulation::ExactCapacity).unwrap();
    assert!(matches!(am.solve(), Err(Error::Unsupported(_))));
}

#[test]
fn load_at_rate_is_rejected() {
    init_logging();
    let f = QueueingDelay::new(4.0).unwrap();
    assert!(matches!(f.try_value(4.0), Err(Error::UndefinedRegion{ .. })));
    // a margin of 1 would sample the singularity; rejected before evaluation
    let config = PwlConfig::default().with_margin(1.0);
    assert!(matches!(BreakpointTable::sample(&f, &config), Err(Error::InvalidParameter(_))));
}

#[test]
fn scenario_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenario.json");
    let s = scenario();
    let formulation = DelayFormulation::PiecewiseLinear(PwlConfig::default().with_samples(25));
    std::fs::write(&path, serde_json::to_string_pretty(&(&s,&formulation)).unwrap()).unwrap();

    let (s2,f2) : (Scenario,DelayFormulation) = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(s2, s);
    assert_eq!(f2, formulation);
}

#[test]
fn pwl_with_expression_load() {
    let mut m = dummy::Model::new(None);
    let x = m.variables(Some("x"), 4, binary()).unwrap();
    let config = PwlConfig::default().with_samples(8).with_encoding(Sos2Encoding::Selector);
    let table = BreakpointTable::sample(&QueueingDelay::new(5.0).unwrap(), &config).unwrap();
    let pwl = add_piecewise_linear(&mut m, "d", table, x.as_slice(), &config).unwrap();

    // load link: Σ w_i l_i - Σ x = 0
    let (subj,cof) = m.data().row(pwl.load_link().index());
    assert_eq!(&subj[..4], &[0,1,2,3]);
    assert!(cof[..4].iter().all(|&c| c == -1.0));
    assert_eq!(pwl.selectors().len(), 7);
}
