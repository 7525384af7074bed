use rstest::rstest;
use std::path::Path;

use super::*;

#[test]
fn defaults_test() {
    let args = Args::try_parse_from(["mci"]).unwrap();

    assert_eq!(None, args.max_requeue);
    assert!(args.log_dir.is_none() || std::env::var_os("MCI_LOG_DIR").is_some());
}

#[test]
fn all_arguments_test() {
    let args = Args::try_parse_from(["mci", "-c", "/etc/mci.yaml", "--log-dir", "/var/log/mci", "--max-requeue", "5"])
        .unwrap();

    assert_eq!(Path::new("/etc/mci.yaml"), args.config);
    assert_eq!(Some(Path::new("/var/log/mci")), args.log_dir.as_deref());
    assert_eq!(Some(5), args.max_requeue);
}

#[rstest]
#[case(None, 3)]
#[case(Some(0), 0)]
#[case(Some(10), 10)]
fn apply_overrides_test(#[case] max_requeue: Option<u32>, #[case] expected: u32) {
    let args = Args {
        config: PathBuf::from(DEFAULT_CONFIG_PATH),
        log_dir: None,
        max_requeue,
    };
    let mut config = Config {
        max_requeue_time: 3,
        ..Default::default()
    };

    args.apply_overrides(&mut config);

    assert_eq!(expected, config.max_requeue_time);
}

#[test]
fn invalid_max_requeue_test() {
    assert!(Args::try_parse_from(["mci", "--max-requeue", "-1"]).is_err());
}
