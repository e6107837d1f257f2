use qpay_logger::{LevelFilter, Logger, LoggerError};

#[test]
fn console_only_has_no_guard_and_second_init_fails() {
    let logger = Logger::builder()
        .name("qpay-console-only")
        .json(true)
        .level(LevelFilter::INFO)
        .init()
        .expect("logger should initialize");

    assert!(logger.guard().is_none(), "console-only logger should not create a file guard");

    let second = Logger::builder().name("qpay-console-only").init();
    assert!(matches!(second, Err(LoggerError::Subscriber { .. })));
}
