use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use lb_api::{create_engine, CreateEngineOptions, EngineOptions, HostFunction, LuaEngine};
use lb_core::{ArgValue, CallbackKey, ExecutionError, LogLevel, LuaBridgeError};

use crate::source::{read_lua_sources, read_test_case};
use crate::{ExpectedCall, ExpectedOutcome, LbToolError, TestCase, MAIN_SCRIPT};

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub observed_calls: Vec<ExpectedCall>,
    pub outcome: ExpectedOutcome,
    pub executions: usize,
}

type CallLog = Rc<RefCell<Vec<ExpectedCall>>>;

/// Runs every helper source once, then executes `main.lua`
/// `case.executions` times, stopping at the first failure.
pub fn run_case(case_dir: &Path, case: &TestCase) -> Result<RunReport, LbToolError> {
    let sources = read_lua_sources(case_dir)?;
    let log_level = match case.log_level.as_deref() {
        Some(raw) => LogLevel::parse(raw).ok_or_else(|| LbToolError::InvalidLogLevel {
            value: raw.to_string(),
        })?,
        None => LogLevel::Off,
    };

    let calls: CallLog = Rc::new(RefCell::new(Vec::new()));
    let functions = case
        .functions
        .iter()
        .map(|spec| {
            let key = CallbackKey::new(spec.namespace.clone(), spec.name.clone());
            let outcome = match &spec.error {
                Some(error) => Err(LuaBridgeError::from(error)),
                None => Ok(spec.result),
            };
            (key.clone(), recording_function(&calls, key, outcome))
        })
        .collect();

    let mut engine = create_engine(CreateEngineOptions {
        options: EngineOptions {
            log_level,
            memory_limit: None,
        },
        functions,
        preload: None,
    })?;

    let mut executions = 0usize;
    let result = prepare_sources(&mut engine, &sources)
        .and_then(|()| execute_repeatedly(&mut engine, case.executions, &mut executions));
    engine.close();

    let outcome = match result {
        Ok(()) => ExpectedOutcome::default(),
        Err(error) => ExpectedOutcome {
            code: error.code,
            message: Some(error.message),
            message_contains: None,
        },
    };

    let observed_calls = calls.borrow().clone();
    Ok(RunReport {
        observed_calls,
        outcome,
        executions,
    })
}

pub fn assert_case(case_dir: &Path, case_path: &Path) -> Result<(), LbToolError> {
    let case = read_test_case(case_path)?;
    let report = run_case(case_dir, &case)?;

    let actual_message = report.outcome.message.as_deref().unwrap_or_default();
    if !case
        .expected_outcome
        .matches(report.outcome.code, actual_message)
    {
        let expected =
            serde_json::to_string(&case.expected_outcome).map_err(LbToolError::Serialize)?;
        let actual = serde_json::to_string(&report.outcome).map_err(LbToolError::Serialize)?;
        return Err(LbToolError::OutcomeMismatch { expected, actual });
    }

    if report.observed_calls.len() != case.expected_calls.len() {
        let observed = serde_json::to_string_pretty(&report.observed_calls)
            .map_err(LbToolError::Serialize)?;
        return Err(LbToolError::CallCountMismatch {
            expected: case.expected_calls.len(),
            actual: report.observed_calls.len(),
            observed,
        });
    }

    for (index, (expected, actual)) in case
        .expected_calls
        .iter()
        .zip(report.observed_calls.iter())
        .enumerate()
    {
        if expected != actual {
            let expected = serde_json::to_string(expected).map_err(LbToolError::Serialize)?;
            let actual = serde_json::to_string(actual).map_err(LbToolError::Serialize)?;
            return Err(LbToolError::CallMismatch {
                index,
                expected,
                actual,
            });
        }
    }

    Ok(())
}

fn prepare_sources(
    engine: &mut LuaEngine,
    sources: &BTreeMap<String, String>,
) -> Result<(), ExecutionError> {
    for (path, source) in sources {
        if path != MAIN_SCRIPT {
            engine.execute_script(source)?;
        }
    }
    match sources.get(MAIN_SCRIPT) {
        Some(main) => engine.load(main),
        None => Ok(()),
    }
}

fn execute_repeatedly(
    engine: &mut LuaEngine,
    times: usize,
    executions: &mut usize,
) -> Result<(), ExecutionError> {
    for _ in 0..times {
        *executions += 1;
        engine.execute()?;
    }
    Ok(())
}

fn recording_function(
    calls: &CallLog,
    key: CallbackKey,
    outcome: Result<i32, LuaBridgeError>,
) -> Rc<dyn HostFunction> {
    let calls = Rc::clone(calls);
    Rc::new(move |args: &[ArgValue]| -> Result<i32, LuaBridgeError> {
        calls.borrow_mut().push(ExpectedCall {
            namespace: key.namespace.clone(),
            name: key.name.clone(),
            args: args.to_vec(),
        });
        outcome.clone()
    })
}
