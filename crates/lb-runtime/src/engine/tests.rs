use super::*;
use lb_core::CallFailure;
use std::cell::Cell;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(Level::TRACE)
        .try_init();
}

fn quiet_engine() -> LuaEngine {
    let mut engine = LuaEngine::new().expect("engine should build");
    engine.set_log_level("off");
    engine
}

type Calls = Rc<RefCell<Vec<Vec<ArgValue>>>>;

fn recorder(result: i32) -> (Calls, impl Fn(&[ArgValue]) -> Result<i32, LuaBridgeError>) {
    let calls: Calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    let function = move |args: &[ArgValue]| -> Result<i32, LuaBridgeError> {
        sink.borrow_mut().push(args.to_vec());
        Ok(result)
    };
    (calls, function)
}

#[test]
fn default_namespace_receives_marshalled_arguments() {
    init_tracing();
    let mut engine = LuaEngine::new().expect("engine should build");
    engine.set_log_level("trace");
    let (calls, function) = recorder(5);
    engine.register_function("func", function).expect("register");

    engine
        .execute_script("r = java:func(42, 'xyz')")
        .expect("script should run");

    assert_eq!(
        *calls.borrow(),
        vec![vec![ArgValue::Number(42.0), ArgValue::from("xyz")]]
    );
    assert_eq!(engine.state(), EngineState::Executed(ReturnCode::Ok));
}

#[test]
fn result_is_visible_to_guest_code() {
    let mut engine = quiet_engine();
    let (_, function) = recorder(41);
    engine.register_function("answer", function).expect("register");
    let (seen, check) = recorder(0);
    engine
        .register_namespaced_function("host", "check", check)
        .expect("register");

    engine
        .execute_script("host:check(java:answer() + 1, math.type(java:answer()))")
        .expect("script should run");

    assert_eq!(
        *seen.borrow(),
        vec![vec![ArgValue::Number(42.0), ArgValue::from("integer")]]
    );
}

#[test]
fn namespaces_do_not_collide() {
    let mut engine = quiet_engine();
    let (java_calls, java_fn) = recorder(1);
    let (ns1_calls, ns1_fn) = recorder(2);
    engine.register_function("func", java_fn).expect("register");
    engine
        .register_namespaced_function("ns1", "func", ns1_fn)
        .expect("register");

    engine
        .execute_script("ns1:func('a')\njava:func('b')\nns1:func('c')")
        .expect("script should run");

    assert_eq!(
        *java_calls.borrow(),
        vec![vec![ArgValue::from("b")]]
    );
    assert_eq!(
        *ns1_calls.borrow(),
        vec![vec![ArgValue::from("a")], vec![ArgValue::from("c")]]
    );
    assert_eq!(engine.namespaces(), vec!["java".to_string(), "ns1".to_string()]);
}

#[test]
fn call_without_arguments_passes_empty_slice() {
    let mut engine = quiet_engine();
    let (calls, function) = recorder(0);
    engine.register_function("ping", function).expect("register");

    engine.execute_script("java:ping()").expect("script should run");

    assert_eq!(*calls.borrow(), vec![Vec::<ArgValue>::new()]);
}

#[test]
fn loaded_chunk_runs_once_per_execute() {
    let mut engine = quiet_engine();
    let (calls, function) = recorder(0);
    engine.register_function("tick", function).expect("register");

    engine.load("java:tick(1, true, nil)").expect("load");
    for _ in 0..10 {
        engine.execute().expect("execute");
    }

    assert_eq!(calls.borrow().len(), 10);
    assert!(calls
        .borrow()
        .iter()
        .all(|args| args == &vec![ArgValue::Number(1.0), ArgValue::Bool(true), ArgValue::Nil]));
}

#[test]
fn execute_runs_only_the_latest_loaded_script() {
    let mut engine = quiet_engine();
    let (calls, function) = recorder(0);
    engine.register_function("log", function).expect("register");

    engine.load("java:log('first')").expect("load first");
    engine.load("java:log('second')").expect("load second");
    assert_eq!(engine.source(), Some("java:log('second')"));
    assert_eq!(
        engine.history(),
        &["java:log('first')".to_string(), "java:log('second')".to_string()]
    );
    assert_eq!(engine.state(), EngineState::Loaded);

    engine.execute().expect("execute");
    assert_eq!(*calls.borrow(), vec![vec![ArgValue::from("second")]]);
}

#[test]
fn repeated_execute_script_calls_each_function_once_per_run() {
    let mut engine = quiet_engine();
    let (first, first_fn) = recorder(0);
    let (second, second_fn) = recorder(0);
    engine.register_function("first", first_fn).expect("register");
    engine
        .register_namespaced_function("ns1", "second", second_fn)
        .expect("register");

    for _ in 0..10 {
        engine
            .execute_script("r = java:first('abc')
ns1:second(r)")
            .expect("script should run");
    }

    assert_eq!(first.borrow().len(), 10);
    assert_eq!(second.borrow().len(), 10);
}

#[test]
fn diagnostics_name_the_script_that_failed() {
    let mut engine = quiet_engine();
    engine.execute_script("x = 1\ny = 2").expect("first script runs");

    let error = engine
        .execute_script("error('second')")
        .expect_err("second script fails");

    assert_eq!(error.message, "[string \"error('second')\"]:1: second");
    let location = error.location().expect("location");
    assert_eq!(location.chunk, "error('second')");
    assert_eq!(location.line, 1);
}

#[test]
fn execute_without_script_fails() {
    let mut engine = quiet_engine();

    let error = engine.execute().expect_err("nothing loaded");

    assert_eq!(error.code, ReturnCode::RuntimeError);
    assert_eq!(error.message, NO_SCRIPT_MESSAGE);
    assert_eq!(engine.last_error().as_deref(), Some(NO_SCRIPT_MESSAGE));
    assert_eq!(engine.state(), EngineState::Created);
}

#[test]
fn syntax_error_keeps_previous_chunk() {
    let mut engine = quiet_engine();
    let (calls, function) = recorder(0);
    engine.register_function("ok", function).expect("register");
    engine.load("java:ok()").expect("load");

    let error = engine.load("x = 'unclosed").expect_err("syntax error");

    assert_eq!(error.code, ReturnCode::SyntaxError);
    assert!(!error.message.is_empty());
    assert_eq!(engine.last_error(), Some(error.message.clone()));
    assert_eq!(engine.source(), Some("java:ok()"));
    assert_eq!(engine.history().len(), 1);

    engine.execute().expect("previous chunk still runs");
    assert_eq!(calls.borrow().len(), 1);
}

#[test]
fn unknown_namespace_reports_interpreter_diagnostic() {
    let mut engine = quiet_engine();

    let error = engine.execute_script("ns:fn()").expect_err("unknown namespace");

    assert_eq!(error.code, ReturnCode::RuntimeError);
    assert_eq!(
        error.message,
        "[string \"ns:fn()\"]:1: attempt to index a nil value (global 'ns')"
    );
    let location = error.location().expect("location");
    assert_eq!(location.chunk, "ns:fn()");
    assert_eq!(location.line, 1);
    assert!(error.failure.is_none());
    assert_eq!(engine.state(), EngineState::Executed(ReturnCode::RuntimeError));
}

#[test]
fn missing_function_in_known_namespace_is_not_found() {
    let mut engine = quiet_engine();
    let (calls, function) = recorder(0);
    engine
        .register_namespaced_function("ns", "present", function)
        .expect("register");

    let error = engine
        .execute_script("ns:missing(1)")
        .expect_err("missing function");

    assert_eq!(error.code, ReturnCode::RuntimeError);
    assert!(error.is_function_not_found());
    assert!(error.message.contains("ns:missing"));
    assert!(calls.borrow().is_empty());
}

#[test]
fn dot_call_syntax_is_rejected() {
    let mut engine = quiet_engine();
    let (calls, function) = recorder(0);
    engine
        .register_namespaced_function("ns", "fn", function)
        .expect("register");

    let error = engine.execute_script("ns.fn()").expect_err("dot syntax");

    assert_eq!(error.code, ReturnCode::RuntimeError);
    assert_eq!(error.message, "[string \"ns.fn()\"]:1: use ns:func() syntax");
    assert!(calls.borrow().is_empty());
}

#[test]
fn re_registration_replaces_handle() {
    let mut engine = quiet_engine();
    let (first_calls, first) = recorder(1);
    let (second_calls, second) = recorder(2);
    engine.register_function("fn", first).expect("register");
    engine.register_function("fn", second).expect("register again");

    engine.execute_script("java:fn()").expect("script should run");

    assert!(first_calls.borrow().is_empty());
    assert_eq!(second_calls.borrow().len(), 1);
}

#[test]
fn host_failure_aborts_script_distinctly() {
    let mut engine = quiet_engine();
    engine
        .register_function("deny", |_: &[ArgValue]| -> Result<i32, LuaBridgeError> {
            Err(LuaBridgeError::new("HOST_DENIED", "not allowed"))
        })
        .expect("register");
    let (after, function) = recorder(0);
    engine.register_function("after", function).expect("register");

    let error = engine
        .execute_script("java:deny()\njava:after()")
        .expect_err("host failure");

    assert_eq!(error.code, ReturnCode::RuntimeError);
    assert_eq!(
        error.host_error(),
        Some(&LuaBridgeError::new("HOST_DENIED", "not allowed"))
    );
    assert!(!error.is_function_not_found());
    assert!(after.borrow().is_empty());
}

#[test]
fn guest_can_catch_host_failure() {
    let mut engine = quiet_engine();
    engine
        .register_function("deny", |_: &[ArgValue]| -> Result<i32, LuaBridgeError> {
            Err(LuaBridgeError::new("HOST_DENIED", "not allowed"))
        })
        .expect("register");
    let (seen, check) = recorder(0);
    engine.register_function("check", check).expect("register");

    engine
        .execute_script("local ok = pcall(function() return java:deny() end)\njava:check(ok)")
        .expect("guest handled the failure");

    assert_eq!(*seen.borrow(), vec![vec![ArgValue::Bool(false)]]);
}

#[test]
fn table_argument_is_rejected_before_host_call() {
    let mut engine = quiet_engine();
    let (calls, function) = recorder(0);
    engine.register_function("fn", function).expect("register");

    let error = engine
        .execute_script("java:fn(1, {})")
        .expect_err("unsupported argument");

    assert!(matches!(error.failure, Some(CallFailure::Marshal(_))));
    assert_eq!(
        error.message,
        "unsupported argument type: 'table' (argument 2)"
    );
    assert!(calls.borrow().is_empty());
}

#[test]
fn guest_error_keeps_interpreter_message() {
    let mut engine = quiet_engine();

    let error = engine
        .execute_script("local x = 1\nerror('boom')")
        .expect_err("guest error");

    assert_eq!(error.code, ReturnCode::RuntimeError);
    assert_eq!(error.message, "[string \"local x = 1...\"]:2: boom");
    assert_eq!(error.location().map(|location| location.line), Some(2));
}

#[test]
fn memory_limit_surfaces_memory_error() {
    let mut engine = LuaEngine::with_options(EngineOptions {
        log_level: LogLevel::Off,
        memory_limit: Some(2 * 1024 * 1024),
    })
    .expect("engine should build");

    let error = engine
        .execute_script("local s = string.rep('x', 64 * 1024 * 1024)")
        .expect_err("allocation should fail");

    assert_eq!(error.code, ReturnCode::MemoryError);
    assert_eq!(engine.state(), EngineState::Executed(ReturnCode::MemoryError));
}

#[test]
fn log_level_accepts_known_names_only() {
    let mut engine = quiet_engine();
    assert_eq!(engine.log_level(), LogLevel::Off);

    engine.set_log_level("DEBUG");
    assert_eq!(engine.log_level(), LogLevel::Debug);
    engine.set_log_level("all");
    assert_eq!(engine.log_level(), LogLevel::Trace);
    engine.set_log_level("fatal");
    assert_eq!(engine.log_level(), LogLevel::Fatal);
    engine.set_log_level("verbose");
    assert_eq!(engine.log_level(), LogLevel::Fatal);
}

#[test]
fn invoke_reaches_registered_function() {
    let mut engine = quiet_engine();
    let (calls, function) = recorder(9);
    engine
        .register_namespaced_function("ns", "fn", function)
        .expect("register");

    let result = engine
        .invoke("ns", "fn", &[ArgValue::from("a"), ArgValue::Number(2.5)])
        .expect("invoke");

    assert_eq!(result, 9);
    assert_eq!(
        *calls.borrow(),
        vec![vec![ArgValue::from("a"), ArgValue::Number(2.5)]]
    );

    let error = engine.invoke("ns", "nope", &[]).expect_err("missing");
    assert!(error.is_function_not_found());
    assert_eq!(engine.last_error().as_deref(), Some("function not found: ns:nope"));
}

#[test]
fn last_error_is_kept_after_success() {
    let mut engine = quiet_engine();
    let (calls, function) = recorder(0);
    engine.register_function("fn", function).expect("register");
    assert_eq!(engine.last_error(), None);

    engine.load("java:fn()").expect("load");
    let error = engine.load("x = (").expect_err("syntax error");
    assert_eq!(engine.last_error(), Some(error.message.clone()));

    engine.execute().expect("runs");
    assert_eq!(calls.borrow().len(), 1);
    assert_eq!(engine.last_error(), Some(error.message));
}

#[test]
fn engines_are_independent() {
    let mut first = quiet_engine();
    let mut second = quiet_engine();
    let hits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&hits);
    first
        .register_function("hit", move |_: &[ArgValue]| -> Result<i32, LuaBridgeError> {
            counter.set(counter.get() + 1);
            Ok(0)
        })
        .expect("register");

    first.execute_script("shared = 1\njava:hit()").expect("first runs");
    second
        .execute_script("assert(shared == nil)")
        .expect("globals are per engine");
    let error = second
        .execute_script("java:hit()")
        .expect_err("not registered here");

    assert!(error.is_function_not_found());
    assert_eq!(hits.get(), 1);
    first.close();
    second.close();
}

#[test]
fn namespace_shadowing_a_library_is_reported() {
    let mut engine = quiet_engine();
    assert!(!engine.publish_namespace("ns").expect("fresh namespace"));
    assert!(!engine.publish_namespace("ns").expect("own proxy again"));
    assert!(!engine.publish_namespace(DEFAULT_NAMESPACE).expect("default namespace"));

    engine
        .register_namespaced_function("string", "rep", |_: &[ArgValue]| -> Result<i32, LuaBridgeError> {
            Ok(3)
        })
        .expect("register");
    assert!(!engine.publish_namespace("string").expect("already a proxy"));

    let mut fresh = quiet_engine();
    assert!(fresh.publish_namespace("table").expect("library replaced"));
    let error = fresh
        .execute_script("local s = table.concat({'a'})")
        .expect_err("library is gone");
    assert_eq!(
        error.message,
        "[string \"local s = table.concat({'a'})\"]:1: use ns:func() syntax"
    );
    engine.execute_script("assert(string:rep() == 3)").expect("proxy call works");
}
