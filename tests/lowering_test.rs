// Behavioral tests for goto lowering: the lowered dispatch form must compute
// what the unstructured original computes, including jumps into loop bodies
// and mutually-referential label graphs.

use liftc::eval::{call_function, run_module, EvalError, Value};
use liftc::parser::lexer::tokenize;
use liftc::{parse_clean, parse_raw, Setting};

fn clean_env(source: &str) -> liftc::eval::Value {
    let tokens = tokenize(source);
    let module = parse_clean(&tokens, &Setting::default()).unwrap();
    let env = run_module(&module).unwrap();
    call_function(&env, "f", vec![]).unwrap()
}

#[test]
fn test_jump_into_loop_body_threads_the_loop() {
    // Jumping to a label inside the while body re-enters the remaining
    // iterations, then falls out through the code after the loop.
    let source = r#"
        int f() {
            int count = 0;
            int i = 0;
            while (i < 3) {
                count = count + 10;
            L2:
                i = i + 1;
            }
            if (i < 5) goto L2;
            return count + i;
        }
    "#;
    // Direct C semantics: three loop passes (count 30, i 3), then two more
    // jumps to L2 push i to 5 without touching count.
    assert_eq!(clean_env(source), Value::Int(35));
}

#[test]
fn test_mutually_referential_labels_match_direct_execution() {
    let source = r#"
        int f() {
            int n = 0;
        A:
            n = n + 1;
            if (n >= 5) goto DONE;
            goto B;
        B:
            n = n + 2;
            goto A;
        DONE:
            return n;
        }
    "#;
    let tokens = tokenize(source);

    let raw = parse_raw(&tokens).unwrap();
    let raw_env = run_module(&raw).unwrap();
    let direct = call_function(&raw_env, "f", vec![]).unwrap();

    let clean = parse_clean(&tokens, &Setting::default()).unwrap();
    let cleaned_env = run_module(&clean).unwrap();
    let lowered = call_function(&cleaned_env, "f", vec![]).unwrap();

    assert_eq!(direct, Value::Int(7));
    assert_eq!(lowered, direct);
}

#[test]
fn test_backward_jump_with_counter() {
    let source = r#"
        int f() {
            int n = 1;
        TOP:
            n = n * 2;
            if (n < 100) goto TOP;
            return n;
        }
    "#;
    assert_eq!(clean_env(source), Value::Int(128));
}

#[test]
fn test_module_level_lowering() {
    let source = r#"
        total = 0;
        step = 0;
    AGAIN:
        step = step + 1;
        total = total + step;
        if (step < 4) goto AGAIN;
    "#;
    let tokens = tokenize(source);
    let module = parse_clean(&tokens, &Setting::default()).unwrap();

    let env = run_module(&module).unwrap();
    assert_eq!(env.lookup("total"), Some(Value::Int(10)));
    assert_eq!(env.lookup("step"), Some(Value::Int(4)));
}

#[test]
fn test_goto_to_unknown_label_is_left_as_a_marker() {
    // An untracked jump target is not lowered away; it surfaces when the
    // generated program runs.
    let source = r#"
        int f() {
            HERE: x = 1;
            if (x) goto NOWHERE;
            goto HERE;
        }
    "#;
    let tokens = tokenize(source);
    let module = parse_clean(&tokens, &Setting::default()).unwrap();
    let env = run_module(&module).unwrap();

    let err = call_function(&env, "f", vec![]).unwrap_err();
    assert_eq!(err, EvalError::UnknownLabel("NOWHERE".to_string()));
}

#[test]
fn test_conditional_skip_of_initialization() {
    let source = r#"
        int f(int takeShortcut) {
            if (takeShortcut) goto OUT;
            prepared = 41;
        OUT:
            return prepared + 1;
        }
    "#;
    let tokens = tokenize(source);
    let module = parse_clean(&tokens, &Setting::default()).unwrap();
    let env = run_module(&module).unwrap();

    let ok = call_function(&env, "f", vec![Value::Int(0)]).unwrap();
    assert_eq!(ok, Value::Int(42));

    let err = call_function(&env, "f", vec![Value::Int(1)]).unwrap_err();
    assert_eq!(
        err,
        EvalError::UninitializedCapture("prepared".to_string())
    );
}

#[test]
fn test_plain_return_before_labels_still_stops() {
    let source = r#"
        int f(int early) {
            if (early) return 100;
            x = 0;
        L:
            x = x + 1;
            if (x < 2) goto L;
            return x;
        }
    "#;
    let tokens = tokenize(source);
    let module = parse_clean(&tokens, &Setting::default()).unwrap();
    let env = run_module(&module).unwrap();

    let early = call_function(&env, "f", vec![Value::Int(1)]).unwrap();
    assert_eq!(early, Value::Int(100));
    let looped = call_function(&env, "f", vec![Value::Int(0)]).unwrap();
    assert_eq!(looped, Value::Int(2));
}
