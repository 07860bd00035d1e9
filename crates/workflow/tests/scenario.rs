use oa_workflow::{keys, WorkflowEngine, WorkflowStage};

#[test]
fn session_then_objective_scenario() {
    let engine = WorkflowEngine::with_phrase_detector().unwrap();

    let first = engine.advance(
        "conv-42",
        "The OKR session has been created. Session ID: '3fa85f64-5717-4562-b3fc-2c963f66afa6'",
    );
    assert_eq!(engine.stage("conv-42"), WorkflowStage::CreatedSession);
    assert_eq!(
        engine.value("conv-42", keys::OKR_SESSION_ID).as_deref(),
        Some("3fa85f64-5717-4562-b3fc-2c963f66afa6")
    );
    assert!(first.text.contains("**STEP 2: Create an Objective**"));

    let response = "The objective 'Grow Revenue' was created. Objective ID: 'abc-123'\n\n\
                    Next, let's add a key result.";
    let second = engine.advance("conv-42", response);
    assert_eq!(engine.stage("conv-42"), WorkflowStage::CreatedObjective);
    assert_eq!(engine.value("conv-42", keys::OBJECTIVE_ID).as_deref(), Some("abc-123"));
    // Already forward-looking: returned unchanged.
    assert_eq!(second.text, response);
    assert!(!second.transition.unwrap().continuation_appended);
}

#[test]
fn advancing_twice_with_prompted_text_does_not_duplicate_prompt() {
    let engine = WorkflowEngine::with_phrase_detector().unwrap();
    let out = engine.advance("c", "OKR session successfully created, ID: 'aa'");
    let again = engine.advance("c", &out.text);
    assert_eq!(again.text, out.text);
    assert_eq!(again.text.matches("STEP 2").count(), 1);
}
