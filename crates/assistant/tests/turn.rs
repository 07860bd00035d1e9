use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use oa_assistant::{Assistant, TurnInput};
use oa_domain::config::Config;
use oa_domain::error::Error;
use oa_domain::message::Role;
use oa_ingestion::AnswerMode;
use oa_providers::ScriptedProvider;
use oa_workflow::{keys, WorkflowStage};

fn assistant(provider: Arc<ScriptedProvider>) -> Assistant {
    Assistant::new(Arc::new(Config::default()), provider).unwrap()
}

fn turn(conversation: &str, text: &str) -> TurnInput {
    TurnInput::new(conversation, text)
}

#[tokio::test]
async fn turn_sends_system_prompt_and_records_both_messages() {
    let provider = Arc::new(ScriptedProvider::fixed("Hi! Let's set some goals."));
    let assistant = assistant(provider.clone());

    let outcome = assistant
        .handle_turn(turn("c1", "Hello"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.reply, "Hi! Let's set some goals.");
    assert!(outcome.stored);
    assert_eq!(outcome.stage, WorkflowStage::None);

    let req = &provider.requests()[0];
    assert_eq!(req.messages[0].role, Role::System);
    assert_eq!(req.messages[0].content, assistant.config.assistant.system_prompt);
    assert_eq!(req.messages[1].content, "Hello");

    let history = assistant.conversations.get("c1").unwrap();
    let history = history.read();
    assert_eq!(history.len(), 2);
    assert_eq!(history.messages()[1].role, Role::Assistant);
}

#[tokio::test]
async fn later_turns_see_earlier_exchange() {
    let provider = Arc::new(ScriptedProvider::fixed("noted"));
    let assistant = assistant(provider.clone());
    let cancel = CancellationToken::new();

    assistant.handle_turn(turn("c1", "first"), &cancel).await.unwrap();
    assistant.handle_turn(turn("c1", "second"), &cancel).await.unwrap();

    let second = &provider.requests()[1];
    let contents: Vec<&str> = second.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents[1..], ["first", "noted", "second"]);
}

#[tokio::test]
async fn session_creation_reply_gets_objective_prompt() {
    let provider = Arc::new(ScriptedProvider::fixed(
        "The OKR session has been created. Session ID: '3fa85f64-5717-4562-b3fc-2c963f66afa6'",
    ));
    let assistant = assistant(provider);

    let outcome = assistant
        .handle_turn(turn("c1", "Create a Q3 session"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.stage, WorkflowStage::CreatedSession);
    assert!(outcome.reply.contains("**STEP 2: Create an Objective**"));
    assert_eq!(
        assistant.workflow.value("c1", keys::OKR_SESSION_ID).as_deref(),
        Some("3fa85f64-5717-4562-b3fc-2c963f66afa6")
    );

    // The stored reply is the extended one.
    let history = assistant.conversations.get("c1").unwrap();
    assert_eq!(history.read().messages()[1].text(), outcome.reply);
}

#[tokio::test]
async fn failed_completion_keeps_user_message_and_workflow() {
    let provider = Arc::new(ScriptedProvider::new(|_| {
        Err(Error::Provider {
            provider: "scripted".into(),
            message: "HTTP 503".into(),
        })
    }));
    let assistant = assistant(provider);

    let err = assistant
        .handle_turn(turn("c1", "Create a session"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("HTTP 503"));

    let history = assistant.conversations.get("c1").unwrap();
    assert_eq!(history.read().len(), 1);
    assert_eq!(assistant.workflow.stage("c1"), WorkflowStage::None);
}

#[tokio::test]
async fn code_block_reply_is_returned_but_not_stored() {
    let provider = Arc::new(ScriptedProvider::fixed("```json\n{}\n```"));
    let assistant = assistant(provider);

    let outcome = assistant
        .handle_turn(turn("c1", "show json"), &CancellationToken::new())
        .await
        .unwrap();
    assert!(!outcome.stored);
    assert_eq!(assistant.conversations.get("c1").unwrap().read().len(), 1);
}

#[tokio::test]
async fn user_id_makes_conversation_listable_by_participant() {
    let assistant = assistant(Arc::new(ScriptedProvider::fixed("ok")));
    let cancel = CancellationToken::new();

    assistant
        .handle_turn(turn("c1", "hi").from_user("Alice"), &cancel)
        .await
        .unwrap();
    assistant.handle_turn(turn("c2", "hi"), &cancel).await.unwrap();

    let found = assistant.conversations.list_by_participant("alice");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].0, "c1");
    assert!(assistant.conversations.list_by_participant("").is_empty());
}

#[tokio::test]
async fn reset_clears_history_and_workflow() {
    let provider = Arc::new(ScriptedProvider::fixed(
        "OKR session created successfully. Session ID: 'abcd'",
    ));
    let assistant = assistant(provider);

    assistant
        .handle_turn(turn("c1", "go"), &CancellationToken::new())
        .await
        .unwrap();
    let before = assistant.conversations.get("c1").unwrap();

    assistant.reset_conversation("c1");

    let after = assistant.conversations.get("c1").unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert!(after.read().is_empty());
    assert!(assistant.workflow.state("c1").is_empty());
}

#[tokio::test]
async fn concurrent_turns_on_one_conversation_are_serialized() {
    let provider = Arc::new(
        ScriptedProvider::fixed("reply").with_delay(Duration::from_millis(30)),
    );
    let assistant = assistant(provider.clone());

    let a = {
        let assistant = assistant.clone();
        tokio::spawn(async move {
            assistant
                .handle_turn(turn("c1", "one"), &CancellationToken::new())
                .await
        })
    };
    let b = {
        let assistant = assistant.clone();
        tokio::spawn(async move {
            assistant
                .handle_turn(turn("c1", "two"), &CancellationToken::new())
                .await
        })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    // Whichever ran second saw the first exchange in full.
    let sizes: Vec<usize> = provider.requests().iter().map(|r| r.messages.len()).collect();
    assert_eq!(sizes, [2, 4]);

    let history = assistant.conversations.get("c1").unwrap();
    let roles: Vec<Role> = history.read().messages().iter().map(|m| m.role).collect();
    assert_eq!(roles, [Role::User, Role::Assistant, Role::User, Role::Assistant]);
}

#[tokio::test]
async fn ask_document_records_question_and_answer() {
    let provider = Arc::new(ScriptedProvider::fixed("Revenue is the focus."));
    let assistant = assistant(provider.clone());

    let answer = assistant
        .ask_document(
            "c1",
            None,
            "Q3: grow revenue 10%",
            "What is the focus?",
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(answer.mode, AnswerMode::SingleShot);
    assert_eq!(answer.text, "Revenue is the focus.");
    assert!(provider.requests()[0].messages[0]
        .content
        .contains("Document content:\nQ3: grow revenue 10%"));

    let history = assistant.conversations.get("c1").unwrap();
    let history = history.read();
    assert_eq!(history.len(), 2);
    assert_eq!(history.messages()[0].text(), "What is the focus?");
}

#[tokio::test]
async fn failed_document_answer_is_not_stored() {
    let provider = Arc::new(ScriptedProvider::new(|_| Err(Error::Other("boom".into()))));
    let assistant = assistant(provider);

    let answer = assistant
        .ask_document("c1", None, "doc", "q", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(answer.mode, AnswerMode::Failed);
    assert_eq!(assistant.conversations.get("c1").unwrap().read().len(), 1);
}

#[tokio::test]
async fn ask_document_records_participant() {
    let assistant = assistant(Arc::new(ScriptedProvider::fixed("Growth.")));

    assistant
        .ask_document(
            "doc-chat",
            Some("Alice"),
            "Q3: grow revenue",
            "Focus?",
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let found = assistant.conversations.list_by_participant("alice");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].0, "doc-chat");
}

#[tokio::test]
async fn created_entities_are_resolvable_in_later_turns() {
    let replies = [
        "The OKR session has been created. Session ID: 'dead-0001'",
        "Objective created successfully. Objective ID: 'abc-123'",
        "Here is what I know about it.",
    ];
    let calls = AtomicUsize::new(0);
    let provider = Arc::new(ScriptedProvider::new(move |_| {
        let i = calls.fetch_add(1, Ordering::SeqCst);
        Ok(replies[i.min(replies.len() - 1)].to_string())
    }));
    let assistant = assistant(provider.clone());
    let cancel = CancellationToken::new();

    assistant.handle_turn(turn("c1", "Create a Q3 session"), &cancel).await.unwrap();
    assistant.handle_turn(turn("c1", "Add an objective"), &cancel).await.unwrap();
    assistant
        .handle_turn(turn("c1", "What was the first objective about?"), &cancel)
        .await
        .unwrap();

    let history = assistant.conversations.get("c1").unwrap();
    {
        let history = history.read();
        assert_eq!(history.most_recent_entity_id("OkrSession"), Some("dead-0001"));
        assert_eq!(history.most_recent_entity_id("Objective"), Some("abc-123"));
        let tagged = history.entity_history("Objective", "abc-123");
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].operation.as_deref(), Some("Create"));
    }

    let last_request = provider.requests().pop().unwrap();
    let question = last_request.messages.last().unwrap();
    assert_eq!(question.role, Role::User);
    assert!(question
        .content
        .contains("Context: Referenced Objective ID: abc-123"));
}

#[tokio::test]
async fn pruning_skips_conversation_with_turn_in_flight() {
    let provider = Arc::new(
        ScriptedProvider::fixed("reply").with_delay(Duration::from_millis(200)),
    );
    let assistant = assistant(provider);

    let running = {
        let assistant = assistant.clone();
        tokio::spawn(async move {
            assistant
                .handle_turn(turn("c1", "hello"), &CancellationToken::new())
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(assistant.prune_idle_conversations(chrono::Duration::zero()), 0);

    running.await.unwrap().unwrap();
    let history = assistant.conversations.get("c1").unwrap();
    assert_eq!(history.read().len(), 2);

    // Once the turn is over the conversation is ordinary idle state.
    assert_eq!(assistant.prune_idle_conversations(chrono::Duration::seconds(-1)), 1);
    assert!(!assistant.conversations.contains("c1"));
}

#[tokio::test]
async fn padded_conversation_id_resets_the_same_conversation() {
    let provider = Arc::new(ScriptedProvider::fixed(
        "OKR session created successfully. Session ID: 'abcd'",
    ));
    let assistant = assistant(provider);

    assistant
        .handle_turn(turn(" c1 ", "go"), &CancellationToken::new())
        .await
        .unwrap();
    assert!(assistant.conversations.contains("c1"));
    assert_eq!(assistant.workflow.stage("c1"), WorkflowStage::CreatedSession);

    assistant.reset_conversation(" c1 ");

    assert!(assistant.conversations.get("c1").unwrap().read().is_empty());
    assert!(assistant.workflow.state("c1").is_empty());
}
