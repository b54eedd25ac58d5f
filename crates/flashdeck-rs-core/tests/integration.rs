//! End-to-end card integration tests over a file-backed store.

use flashdeck_rs_core::{
    CardStore, CompletionClient, CompletionSettings, Conversation, FileBlobStore,
    FlashdeckError, IntegrationOrchestrator, IntegrationRequest,
};
use flashdeck_rs_protocol::TransportError;
use flashdeck_rs_test_utils::{ControlledBlobStore, ScriptedTransport, api_error_body, chat_body};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::tempdir;

fn orchestrator(transport: Arc<ScriptedTransport>) -> IntegrationOrchestrator {
    let client = CompletionClient::new(
        transport,
        Some("sk-test".to_string()),
        CompletionSettings::immediate("test-model", 2),
    );
    IntegrationOrchestrator::new(client, 0.2)
}

/// A chat answer integrated into a card survives a reload from disk.
#[tokio::test]
async fn integrated_card_survives_reload() {
    let temp = tempdir().expect("tempdir");
    let blobs = Arc::new(FileBlobStore::new(temp.path().join("data")).expect("blobs"));
    let mut store = CardStore::open(blobs.clone()).expect("open");
    let deck = store.create_deck("Linear algebra").expect("deck");
    let card = store
        .append_card(deck.id, "What is a basis?", "A spanning set")
        .expect("card");

    let chat = Arc::new(ScriptedTransport::new(vec![Ok(chat_body(
        "It must also be linearly independent.",
    ))]));
    let client = CompletionClient::new(
        chat,
        Some("sk-test".to_string()),
        CompletionSettings::immediate("test-model", 0),
    );
    let mut conversation = Conversation::for_card(&card);
    let answer = conversation
        .ask(&client, &card, "Is that all?", 0.7)
        .await
        .expect("answer");

    let transport = Arc::new(ScriptedTransport::new(vec![Ok(chat_body(
        "<CARD><FRONT>What is a basis?</FRONT>\
         <BACK>A linearly independent spanning set</BACK></CARD>",
    ))]));
    let updated = orchestrator(transport.clone())
        .integrate(
            &mut store,
            &IntegrationRequest {
                card: card.clone(),
                transcript: conversation.messages().to_vec(),
                assistant_message_id: answer.id,
                instructions: None,
            },
        )
        .await
        .expect("integrated");
    assert!(
        transport.requests()[0].messages[1]
            .content
            .contains("Student question:\nIs that all?")
    );

    let reopened = CardStore::open(blobs).expect("reopen");
    let reloaded = reopened.card(card.id).expect("card");
    assert_eq!(reloaded, &updated);
    assert_eq!(reloaded.back, "A linearly independent spanning set");
    assert_eq!(reopened.decks()[0].cards.len(), 1);
}

/// Errors before the apply step never write to the blob store.
#[tokio::test]
async fn failed_integration_does_not_write() {
    let blobs = Arc::new(ControlledBlobStore::new());
    let mut store = CardStore::new(blobs.clone());
    let deck = store.create_deck("Chemistry").expect("deck");
    let card = store.append_card(deck.id, "pH of water", "7").expect("card");
    let mut conversation = Conversation::for_card(&card);
    conversation.push_user("At what temperature?");
    let answer = conversation.push_assistant("At 25 degrees Celsius.").id;
    let request = IntegrationRequest {
        card,
        transcript: conversation.messages().to_vec(),
        assistant_message_id: answer,
        instructions: Some("mention temperature".to_string()),
    };
    let writes = blobs.writes();

    let failures = vec![
        (
            vec![Ok(api_error_body("model overloaded"))],
            FlashdeckError::Response("model overloaded".to_string()),
        ),
        (
            vec![
                Err(TransportError::Network("reset".to_string())),
                Err(TransportError::Network("reset".to_string())),
                Err(TransportError::Network("timed out".to_string())),
            ],
            FlashdeckError::Network("timed out".to_string()),
        ),
    ];
    for (script, expected) in failures {
        let err = orchestrator(Arc::new(ScriptedTransport::new(script)))
            .integrate(&mut store, &request)
            .await
            .expect_err("integration fails");
        assert_eq!(err, expected);
    }
    assert_eq!(blobs.writes(), writes);
    assert_eq!(store.card(request.card.id).expect("card").back, "7");
}

/// A save failure during integration keeps the new content in memory.
#[tokio::test]
async fn save_failure_during_apply_marks_store_dirty() {
    let blobs = Arc::new(ControlledBlobStore::new());
    let mut store = CardStore::new(blobs.clone());
    let deck = store.create_deck("History").expect("deck");
    let card = store.append_card(deck.id, "1066", "Hastings").expect("card");
    let mut conversation = Conversation::for_card(&card);
    let answer = conversation.push_assistant("William won.").id;
    blobs.fail_writes(true);

    let transport = Arc::new(ScriptedTransport::new(vec![Ok(chat_body(
        "<CARD><FRONT>1066</FRONT><BACK>Hastings; William won</BACK></CARD>",
    ))]));
    let err = orchestrator(transport)
        .integrate(
            &mut store,
            &IntegrationRequest {
                card: card.clone(),
                transcript: conversation.messages().to_vec(),
                assistant_message_id: answer,
                instructions: None,
            },
        )
        .await
        .expect_err("save fails");
    assert!(matches!(err, FlashdeckError::Io(_)));
    assert!(store.is_dirty());
    assert_eq!(store.card(card.id).expect("card").back, "Hastings; William won");
}
