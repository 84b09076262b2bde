//! End-to-end conversation flows against the in-memory backend.

use std::sync::Arc;

use pv_client::conversation::{DECRYPT_FAILED_PLACEHOLDER, ENCRYPTED_PLACEHOLDER};
use pv_client::{ChatClient, ClientError, Directory, DocumentStore, MemoryBackend};
use pv_crypto::CryptoError;
use pv_proto::message::{DeliveryState, Envelope, MessageBody, MessageRecord};
use pv_store::{KeyStore, MemoryKeyStore, StoredIdentity};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pv_client=debug".into()),
        )
        .try_init();
}

async fn sign_in(
    backend: &MemoryBackend,
    user_id: &str,
    display_name: &str,
    key_store: &MemoryKeyStore,
) -> ChatClient {
    ChatClient::sign_in(
        user_id,
        display_name,
        key_store,
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
    )
    .await
    .expect("sign in")
}

#[tokio::test]
async fn two_published_users_exchange_an_encrypted_hello() -> anyhow::Result<()> {
    init_tracing();
    let backend = MemoryBackend::new();
    let alice_keys = MemoryKeyStore::new();
    let bob_keys = MemoryKeyStore::new();

    let alice = sign_in(&backend, "alice", "Alice", &alice_keys).await;
    let bob = sign_in(&backend, "bob", "Bob", &bob_keys).await;

    let conversation = alice.find_or_create_direct("bob").await?;
    assert!(!conversation.is_group);
    assert_eq!(conversation.keyring.len(), 2);

    let alice_view = alice.open_conversation(&conversation.id).await?;
    assert!(alice_view.is_encrypted());
    alice_view.send_text("hello").await?;

    // The stored document must carry an envelope, not the text.
    let stored = backend.list_messages(&conversation.id, 10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert!(matches!(stored[0].body, MessageBody::Encrypted { .. }));

    // Bob opens the conversation, unwraps his copy of the key, and reads
    // exactly what Alice wrote.
    let bob_view = bob.open_conversation(&conversation.id).await?;
    assert!(bob_view.is_encrypted());
    let messages = bob_view.messages().await?;
    assert_eq!(bob_view.render(&messages[0]), "hello");

    // Replies flow the other way under the same key.
    bob_view.send_text("hi alice").await?;
    let messages = alice_view.messages().await?;
    assert_eq!(alice_view.render(&messages[1]), "hi alice");

    Ok(())
}

#[tokio::test]
async fn delivery_status_sweep_and_unread_reset() -> anyhow::Result<()> {
    init_tracing();
    let backend = MemoryBackend::new();
    let alice = sign_in(&backend, "alice", "Alice", &MemoryKeyStore::new()).await;
    let bob = sign_in(&backend, "bob", "Bob", &MemoryKeyStore::new()).await;

    let conversation = alice.find_or_create_direct("bob").await?;
    let alice_view = alice.open_conversation(&conversation.id).await?;
    alice_view.send_text("are you there?").await?;

    let bob_view = bob.open_conversation(&conversation.id).await?;
    bob_view.mark_delivered_and_read().await?;

    let stored = backend.list_messages(&conversation.id, 10).await.unwrap();
    assert_eq!(stored[0].status, DeliveryState::Read);

    // Bob's own messages are never swept by his client.
    bob_view.send_text("yes").await?;
    bob_view.mark_delivered_and_read().await?;
    let stored = backend.list_messages(&conversation.id, 10).await.unwrap();
    assert_eq!(stored[1].status, DeliveryState::Sent);

    let record = backend
        .get_conversation(&conversation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.unread.get("bob"), Some(&0));
    assert_eq!(record.last_message.as_deref(), Some("yes"));

    Ok(())
}

#[tokio::test]
async fn direct_conversations_are_deduplicated() -> anyhow::Result<()> {
    init_tracing();
    let backend = MemoryBackend::new();
    let alice = sign_in(&backend, "alice", "Alice", &MemoryKeyStore::new()).await;
    let _bob = sign_in(&backend, "bob", "Bob", &MemoryKeyStore::new()).await;

    let first = alice.find_or_create_direct("bob").await?;
    let second = alice.find_or_create_direct("bob").await?;
    assert_eq!(first.id, second.id);

    Ok(())
}

#[tokio::test]
async fn keyless_peer_makes_a_direct_conversation_plaintext() -> anyhow::Result<()> {
    init_tracing();
    let backend = MemoryBackend::new();
    let alice = sign_in(&backend, "alice", "Alice", &MemoryKeyStore::new()).await;

    // "carol" never signed in, so she has no published key.
    let conversation = alice.create_conversation(&["carol"], None).await?;
    assert_eq!(conversation.members, vec!["alice", "carol"]);
    assert!(conversation.keyring.is_empty());

    let view = alice.open_conversation(&conversation.id).await?;
    assert!(!view.is_encrypted());
    view.send_text("hi").await?;

    // Stored as `{"text": "hi"}`, since no shared key exists.
    let stored = backend.list_messages(&conversation.id, 10).await.unwrap();
    let json = serde_json::to_value(&stored[0])?;
    assert_eq!(json["text"], "hi");
    assert!(json.get("enc").is_none());

    // A non-member has no access path at all: not in the member listing,
    // and no keyring entry to unwrap.
    let for_bob = backend.conversations_for("bob").await.unwrap();
    assert!(for_bob.is_empty());
    assert!(conversation.wrapped_key_for("bob").is_none());

    Ok(())
}

#[tokio::test]
async fn group_with_a_keyless_member_stays_encrypted_for_the_rest() -> anyhow::Result<()> {
    init_tracing();
    let backend = MemoryBackend::new();
    let alice = sign_in(&backend, "alice", "Alice", &MemoryKeyStore::new()).await;
    let bob = sign_in(&backend, "bob", "Bob", &MemoryKeyStore::new()).await;

    // Dave has not signed in yet, so he has no published key at creation
    // time.
    let conversation = alice
        .create_conversation(&["bob", "dave"], Some("trio"))
        .await?;
    assert!(conversation.is_group);
    assert_eq!(conversation.members.len(), 3);
    assert_eq!(conversation.keyring.len(), 2);
    assert!(conversation.wrapped_key_for("dave").is_none());

    let alice_view = alice.open_conversation(&conversation.id).await?;
    assert!(alice_view.is_encrypted());
    alice_view.send_text("keyed members only").await?;

    let bob_view = bob.open_conversation(&conversation.id).await?;
    assert!(bob_view.is_encrypted());
    let messages = bob_view.messages().await?;
    assert_eq!(bob_view.render(&messages[0]), "keyed members only");

    // Dave publishes a key afterwards; his keyring entry is NOT backfilled.
    // He is a member but opens in plaintext mode, and encrypted history
    // renders as the placeholder label.
    let dave = sign_in(&backend, "dave", "Dave", &MemoryKeyStore::new()).await;
    let dave_view = dave.open_conversation(&conversation.id).await?;
    assert!(!dave_view.is_encrypted());
    let messages = dave_view.messages().await?;
    assert_eq!(dave_view.render(&messages[0]), ENCRYPTED_PLACEHOLDER);

    Ok(())
}

#[tokio::test]
async fn corrupt_key_store_blocks_sign_in() {
    init_tracing();
    let backend = MemoryBackend::new();
    let key_store = MemoryKeyStore::new();
    key_store
        .save(&StoredIdentity {
            version: 1,
            public_key: "???".into(),
            secret_key: "???".into(),
        })
        .await
        .unwrap();

    let result = ChatClient::sign_in(
        "alice",
        "Alice",
        &key_store,
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
    )
    .await;
    assert!(matches!(result, Err(ClientError::KeyStoreCorrupt(_))));

    // Nothing was published for the broken identity.
    assert!(backend.get("alice").await.unwrap().is_none());
}

#[tokio::test]
async fn tampered_keyring_entry_makes_the_conversation_unreadable() -> anyhow::Result<()> {
    init_tracing();
    let backend = MemoryBackend::new();
    let alice = sign_in(&backend, "alice", "Alice", &MemoryKeyStore::new()).await;
    let bob = sign_in(&backend, "bob", "Bob", &MemoryKeyStore::new()).await;

    let conversation = alice.find_or_create_direct("bob").await?;

    let mut record = backend
        .get_conversation(&conversation.id)
        .await
        .unwrap()
        .unwrap();
    let wrapped = record.keyring.get("bob").unwrap().clone();
    let mut bytes = pv_crypto::encoding::from_text(&wrapped)?;
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    record
        .keyring
        .insert("bob".into(), pv_crypto::encoding::to_text(&bytes));
    backend.put_conversation(record).await.unwrap();

    let result = bob.open_conversation(&conversation.id).await;
    assert!(matches!(
        result,
        Err(ClientError::Crypto(CryptoError::KeyUnwrapFailed))
    ));

    // Alice's entry is untouched; her open still succeeds.
    assert!(alice
        .open_conversation(&conversation.id)
        .await?
        .is_encrypted());

    Ok(())
}

#[tokio::test]
async fn resolved_keys_are_cached_for_the_session() -> anyhow::Result<()> {
    init_tracing();
    let backend = MemoryBackend::new();
    let alice = sign_in(&backend, "alice", "Alice", &MemoryKeyStore::new()).await;
    let _bob = sign_in(&backend, "bob", "Bob", &MemoryKeyStore::new()).await;

    let conversation = alice.find_or_create_direct("bob").await?;
    let first = alice.open_conversation(&conversation.id).await?;
    assert!(first.is_encrypted());
    first.send_text("before").await?;

    // Strip alice's keyring entry from the stored record. A later open in
    // the same session still resolves the key from the cache.
    let mut record = backend
        .get_conversation(&conversation.id)
        .await
        .unwrap()
        .unwrap();
    record.keyring.remove("alice");
    backend.put_conversation(record).await.unwrap();

    let second = alice.open_conversation(&conversation.id).await?;
    assert!(second.is_encrypted());
    let messages = second.messages().await?;
    assert_eq!(second.render(&messages[0]), "before");

    Ok(())
}

#[tokio::test]
async fn tampered_message_renders_placeholder_and_stream_continues() -> anyhow::Result<()> {
    init_tracing();
    let backend = MemoryBackend::new();
    let alice = sign_in(&backend, "alice", "Alice", &MemoryKeyStore::new()).await;
    let bob = sign_in(&backend, "bob", "Bob", &MemoryKeyStore::new()).await;

    let conversation = alice.find_or_create_direct("bob").await?;
    let alice_view = alice.open_conversation(&conversation.id).await?;
    alice_view.send_text("good message").await?;

    // A forged envelope appended by a malicious writer.
    backend
        .append_message(
            &conversation.id,
            MessageRecord::new(
                "alice",
                MessageBody::Encrypted {
                    enc: Envelope {
                        ct: pv_crypto::encoding::to_text(b"forged ciphertext"),
                        iv: pv_crypto::encoding::to_text(&[0u8; 12]),
                    },
                },
            ),
        )
        .await
        .unwrap();

    alice_view.send_text("still fine").await?;

    let bob_view = bob.open_conversation(&conversation.id).await?;
    let messages = bob_view.messages().await?;
    let rendered: Vec<String> = messages.iter().map(|m| bob_view.render(m)).collect();
    assert_eq!(
        rendered,
        vec!["good message", DECRYPT_FAILED_PLACEHOLDER, "still fine"]
    );

    Ok(())
}

#[tokio::test]
async fn identity_survives_repeated_sign_ins() -> anyhow::Result<()> {
    init_tracing();
    let backend = MemoryBackend::new();
    let key_store = MemoryKeyStore::new();

    let first = sign_in(&backend, "alice", "Alice", &key_store).await;
    let first_key = first.public_key().clone();
    drop(first);

    let second = sign_in(&backend, "alice", "Alice", &key_store).await;
    assert_eq!(&first_key, second.public_key());

    let published = backend.get("alice").await.unwrap().unwrap();
    assert_eq!(published.public_key, first_key.to_text());
    assert_eq!(published.name, "Alice");

    Ok(())
}
