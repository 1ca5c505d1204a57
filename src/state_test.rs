use super::*;
use crate::services::chat::Phase;
use crate::test_support::{EchoGenerator, MemoryStore};

fn state(generator: Option<Arc<dyn Generator>>) -> AppState {
    AppState::new(Arc::new(MemoryStore::default()), generator, PersonaCatalog::builtin().unwrap(), IdentityHandle::new())
}

#[test]
fn open_chat_requires_generator() {
    assert!(state(None).open_chat(ChatRoute::New, None, None).is_none());
}

#[test]
fn open_chat_resolves_persona_from_catalog() {
    let state = state(Some(Arc::new(EchoGenerator)));
    let session = state.open_chat(ChatRoute::New, Some("Image Generator"), None).unwrap();
    assert!(session.persona().is_ephemeral());
    assert_eq!(session.chat().title, "Image Generator");
    assert_eq!(session.phase(), Phase::Initializing);
}

#[tokio::test]
async fn open_existing_chat_adopts_stored_persona() {
    let store = Arc::new(MemoryStore::default());
    store.insert_chat("abc123", "user-1", "Storyteller");
    let state = AppState::new(store, Some(Arc::new(EchoGenerator)), PersonaCatalog::builtin().unwrap(), IdentityHandle::new());

    let mut session = state.open_chat(ChatRoute::Existing("abc123".into()), None, None).unwrap();
    session.initialize("user-1").await;
    assert_eq!(session.persona().title, "Storyteller");

    let mut explicit = state.open_chat(ChatRoute::Existing("abc123".into()), Some("Poems"), None).unwrap();
    explicit.initialize("user-1").await;
    assert_eq!(explicit.persona().title, "Poems");
}

#[tokio::test]
async fn open_existing_chat_missing_for_owner_redirects() {
    let state = state(Some(Arc::new(EchoGenerator)));
    let mut session = state.open_chat(ChatRoute::Existing("xyz".into()), None, None).unwrap();
    session.initialize("user-1").await;
    assert!(session.should_redirect());
}
