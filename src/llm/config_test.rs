use super::*;
use crate::test_support::env_lock;

/// # Safety
/// Callers hold `env_lock()` so no other test mutates the environment.
unsafe fn clear_llm_env() {
    unsafe {
        for key in [
            "LLM_PROVIDER",
            "LLM_MODEL",
            "LLM_MAX_TOKENS",
            "LLM_API_KEY_ENV",
            "LLM_OPENAI_MODE",
            "LLM_OPENAI_BASE_URL",
            "LLM_ANTHROPIC_BASE_URL",
            "LLM_REQUEST_TIMEOUT_SECS",
            "LLM_CONNECT_TIMEOUT_SECS",
            "IMAGE_API_KEY_ENV",
            "IMAGE_MODEL",
            "IMAGE_SIZE",
            "ANTHROPIC_API_KEY",
            "OPENAI_API_KEY",
            "TEST_KEY",
            "TEST_IMAGE_KEY",
        ] {
            std::env::remove_var(key);
        }
    }
}

#[test]
fn from_env_defaults_to_openai_with_image_support() {
    let _guard = env_lock();
    unsafe {
        clear_llm_env();
        std::env::set_var("LLM_API_KEY_ENV", "TEST_KEY");
        std::env::set_var("TEST_KEY", "secret");
    }

    let cfg = LlmConfig::from_env().unwrap();
    assert_eq!(cfg.provider, LlmProviderKind::OpenAi);
    assert_eq!(cfg.model, "gpt-4o-mini");
    assert_eq!(cfg.max_tokens, DEFAULT_LLM_MAX_TOKENS);
    assert_eq!(cfg.openai_mode, OpenAiApiMode::Responses);
    assert_eq!(cfg.openai_base_url, DEFAULT_OPENAI_BASE_URL);
    assert_eq!(
        cfg.timeouts,
        LlmTimeouts { request_secs: DEFAULT_LLM_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_LLM_CONNECT_TIMEOUT_SECS }
    );
    assert_eq!(cfg.api_key, "secret");

    let image = cfg.image.expect("openai key doubles as image key");
    assert_eq!(image.api_key, "secret");
    assert_eq!(image.model, DEFAULT_IMAGE_MODEL);
    assert_eq!(image.size, DEFAULT_IMAGE_SIZE);

    unsafe { clear_llm_env() };
}

#[test]
fn from_env_anthropic_without_image_key_disables_images() {
    let _guard = env_lock();
    unsafe {
        clear_llm_env();
        std::env::set_var("LLM_PROVIDER", "anthropic");
        std::env::set_var("LLM_API_KEY_ENV", "ANTHROPIC_API_KEY");
        std::env::set_var("ANTHROPIC_API_KEY", "sk-ant");
        std::env::set_var("LLM_ANTHROPIC_BASE_URL", "https://proxy.test/v1/");
    }

    let cfg = LlmConfig::from_env().unwrap();
    assert_eq!(cfg.provider, LlmProviderKind::Anthropic);
    assert_eq!(cfg.model, "claude-sonnet-4-5-20250929");
    assert_eq!(cfg.anthropic_base_url, "https://proxy.test/v1");
    assert!(cfg.image.is_none());

    unsafe { clear_llm_env() };
}

#[test]
fn from_env_anthropic_with_separate_image_key() {
    let _guard = env_lock();
    unsafe {
        clear_llm_env();
        std::env::set_var("LLM_PROVIDER", "anthropic");
        std::env::set_var("LLM_API_KEY_ENV", "TEST_KEY");
        std::env::set_var("TEST_KEY", "sk-ant");
        std::env::set_var("IMAGE_API_KEY_ENV", "TEST_IMAGE_KEY");
        std::env::set_var("TEST_IMAGE_KEY", "sk-img");
        std::env::set_var("IMAGE_MODEL", "gpt-image-1");
        std::env::set_var("IMAGE_SIZE", "512x512");
    }

    let cfg = LlmConfig::from_env().unwrap();
    let image = cfg.image.unwrap();
    assert_eq!(image.api_key, "sk-img");
    assert_eq!(image.model, "gpt-image-1");
    assert_eq!(image.size, "512x512");

    unsafe { clear_llm_env() };
}

#[test]
fn from_env_parses_openai_overrides() {
    let _guard = env_lock();
    unsafe {
        clear_llm_env();
        std::env::set_var("LLM_PROVIDER", "openai");
        std::env::set_var("LLM_API_KEY_ENV", "OPENAI_API_KEY");
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::set_var("LLM_MODEL", "gpt-4o");
        std::env::set_var("LLM_MAX_TOKENS", "512");
        std::env::set_var("LLM_OPENAI_MODE", "chat_completions");
        std::env::set_var("LLM_OPENAI_BASE_URL", "https://example.test/v1/");
        std::env::set_var("LLM_REQUEST_TIMEOUT_SECS", "42");
        std::env::set_var("LLM_CONNECT_TIMEOUT_SECS", "7");
    }

    let cfg = LlmConfig::from_env().unwrap();
    assert_eq!(cfg.model, "gpt-4o");
    assert_eq!(cfg.max_tokens, 512);
    assert_eq!(cfg.openai_mode, OpenAiApiMode::ChatCompletions);
    assert_eq!(cfg.openai_base_url, "https://example.test/v1");
    assert_eq!(cfg.image.unwrap().base_url, "https://example.test/v1");
    assert_eq!(cfg.timeouts, LlmTimeouts { request_secs: 42, connect_secs: 7 });

    unsafe { clear_llm_env() };
}

#[test]
fn from_env_missing_key_var_errors() {
    let _guard = env_lock();
    unsafe { clear_llm_env() };

    let err = LlmConfig::from_env().unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey { var } if var == "LLM_API_KEY_ENV"));
}

#[test]
fn from_env_unknown_provider_errors() {
    let _guard = env_lock();
    unsafe {
        clear_llm_env();
        std::env::set_var("LLM_PROVIDER", "bad");
        std::env::set_var("LLM_API_KEY_ENV", "TEST_KEY");
        std::env::set_var("TEST_KEY", "secret");
    }

    let err = LlmConfig::from_env().unwrap_err().to_string();
    assert!(err.contains("unknown LLM_PROVIDER"));

    unsafe { clear_llm_env() };
}

#[test]
fn from_env_unknown_openai_mode_errors() {
    let _guard = env_lock();
    unsafe {
        clear_llm_env();
        std::env::set_var("LLM_API_KEY_ENV", "TEST_KEY");
        std::env::set_var("TEST_KEY", "secret");
        std::env::set_var("LLM_OPENAI_MODE", "bad_mode");
    }

    let err = LlmConfig::from_env().unwrap_err().to_string();
    assert!(err.contains("unsupported openai_api mode"));

    unsafe { clear_llm_env() };
}
